//! Send/Sync guarantees for types shared across threads.

use raven_rs::event::HostnameCache;
use raven_rs::marshaller::{JsonMarshaller, StackTraceBinding};
use raven_rs::transport::{AsyncTransport, HttpTransport, UdpTransport};
use raven_rs::{Client, DefaultClientFactory, Dsn, Event, ExceptionChain, FrameFilter};
use rstest::rstest;
use static_assertions::{assert_impl_all, assert_not_impl_any};

#[rstest]
fn shared_components_are_send_sync() {
    assert_impl_all!(Client: Send, Sync);
    assert_impl_all!(DefaultClientFactory: Send, Sync);
    assert_impl_all!(HostnameCache: Send, Sync);
    assert_impl_all!(JsonMarshaller: Send, Sync);
    assert_impl_all!(StackTraceBinding: Send, Sync);
    assert_impl_all!(FrameFilter: Send, Sync);
}

#[rstest]
fn transports_are_send_sync() {
    assert_impl_all!(HttpTransport: Send, Sync);
    assert_impl_all!(UdpTransport: Send, Sync);
    assert_impl_all!(AsyncTransport: Send, Sync);
}

#[rstest]
fn values_move_between_threads() {
    assert_impl_all!(Event: Send, Sync, Clone);
    assert_impl_all!(Dsn: Send, Sync, Clone);
    assert_impl_all!(ExceptionChain: Send, Sync, Clone);
}

#[rstest]
fn reporting_scope_stays_on_its_thread() {
    assert_not_impl_any!(raven_rs::scope::ReportingScope: Send, Sync);
}

//! HTTP transport against a local mock backend.

mod test_utils;

use std::io::Read;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::ZlibDecoder;
use raven_rs::dsn::Dsn;
use raven_rs::marshaller::JsonMarshaller;
use raven_rs::test_utils::sample_event;
use raven_rs::transport::{HttpTransport, HttpTransportConfig, Transport, TransportError};
use rstest::rstest;
use serde_json::Value;

use test_utils::{CapturedRequest, spawn_mock_server, tcp_listener};

fn transport_for(addr: std::net::SocketAddr, compression: bool) -> HttpTransport {
    let dsn = Dsn::parse(&format!("http://public:secret@{addr}/sentry/42")).expect("dsn");
    let mut marshaller = JsonMarshaller::new();
    marshaller.set_compression(compression);
    let config = HttpTransportConfig {
        timeout: Duration::from_secs(5),
        ..Default::default()
    };
    HttpTransport::new(&dsn, Arc::new(marshaller), config).expect("transport")
}

fn received(rx: &std::sync::mpsc::Receiver<CapturedRequest>) -> CapturedRequest {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("request reached the mock server")
}

#[rstest]
fn posts_event_to_store_endpoint(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_mock_server(tcp_listener, 200, "");
    let transport = transport_for(addr, false);
    let event = sample_event("boiler pressure high");

    transport.send(&event).expect("send");

    let request = received(&rx);
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/sentry/api/42/store/");
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert!(
        request
            .header("user-agent")
            .is_some_and(|ua| ua.starts_with("raven-rs/3."))
    );

    let auth = request.header("x-sentry-auth").expect("auth header");
    assert!(auth.starts_with("Sentry sentry_version=3,"));
    assert!(auth.contains("sentry_key=public"));
    assert!(auth.contains("sentry_secret=secret"));

    let body: Value = serde_json::from_slice(&request.body).expect("json body");
    assert_eq!(body["event_id"], event.id().simple().to_string());
    assert_eq!(body["message"], "boiler pressure high");
}

#[rstest]
fn compressed_body_is_base64_zlib(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_mock_server(tcp_listener, 200, "");
    let transport = transport_for(addr, true);

    transport.send(&sample_event("squeezed")).expect("send");

    let request = received(&rx);
    assert_eq!(
        request.header("content-type"),
        Some("application/octet-stream")
    );
    let deflated = STANDARD.decode(&request.body).expect("base64 body");
    let mut json = String::new();
    ZlibDecoder::new(deflated.as_slice())
        .read_to_string(&mut json)
        .expect("zlib body");
    let body: Value = serde_json::from_str(&json).expect("json body");
    assert_eq!(body["message"], "squeezed");
}

#[rstest]
fn explained_rejection_is_not_an_error(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_mock_server(tcp_listener, 403, "project disabled");
    let transport = transport_for(addr, false);

    assert!(transport.send(&sample_event("rejected")).is_ok());
    received(&rx);
}

#[rstest]
fn bare_error_status_is_reported(tcp_listener: TcpListener) {
    let (addr, rx) = spawn_mock_server(tcp_listener, 500, "");
    let transport = transport_for(addr, false);

    let err = transport.send(&sample_event("broken")).unwrap_err();
    assert!(matches!(err, TransportError::ServerStatus { status: 500 }));
    received(&rx);
}

#[rstest]
fn unreachable_backend_is_an_io_error(tcp_listener: TcpListener) {
    let addr = tcp_listener.local_addr().expect("address");
    drop(tcp_listener);
    let transport = transport_for(addr, false);

    let err = transport.send(&sample_event("nobody home")).unwrap_err();
    assert!(matches!(err, TransportError::Io(_)));
}

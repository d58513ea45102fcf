//! Structured payloads attached to an event.
//!
//! Each payload kind implements [`EventInterface`] and is stored on the
//! event under its namespaced name. The marshaller finds the binding
//! registered for that name and downcasts through
//! [`EventInterface::as_any`], so new kinds need no change to
//! [`Event`](crate::event::Event).

use std::any::Any;
use std::fmt::Debug;

mod exception;
mod http;
mod message;
mod stacktrace;

pub use exception::{EXCEPTION_INTERFACE, ExceptionInterface};
pub use http::{HTTP_INTERFACE, HttpInterface};
pub use message::{MESSAGE_INTERFACE, MessageInterface};
pub use stacktrace::{STACKTRACE_INTERFACE, StackTraceInterface};

/// A payload kind that can be attached to an event.
pub trait EventInterface: Debug + Send + Sync {
    /// Namespaced name the payload is keyed by, e.g.
    /// `sentry.interfaces.Message`.
    fn interface_name(&self) -> &'static str;

    /// Return `self` as `Any` for downcasting in bindings.
    fn as_any(&self) -> &dyn Any;
}

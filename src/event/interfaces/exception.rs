use std::any::Any;
use std::error::Error;

use super::EventInterface;
use crate::exception_schema::ExceptionChain;

pub const EXCEPTION_INTERFACE: &str = "sentry.interfaces.Exception";

/// An error and its causes, outermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExceptionInterface {
    chain: ExceptionChain,
}

impl ExceptionInterface {
    pub fn new(chain: ExceptionChain) -> Self {
        Self { chain }
    }

    /// Capture `err` and its `source()` chain.
    pub fn from_error<E: Error + 'static>(err: &E) -> Self {
        Self::new(ExceptionChain::from_typed_error(err))
    }

    pub fn chain(&self) -> &ExceptionChain {
        &self.chain
    }
}

impl From<ExceptionChain> for ExceptionInterface {
    fn from(chain: ExceptionChain) -> Self {
        Self::new(chain)
    }
}

impl EventInterface for ExceptionInterface {
    fn interface_name(&self) -> &'static str {
        EXCEPTION_INTERFACE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

use std::any::Any;

use super::EventInterface;
use crate::exception_schema::{ExceptionChain, StackFrame};
use crate::frame_filter::frames_in_common;

pub const STACKTRACE_INTERFACE: &str = "sentry.interfaces.Stacktrace";

/// Frames of one stack, innermost call first.
///
/// When the stack belongs to an error that has a cause, the number of
/// trailing frames it shares with the cause is recorded so the binding can
/// hide them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackTraceInterface {
    frames: Vec<StackFrame>,
    frames_common_with_enclosing: usize,
}

impl StackTraceInterface {
    pub fn new(frames: Vec<StackFrame>) -> Self {
        Self {
            frames,
            frames_common_with_enclosing: 0,
        }
    }

    /// Stack of an error whose cause captured `enclosing`.
    pub fn with_enclosing(frames: Vec<StackFrame>, enclosing: &[StackFrame]) -> Self {
        let common = frames_in_common(&frames, enclosing);
        Self {
            frames,
            frames_common_with_enclosing: common,
        }
    }

    /// Stack of the outermost error of `chain`.
    pub fn from_chain(chain: &ExceptionChain) -> Self {
        let Some(outer) = chain.outer() else {
            return Self::default();
        };
        Self {
            frames: outer.frames.clone(),
            frames_common_with_enclosing: chain.frames_common_with_cause(0),
        }
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn frames_common_with_enclosing(&self) -> usize {
        self.frames_common_with_enclosing
    }
}

impl EventInterface for StackTraceInterface {
    fn interface_name(&self) -> &'static str {
        STACKTRACE_INTERFACE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception_schema::CapturedException;

    fn frame(function: &str) -> StackFrame {
        StackFrame::new("app", function).with_location("app.rs", 1)
    }

    #[test]
    fn from_chain_takes_outer_frames_and_common_count() {
        let outer = CapturedException::new("Outer", "o")
            .with_frames(vec![frame("handle"), frame("serve"), frame("main")]);
        let cause = CapturedException::new("Inner", "i")
            .with_frames(vec![frame("read"), frame("serve"), frame("main")]);
        let chain = ExceptionChain::new(outer).caused_by(cause);

        let trace = StackTraceInterface::from_chain(&chain);

        assert_eq!(trace.frames().len(), 3);
        assert_eq!(trace.frames()[0].function, "handle");
        assert_eq!(trace.frames_common_with_enclosing(), 2);
    }

    #[test]
    fn from_chain_uses_attached_outer_frames() {
        let chain = ExceptionChain::new(CapturedException::new("Solo", "alone"))
            .with_outer_frames(vec![frame("report")]);

        let trace = StackTraceInterface::from_chain(&chain);

        assert_eq!(trace.frames(), [frame("report")].as_slice());
        assert_eq!(trace.frames_common_with_enclosing(), 0);
    }

    #[test]
    fn empty_chain_gives_empty_trace() {
        let trace = StackTraceInterface::from_chain(&ExceptionChain::default());
        assert_eq!(trace, StackTraceInterface::default());
    }
}

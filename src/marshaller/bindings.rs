//! Per-interface JSON writers.

use serde_json::{Map, Value, json};

use super::MarshallError;
use crate::event::interfaces::{
    EXCEPTION_INTERFACE, EventInterface, ExceptionInterface, HTTP_INTERFACE, HttpInterface,
    MESSAGE_INTERFACE, MessageInterface, STACKTRACE_INTERFACE, StackTraceInterface,
};
use crate::exception_schema::StackFrame;
use crate::frame_filter::FrameFilter;

/// Writes one payload kind as a JSON value.
pub trait InterfaceBinding: Send + Sync {
    fn write_interface(&self, interface: &dyn EventInterface) -> Result<Value, MarshallError>;
}

fn downcast<'a, T: 'static>(
    interface: &'a dyn EventInterface,
    name: &'static str,
) -> Result<&'a T, MarshallError> {
    interface
        .as_any()
        .downcast_ref::<T>()
        .ok_or(MarshallError::UnexpectedInterface(name))
}

/// Writes `{"frames": [...]}`, oldest call first.
#[derive(Clone, Debug, Default)]
pub struct StackTraceBinding {
    remove_common_frames_with_enclosing: bool,
    frame_filter: FrameFilter,
}

impl StackTraceBinding {
    pub fn new(frame_filter: FrameFilter) -> Self {
        Self {
            remove_common_frames_with_enclosing: false,
            frame_filter,
        }
    }

    /// Mark frames shared with the cause's stack as outside the application.
    pub fn set_remove_common_frames_with_enclosing(&mut self, remove: bool) -> &mut Self {
        self.remove_common_frames_with_enclosing = remove;
        self
    }

    pub fn remove_common_frames_with_enclosing(&self) -> bool {
        self.remove_common_frames_with_enclosing
    }

    pub fn frame_filter(&self) -> &FrameFilter {
        &self.frame_filter
    }

    pub fn frame_filter_mut(&mut self) -> &mut FrameFilter {
        &mut self.frame_filter
    }

    /// Write `frames` (innermost first) of which the last `common` are
    /// shared with the enclosing stack.
    pub(crate) fn frames_value(&self, frames: &[StackFrame], common: usize) -> Value {
        let shared_from = frames.len().saturating_sub(common);
        let written: Vec<Value> = frames
            .iter()
            .enumerate()
            .rev()
            .map(|(i, frame)| {
                let shared = self.remove_common_frames_with_enclosing && i >= shared_from;
                self.frame_value(frame, !shared && self.frame_filter.is_in_app(frame))
            })
            .collect();
        json!({ "frames": written })
    }

    fn frame_value(&self, frame: &StackFrame, in_app: bool) -> Value {
        let mut map = Map::new();
        map.insert("module".into(), Value::from(frame.module.as_str()));
        map.insert("function".into(), Value::from(frame.function.as_str()));
        if let Some(filename) = &frame.filename {
            map.insert("filename".into(), Value::from(filename.as_str()));
        }
        if let Some(lineno) = frame.lineno {
            map.insert("lineno".into(), Value::from(lineno));
        }
        map.insert("in_app".into(), Value::from(in_app));
        Value::Object(map)
    }
}

impl InterfaceBinding for StackTraceBinding {
    fn write_interface(&self, interface: &dyn EventInterface) -> Result<Value, MarshallError> {
        let stack = downcast::<StackTraceInterface>(interface, STACKTRACE_INTERFACE)?;
        Ok(self.frames_value(stack.frames(), stack.frames_common_with_enclosing()))
    }
}

/// Writes the error chain as an array, outermost error first.
#[derive(Clone, Debug, Default)]
pub struct ExceptionBinding {
    stack_trace: StackTraceBinding,
}

impl ExceptionBinding {
    pub fn new(stack_trace: StackTraceBinding) -> Self {
        Self { stack_trace }
    }
}

impl InterfaceBinding for ExceptionBinding {
    fn write_interface(&self, interface: &dyn EventInterface) -> Result<Value, MarshallError> {
        let exception = downcast::<ExceptionInterface>(interface, EXCEPTION_INTERFACE)?;
        let chain = exception.chain();
        let values = chain
            .iter()
            .enumerate()
            .map(|(i, captured)| {
                let mut map = Map::new();
                map.insert("type".into(), Value::from(captured.type_name.as_str()));
                map.insert("value".into(), Value::from(captured.message.as_str()));
                if let Some(module) = &captured.module {
                    map.insert("module".into(), Value::from(module.as_str()));
                }
                map.insert(
                    "stacktrace".into(),
                    self.stack_trace
                        .frames_value(&captured.frames, chain.frames_common_with_cause(i)),
                );
                Value::Object(map)
            })
            .collect();
        Ok(Value::Array(values))
    }
}

/// Writes `{"message": template, "params": [...]}`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MessageBinding;

impl InterfaceBinding for MessageBinding {
    fn write_interface(&self, interface: &dyn EventInterface) -> Result<Value, MarshallError> {
        let message = downcast::<MessageInterface>(interface, MESSAGE_INTERFACE)?;
        Ok(json!({
            "message": message.message(),
            "params": message.params(),
        }))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HttpBinding;

impl InterfaceBinding for HttpBinding {
    fn write_interface(&self, interface: &dyn EventInterface) -> Result<Value, MarshallError> {
        let http = downcast::<HttpInterface>(interface, HTTP_INTERFACE)?;
        Ok(serde_json::to_value(http)?)
    }
}

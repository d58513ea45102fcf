//! Structured representation of stack frames and error chains.
//!
//! These types are what adapters hand to the event builder: a
//! [`StackFrame`] describes one call site, a [`CapturedException`] one error
//! with its own frames, and an [`ExceptionChain`] the error plus its causes,
//! ordered from the outermost error to the innermost cause.
//!
//! # Example
//!
//! ```rust
//! use raven_rs::exception_schema::{CapturedException, ExceptionChain, StackFrame};
//!
//! let outer = CapturedException::new("ConfigError", "cannot load settings")
//!     .with_frames(vec![StackFrame::new("app::config", "load").with_location("config.rs", 12)]);
//! let cause = CapturedException::new("io::Error", "permission denied");
//! let chain = ExceptionChain::new(outer).caused_by(cause);
//!
//! assert_eq!(chain.len(), 2);
//! assert!(chain.has_cause());
//! ```

use std::error::Error;
use std::fmt;

use crate::frame_filter::frames_in_common;

/// Upper bound on the number of causes collected from an error chain.
pub const MAX_CHAIN_DEPTH: usize = 64;

/// A single frame of a stack trace.
///
/// `module` plays the role of the class or module that owns `function`.
/// Frames are stored innermost (most recent call) first, as captured.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StackFrame {
    /// Module path owning the function, e.g. `my_app::store`.
    pub module: String,
    /// Function or method name.
    pub function: String,
    /// Source file name, when known.
    pub filename: Option<String>,
    /// Line number in the source file, when known.
    pub lineno: Option<u32>,
}

impl StackFrame {
    /// Create a frame with no source location.
    ///
    /// ```rust
    /// use raven_rs::exception_schema::StackFrame;
    ///
    /// let frame = StackFrame::new("app::db", "connect");
    /// assert!(frame.filename.is_none());
    /// assert!(frame.lineno.is_none());
    /// ```
    pub fn new(module: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
            ..Default::default()
        }
    }

    /// Split a fully qualified path (`a::b::function`) into module and
    /// function.
    pub fn from_path(path: &str) -> Self {
        match path.rsplit_once("::") {
            Some((module, function)) => Self::new(module, function),
            None => Self::new("", path),
        }
    }

    /// Attach a file name and line number.
    #[must_use]
    pub fn with_location(mut self, filename: impl Into<String>, lineno: u32) -> Self {
        self.filename = Some(filename.into());
        self.lineno = Some(lineno);
        self
    }

    /// Attach a file name without a line number.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Attach a line number without a file name.
    #[must_use]
    pub fn with_lineno(mut self, lineno: u32) -> Self {
        self.lineno = Some(lineno);
        self
    }
}

/// Location identifier: `module.function(file:line)`, `module.function(file)`
/// or `module.function`, depending on what is known.
impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.function)?;
        match (&self.filename, self.lineno) {
            (Some(file), Some(line)) => write!(f, "({file}:{line})"),
            (Some(file), None) => write!(f, "({file})"),
            (None, _) => Ok(()),
        }
    }
}

/// One error of a chain, with the frames captured for it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedException {
    /// Short type name, e.g. `ParseIntError`.
    pub type_name: String,
    /// Module owning the type, when known.
    pub module: Option<String>,
    /// Rendered error message.
    pub message: String,
    /// Frames, innermost call first.
    pub frames: Vec<StackFrame>,
}

impl CapturedException {
    /// Create an exception from a type name and a message.
    ///
    /// A qualified type name (`std::io::Error`) is split into module and
    /// short name.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        let (module, type_name) = split_type_name(&type_name.into());
        Self {
            type_name,
            module,
            message: message.into(),
            frames: Vec::new(),
        }
    }

    /// Attach stack frames.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    /// Override the module of the exception type.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Describe an error whose concrete type is unknown.
    ///
    /// The type name is taken from the leading identifier of the error's
    /// `Debug` output, which for derived implementations is the type or
    /// variant name.
    pub fn from_dyn_error(err: &(dyn Error + 'static)) -> Self {
        let debug = format!("{err:?}");
        let type_name: String = debug
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
            .collect();
        let type_name = if type_name.is_empty() {
            "Error".to_owned()
        } else {
            type_name
        };
        Self::new(type_name, err.to_string())
    }
}

fn split_type_name(name: &str) -> (Option<String>, String) {
    // Generic arguments may contain `::`; only split the outer path.
    let base = name.split('<').next().unwrap_or(name);
    match base.rsplit_once("::") {
        Some((module, _)) if !module.is_empty() => {
            (Some(module.to_owned()), name[module.len() + 2..].to_owned())
        }
        _ => (None, name.to_owned()),
    }
}

/// An error followed by its causes, outermost first.
///
/// The chain never contains the same error object twice: building one from
/// a `std::error::Error` stops at the first source already visited.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExceptionChain {
    exceptions: Vec<CapturedException>,
}

impl ExceptionChain {
    /// Start a chain with its outermost error.
    pub fn new(outer: CapturedException) -> Self {
        Self {
            exceptions: vec![outer],
        }
    }

    /// Append the next, more inner, cause.
    #[must_use]
    pub fn caused_by(mut self, cause: CapturedException) -> Self {
        self.exceptions.push(cause);
        self
    }

    /// Build a chain by walking `err.source()`.
    ///
    /// The walk stops on a self-referential or cyclic source, and after
    /// [`MAX_CHAIN_DEPTH`] errors.
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let mut seen: Vec<*const dyn Error> = Vec::new();
        let mut exceptions = Vec::new();
        let mut current = Some(err);
        while let Some(e) = current {
            let ptr: *const dyn Error = e;
            if seen.iter().any(|p| std::ptr::eq(*p, ptr)) || seen.len() >= MAX_CHAIN_DEPTH {
                break;
            }
            seen.push(ptr);
            exceptions.push(CapturedException::from_dyn_error(e));
            current = e.source();
        }
        Self { exceptions }
    }

    /// Like [`from_error`](Self::from_error), naming the outer error after
    /// its concrete type.
    pub fn from_typed_error<E: Error + 'static>(err: &E) -> Self {
        let mut chain = Self::from_error(err);
        if let Some(outer) = chain.exceptions.first_mut() {
            let (module, type_name) = split_type_name(std::any::type_name::<E>());
            outer.module = module;
            outer.type_name = type_name;
        }
        chain
    }

    /// Attach frames to the outermost error.
    #[must_use]
    pub fn with_outer_frames(mut self, frames: Vec<StackFrame>) -> Self {
        if let Some(outer) = self.exceptions.first_mut() {
            outer.frames = frames;
        }
        self
    }

    pub fn outer(&self) -> Option<&CapturedException> {
        self.exceptions.first()
    }

    pub fn exceptions(&self) -> &[CapturedException] {
        &self.exceptions
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapturedException> {
        self.exceptions.iter()
    }

    pub fn len(&self) -> usize {
        self.exceptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exceptions.is_empty()
    }

    /// Whether the outer error has at least one cause.
    pub fn has_cause(&self) -> bool {
        self.exceptions.len() > 1
    }

    /// Number of trailing frames the error at `index` shares with its cause.
    pub fn frames_common_with_cause(&self, index: usize) -> usize {
        match (self.exceptions.get(index), self.exceptions.get(index + 1)) {
            (Some(exception), Some(cause)) => frames_in_common(&exception.frames, &cause.frames),
            _ => 0,
        }
    }
}

//! Frame classification utilities for stack trace payloads.
//!
//! Two questions are answered here:
//!
//! - is a frame part of the application, or of the runtime and libraries
//!   beneath it ([`FrameFilter`])?
//! - how many trailing frames does an error share with its cause
//!   ([`frames_in_common`])?
//!
//! # Example
//!
//! ```rust
//! use raven_rs::exception_schema::StackFrame;
//! use raven_rs::frame_filter::FrameFilter;
//!
//! let mut filter = FrameFilter::default();
//! filter.add_not_in_app_prefix("hyper::");
//!
//! assert!(filter.is_in_app(&StackFrame::new("my_app::routes", "index")));
//! assert!(!filter.is_in_app(&StackFrame::new("core::ops::function", "call_once")));
//! assert!(!filter.is_in_app(&StackFrame::new("hyper::server", "serve")));
//! ```

use crate::exception_schema::StackFrame;

/// Module prefixes considered runtime or library code by default.
pub const DEFAULT_NOT_IN_APP_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "<std::",
    "<core::",
    "<alloc::",
    "backtrace::",
    "<backtrace::",
    "panic_unwind::",
    "rust_begin_unwind",
    "rust_panic",
    "__rust_",
    "_rust_",
    "log::",
    "<log::",
    "raven_rs::",
    "<raven_rs::",
];

/// Decides whether frames belong to the application.
///
/// A frame is outside the application when any configured prefix matches
/// it. Prefixes ending in `::` name module paths; bare prefixes such as
/// `rust_panic` name runtime symbols or whole crate names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameFilter {
    not_in_app: Vec<String>,
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self {
            not_in_app: DEFAULT_NOT_IN_APP_PREFIXES
                .iter()
                .map(|p| (*p).to_owned())
                .collect(),
        }
    }
}

impl FrameFilter {
    /// A filter with no prefixes; every frame is in the application.
    pub fn empty() -> Self {
        Self {
            not_in_app: Vec::new(),
        }
    }

    /// Treat modules starting with `prefix` as outside the application.
    pub fn add_not_in_app_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        let prefix = prefix.into();
        if !prefix.is_empty() && !self.not_in_app.contains(&prefix) {
            self.not_in_app.push(prefix);
        }
        self
    }

    pub fn not_in_app_prefixes(&self) -> &[String] {
        &self.not_in_app
    }

    pub fn is_in_app(&self, frame: &StackFrame) -> bool {
        !self.not_in_app.iter().any(|prefix| excludes(prefix, frame))
    }
}

/// Whether `prefix` places `frame` outside the application.
///
/// Path prefixes (containing `::`) match the qualified `module::function`
/// path. Other prefixes match the symbol of a frame without a module, or a
/// module whose first path segment is exactly the prefix.
fn excludes(prefix: &str, frame: &StackFrame) -> bool {
    if frame.module.is_empty() {
        return frame.function.starts_with(prefix);
    }
    if prefix.contains("::") {
        // `std::` must also match the bare module `std`.
        return format!("{}::{}", frame.module, frame.function).starts_with(prefix);
    }
    frame.module.split("::").next() == Some(prefix)
}

/// Count the trailing frames `frames` shares with `enclosing`.
///
/// Both slices are compared from their last element backwards until the
/// first mismatch.
///
/// ```rust
/// use raven_rs::exception_schema::StackFrame;
/// use raven_rs::frame_filter::frames_in_common;
///
/// let main = StackFrame::new("app", "main");
/// let a = vec![StackFrame::new("app", "load"), main.clone()];
/// let b = vec![StackFrame::new("app", "parse"), main];
/// assert_eq!(frames_in_common(&a, &b), 1);
/// ```
pub fn frames_in_common(frames: &[StackFrame], enclosing: &[StackFrame]) -> usize {
    frames
        .iter()
        .rev()
        .zip(enclosing.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn frame(module: &str, function: &str, line: u32) -> StackFrame {
        StackFrame::new(module, function).with_location("lib.rs", line)
    }

    #[rstest]
    #[case("std::thread", "spawn", false)]
    #[case("std", "process_exit", false)]
    #[case("core::ops::function", "call_once", false)]
    #[case("alloc::vec", "push", false)]
    #[case("", "rust_begin_unwind", false)]
    #[case("my_app::handlers", "process", true)]
    #[case("stdout_logger", "write", true)]
    #[case("rust_panicky::handlers", "retry", true)]
    #[case("__rust_helpers", "run", true)]
    #[case("", "rust_panic", false)]
    #[case("", "__rust_start_panic", false)]
    fn classifies_default_prefixes(
        #[case] module: &str,
        #[case] function: &str,
        #[case] in_app: bool,
    ) {
        let filter = FrameFilter::default();
        assert_eq!(filter.is_in_app(&StackFrame::new(module, function)), in_app);
    }

    #[rstest]
    fn added_prefixes_are_deduplicated() {
        let mut filter = FrameFilter::empty();
        filter
            .add_not_in_app_prefix("tokio::")
            .add_not_in_app_prefix("tokio::")
            .add_not_in_app_prefix("");
        assert_eq!(filter.not_in_app_prefixes(), ["tokio::".to_owned()]);
        assert!(!filter.is_in_app(&StackFrame::new("tokio::runtime", "block_on")));
    }

    #[rstest]
    #[case("hyper::proto", "dispatch", false)]
    #[case("hyper", "serve", false)]
    #[case("hyperlocal::client", "connect", true)]
    #[case("", "hyper_entry", false)]
    fn bare_prefixes_match_whole_crate_names(
        #[case] module: &str,
        #[case] function: &str,
        #[case] in_app: bool,
    ) {
        let mut filter = FrameFilter::empty();
        filter.add_not_in_app_prefix("hyper");
        assert_eq!(filter.is_in_app(&StackFrame::new(module, function)), in_app);
    }

    #[rstest]
    fn empty_filter_keeps_everything() {
        let filter = FrameFilter::empty();
        assert!(filter.is_in_app(&StackFrame::new("std::thread", "spawn")));
    }

    #[rstest]
    #[case(vec![], vec![], 0)]
    #[case(vec![frame("a", "f", 1)], vec![], 0)]
    #[case(vec![frame("a", "f", 1), frame("a", "e", 2)], vec![frame("a", "e", 2), frame("a", "e", 2)], 1)]
    #[case(vec![frame("a", "x", 1), frame("a", "e", 2)], vec![frame("a", "y", 1), frame("a", "e", 2)], 1)]
    #[case(vec![frame("a", "e", 2)], vec![frame("a", "x", 9), frame("a", "e", 2)], 1)]
    #[case(vec![frame("a", "f", 1), frame("a", "e", 2)], vec![frame("a", "f", 1), frame("a", "e", 2)], 2)]
    #[case(vec![frame("a", "f", 1), frame("a", "e", 2)], vec![frame("a", "f", 1), frame("a", "e", 3)], 0)]
    fn counts_trailing_common_frames(
        #[case] frames: Vec<StackFrame>,
        #[case] enclosing: Vec<StackFrame>,
        #[case] expected: usize,
    ) {
        assert_eq!(frames_in_common(&frames, &enclosing), expected);
    }
}

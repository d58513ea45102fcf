//! Capturing stack frames and call sites at runtime.

use backtrace::Backtrace;

use crate::exception_schema::StackFrame;

/// Frames produced by the capture machinery itself.
const CAPTURE_FRAME_PREFIXES: &[&str] = &[
    "backtrace::",
    "<backtrace::",
    "raven_rs::event::capture::",
];

/// Capture the current thread's stack, innermost call first.
///
/// Frames without symbol information are skipped, as are the frames of the
/// capture itself. Symbol names are demangled and stripped of their hash
/// suffix.
pub fn capture_frames() -> Vec<StackFrame> {
    frames_from_backtrace(&Backtrace::new())
}

/// Convert a resolved backtrace into frames, innermost call first.
pub fn frames_from_backtrace(backtrace: &Backtrace) -> Vec<StackFrame> {
    backtrace
        .frames()
        .iter()
        .flat_map(|frame| frame.symbols())
        .filter_map(|symbol| {
            let name = format!("{:#}", symbol.name()?);
            if CAPTURE_FRAME_PREFIXES.iter().any(|p| name.starts_with(p)) {
                return None;
            }
            let mut frame = StackFrame::from_path(&name);
            frame.filename = symbol
                .filename()
                .and_then(|path| path.file_name())
                .map(|file| file.to_string_lossy().into_owned());
            frame.lineno = symbol.lineno();
            Some(frame)
        })
        .collect()
}

/// Frame describing the location the macro is expanded at.
///
/// The module is the enclosing function's path and the function its name,
/// so the result identifies the call site in grouping and culprits.
///
/// ```rust
/// use raven_rs::call_site;
///
/// fn handler() -> raven_rs::exception_schema::StackFrame {
///     call_site!()
/// }
///
/// let site = handler();
/// assert_eq!(site.function, "handler");
/// assert!(site.lineno.is_some());
/// ```
#[macro_export]
macro_rules! call_site {
    () => {{
        fn __raven_here() {}
        let name = ::std::any::type_name_of_val(&__raven_here);
        let function = name.strip_suffix("::__raven_here").unwrap_or(name);
        $crate::exception_schema::StackFrame::from_path(function)
            .with_location(::std::file!(), ::std::line!())
    }};
}

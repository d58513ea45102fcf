//! Suppression of re-entrant reporting.
//!
//! Sending an event may itself log (transport diagnostics, a failing
//! connection). If those log records are routed back into the client, the
//! report would recurse. A [`ReportingScope`] marks the current call stack
//! as reporting; nested attempts see the mark and stand down.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static REPORTING: Cell<bool> = const { Cell::new(false) };
}

/// RAII guard marking the current thread as reporting.
///
/// The mark is cleared when the guard is dropped, on every exit path.
///
/// ```rust
/// use raven_rs::scope::ReportingScope;
///
/// let outer = ReportingScope::enter().expect("not reporting yet");
/// assert!(ReportingScope::is_active());
/// assert!(ReportingScope::enter().is_none());
/// drop(outer);
/// assert!(!ReportingScope::is_active());
/// ```
#[derive(Debug)]
pub struct ReportingScope {
    // The mark is per thread, so the guard must not leave it.
    _not_send: PhantomData<*const ()>,
}

impl ReportingScope {
    /// Enter the scope, or return `None` if this thread is already inside
    /// one.
    #[must_use]
    pub fn enter() -> Option<Self> {
        REPORTING.with(|flag| {
            if flag.replace(true) {
                None
            } else {
                Some(Self {
                    _not_send: PhantomData,
                })
            }
        })
    }

    /// Whether the current thread is inside a reporting scope.
    pub fn is_active() -> bool {
        REPORTING.with(Cell::get)
    }
}

impl Drop for ReportingScope {
    fn drop(&mut self) {
        REPORTING.with(|flag| flag.set(false));
    }
}

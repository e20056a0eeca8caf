//! Run a closure when the current scope ends.
//!
//! Inspired by `defer` in Go: [`defer`] hands back a guard whose only purpose
//! is to invoke the wrapped closure on drop. Guards must be bound to a named
//! local; an unbound guard is dropped immediately, which is almost never what
//! the caller meant, so the type is `#[must_use]`.

/// Scope guard returned by [`defer`].
///
/// Runs its closure exactly once when dropped. Not `Clone`.
#[must_use = "a Defer guard runs on scope exit; without a binding it fires immediately"]
pub struct Defer<F: FnOnce()> {
    action: Option<F>,
}

/// Wraps `action` in a guard that invokes it when the guard is dropped.
///
/// # Example
/// ```
/// use std::cell::RefCell;
/// use gantry::defer;
///
/// let order = RefCell::new(Vec::new());
/// {
///     let _restore = defer(|| order.borrow_mut().push("closed"));
///     order.borrow_mut().push("open");
/// }
/// assert_eq!(*order.borrow(), ["open", "closed"]);
/// ```
pub fn defer<F: FnOnce()>(action: F) -> Defer<F> {
    Defer {
        action: Some(action),
    }
}

impl<F: FnOnce()> Drop for Defer<F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

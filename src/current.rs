//! Thread-local current-tracer binding.
//!
//! Instrumentation deep inside an agent rarely wants to thread a
//! tracer handle through every call. [`bind`] pushes a tracer onto a
//! thread-local stack and returns a guard; while the guard lives,
//! [`current`] resolves to that tracer on the same thread. Bindings
//! nest and unwind in LIFO order, and the guard is `!Send` so a
//! binding can never outlive its thread's stack discipline.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::tracer::Tracer;

thread_local! {
    static CURRENT: RefCell<Vec<Arc<Tracer>>> = const { RefCell::new(Vec::new()) };
}

/// Guard returned by [`bind`]; dropping it unbinds the tracer.
#[must_use = "dropping the guard immediately unbinds the tracer"]
pub struct CurrentGuard {
    // Keeps the guard on the thread whose stack it must pop.
    _not_send: PhantomData<*const ()>,
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Bind a tracer as the current tracer for this thread.
pub fn bind(tracer: Arc<Tracer>) -> CurrentGuard {
    CURRENT.with(|stack| stack.borrow_mut().push(tracer));
    CurrentGuard {
        _not_send: PhantomData,
    }
}

/// The innermost tracer bound on this thread, if any.
pub fn current() -> Option<Arc<Tracer>> {
    CURRENT.with(|stack| stack.borrow().last().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_bind_nests_and_unwinds() {
        let dir = tempdir().expect("tempdir");
        let outer = Arc::new(
            Tracer::builder("outer").root(dir.path()).start().expect("outer"),
        );
        let inner = Arc::new(
            Tracer::builder("inner").root(dir.path()).start().expect("inner"),
        );

        assert!(current().is_none());
        let _outer_guard = bind(Arc::clone(&outer));
        assert_eq!(
            current().expect("outer bound").trace_id(),
            outer.trace_id()
        );
        {
            let _inner_guard = bind(Arc::clone(&inner));
            assert_eq!(
                current().expect("inner bound").trace_id(),
                inner.trace_id()
            );
        }
        assert_eq!(
            current().expect("outer restored").trace_id(),
            outer.trace_id()
        );
        drop(_outer_guard);
        assert!(current().is_none());
    }

    #[test]
    fn test_binding_is_per_thread() {
        let dir = tempdir().expect("tempdir");
        let tracer = Arc::new(
            Tracer::builder("threaded").root(dir.path()).start().expect("start"),
        );
        let _guard = bind(Arc::clone(&tracer));

        let seen = std::thread::spawn(|| current().is_some())
            .join()
            .expect("join");
        assert!(!seen);
        assert!(current().is_some());
    }
}

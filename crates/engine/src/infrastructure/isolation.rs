//! Panic isolation for third-party code.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Run `f`, turning a panic into its message.
///
/// Callers must not rely on state `f` touched being consistent after a
/// panic.
pub fn isolate<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| describe(payload.as_ref()))
}

/// Best-effort text of a panic payload.
pub fn describe(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

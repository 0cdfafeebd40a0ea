//! Internal helper macros.

/// Returns early with `$error` unless `$predicate` holds.
///
/// Works like `assert!`, but for validation that should fail with an error value instead of a
/// panic.
///
/// ```ignore
/// ensure!(count <= positions.len(), ParseError::boundary_overflow(count - 1, positions.len()));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

//! Invariant checks for per-entity storage.
//!
//! Every per-entity array of a collection (coordinates, ghost flags, global
//! indices, ranks, auxiliary attributes) must have one entry per entity.

use crate::mesh_error::MeshNumberingError;

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self);
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), MeshNumberingError>;
}

/// Helper macro to run a fallible check and panic on error when invariant
/// checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}

/// Fail with [`MeshNumberingError::LengthMismatch`] unless `found == expected`.
pub(crate) fn check_len(
    what: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), MeshNumberingError> {
    if expected == found {
        Ok(())
    } else {
        Err(MeshNumberingError::LengthMismatch {
            what,
            expected,
            found,
        })
    }
}

//! Core traits for online accumulators
//!
//! All accumulators implement the base [`Accumulator`] trait, which covers
//! everything that does not depend on the kind of statistic being tracked:
//! counting, merging, rollback and resetting.

use core::fmt::Debug;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use thiserror::Error;

/// Error raised by accumulator operations
///
/// Every error is raised before the offending call mutates anything, with the
/// exception of `add_iter`, which keeps the observations preceding the failing
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccumulatorError {
    /// Observation shape disagrees with the order bound by the first observation
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// Input has fewer axes than the operation needs
    #[error("input needs at least {required} axis(es), found {found}")]
    RankTooLow { required: usize, found: usize },
    /// Merge operands were built from observations of different orders
    #[error("cannot merge accumulators with different orders: {ours:?} != {theirs:?}")]
    OrderMismatch {
        ours: Vec<usize>,
        theirs: Vec<usize>,
    },
    /// Rollback requested with no snapshot to restore
    #[error("nothing to roll back")]
    NoHistory,
}

/// Shorthand result type for accumulator operations
pub type Result<T> = core::result::Result<T, AccumulatorError>;

/// Core trait for all online accumulators
pub trait Accumulator: Clone + Debug {
    /// Merge another accumulator into this one
    ///
    /// Returns an error if the accumulators were bound to different orders.
    /// `self` is untouched on error.
    fn merge(&mut self, other: &Self) -> Result<&mut Self>;

    /// Undo the most recent mutating call
    ///
    /// Only one level of history is kept. Fails with
    /// [`AccumulatorError::NoHistory`] if there is nothing to restore.
    fn rollback(&mut self) -> Result<()>;

    /// Whether a snapshot is available for [`rollback`](Self::rollback)
    fn can_rollback(&self) -> bool;

    /// Reset to the uninitialized state, discarding history
    fn clear(&mut self);

    /// Heap and inline memory usage in bytes, including the rollback snapshot
    fn size_bytes(&self) -> usize;

    /// Number of observations folded in
    fn count(&self) -> u64;

    /// Shape of one observation, once bound
    fn order(&self) -> Option<&[usize]>;

    /// Check if no observation has been folded in
    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// Verify that `found` equals the bound `expected` shape
pub(crate) fn check_shape(expected: &[usize], found: &[usize]) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(AccumulatorError::ShapeMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        })
    }
}

/// Verify that two merge operands share an order
pub(crate) fn check_order(ours: &[usize], theirs: &[usize]) -> Result<()> {
    if ours == theirs {
        Ok(())
    } else {
        Err(AccumulatorError::OrderMismatch {
            ours: ours.to_vec(),
            theirs: theirs.to_vec(),
        })
    }
}

/// Verify that an input carries at least `required` axes
pub(crate) fn check_rank(required: usize, found: usize) -> Result<()> {
    if found >= required {
        Ok(())
    } else {
        Err(AccumulatorError::RankTooLow { required, found })
    }
}

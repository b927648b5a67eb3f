//! Numeric capability layer over `ndarray`
//!
//! The accumulators only need elementwise arithmetic with broadcasting, an
//! outer product over the trailing axis, a batched diagonal and a square root.
//! [`Element`] gathers the scalar side of that contract, the free functions
//! below the array side.

use core::fmt::Debug;

use ndarray::{ArrayD, ArrayViewD, Axis, Dimension, IxDyn, ScalarOperand};
use num_traits::Float;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Floating-point element type an accumulator computes in
///
/// Implemented for `f32` and `f64`. The element type is the accumulator's
/// precision: two accumulators can only be merged when they share it.
pub trait Element: Float + ScalarOperand + Debug + Send + Sync + 'static {
    /// Convert an observation count to this precision
    fn from_count(count: u64) -> Self;
}

impl Element for f32 {
    #[inline]
    fn from_count(count: u64) -> Self {
        count as f32
    }
}

impl Element for f64 {
    #[inline]
    fn from_count(count: u64) -> Self {
        count as f64
    }
}

/// Batched outer product over the trailing axis
///
/// For inputs of shape `[..., D]` returns shape `[..., D, D]` with
/// `out[..., i, j] = a[..., i] * b[..., j]`.
pub(crate) fn outer<A: Element>(a: ArrayViewD<'_, A>, b: ArrayViewD<'_, A>) -> ArrayD<A> {
    let last = a.ndim();
    let column = a.insert_axis(Axis(last));
    let row = b.insert_axis(Axis(last - 1));
    &column * &row
}

/// Batched diagonal over the trailing two axes
///
/// For an input of shape `[..., D, D]` returns shape `[..., D]`.
pub(crate) fn diagonal<A: Element>(matrices: &ArrayD<A>) -> ArrayD<A> {
    let order = &matrices.shape()[..matrices.ndim() - 1];
    ArrayD::from_shape_fn(IxDyn(order), |index| {
        let mut at: Vec<usize> = index.slice().to_vec();
        at.push(at[at.len() - 1]);
        matrices[at.as_slice()]
    })
}

/// Array of `shape` filled with NaN
pub(crate) fn nan_like<A: Element>(shape: &[usize]) -> ArrayD<A> {
    ArrayD::from_elem(IxDyn(shape), A::nan())
}

/// Bytes held by an array's elements
pub(crate) fn array_bytes<A>(array: &ArrayD<A>) -> usize {
    array.len() * core::mem::size_of::<A>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_outer_single_slot() {
        let a = array![1.0, 2.0].into_dyn();
        let b = array![3.0, 4.0, 5.0].into_dyn();
        let out = outer(a.view(), b.view());

        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out, array![[3.0, 4.0, 5.0], [6.0, 8.0, 10.0]].into_dyn());
    }

    #[test]
    fn test_outer_batched() {
        let a = array![[1.0, 2.0], [0.0, -1.0]].into_dyn();
        let out = outer(a.view(), a.view());

        assert_eq!(out.shape(), &[2, 2, 2]);
        assert_eq!(
            out,
            array![[[1.0, 2.0], [2.0, 4.0]], [[0.0, 0.0], [0.0, 1.0]]].into_dyn()
        );
    }

    #[test]
    fn test_diagonal_batched() {
        let m = array![[[1.0, 9.0], [9.0, 4.0]], [[2.0, 0.0], [0.0, 3.0]]].into_dyn();
        let diag = diagonal(&m);

        assert_eq!(diag, array![[1.0, 4.0], [2.0, 3.0]].into_dyn());
    }

    #[test]
    fn test_diagonal_empty_features() {
        let m = ArrayD::<f64>::zeros(IxDyn(&[3, 0, 0]));
        assert_eq!(diagonal(&m).shape(), &[3, 0]);
    }

    #[test]
    fn test_from_count() {
        assert_eq!(f32::from_count(7), 7.0);
        assert_eq!(f64::from_count(1 << 40), 1_099_511_627_776.0);
    }

    #[test]
    fn test_nan_like() {
        let nans = nan_like::<f64>(&[2, 2]);
        assert_eq!(nans.shape(), &[2, 2]);
        assert!(nans.iter().all(|v| v.is_nan()));
    }
}

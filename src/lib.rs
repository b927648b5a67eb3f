//! # Flowmoments
//!
//! Online mean, variance and covariance for batched n-dimensional streams.
//!
//! Flowmoments folds observations into constant-size accumulators, one
//! observation or one batch at a time, without retaining the observations.
//! Each position of an observation is an independent slot; all slots of an
//! accumulator advance in lockstep.
//!
//! ## Features
//!
//! - **Running Moments**: per-slot mean and sample/population variance with
//!   Welford's algorithm
//! - **Running Covariance**: per-slot feature covariance and correlation
//!   matrices
//! - **Full Mergeability**: accumulators built on separate shards combine
//!   into the accumulator of the union
//! - **Rollback**: the most recent mutation can be undone
//!
//! ## Quick Start
//!
//! ```rust
//! use flowmoments::prelude::*;
//! use ndarray::array;
//!
//! let mut w = Welford::<f64>::new();
//! w.add(&array![0.0, 100.0]).unwrap();
//! w.add(&array![1.0, 110.0]).unwrap();
//!
//! println!("mean: {}", w.mean().unwrap());
//! println!("variance: {}", w.var_s().unwrap());
//! ```
//!
//! ## Distributed Computing
//!
//! All accumulators implement the [`Accumulator`](traits::Accumulator) trait
//! which includes a `merge` operation, allowing accumulators to be combined
//! across workers:
//!
//! ```rust
//! use flowmoments::covariance::OnlineCovariance;
//! use flowmoments::traits::Accumulator;
//! use ndarray::array;
//!
//! let mut worker1 = OnlineCovariance::<f64>::new();
//! let mut worker2 = OnlineCovariance::<f64>::new();
//!
//! // Each worker processes its partition
//! worker1.add(&array![1.0, 2.0]).unwrap();
//! worker2.add(&array![3.0, 5.0]).unwrap();
//!
//! // Merge results
//! worker1.merge(&worker2).unwrap();
//! assert_eq!(worker1.count(), 2);
//! ```
//!
//! ## Feature Flags
//!
//! Accumulator families:
//! - `moments` (default): [`Welford`] running mean and variance
//! - `covariance` (default): [`OnlineCovariance`] running covariance
//! - `full`: Enable all accumulator families
//!
//! Platform features:
//! - `std` (default): Standard library support
//! - `libm`: Floating-point math for `no_std` targets

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("flowmoments needs either the `std` or the `libm` feature for floating-point math");

#[cfg(not(feature = "std"))]
extern crate alloc;

// Core traits always available
pub mod array;
pub mod traits;

mod history;

#[cfg(feature = "moments")]
#[cfg_attr(docsrs, doc(cfg(feature = "moments")))]
pub mod moments;

#[cfg(feature = "covariance")]
#[cfg_attr(docsrs, doc(cfg(feature = "covariance")))]
pub mod covariance;

pub mod prelude {
    pub use crate::array::Element;
    pub use crate::traits::{Accumulator, AccumulatorError};

    #[cfg(feature = "moments")]
    pub use crate::moments::Welford;

    #[cfg(feature = "covariance")]
    pub use crate::covariance::OnlineCovariance;
}

#[cfg(feature = "moments")]
pub use moments::Welford;

#[cfg(feature = "covariance")]
pub use covariance::OnlineCovariance;

//! Running covariance matrices for streaming data
//!
//! This module provides accumulators that track the mean and the
//! feature-by-feature covariance matrix of batched observations in a single
//! pass. The trailing axis of an observation holds the features; the leading
//! axes index independent batch slots.
//!
//! # Algorithms
//!
//! - [`OnlineCovariance`]: Welford-style matrix update with a parallel merge
//!
//! # Example
//!
//! ```
//! use flowmoments::covariance::OnlineCovariance;
//! use ndarray::array;
//!
//! // Two batch slots, three features each
//! let observations = array![
//!     [[0.0, 100.0, 1000.0], [2.0, 220.0, 2200.0]],
//!     [[1.0, 110.0, 1100.0], [2.0, 220.0, 2200.0]],
//! ];
//! let oc = OnlineCovariance::<f64>::from_observations(&observations).unwrap();
//!
//! assert_eq!(oc.shape(), Some(&[2, 3, 3][..]));
//! println!("covariance: {}", oc.cov().unwrap());
//! println!("correlation: {}", oc.corrcoef().unwrap());
//! ```

mod online;

pub use online::OnlineCovariance;

//! Running mean and variance for streaming data
//!
//! This module provides accumulators that track first and second moments of
//! every slot of an n-dimensional observation in a single pass with memory
//! independent of the number of observations.
//!
//! # Algorithms
//!
//! - [`Welford`]: Welford's online update with Chan's parallel merge
//!
//! # Example
//!
//! ```
//! use flowmoments::moments::Welford;
//! use flowmoments::traits::Accumulator;
//! use ndarray::array;
//!
//! let mut w = Welford::<f64>::new();
//!
//! for row in [array![0.0, 100.0], array![1.0, 110.0]] {
//!     w.add(&row).unwrap();
//! }
//!
//! println!("count: {}", w.count());
//! println!("mean: {}", w.mean().unwrap());
//! println!("sample variance: {}", w.var_s().unwrap());
//! ```

mod welford;

pub use welford::Welford;

//! Fixed-layout weighted distributions for calibration statistics
//!
//! This crate provides equal-width 1-D and 2-D histograms that track, per
//! bin, the sum of weights and the sum of squared weights, plus running
//! moments of every counted fill. They support:
//!
//! - **Lazy storage**: a booked distribution allocates bins on first use
//! - **Statistics**: mean, RMS, effective entries, mean error, quantiles
//! - **Exact merging**: every accumulator adds linearly
//!
//! # Example
//!
//! ```rust
//! use hcal_histogram::{DistributionBuilder, DistributionOps, FixedLayout};
//!
//! let layout = FixedLayout::one_d(50, 40.0, 140.0).unwrap();
//! let mut early = layout.build(&[78.0, 79.0, 80.0]).unwrap();
//! let late = layout.build(&[82.0, 83.0]).unwrap();
//!
//! early.merge(&late).unwrap();
//! assert_eq!(early.entries(), 5);
//! println!("mean {:.2} +- {:.3}", early.mean(), early.mean_error());
//! ```

pub mod builders;
pub mod ops;
pub mod stats;
pub mod traits;
pub mod types;

pub use builders::FixedLayout;
pub use ops::{sum_all, DistributionOps};
pub use traits::DistributionBuilder;
pub use types::{Axis, Distribution, Moments};

pub use hcal_core::Result;

//! Core traits for booking distributions

use crate::types::Distribution;
use hcal_core::Result;

/// Anything that knows the fixed layout of a distribution
pub trait DistributionBuilder {
    /// Book an empty distribution with this layout
    fn book(&self) -> Distribution;

    /// Book a distribution and fill it with unit-weight samples
    ///
    /// Only meaningful for 1-D layouts.
    fn build(&self, sample: &[f64]) -> Result<Distribution> {
        let mut dist = self.book();
        for &x in sample {
            dist.fill(x, 1.0)?;
        }
        Ok(dist)
    }

    /// Number of in-range bins along x
    fn target_bins(&self) -> usize {
        self.book().x_axis().bins()
    }
}

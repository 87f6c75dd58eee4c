//! Fixed-layout distribution builders

use crate::traits::DistributionBuilder;
use crate::types::{Axis, Distribution};
use hcal_core::Result;
use serde::{Deserialize, Serialize};

/// Equal-width layout of a 1-D or 2-D distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedLayout {
    pub x: Axis,
    pub y: Option<Axis>,
    pub stat_overflows: bool,
}

impl FixedLayout {
    /// 1-D layout with `bins` equal-width bins over `[low, high)`
    pub fn one_d(bins: usize, low: f64, high: f64) -> Result<Self> {
        Ok(Self {
            x: Axis::new(bins, low, high)?,
            y: None,
            stat_overflows: false,
        })
    }

    /// 2-D layout
    pub fn two_d(x: (usize, f64, f64), y: (usize, f64, f64)) -> Result<Self> {
        Ok(Self {
            x: Axis::new(x.0, x.1, x.2)?,
            y: Some(Axis::new(y.0, y.1, y.2)?),
            stat_overflows: false,
        })
    }

    /// Count under/overflow fills in the moments
    pub fn with_stat_overflows(mut self) -> Self {
        self.stat_overflows = true;
        self
    }
}

impl DistributionBuilder for FixedLayout {
    fn book(&self) -> Distribution {
        match self.y {
            Some(y) => Distribution::new_2d(self.x, y, self.stat_overflows),
            None => Distribution::new_1d(self.x, self.stat_overflows),
        }
    }

    fn target_bins(&self) -> usize {
        self.x.bins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_book_and_build() {
        let layout = FixedLayout::one_d(10, -0.5, 9.5).unwrap();
        assert_eq!(layout.target_bins(), 10);
        let dist = layout.build(&[1.0, 1.0, 2.0]).unwrap();
        assert_eq!(dist.entries(), 3);
        assert_relative_eq!(dist.bin_content(2), 2.0);
        assert!(!dist.stat_overflows());
    }

    #[test]
    fn test_two_d_layout() {
        let layout = FixedLayout::two_d((50, 40.0, 140.0), (35, 0.0, 70.0)).unwrap();
        let dist = layout.book();
        assert!(dist.is_2d());
        assert!(layout.build(&[1.0]).is_err());
        assert!(FixedLayout::two_d((50, 40.0, 140.0), (0, 0.0, 1.0)).is_err());
    }

    #[test]
    fn test_stat_overflows_flag() {
        let layout = FixedLayout::one_d(40, 0.0, 500.0)
            .unwrap()
            .with_stat_overflows();
        let dist = layout.build(&[600.0]).unwrap();
        assert_relative_eq!(dist.mean(), 600.0);
    }
}

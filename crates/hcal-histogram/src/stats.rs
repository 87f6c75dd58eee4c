//! Summary statistics of a distribution
//!
//! Moments come from the running accumulators, so they reflect the exact
//! filled values rather than bin centers. Quantiles are read from the binned
//! contents with linear interpolation inside a bin.

use crate::types::Distribution;

impl Distribution {
    /// Sum of weights that count towards statistics
    pub fn sum_of_weights(&self) -> f64 {
        self.moments().sumw
    }

    /// Sum of in-range 1-D bin contents
    pub fn integral(&self) -> f64 {
        if self.is_2d() {
            let (nx, ny) = (self.x_axis().bins(), self.y_axis().map_or(0, |y| y.bins()));
            (1..=ny)
                .flat_map(|by| (1..=nx).map(move |bx| (bx, by)))
                .map(|(bx, by)| self.bin_content_2d(bx, by))
                .sum()
        } else {
            (1..=self.x_axis().bins()).map(|b| self.bin_content(b)).sum()
        }
    }

    /// Weighted mean along x, 0 when nothing was counted
    pub fn mean(&self) -> f64 {
        let m = self.moments();
        if m.sumw == 0.0 {
            0.0
        } else {
            m.sumwx / m.sumw
        }
    }

    /// Weighted standard deviation along x
    pub fn rms(&self) -> f64 {
        let m = self.moments();
        if m.sumw == 0.0 {
            return 0.0;
        }
        let mean = m.sumwx / m.sumw;
        let variance = m.sumwx2 / m.sumw - mean * mean;
        if variance > 0.0 {
            variance.sqrt()
        } else {
            0.0
        }
    }

    /// Weighted mean along y of a 2-D distribution
    pub fn mean_y(&self) -> f64 {
        let m = self.moments();
        if m.sumw == 0.0 {
            0.0
        } else {
            m.sumwy / m.sumw
        }
    }

    /// Kish effective number of entries, `(Σw)² / Σw²`
    pub fn effective_entries(&self) -> f64 {
        let m = self.moments();
        if m.sumw2 == 0.0 {
            0.0
        } else {
            m.sumw * m.sumw / m.sumw2
        }
    }

    /// Standard error of the mean, `rms / sqrt(neff)`
    pub fn mean_error(&self) -> f64 {
        let neff = self.effective_entries();
        if neff > 0.0 {
            self.rms() / neff.sqrt()
        } else {
            0.0
        }
    }

    /// Bin-resolution error of a quantile, `width / sqrt(12)`
    pub fn quantile_resolution(&self) -> f64 {
        self.x_axis().width() / 12f64.sqrt()
    }

    /// Value below which a fraction `p` of the in-range content lies
    ///
    /// Returns `None` for empty 1-D distributions, for 2-D distributions and
    /// for `p` outside `[0, 1]`.
    pub fn quantile(&self, p: f64) -> Option<f64> {
        if self.is_2d() || !(0.0..=1.0).contains(&p) {
            return None;
        }
        let cumulative = self.normalized_cumulative()?;
        let axis = self.x_axis();
        let nbins = axis.bins();

        // First edge equal to p, otherwise the last edge below it
        let searched = &cumulative[..nbins];
        let lower = searched.partition_point(|&c| c < p);
        let mut ibin = if lower < nbins && searched[lower] == p {
            lower
        } else {
            lower.saturating_sub(1)
        };
        // Step across flat stretches sitting exactly on p
        while ibin + 2 <= nbins && cumulative[ibin + 1] == p {
            if cumulative[ibin + 2] == p {
                ibin += 1;
            } else {
                break;
            }
        }

        let mut xp = axis.low_edge(ibin + 1);
        let dint = cumulative[ibin + 1] - cumulative[ibin];
        if dint > 0.0 {
            xp += axis.width() * (p - cumulative[ibin]) / dint;
        }
        Some(xp)
    }

    /// 50th percentile
    pub fn median(&self) -> Option<f64> {
        self.quantile(0.5)
    }

    /// Cumulative in-range content normalised to 1, with a leading 0
    fn normalized_cumulative(&self) -> Option<Vec<f64>> {
        let nbins = self.x_axis().bins();
        let mut cumulative = Vec::with_capacity(nbins + 1);
        cumulative.push(0.0);
        let mut running = 0.0;
        for bin in 1..=nbins {
            running += self.bin_content(bin);
            cumulative.push(running);
        }
        if running == 0.0 {
            return None;
        }
        for c in cumulative.iter_mut() {
            *c /= running;
        }
        Some(cumulative)
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{Axis, Distribution};
    use approx::assert_relative_eq;

    fn tdc_time() -> Distribution {
        Distribution::new_1d(Axis::new(50, 40.0, 140.0).unwrap(), false)
    }

    #[test]
    fn test_empty_statistics() {
        let dist = tdc_time();
        assert_eq!(dist.mean(), 0.0);
        assert_eq!(dist.rms(), 0.0);
        assert_eq!(dist.mean_error(), 0.0);
        assert_eq!(dist.effective_entries(), 0.0);
        assert!(dist.median().is_none());
    }

    #[test]
    fn test_moments() {
        let mut dist = tdc_time();
        for x in [79.0, 80.0, 81.0, 82.0, 83.0] {
            dist.fill(x, 1.0).unwrap();
        }
        assert_relative_eq!(dist.mean(), 81.0, epsilon = 1e-12);
        assert_relative_eq!(dist.rms(), 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(dist.effective_entries(), 5.0);
        assert_relative_eq!(dist.mean_error(), 2f64.sqrt() / 5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_weighted_effective_entries() {
        let mut dist = tdc_time();
        dist.fill(60.0, 2.0).unwrap();
        dist.fill(70.0, 1.0).unwrap();
        assert_relative_eq!(dist.sum_of_weights(), 3.0);
        assert_relative_eq!(dist.effective_entries(), 9.0 / 5.0);
        assert_relative_eq!(dist.mean(), 190.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_range_excluded_from_moments() {
        let mut dist = tdc_time();
        dist.fill(80.0, 1.0).unwrap();
        dist.fill(500.0, 1.0).unwrap();
        assert_relative_eq!(dist.mean(), 80.0);
        assert_eq!(dist.entries(), 2);
    }

    #[test]
    fn test_uniform_median() {
        let mut dist = tdc_time();
        for bin in 1..=50 {
            let center = dist.x_axis().center(bin);
            for _ in 0..4 {
                dist.fill(center, 1.0).unwrap();
            }
        }
        let median = dist.median().unwrap();
        assert_relative_eq!(median, 90.0, epsilon = 1e-9);
        assert!((median - 90.0).abs() <= dist.x_axis().width());
    }

    #[test]
    fn test_single_bin_quantiles_interpolate() {
        let mut dist = tdc_time();
        dist.fill(81.0, 1.0).unwrap();
        // All content in [80, 82)
        assert_relative_eq!(dist.quantile(0.5).unwrap(), 81.0, epsilon = 1e-12);
        assert_relative_eq!(dist.quantile(0.25).unwrap(), 80.5, epsilon = 1e-12);
        assert_relative_eq!(dist.quantile(0.75).unwrap(), 81.5, epsilon = 1e-12);
        assert!(dist.quantile(1.5).is_none());
    }

    #[test]
    fn test_median_skips_empty_gap() {
        let mut dist = Distribution::new_1d(Axis::new(4, 0.0, 4.0).unwrap(), false);
        dist.fill(0.5, 1.0).unwrap();
        dist.fill(3.5, 1.0).unwrap();
        // Cumulative is [0, .5, .5, .5, 1]; the median sits at the end of the
        // flat stretch rather than at its start.
        assert_relative_eq!(dist.median().unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integral_ignores_flow() {
        let mut dist = tdc_time();
        dist.fill(10.0, 1.0).unwrap();
        dist.fill(90.0, 3.0).unwrap();
        assert_relative_eq!(dist.integral(), 3.0);
        assert_relative_eq!(dist.quantile_resolution(), 2.0 / 12f64.sqrt());
    }
}

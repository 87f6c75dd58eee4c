//! Run configuration for the calibration pipeline

use crate::{ChargeBin, ChargeThresholds, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Tunable constants of a calibration run
///
/// Every field has a default, so a JSON override file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Charge-bin edges in fC
    pub thresholds: ChargeThresholds,
    /// Time every channel is corrected towards (ns)
    pub target_time_ns: f64,
    /// Charge bin the correction table is computed from
    pub measurement_bin: ChargeBin,
    /// A correction is applied only above this many digis
    pub min_digis: u64,
    /// Minimum |correction| / mean error for a correction to be applied
    pub min_significance: f64,
    /// Hardware phase steps per ns
    pub adjustments_per_ns: f64,
    /// Events between progress log lines
    pub progress_interval: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            thresholds: ChargeThresholds::default(),
            target_time_ns: 81.0,
            measurement_bin: ChargeBin::Mid,
            min_digis: 5,
            min_significance: 1.0,
            adjustments_per_ns: 2.0,
            progress_interval: 100_000,
        }
    }
}

impl CalibrationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        debug!(path = %path.display(), ?config, "Loaded calibration config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if !self.target_time_ns.is_finite() {
            return Err(Error::non_finite("target time"));
        }
        if !(self.adjustments_per_ns.is_finite() && self.adjustments_per_ns > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "adjustments_per_ns must be positive, got {}",
                self.adjustments_per_ns
            )));
        }
        if self.min_significance.is_nan() || self.min_significance < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "min_significance must be non-negative, got {}",
                self.min_significance
            )));
        }
        if self.progress_interval == 0 {
            return Err(Error::InvalidParameter(
                "progress_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_thresholds(mut self, thresholds: ChargeThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_target_time(mut self, target_time_ns: f64) -> Self {
        self.target_time_ns = target_time_ns;
        self
    }

    pub fn with_measurement_bin(mut self, bin: ChargeBin) -> Self {
        self.measurement_bin = bin;
        self
    }

    pub fn with_min_digis(mut self, min_digis: u64) -> Self {
        self.min_digis = min_digis;
        self
    }

    pub fn with_min_significance(mut self, min_significance: f64) -> Self {
        self.min_significance = min_significance;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }
}

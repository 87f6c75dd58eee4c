//! Charge-bin classification of digis by total windowed charge

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Integrated-charge category of a digi
///
/// `Inclusive` is the union of the three measured bins and is only ever
/// populated by aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChargeBin {
    Inclusive = 0,
    Low = 1,
    Mid = 2,
    High = 3,
}

impl ChargeBin {
    /// All bins in index order
    pub const ALL: [ChargeBin; 4] = [
        ChargeBin::Inclusive,
        ChargeBin::Low,
        ChargeBin::Mid,
        ChargeBin::High,
    ];

    /// Bins a digi can be classified into
    pub const MEASURED: [ChargeBin; 3] = [ChargeBin::Low, ChargeBin::Mid, ChargeBin::High];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL.get(index).copied().ok_or_else(|| {
            Error::InvalidParameter(format!("charge bin index {index} out of range 0..=3"))
        })
    }

    pub fn is_measured(self) -> bool {
        self != ChargeBin::Inclusive
    }

    pub fn name(self) -> &'static str {
        match self {
            ChargeBin::Inclusive => "Inclusive",
            ChargeBin::Low => "Low",
            ChargeBin::Mid => "Mid",
            ChargeBin::High => "High",
        }
    }
}

impl fmt::Display for ChargeBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChargeBin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "inclusive" | "0" => Ok(ChargeBin::Inclusive),
            "low" | "1" => Ok(ChargeBin::Low),
            "mid" | "2" => Ok(ChargeBin::Mid),
            "high" | "3" => Ok(ChargeBin::High),
            _ => Err(Error::InvalidParameter(format!("unknown charge bin '{s}'"))),
        }
    }
}

/// Edges (fC) of the Low, Mid and High bins
///
/// Low is `[low, mid)`, Mid is `[mid, high]` and High is above `high`.
/// Charge below `low` is not classified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargeThresholds {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl Default for ChargeThresholds {
    fn default() -> Self {
        Self {
            low: 5000.0,
            mid: 7000.0,
            high: 11000.0,
        }
    }
}

impl ChargeThresholds {
    pub fn new(low: f64, mid: f64, high: f64) -> Result<Self> {
        let thresholds = Self { low, mid, high };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.low.is_finite() && self.mid.is_finite() && self.high.is_finite()) {
            return Err(Error::non_finite("charge thresholds"));
        }
        if !(self.low < self.mid && self.mid < self.high) {
            return Err(Error::InvalidParameter(format!(
                "charge thresholds must be strictly increasing, got {} / {} / {}",
                self.low, self.mid, self.high
            )));
        }
        Ok(())
    }

    /// Assign a measured bin, or `None` when the digi is dropped
    ///
    /// NaN charge is never classified.
    pub fn classify(&self, total_charge: f64) -> Option<ChargeBin> {
        if total_charge > self.high {
            Some(ChargeBin::High)
        } else if total_charge >= self.mid {
            Some(ChargeBin::Mid)
        } else if total_charge >= self.low {
            Some(ChargeBin::Low)
        } else {
            None
        }
    }
}

//! Per-channel timing summaries and quantized corrections

use crate::Result;
use hcal_aggregate::{DistributionLookup, Quantity};
use hcal_core::{CalibrationConfig, ChannelKey, ChannelSlot, ChargeBin, Error};
use hcal_histogram::Distribution;
use serde::Serialize;
use tracing::{debug, info, instrument};

/// A mean with its statistical error
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Measurement {
    pub value: f64,
    pub error: f64,
}

impl Measurement {
    pub fn of_mean(dist: &Distribution) -> Self {
        Self {
            value: dist.mean(),
            error: dist.mean_error(),
        }
    }
}

/// Statistics of one (slot, charge bin) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotStatistics {
    /// Single-fire digis, i.e. entries of the TDC-time distribution
    pub digi_count: u64,
    pub mean_time: f64,
    pub mean_time_error: f64,
    pub rms_time: f64,
    /// `None` when no TDC time fell inside the histogram range
    pub median_time: Option<f64>,
    /// Bin-width resolution of the median
    pub median_time_error: f64,
    pub ts2_fraction: Measurement,
    pub ts4_fraction: Measurement,
    pub total_charge: Measurement,
}

impl SlotStatistics {
    /// Extract the statistics of a populated pair
    ///
    /// Every quantity must be present; a missing one means the lookup is
    /// inconsistent and is reported as an unknown distribution.
    pub fn from_lookup<L>(lookup: &L, slot: &ChannelSlot, bin: ChargeBin) -> Result<Self>
    where
        L: DistributionLookup + ?Sized,
    {
        let get = |quantity: Quantity| -> Result<&Distribution> {
            lookup
                .distribution(slot, bin, quantity)
                .ok_or_else(|| Error::UnknownDistribution(quantity.distribution_name(slot, bin)).into())
        };

        let tdc = get(Quantity::TdcTime)?;
        Ok(Self {
            digi_count: tdc.entries(),
            mean_time: tdc.mean(),
            mean_time_error: tdc.mean_error(),
            rms_time: tdc.rms(),
            median_time: tdc.median(),
            median_time_error: tdc.quantile_resolution(),
            ts2_fraction: Measurement::of_mean(get(Quantity::ChargeFractionTs2)?),
            ts4_fraction: Measurement::of_mean(get(Quantity::ChargeFractionTs4)?),
            total_charge: Measurement::of_mean(get(Quantity::TotalCharge)?),
        })
    }

    /// Shift that moves the mean time onto `target`
    pub fn correction(&self, target: f64) -> f64 {
        target - self.mean_time
    }

    /// Correction in units of the mean error
    pub fn pull(&self, target: f64) -> f64 {
        self.correction(target) / self.mean_time_error
    }

    pub fn mean_minus_median(&self) -> Option<f64> {
        self.median_time.map(|median| self.mean_time - median)
    }
}

/// Summary of one real channel at the measurement charge bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub channel: ChannelKey,
    pub stats: SlotStatistics,
    /// `target - mean` in ns
    pub correction_ns: f64,
    pub pull: f64,
    /// Quantized correction in hardware phase steps; 0 when gated off
    pub adjustment: i64,
}

impl SummaryRecord {
    pub fn digi_count(&self) -> u64 {
        self.stats.digi_count
    }
}

/// Turns aggregated distributions into per-channel corrections
#[derive(Debug, Clone)]
pub struct SummaryStatsEngine {
    config: CalibrationConfig,
}

impl SummaryStatsEngine {
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Quantized adjustment of a channel
    ///
    /// Applied only with more than `min_digis` digis and a correction larger
    /// than `min_significance` mean errors; otherwise 0.
    pub fn adjustment(&self, digi_count: u64, correction: f64, mean_error: f64) -> i64 {
        let significance = correction.abs() / mean_error;
        if digi_count > self.config.min_digis && significance > self.config.min_significance {
            let steps = (self.config.adjustments_per_ns * correction).round();
            if steps.is_finite() {
                return steps as i64;
            }
        }
        0
    }

    /// Summary of one channel, or `None` when its measurement slot is empty
    pub fn summarize_channel<L>(&self, lookup: &L, channel: ChannelKey) -> Result<Option<SummaryRecord>>
    where
        L: DistributionLookup + ?Sized,
    {
        let slot = ChannelSlot::Real(channel);
        let bin = self.config.measurement_bin;
        if lookup.entries(&slot, bin) == 0 {
            return Ok(None);
        }

        let stats = SlotStatistics::from_lookup(lookup, &slot, bin)?;
        let target = self.config.target_time_ns;
        let correction_ns = stats.correction(target);
        let adjustment = self.adjustment(stats.digi_count, correction_ns, stats.mean_time_error);
        debug!(%channel, digis = stats.digi_count, adjustment, "Channel summarized");
        Ok(Some(SummaryRecord {
            channel,
            stats,
            correction_ns,
            pull: stats.pull(target),
            adjustment,
        }))
    }

    /// Records for every real channel populated at the measurement bin, in
    /// key order
    #[instrument(skip_all, fields(bin = %self.config.measurement_bin))]
    pub fn summarize<L>(&self, lookup: &L) -> Result<Vec<SummaryRecord>>
    where
        L: DistributionLookup + ?Sized,
    {
        let mut records = Vec::new();
        for channel in lookup.populated_channels(self.config.measurement_bin) {
            if let Some(record) = self.summarize_channel(lookup, channel)? {
                records.push(record);
            }
        }
        let adjusted = records.iter().filter(|r| r.adjustment != 0).count();
        info!(channels = records.len(), adjusted, "Summary complete");
        Ok(records)
    }
}

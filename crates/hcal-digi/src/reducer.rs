//! Per-digi feature extraction
//!
//! The reducer pedestal-subtracts a digi, integrates the peak window,
//! classifies it into a charge bin and derives the charge fractions. The raw
//! charge and the looked-up baselines are kept alongside so the pulse-shape
//! distributions can overlay signal and expected baseline.

use crate::digi::{windowed_sum, Digi};
use crate::event::EventRecord;
use crate::pedestal::PedestalTable;
use hcal_core::{ChannelKey, ChargeBin, ChargeThresholds, Result, SAMPLES_PER_DIGI};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Derived quantities of one classified digi
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedDigi {
    pub channel: ChannelKey,
    pub bin: ChargeBin,
    /// Pedestal-subtracted charge in the peak window (fC)
    pub total_charge: f64,
    /// Raw ADC counts in the ADC peak window
    pub total_adc: f64,
    pub charge_time: f64,
    pub tdc_time: f64,
    pub n_tdc: u32,
    /// Percentage of the windowed charge in slice 2
    pub charge_fraction_ts2: f64,
    /// Percentage of the windowed charge in slice 4
    pub charge_fraction_ts4: f64,
    /// Raw (not pedestal-subtracted) charge per slice
    pub raw_charge: [f64; SAMPLES_PER_DIGI],
    /// Baseline used for each slice
    pub pedestals: [f64; SAMPLES_PER_DIGI],
}

impl ReducedDigi {
    /// Whether the TDC-conditioned quantities apply
    pub fn single_tdc_fire(&self) -> bool {
        self.n_tdc == 1
    }
}

/// Result of reducing one digi
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// `None` when the windowed charge is below the lowest threshold
    pub digi: Option<ReducedDigi>,
    /// Slices whose baseline resolved to exactly zero
    pub missing_pedestals: u32,
}

/// Counters accumulated while reducing digis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReducerDiagnostics {
    pub digis_seen: u64,
    pub below_threshold: u64,
    /// Accepted digis per charge bin, indexed by [`ChargeBin::index`]
    pub per_bin: [u64; 4],
    pub missing_pedestals: u64,
}

impl ReducerDiagnostics {
    pub fn record(&mut self, reduction: &Reduction) {
        self.digis_seen += 1;
        self.missing_pedestals += u64::from(reduction.missing_pedestals);
        match &reduction.digi {
            Some(digi) => self.per_bin[digi.bin.index()] += 1,
            None => self.below_threshold += 1,
        }
    }

    pub fn merge(&mut self, other: &ReducerDiagnostics) {
        self.digis_seen += other.digis_seen;
        self.below_threshold += other.below_threshold;
        for (a, b) in self.per_bin.iter_mut().zip(other.per_bin) {
            *a += b;
        }
        self.missing_pedestals += other.missing_pedestals;
    }

    pub fn accepted(&self) -> u64 {
        self.per_bin.iter().sum()
    }
}

/// All accepted digis of one event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducedEvent {
    pub digis: Vec<ReducedDigi>,
    pub diagnostics: ReducerDiagnostics,
}

/// Converts digis into the quantities filled into distributions
#[derive(Debug, Clone, Copy)]
pub struct DigiReducer<'a> {
    pedestals: &'a PedestalTable,
    thresholds: ChargeThresholds,
}

impl<'a> DigiReducer<'a> {
    pub fn new(pedestals: &'a PedestalTable, thresholds: ChargeThresholds) -> Self {
        Self {
            pedestals,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &ChargeThresholds {
        &self.thresholds
    }

    /// Reduce one digi
    ///
    /// A zero baseline is used as-is and reported through `warn!` and the
    /// returned missing-pedestal count.
    pub fn reduce(&self, digi: &Digi) -> Reduction {
        let mut pedestals = [0.0; SAMPLES_PER_DIGI];
        let mut subtracted = [0.0; SAMPLES_PER_DIGI];
        let mut missing_pedestals = 0;
        for ts in 0..SAMPLES_PER_DIGI {
            let baseline = self.pedestals.baseline(&digi.channel, digi.capid[ts]);
            if baseline == 0.0 {
                missing_pedestals += 1;
                warn!(
                    ieta = digi.channel.ieta(),
                    iphi = digi.channel.iphi(),
                    depth = digi.channel.depth(),
                    capid = digi.capid[ts],
                    "Missing pedestal value"
                );
            }
            pedestals[ts] = baseline;
            subtracted[ts] = digi.charge_fc[ts] - baseline;
        }

        let total_charge = windowed_sum(&subtracted);
        let Some(bin) = self.thresholds.classify(total_charge) else {
            return Reduction {
                digi: None,
                missing_pedestals,
            };
        };

        let reduced = ReducedDigi {
            channel: digi.channel,
            bin,
            total_charge,
            total_adc: windowed_sum(&digi.adc),
            charge_time: digi.charge_time,
            tdc_time: digi.tdc_time,
            n_tdc: digi.n_tdc,
            charge_fraction_ts2: 100.0 * subtracted[2] / total_charge,
            charge_fraction_ts4: 100.0 * subtracted[4] / total_charge,
            raw_charge: digi.charge_fc,
            pedestals,
        };
        Reduction {
            digi: Some(reduced),
            missing_pedestals,
        }
    }

    /// Validate and reduce every digi of an event
    ///
    /// Structural problems in the record (mismatched arrays, unknown
    /// channels, wrong slice counts) are returned as errors.
    pub fn reduce_event(&self, event: &EventRecord) -> Result<ReducedEvent> {
        let mut reduced = ReducedEvent::default();
        for digi in event.digis()? {
            let reduction = self.reduce(&digi);
            reduced.diagnostics.record(&reduction);
            if let Some(digi) = reduction.digi {
                reduced.digis.push(digi);
            }
        }
        Ok(reduced)
    }

    /// Reduce a batch of events, in parallel when the feature is enabled
    ///
    /// Output order matches input order either way.
    pub fn reduce_events(&self, events: &[EventRecord]) -> Result<Vec<ReducedEvent>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            events.par_iter().map(|e| self.reduce_event(e)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            events.iter().map(|e| self.reduce_event(e)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pedestal::PedestalEntry;
    use approx::assert_relative_eq;

    fn channel() -> ChannelKey {
        ChannelKey::new(18, 7, 3).unwrap()
    }

    fn flat_pedestals(value: f64) -> PedestalTable {
        let mut table = PedestalTable::new();
        table.insert(
            channel(),
            PedestalEntry {
                detector: "HE".to_string(),
                baselines: [value; 4],
                widths: None,
                channel_id: "0x1".to_string(),
            },
        );
        table
    }

    fn digi(charge: [f64; 8]) -> Digi {
        Digi::new(
            channel(),
            &charge,
            &[2, 5, 80, 30, 10, 2, 2, 2],
            &[0, 1, 2, 3, 0, 1, 2, 3],
            78.5,
            80.0,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_reduce_mid_bin() {
        let table = flat_pedestals(10.0);
        let reducer = DigiReducer::new(&table, ChargeThresholds::default());
        // Windowed slices 1..=4 after subtraction: 990 + 5010 + 2010 + 10
        let reduction = reducer.reduce(&digi([10.0, 1000.0, 5020.0, 2020.0, 20.0, 10.0, 10.0, 10.0]));
        assert_eq!(reduction.missing_pedestals, 0);
        let reduced = reduction.digi.unwrap();
        assert_relative_eq!(reduced.total_charge, 8020.0);
        assert_eq!(reduced.bin, ChargeBin::Mid);
        assert_relative_eq!(reduced.total_adc, 125.0);
        assert_relative_eq!(reduced.charge_fraction_ts2, 100.0 * 5010.0 / 8020.0);
        assert_relative_eq!(reduced.charge_fraction_ts4, 100.0 * 10.0 / 8020.0);
        assert_relative_eq!(reduced.raw_charge[2], 5020.0);
        assert_relative_eq!(reduced.pedestals[2], 10.0);
        assert!(reduced.single_tdc_fire());
    }

    #[test]
    fn test_below_threshold_dropped() {
        let table = flat_pedestals(10.0);
        let reducer = DigiReducer::new(&table, ChargeThresholds::default());
        let reduction = reducer.reduce(&digi([10.0, 500.0, 3000.0, 1000.0, 10.0, 10.0, 10.0, 10.0]));
        assert!(reduction.digi.is_none());

        let mut diagnostics = ReducerDiagnostics::default();
        diagnostics.record(&reduction);
        assert_eq!(diagnostics.below_threshold, 1);
        assert_eq!(diagnostics.accepted(), 0);
    }

    #[test]
    fn test_missing_pedestal_counted_not_fatal() {
        let table = PedestalTable::new();
        let reducer = DigiReducer::new(&table, ChargeThresholds::default());
        let reduction = reducer.reduce(&digi([0.0, 3000.0, 6000.0, 3000.0, 0.0, 0.0, 0.0, 0.0]));
        assert_eq!(reduction.missing_pedestals, 8);
        let reduced = reduction.digi.unwrap();
        assert_eq!(reduced.bin, ChargeBin::High);
        assert!(reduced.pedestals.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_diagnostics_merge() {
        let mut a = ReducerDiagnostics {
            digis_seen: 3,
            below_threshold: 1,
            per_bin: [0, 1, 1, 0],
            missing_pedestals: 2,
        };
        let b = ReducerDiagnostics {
            digis_seen: 2,
            below_threshold: 0,
            per_bin: [0, 0, 1, 1],
            missing_pedestals: 0,
        };
        a.merge(&b);
        assert_eq!(a.digis_seen, 5);
        assert_eq!(a.per_bin, [0, 1, 2, 1]);
        assert_eq!(a.accepted(), 4);
    }
}

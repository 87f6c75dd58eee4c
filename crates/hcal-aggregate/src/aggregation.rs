//! Hierarchical additive reduction of filled distributions
//!
//! Three stages run in a fixed order:
//!
//! 1. charge-bin union: `Inclusive := Low + Mid + High` for every real slot
//! 2. phi union: the all-phi aggregate of each (eta, depth) sums the 72 real
//!    phi slots, for every charge bin including `Inclusive`
//! 3. eta-half union: HEM and HEP aggregates of each (phi, depth) sum the
//!    real eta slots of their own half only
//!
//! The accumulator's [`AggregationPhase`] guards the order. Work inside a
//! stage is independent per target and runs in parallel with the
//! `parallel` feature; contributions are always added in key order, so the
//! result does not depend on the feature.

use crate::accumulator::{ChargeBinSet, HistogramAccumulator};
use hcal_core::{
    valid_ietas, AggregateChannelKey, ChannelKey, ChannelSlot, ChargeBin, EtaHalf, EtaSelector,
    Error, PhiSelector, Result, MAX_IPHI, MIN_IPHI,
};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, instrument};

/// Lifecycle of an accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AggregationPhase {
    /// Accepting fills
    Raw,
    /// Inclusive bins populated
    ChargeUnioned,
    /// All-phi aggregates populated
    PhiUnioned,
    /// Eta-half aggregates populated; read-only from here on
    FullyAggregated,
}

impl AggregationPhase {
    /// Fail unless the accumulator is exactly in `required`
    pub fn require(self, required: AggregationPhase) -> Result<()> {
        if self == required {
            Ok(())
        } else {
            Err(Error::PhaseOrder {
                required: required.to_string(),
                current: self.to_string(),
            })
        }
    }
}

impl fmt::Display for AggregationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationPhase::Raw => "Raw",
            AggregationPhase::ChargeUnioned => "ChargeUnioned",
            AggregationPhase::PhiUnioned => "PhiUnioned",
            AggregationPhase::FullyAggregated => "FullyAggregated",
        };
        f.write_str(name)
    }
}

/// Counts of what each stage produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationReport {
    pub charge_unioned_slots: usize,
    pub phi_targets: usize,
    pub eta_half_targets: usize,
}

/// Runs the aggregation stages on an accumulator
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationEngine;

impl AggregationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run all three stages in order
    #[instrument(skip_all)]
    pub fn run(&self, acc: &mut HistogramAccumulator) -> Result<AggregationReport> {
        let report = AggregationReport {
            charge_unioned_slots: self.union_charge_bins(acc)?,
            phi_targets: self.union_phi(acc)?,
            eta_half_targets: self.union_eta_halves(acc)?,
        };
        info!(
            charge_unioned = report.charge_unioned_slots,
            phi_targets = report.phi_targets,
            eta_half_targets = report.eta_half_targets,
            "Aggregation complete"
        );
        Ok(report)
    }

    /// Stage 1: populate the inclusive bin of every real slot
    #[instrument(skip_all)]
    pub fn union_charge_bins(&self, acc: &mut HistogramAccumulator) -> Result<usize> {
        acc.phase().require(AggregationPhase::Raw)?;

        let union = |(slot, set): (&ChannelSlot, &mut ChargeBinSet)| -> Result<()> {
            if !slot.is_real() {
                return Ok(());
            }
            let mut inclusive = set.bin(ChargeBin::Inclusive).clone();
            for bin in ChargeBin::MEASURED {
                inclusive.merge(set.bin(bin))?;
            }
            *set.bin_mut(ChargeBin::Inclusive) = inclusive;
            Ok(())
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            acc.slots_mut().par_iter_mut().try_for_each(union)?;
        }
        #[cfg(not(feature = "parallel"))]
        acc.slots_mut().iter_mut().try_for_each(union)?;

        let count = acc.slots().keys().filter(|slot| slot.is_real()).count();
        acc.set_phase(AggregationPhase::ChargeUnioned);
        Ok(count)
    }

    /// Stage 2: sum every real phi into the all-phi aggregate of its eta
    #[instrument(skip_all)]
    pub fn union_phi(&self, acc: &mut HistogramAccumulator) -> Result<usize> {
        acc.phase().require(AggregationPhase::ChargeUnioned)?;
        let targets: Vec<AggregateChannelKey> = AggregateChannelKey::all_phi_targets().collect();
        let produced = insert_sums(acc, &targets, |target| {
            let (EtaSelector::Ieta(ieta), PhiSelector::All) = (target.eta(), target.phi()) else {
                return Ok(Vec::new());
            };
            (MIN_IPHI..=MAX_IPHI)
                .map(|iphi| ChannelKey::new(ieta, iphi, target.depth()))
                .collect()
        })?;
        acc.set_phase(AggregationPhase::PhiUnioned);
        Ok(produced)
    }

    /// Stage 3: sum real eta per detector half into the HEM/HEP aggregates
    #[instrument(skip_all)]
    pub fn union_eta_halves(&self, acc: &mut HistogramAccumulator) -> Result<usize> {
        acc.phase().require(AggregationPhase::PhiUnioned)?;
        let targets: Vec<AggregateChannelKey> = AggregateChannelKey::eta_half_targets().collect();
        let produced = insert_sums(acc, &targets, |target| {
            let (EtaSelector::AllIn(half), PhiSelector::Iphi(iphi)) = (target.eta(), target.phi())
            else {
                return Ok(Vec::new());
            };
            valid_ietas()
                .filter(|&ieta| EtaHalf::of(ieta) == half)
                .map(|ieta| ChannelKey::new(ieta, iphi, target.depth()))
                .collect()
        })?;
        acc.set_phase(AggregationPhase::FullyAggregated);
        Ok(produced)
    }
}

/// Compute each target's sum over its real contributors and store it
///
/// Targets with no touched contributor stay untouched. Returns the number of
/// targets written.
fn insert_sums<F>(
    acc: &mut HistogramAccumulator,
    targets: &[AggregateChannelKey],
    contributors: F,
) -> Result<usize>
where
    F: Fn(&AggregateChannelKey) -> Result<Vec<ChannelKey>> + Sync,
{
    let slots = acc.slots();
    let sum_target = |target: &AggregateChannelKey| -> Result<Option<(ChannelSlot, ChargeBinSet)>> {
        let mut total: Option<ChargeBinSet> = None;
        for channel in contributors(target)? {
            let Some(set) = slots.get(&ChannelSlot::Real(channel)) else {
                continue;
            };
            match total.as_mut() {
                Some(total) => total.merge(set)?,
                None => total = Some(set.clone()),
            }
        }
        Ok(total.map(|set| (ChannelSlot::Aggregate(*target), set)))
    };

    #[cfg(feature = "parallel")]
    let sums: Vec<Option<(ChannelSlot, ChargeBinSet)>> = {
        use rayon::prelude::*;
        targets.par_iter().map(sum_target).collect::<Result<_>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let sums: Vec<Option<(ChannelSlot, ChargeBinSet)>> =
        targets.iter().map(sum_target).collect::<Result<_>>()?;

    let produced: HashMap<ChannelSlot, ChargeBinSet> = sums.into_iter().flatten().collect();
    let count = produced.len();
    acc.slots_mut().extend(produced);
    Ok(count)
}

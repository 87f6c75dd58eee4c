//! Keyed distribution storage filled from reduced digis
//!
//! The accumulator owns one [`ChargeBinSet`] per touched slot. Slots are
//! created on first use: the key space is fixed by construction (every
//! [`ChannelKey`] is valid) and an untouched slot is indistinguishable from
//! a booked, empty one.

use crate::aggregation::AggregationPhase;
use crate::quantity::{Quantity, QuantityCatalogue};
use hcal_core::{ChannelKey, ChannelSlot, ChargeBin, Error, Result, SAMPLES_PER_DIGI};
use hcal_digi::{ReducedDigi, ReducedEvent};
use hcal_histogram::{Distribution, DistributionOps};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// One distribution per quantity
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSet {
    distributions: Vec<Distribution>,
}

impl HistogramSet {
    pub fn new(catalogue: &QuantityCatalogue) -> Self {
        Self {
            distributions: catalogue.book_all(),
        }
    }

    pub fn get(&self, quantity: Quantity) -> &Distribution {
        &self.distributions[quantity.index()]
    }

    pub fn get_mut(&mut self, quantity: Quantity) -> &mut Distribution {
        &mut self.distributions[quantity.index()]
    }

    /// Entry count of the set, taken from its total-charge distribution
    pub fn entries(&self) -> u64 {
        self.get(Quantity::TotalCharge).entries()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Quantity, &Distribution)> {
        Quantity::ALL.into_iter().zip(self.distributions.iter())
    }

    /// Add every distribution of `other` into this set
    pub fn merge(&mut self, other: &HistogramSet) -> Result<()> {
        for (mine, theirs) in self.distributions.iter_mut().zip(&other.distributions) {
            mine.merge(theirs)?;
        }
        Ok(())
    }

    /// Fill the quantities of one reduced digi
    pub fn fill_digi(&mut self, digi: &ReducedDigi) -> Result<()> {
        self.get_mut(Quantity::TotalCharge).fill(digi.total_charge, 1.0)?;
        self.get_mut(Quantity::TotalAdc).fill(digi.total_adc, 1.0)?;
        self.get_mut(Quantity::ChargeTime).fill(digi.charge_time, 1.0)?;
        self.get_mut(Quantity::ChargeFractionTs2)
            .fill(digi.charge_fraction_ts2, 1.0)?;
        self.get_mut(Quantity::ChargeFractionTs4)
            .fill(digi.charge_fraction_ts4, 1.0)?;

        // Pulse shape uses raw charge; the baseline goes to its own series
        for ts in 0..SAMPLES_PER_DIGI {
            let slice = ts as f64;
            self.get_mut(Quantity::PulseCharge)
                .fill(slice, digi.raw_charge[ts])?;
            self.get_mut(Quantity::PulsePedestal)
                .fill(slice, digi.pedestals[ts])?;
        }

        self.get_mut(Quantity::TdcFires).fill(f64::from(digi.n_tdc), 1.0)?;
        if digi.single_tdc_fire() {
            let tdc = digi.tdc_time;
            self.get_mut(Quantity::TdcTime).fill(tdc, 1.0)?;
            self.get_mut(Quantity::Ts2FractionVsTdc)
                .fill_2d(tdc, digi.charge_fraction_ts2, 1.0)?;
            self.get_mut(Quantity::Ts4FractionVsTdc)
                .fill_2d(tdc, digi.charge_fraction_ts4, 1.0)?;
            self.get_mut(Quantity::TotalChargeVsTdc)
                .fill_2d(tdc, digi.total_charge, 1.0)?;
        }
        Ok(())
    }
}

/// The four charge-bin sets of one slot, indexed by [`ChargeBin::index`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeBinSet {
    bins: [HistogramSet; 4],
}

impl ChargeBinSet {
    pub fn new(catalogue: &QuantityCatalogue) -> Self {
        Self {
            bins: std::array::from_fn(|_| HistogramSet::new(catalogue)),
        }
    }

    pub fn bin(&self, bin: ChargeBin) -> &HistogramSet {
        &self.bins[bin.index()]
    }

    pub fn bin_mut(&mut self, bin: ChargeBin) -> &mut HistogramSet {
        &mut self.bins[bin.index()]
    }

    /// Add every charge bin of `other` into this set
    pub fn merge(&mut self, other: &ChargeBinSet) -> Result<()> {
        for bin in ChargeBin::ALL {
            self.bin_mut(bin).merge(other.bin(bin))?;
        }
        Ok(())
    }

    /// Fill a digi into its assigned charge bin
    pub fn fill_digi(&mut self, digi: &ReducedDigi) -> Result<()> {
        if !digi.bin.is_measured() {
            return Err(Error::InvalidParameter(format!(
                "digi for {} classified as {}; the inclusive bin is filled only by aggregation",
                digi.channel, digi.bin
            )));
        }
        self.bin_mut(digi.bin).fill_digi(digi)
    }
}

/// Owner of every slot's distributions through fill and aggregation
#[derive(Debug, Clone)]
pub struct HistogramAccumulator {
    catalogue: QuantityCatalogue,
    slots: HashMap<ChannelSlot, ChargeBinSet>,
    phase: AggregationPhase,
    events: u64,
}

impl HistogramAccumulator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            catalogue: QuantityCatalogue::new()?,
            slots: HashMap::new(),
            phase: AggregationPhase::Raw,
            events: 0,
        })
    }

    pub fn catalogue(&self) -> &QuantityCatalogue {
        &self.catalogue
    }

    pub fn phase(&self) -> AggregationPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: AggregationPhase) {
        self.phase = phase;
    }

    /// Events filled so far
    pub fn events(&self) -> u64 {
        self.events
    }

    fn require_raw(&self) -> Result<()> {
        self.phase.require(AggregationPhase::Raw)
    }

    fn slot_mut(&mut self, slot: ChannelSlot) -> &mut ChargeBinSet {
        let catalogue = &self.catalogue;
        self.slots
            .entry(slot)
            .or_insert_with(|| ChargeBinSet::new(catalogue))
    }

    /// Fill a single value into a real channel's 1-D distribution
    pub fn fill(
        &mut self,
        channel: ChannelKey,
        bin: ChargeBin,
        quantity: Quantity,
        value: f64,
        weight: f64,
    ) -> Result<()> {
        self.check_fill(bin)?;
        self.slot_mut(ChannelSlot::Real(channel))
            .bin_mut(bin)
            .get_mut(quantity)
            .fill(value, weight)
    }

    /// Fill a single point into a real channel's 2-D distribution
    pub fn fill_2d(
        &mut self,
        channel: ChannelKey,
        bin: ChargeBin,
        quantity: Quantity,
        x: f64,
        y: f64,
        weight: f64,
    ) -> Result<()> {
        self.check_fill(bin)?;
        self.slot_mut(ChannelSlot::Real(channel))
            .bin_mut(bin)
            .get_mut(quantity)
            .fill_2d(x, y, weight)
    }

    fn check_fill(&self, bin: ChargeBin) -> Result<()> {
        self.require_raw()?;
        if !bin.is_measured() {
            return Err(Error::InvalidParameter(
                "the inclusive charge bin is filled only by aggregation".to_string(),
            ));
        }
        Ok(())
    }

    /// Fill every quantity of one reduced digi
    pub fn fill_digi(&mut self, digi: &ReducedDigi) -> Result<()> {
        self.require_raw()?;
        self.slot_mut(ChannelSlot::Real(digi.channel)).fill_digi(digi)
    }

    /// Fill all accepted digis of one event
    pub fn fill_event(&mut self, event: &ReducedEvent) -> Result<()> {
        self.require_raw()?;
        for digi in &event.digis {
            self.fill_digi(digi)?;
        }
        self.events += 1;
        Ok(())
    }

    /// Fill a batch of events
    ///
    /// Digis are grouped by channel keeping event order, and each channel's
    /// group is applied to its own slot. With the `parallel` feature the
    /// groups are filled concurrently; the result is identical either way.
    #[instrument(skip(self, events), fields(events = events.len()))]
    pub fn fill_events(&mut self, events: &[ReducedEvent]) -> Result<()> {
        self.require_raw()?;
        let mut groups: BTreeMap<ChannelKey, Vec<&ReducedDigi>> = BTreeMap::new();
        for digi in events.iter().flat_map(|e| e.digis.iter()) {
            groups.entry(digi.channel).or_default().push(digi);
        }

        let mut work: Vec<(ChannelSlot, ChargeBinSet, Vec<&ReducedDigi>)> = groups
            .into_iter()
            .map(|(channel, digis)| {
                let slot = ChannelSlot::Real(channel);
                let set = self
                    .slots
                    .remove(&slot)
                    .unwrap_or_else(|| ChargeBinSet::new(&self.catalogue));
                (slot, set, digis)
            })
            .collect();

        let fill_group = |(_, set, digis): &mut (ChannelSlot, ChargeBinSet, Vec<&ReducedDigi>)| {
            digis.iter().try_for_each(|digi| set.fill_digi(digi))
        };

        #[cfg(feature = "parallel")]
        let outcome: Result<()> = {
            use rayon::prelude::*;
            work.par_iter_mut().try_for_each(fill_group)
        };
        #[cfg(not(feature = "parallel"))]
        let outcome: Result<()> = work.iter_mut().try_for_each(fill_group);

        debug!(channels = work.len(), "Filled channel groups");
        for (slot, set, _) in work {
            self.slots.insert(slot, set);
        }
        outcome?;
        self.events += events.len() as u64;
        Ok(())
    }

    /// Distributions of a slot, if it was ever touched
    pub fn slot(&self, slot: &ChannelSlot) -> Option<&ChargeBinSet> {
        self.slots.get(slot)
    }

    pub(crate) fn slots(&self) -> &HashMap<ChannelSlot, ChargeBinSet> {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut HashMap<ChannelSlot, ChargeBinSet> {
        &mut self.slots
    }

    /// One distribution, or `None` when the slot was never touched
    pub fn distribution(
        &self,
        slot: &ChannelSlot,
        bin: ChargeBin,
        quantity: Quantity,
    ) -> Option<&Distribution> {
        self.slots.get(slot).map(|set| set.bin(bin).get(quantity))
    }

    /// Entry count of a (slot, bin) pair
    pub fn entries(&self, slot: &ChannelSlot, bin: ChargeBin) -> u64 {
        self.slots.get(slot).map_or(0, |set| set.bin(bin).entries())
    }

    /// Touched real channels in key order
    pub fn real_channels(&self) -> Vec<ChannelKey> {
        let mut channels: Vec<ChannelKey> = self
            .slots
            .keys()
            .filter_map(|slot| match slot {
                ChannelSlot::Real(key) => Some(*key),
                ChannelSlot::Aggregate(_) => None,
            })
            .collect();
        channels.sort();
        channels
    }

    /// Number of touched slots, real and aggregate
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

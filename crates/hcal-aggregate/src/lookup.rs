//! Read access to distributions, live or persisted

use crate::accumulator::HistogramAccumulator;
use crate::quantity::Quantity;
use hcal_core::{ChannelKey, ChannelSlot, ChargeBin};
use hcal_histogram::Distribution;

/// Keyed read access shared by the accumulator and a loaded store
pub trait DistributionLookup {
    /// The distribution of a key, or `None` when it holds nothing
    fn distribution(
        &self,
        slot: &ChannelSlot,
        bin: ChargeBin,
        quantity: Quantity,
    ) -> Option<&Distribution>;

    /// Real channels with a non-zero entry count in `bin`, in key order
    fn populated_channels(&self, bin: ChargeBin) -> Vec<ChannelKey>;

    /// Entry count of a (slot, bin) pair
    fn entries(&self, slot: &ChannelSlot, bin: ChargeBin) -> u64 {
        self.distribution(slot, bin, Quantity::TotalCharge)
            .map_or(0, Distribution::entries)
    }
}

impl DistributionLookup for HistogramAccumulator {
    fn distribution(
        &self,
        slot: &ChannelSlot,
        bin: ChargeBin,
        quantity: Quantity,
    ) -> Option<&Distribution> {
        HistogramAccumulator::distribution(self, slot, bin, quantity)
    }

    fn populated_channels(&self, bin: ChargeBin) -> Vec<ChannelKey> {
        self.real_channels()
            .into_iter()
            .filter(|key| HistogramAccumulator::entries(self, &ChannelSlot::Real(*key), bin) > 0)
            .collect()
    }
}

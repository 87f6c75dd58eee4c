//! Persisted, name-addressed distributions
//!
//! Only (slot, charge bin) pairs with a non-zero entry count are written,
//! each with all of its quantities. Names follow
//! [`Quantity::distribution_name`], so a downstream stage can look a
//! distribution up by key again.

use crate::accumulator::HistogramAccumulator;
use crate::lookup::DistributionLookup;
use crate::quantity::{parse_distribution_name, Quantity};
use hcal_core::{ChannelKey, ChannelSlot, ChargeBin, Error, Result};
use hcal_histogram::Distribution;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionStore {
    distributions: BTreeMap<String, Distribution>,
}

impl DistributionStore {
    /// Snapshot every non-empty (slot, bin) pair of an accumulator
    #[instrument(skip_all, fields(slots = acc.slot_count()))]
    pub fn from_accumulator(acc: &HistogramAccumulator) -> Self {
        let mut keys: Vec<ChannelSlot> = Vec::new();
        for channel in acc.real_channels() {
            keys.push(ChannelSlot::Real(channel));
        }
        for target in hcal_core::AggregateChannelKey::all_phi_targets()
            .chain(hcal_core::AggregateChannelKey::eta_half_targets())
        {
            keys.push(ChannelSlot::Aggregate(target));
        }

        let mut distributions = BTreeMap::new();
        for slot in keys {
            let Some(set) = acc.slot(&slot) else {
                continue;
            };
            for bin in ChargeBin::ALL {
                let histograms = set.bin(bin);
                if histograms.entries() == 0 {
                    continue;
                }
                for (quantity, dist) in histograms.iter() {
                    distributions.insert(quantity.distribution_name(&slot, bin), dist.clone());
                }
            }
        }
        info!(distributions = distributions.len(), "Distribution store built");
        Self { distributions }
    }

    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    /// Look a distribution up by its full name
    pub fn get(&self, name: &str) -> Result<&Distribution> {
        self.distributions
            .get(name)
            .ok_or_else(|| Error::UnknownDistribution(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.distributions.keys().map(String::as_str)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Read a store and check every name and storage layout
    pub fn read_json<R: Read>(reader: R) -> Result<Self> {
        let store: Self = serde_json::from_reader(reader)?;
        for (name, dist) in &store.distributions {
            parse_distribution_name(name)?;
            dist.validate()?;
        }
        Ok(store)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_json(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::read_json(BufReader::new(file))
    }
}

impl DistributionLookup for DistributionStore {
    fn distribution(
        &self,
        slot: &ChannelSlot,
        bin: ChargeBin,
        quantity: Quantity,
    ) -> Option<&Distribution> {
        self.distributions
            .get(&quantity.distribution_name(slot, bin))
    }

    fn populated_channels(&self, bin: ChargeBin) -> Vec<ChannelKey> {
        let mut channels: Vec<ChannelKey> = self
            .distributions
            .iter()
            .filter(|(_, dist)| dist.entries() > 0)
            .filter_map(|(name, _)| parse_distribution_name(name).ok())
            .filter_map(|(quantity, slot, slot_bin)| match slot {
                ChannelSlot::Real(key) if quantity == Quantity::TotalCharge && slot_bin == bin => {
                    Some(key)
                }
                _ => None,
            })
            .collect();
        channels.sort();
        channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::AggregationEngine;
    use crate::accumulator::tests::reduced;
    use hcal_core::{AggregateChannelKey, EtaHalf};

    fn aggregated() -> HistogramAccumulator {
        let mut acc = HistogramAccumulator::new().unwrap();
        let a = ChannelKey::new(-21, 30, 2).unwrap();
        let b = ChannelKey::new(21, 30, 2).unwrap();
        acc.fill_digi(&reduced(a, ChargeBin::Mid, 80.0, 1)).unwrap();
        acc.fill_digi(&reduced(b, ChargeBin::Low, 82.0, 1)).unwrap();
        AggregationEngine::new().run(&mut acc).unwrap();
        acc
    }

    #[test]
    fn test_only_nonempty_pairs_written() {
        let store = DistributionStore::from_accumulator(&aggregated());
        // Real: a{Mid, Incl}, b{Low, Incl}; all-phi: same; halves: same
        assert_eq!(store.len(), 3 * 4 * Quantity::COUNT);
        assert!(store.get("h1_TDC_time_ieta-21_iphi30_idepth2_fC2").is_ok());
        assert!(store.get("h1_TDC_time_ieta-21_iphi30_idepth2_fC1").is_err());
        assert!(store.get("h1_energy_ietaHEM_iphi30_idepth2_fC0").is_ok());
        assert!(store.get("h1_energy_ieta21_iphiall_idepth2_fC1").is_ok());
    }

    #[test]
    fn test_lookup_matches_accumulator() {
        let acc = aggregated();
        let store = DistributionStore::from_accumulator(&acc);
        let slots: Vec<ChannelSlot> = vec![
            ChannelKey::new(-21, 30, 2).unwrap().into(),
            AggregateChannelKey::all_phi(21, 2).unwrap().into(),
            AggregateChannelKey::eta_half(EtaHalf::Hep, 30, 2).unwrap().into(),
        ];
        for slot in slots {
            for bin in ChargeBin::ALL {
                assert_eq!(
                    DistributionLookup::entries(&store, &slot, bin),
                    DistributionLookup::entries(&acc, &slot, bin)
                );
            }
        }
        assert_eq!(
            store.populated_channels(ChargeBin::Inclusive),
            acc.populated_channels(ChargeBin::Inclusive)
        );
        assert_eq!(
            store.populated_channels(ChargeBin::Mid),
            vec![ChannelKey::new(-21, 30, 2).unwrap()]
        );
    }

    #[test]
    fn test_json_round_trip_via_file() {
        let store = DistributionStore::from_accumulator(&aggregated());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timing_hists.json");
        store.save(&path).unwrap();
        let loaded = DistributionStore::load(&path).unwrap();
        assert_eq!(loaded, store);
    }

    #[test]
    fn test_rejects_unknown_names() {
        let text = r#"{"distributions": {"bogus": {"x": {"bins": 1, "low": 0.0, "high": 1.0}, "y": null, "stat_overflows": false, "entries": 0, "moments": {"sumw": 0.0, "sumw2": 0.0, "sumwx": 0.0, "sumwx2": 0.0, "sumwy": 0.0, "sumwy2": 0.0}}}}"#;
        assert!(matches!(
            DistributionStore::read_json(text.as_bytes()),
            Err(Error::UnknownDistribution(_))
        ));
    }
}

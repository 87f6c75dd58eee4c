//! Timing profiles along eta and phi
//!
//! An eta profile reads the all-phi aggregates of one depth; a phi profile
//! reads the HEM or HEP aggregates of one depth. Points exist only where the
//! aggregate slot holds entries.

use crate::summary::SlotStatistics;
use crate::Result;
use hcal_aggregate::DistributionLookup;
use hcal_core::{
    valid_ietas, AggregateChannelKey, ChannelSlot, ChargeBin, EtaHalf, MAX_DEPTH, MAX_IPHI,
    MIN_DEPTH, MIN_IPHI,
};
use serde::Serialize;
use std::fmt;
use tracing::instrument;

/// The coordinate a profile runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProfileAxis {
    /// Signed ieta, each point summed over phi
    Eta,
    /// iphi, each point summed over the eta of one half
    Phi(EtaHalf),
}

impl fmt::Display for ProfileAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileAxis::Eta => f.write_str("eta"),
            ProfileAxis::Phi(half) => write!(f, "phi_{}", half.label()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfilePoint {
    /// ieta or iphi of the point
    pub position: i32,
    pub stats: SlotStatistics,
    pub pull: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub axis: ProfileAxis,
    pub depth: i32,
    pub bin: ChargeBin,
    pub points: Vec<ProfilePoint>,
}

impl Profile {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Profile name, e.g. `meanTDC_vs_phi_HEM_depth2_fC2`
    pub fn name(&self) -> String {
        format!("meanTDC_vs_{}_depth{}_fC{}", self.axis, self.depth, self.bin.index())
    }
}

/// Builds eta and phi profiles against a fixed target time
#[derive(Debug, Clone, Copy)]
pub struct ProfileBuilder {
    target_time_ns: f64,
}

impl ProfileBuilder {
    pub fn new(target_time_ns: f64) -> Self {
        Self { target_time_ns }
    }

    fn point<L>(&self, lookup: &L, slot: ChannelSlot, position: i32, bin: ChargeBin) -> Result<Option<ProfilePoint>>
    where
        L: DistributionLookup + ?Sized,
    {
        if lookup.entries(&slot, bin) == 0 {
            return Ok(None);
        }
        let stats = SlotStatistics::from_lookup(lookup, &slot, bin)?;
        Ok(Some(ProfilePoint {
            position,
            stats,
            pull: stats.pull(self.target_time_ns),
        }))
    }

    /// Profile versus ieta at one depth, from the all-phi aggregates
    pub fn eta_profile<L>(&self, lookup: &L, depth: i32, bin: ChargeBin) -> Result<Profile>
    where
        L: DistributionLookup + ?Sized,
    {
        let mut points = Vec::new();
        for ieta in valid_ietas() {
            let slot = AggregateChannelKey::all_phi(ieta, depth)?.into();
            points.extend(self.point(lookup, slot, ieta, bin)?);
        }
        Ok(Profile {
            axis: ProfileAxis::Eta,
            depth,
            bin,
            points,
        })
    }

    /// Profile versus iphi at one depth, from one half's aggregates
    pub fn phi_profile<L>(&self, lookup: &L, half: EtaHalf, depth: i32, bin: ChargeBin) -> Result<Profile>
    where
        L: DistributionLookup + ?Sized,
    {
        let mut points = Vec::new();
        for iphi in MIN_IPHI..=MAX_IPHI {
            let slot = AggregateChannelKey::eta_half(half, iphi, depth)?.into();
            points.extend(self.point(lookup, slot, iphi, bin)?);
        }
        Ok(Profile {
            axis: ProfileAxis::Phi(half),
            depth,
            bin,
            points,
        })
    }

    /// Every non-empty profile of one charge bin: eta profiles per depth,
    /// then HEM and HEP phi profiles per depth
    #[instrument(skip(self, lookup))]
    pub fn all_profiles<L>(&self, lookup: &L, bin: ChargeBin) -> Result<Vec<Profile>>
    where
        L: DistributionLookup + ?Sized,
    {
        let mut profiles = Vec::new();
        for depth in MIN_DEPTH..=MAX_DEPTH {
            profiles.push(self.eta_profile(lookup, depth, bin)?);
        }
        for half in EtaHalf::both() {
            for depth in MIN_DEPTH..=MAX_DEPTH {
                profiles.push(self.phi_profile(lookup, half, depth, bin)?);
            }
        }
        profiles.retain(|profile| !profile.is_empty());
        Ok(profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hcal_aggregate::{AggregationEngine, HistogramAccumulator, Quantity};
    use hcal_core::ChannelKey;

    fn aggregated() -> HistogramAccumulator {
        let mut acc = HistogramAccumulator::new().unwrap();
        let fills = [
            (-20, 5, 80.0),
            (-20, 6, 82.0),
            (-18, 5, 84.0),
            (24, 5, 78.0),
        ];
        for (ieta, iphi, t) in fills {
            let channel = ChannelKey::new(ieta, iphi, 2).unwrap();
            acc.fill(channel, ChargeBin::High, Quantity::TotalCharge, 12000.0, 1.0).unwrap();
            acc.fill(channel, ChargeBin::High, Quantity::TdcTime, t, 1.0).unwrap();
        }
        AggregationEngine::new().run(&mut acc).unwrap();
        acc
    }

    #[test]
    fn test_eta_profile() {
        let acc = aggregated();
        let profile = ProfileBuilder::new(81.0)
            .eta_profile(&acc, 2, ChargeBin::High)
            .unwrap();
        let positions: Vec<i32> = profile.points.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![-20, -18, 24]);
        assert_eq!(profile.points[0].stats.digi_count, 2);
        assert_relative_eq!(profile.points[0].stats.mean_time, 81.0, epsilon = 1e-12);
        assert_eq!(profile.name(), "meanTDC_vs_eta_depth2_fC3");
    }

    #[test]
    fn test_phi_profiles_split_halves() {
        let acc = aggregated();
        let builder = ProfileBuilder::new(81.0);
        let hem = builder.phi_profile(&acc, EtaHalf::Hem, 2, ChargeBin::Inclusive).unwrap();
        let hep = builder.phi_profile(&acc, EtaHalf::Hep, 2, ChargeBin::Inclusive).unwrap();

        assert_eq!(hem.points.len(), 2);
        assert_eq!(hem.points[0].position, 5);
        assert_eq!(hem.points[0].stats.digi_count, 2);
        assert_relative_eq!(hem.points[0].stats.mean_time, 82.0, epsilon = 1e-12);
        assert_relative_eq!(hem.points[0].pull, -1.0 / 2f64.sqrt(), epsilon = 1e-12);

        assert_eq!(hep.points.len(), 1);
        assert_eq!(hep.points[0].stats.digi_count, 1);
        assert_eq!(hep.name(), "meanTDC_vs_phi_HEP_depth2_fC0");
    }

    #[test]
    fn test_all_profiles_drop_empty() {
        let acc = aggregated();
        let profiles = ProfileBuilder::new(81.0)
            .all_profiles(&acc, ChargeBin::High)
            .unwrap();
        assert_eq!(profiles.len(), 3);
        assert!(profiles.iter().all(|p| p.depth == 2));
        assert!(ProfileBuilder::new(81.0)
            .all_profiles(&acc, ChargeBin::Low)
            .unwrap()
            .is_empty());
    }
}

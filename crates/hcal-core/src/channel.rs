//! Channel addressing
//!
//! A real readout channel is an `(ieta, iphi, depth)` triple. Aggregation
//! targets ("all phi", "all eta on the HEM side", ...) are a separate key
//! type so they can never be used as raw fill targets.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest |ieta| handled by this detector half; |ieta| at or below is barrel.
pub const BARREL_MAX_ABS_IETA: i32 = 15;
/// Largest |ieta|.
pub const MAX_ABS_IETA: i32 = 29;
/// Phi indices run 1..=72.
pub const MIN_IPHI: i32 = 1;
pub const MAX_IPHI: i32 = 72;
/// Depth indices run 1..=7.
pub const MIN_DEPTH: i32 = 1;
pub const MAX_DEPTH: i32 = 7;

/// One physical readout channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey {
    ieta: i32,
    iphi: i32,
    depth: i32,
}

impl ChannelKey {
    /// Create a validated channel key
    ///
    /// Fails with [`Error::UnknownChannel`] for barrel channels (|ieta| <= 15)
    /// or indices outside the detector.
    pub fn new(ieta: i32, iphi: i32, depth: i32) -> Result<Self> {
        if !Self::is_valid(ieta, iphi, depth) {
            return Err(Error::unknown_channel(ieta, iphi, depth));
        }
        Ok(Self { ieta, iphi, depth })
    }

    /// Check whether the triple addresses a channel of this detector half
    pub fn is_valid(ieta: i32, iphi: i32, depth: i32) -> bool {
        let abs_eta = ieta.abs();
        abs_eta > BARREL_MAX_ABS_IETA
            && abs_eta <= MAX_ABS_IETA
            && (MIN_IPHI..=MAX_IPHI).contains(&iphi)
            && (MIN_DEPTH..=MAX_DEPTH).contains(&depth)
    }

    pub fn ieta(&self) -> i32 {
        self.ieta
    }

    pub fn iphi(&self) -> i32 {
        self.iphi
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Detector half this channel belongs to
    pub fn half(&self) -> EtaHalf {
        EtaHalf::of(self.ieta)
    }

    /// Every valid channel, ordered by (ieta, iphi, depth)
    pub fn all() -> impl Iterator<Item = ChannelKey> {
        valid_ietas().flat_map(|ieta| {
            (MIN_IPHI..=MAX_IPHI).flat_map(move |iphi| {
                (MIN_DEPTH..=MAX_DEPTH).map(move |depth| ChannelKey { ieta, iphi, depth })
            })
        })
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iEta {}, iPhi {}, Depth {}",
            self.ieta, self.iphi, self.depth
        )
    }
}

/// Valid ieta values in increasing order (negative side first)
pub fn valid_ietas() -> impl Iterator<Item = i32> + Clone {
    (-MAX_ABS_IETA..=MAX_ABS_IETA).filter(|eta| eta.abs() > BARREL_MAX_ABS_IETA)
}

/// The two disjoint physical halves of the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EtaHalf {
    /// Negative pseudorapidity side
    Hem,
    /// Positive pseudorapidity side
    Hep,
}

impl EtaHalf {
    pub fn of(ieta: i32) -> Self {
        if ieta < 0 {
            EtaHalf::Hem
        } else {
            EtaHalf::Hep
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EtaHalf::Hem => "HEM",
            EtaHalf::Hep => "HEP",
        }
    }

    pub fn both() -> [EtaHalf; 2] {
        [EtaHalf::Hem, EtaHalf::Hep]
    }
}

impl fmt::Display for EtaHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Eta coordinate of an aggregate target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EtaSelector {
    Ieta(i32),
    AllIn(EtaHalf),
}

/// Phi coordinate of an aggregate target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhiSelector {
    Iphi(i32),
    All,
}

/// Aggregation target with at least one wildcard dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AggregateChannelKey {
    eta: EtaSelector,
    phi: PhiSelector,
    depth: i32,
}

impl AggregateChannelKey {
    /// Sum over all phi at one real eta
    pub fn all_phi(ieta: i32, depth: i32) -> Result<Self> {
        ChannelKey::new(ieta, MIN_IPHI, depth)?;
        Ok(Self {
            eta: EtaSelector::Ieta(ieta),
            phi: PhiSelector::All,
            depth,
        })
    }

    /// Sum over all eta of one detector half at one real phi
    pub fn eta_half(half: EtaHalf, iphi: i32, depth: i32) -> Result<Self> {
        let probe = match half {
            EtaHalf::Hem => -MAX_ABS_IETA,
            EtaHalf::Hep => MAX_ABS_IETA,
        };
        ChannelKey::new(probe, iphi, depth)?;
        Ok(Self {
            eta: EtaSelector::AllIn(half),
            phi: PhiSelector::Iphi(iphi),
            depth,
        })
    }

    pub fn eta(&self) -> EtaSelector {
        self.eta
    }

    pub fn phi(&self) -> PhiSelector {
        self.phi
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// All "all-phi" targets, ordered by (ieta, depth)
    pub fn all_phi_targets() -> impl Iterator<Item = AggregateChannelKey> {
        valid_ietas().flat_map(|ieta| {
            (MIN_DEPTH..=MAX_DEPTH).map(move |depth| AggregateChannelKey {
                eta: EtaSelector::Ieta(ieta),
                phi: PhiSelector::All,
                depth,
            })
        })
    }

    /// All eta-half targets, ordered by (half, iphi, depth)
    pub fn eta_half_targets() -> impl Iterator<Item = AggregateChannelKey> {
        EtaHalf::both().into_iter().flat_map(|half| {
            (MIN_IPHI..=MAX_IPHI).flat_map(move |iphi| {
                (MIN_DEPTH..=MAX_DEPTH).map(move |depth| AggregateChannelKey {
                    eta: EtaSelector::AllIn(half),
                    phi: PhiSelector::Iphi(iphi),
                    depth,
                })
            })
        })
    }
}

/// Any addressable histogram slot: a real channel or an aggregate target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelSlot {
    Real(ChannelKey),
    Aggregate(AggregateChannelKey),
}

impl ChannelSlot {
    pub fn depth(&self) -> i32 {
        match self {
            ChannelSlot::Real(key) => key.depth(),
            ChannelSlot::Aggregate(key) => key.depth(),
        }
    }

    /// Eta token used in distribution names (`-17`, `HEM`, ...)
    pub fn eta_label(&self) -> String {
        match self {
            ChannelSlot::Real(key) => key.ieta().to_string(),
            ChannelSlot::Aggregate(key) => match key.eta() {
                EtaSelector::Ieta(ieta) => ieta.to_string(),
                EtaSelector::AllIn(half) => half.label().to_string(),
            },
        }
    }

    /// Phi token used in distribution names (`5`, `all`)
    pub fn phi_label(&self) -> String {
        match self {
            ChannelSlot::Real(key) => key.iphi().to_string(),
            ChannelSlot::Aggregate(key) => match key.phi() {
                PhiSelector::Iphi(iphi) => iphi.to_string(),
                PhiSelector::All => "all".to_string(),
            },
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, ChannelSlot::Real(_))
    }
}

impl From<ChannelKey> for ChannelSlot {
    fn from(key: ChannelKey) -> Self {
        ChannelSlot::Real(key)
    }
}

impl From<AggregateChannelKey> for ChannelSlot {
    fn from(key: AggregateChannelKey) -> Self {
        ChannelSlot::Aggregate(key)
    }
}

impl fmt::Display for ChannelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iEta {}, iPhi {}, Depth {}",
            self.eta_label(),
            self.phi_label(),
            self.depth()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range() {
        assert!(ChannelKey::new(16, 1, 1).is_ok());
        assert!(ChannelKey::new(-29, 72, 7).is_ok());
        assert!(ChannelKey::new(15, 1, 1).is_err());
        assert!(ChannelKey::new(-15, 1, 1).is_err());
        assert!(ChannelKey::new(0, 1, 1).is_err());
        assert!(ChannelKey::new(30, 1, 1).is_err());
        assert!(ChannelKey::new(20, 0, 1).is_err());
        assert!(ChannelKey::new(20, 73, 1).is_err());
        assert!(ChannelKey::new(20, 1, 0).is_err());
        assert!(ChannelKey::new(20, 1, 8).is_err());
    }

    #[test]
    fn test_unknown_channel_reports_context() {
        match ChannelKey::new(3, 10, 2) {
            Err(Error::UnknownChannel { ieta, iphi, depth }) => {
                assert_eq!((ieta, iphi, depth), (3, 10, 2));
            }
            other => panic!("expected UnknownChannel, got {other:?}"),
        }
    }

    #[test]
    fn test_enumeration_counts() {
        assert_eq!(valid_ietas().count(), 28);
        assert_eq!(ChannelKey::all().count(), 28 * 72 * 7);
        assert_eq!(AggregateChannelKey::all_phi_targets().count(), 28 * 7);
        assert_eq!(AggregateChannelKey::eta_half_targets().count(), 2 * 72 * 7);
        assert!(ChannelKey::all().all(|k| k.ieta().abs() > 15));
    }

    #[test]
    fn test_halves() {
        assert_eq!(ChannelKey::new(-16, 1, 1).unwrap().half(), EtaHalf::Hem);
        assert_eq!(ChannelKey::new(16, 1, 1).unwrap().half(), EtaHalf::Hep);
    }

    #[test]
    fn test_slot_labels() {
        let real: ChannelSlot = ChannelKey::new(-17, 5, 2).unwrap().into();
        assert_eq!(real.eta_label(), "-17");
        assert_eq!(real.phi_label(), "5");

        let phi_sum: ChannelSlot = AggregateChannelKey::all_phi(20, 3).unwrap().into();
        assert_eq!(phi_sum.eta_label(), "20");
        assert_eq!(phi_sum.phi_label(), "all");

        let hem: ChannelSlot = AggregateChannelKey::eta_half(EtaHalf::Hem, 9, 1).unwrap().into();
        assert_eq!(hem.eta_label(), "HEM");
        assert_eq!(hem.phi_label(), "9");
    }

    #[test]
    fn test_aggregate_constructors_validate() {
        assert!(AggregateChannelKey::all_phi(10, 1).is_err());
        assert!(AggregateChannelKey::eta_half(EtaHalf::Hep, 80, 1).is_err());
        assert!(AggregateChannelKey::eta_half(EtaHalf::Hep, 1, 9).is_err());
    }
}

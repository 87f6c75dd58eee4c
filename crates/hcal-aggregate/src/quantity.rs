//! The catalogue of per-slot distributions
//!
//! Every (slot, charge bin) pair carries one distribution per [`Quantity`],
//! each with a fixed layout. Names are derived from the key so a stored
//! distribution can be looked up again exactly.

use hcal_core::{
    AggregateChannelKey, ChannelKey, ChannelSlot, ChargeBin, EtaHalf, Error, Result,
};
use hcal_histogram::{Distribution, DistributionBuilder, FixedLayout};
use std::fmt;
use std::str::FromStr;

/// A quantity recorded per (slot, charge bin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quantity {
    /// Raw charge per time slice (pulse shape)
    PulseCharge,
    /// Baseline per time slice, overlaid on the pulse shape
    PulsePedestal,
    TotalCharge,
    TotalAdc,
    ChargeTime,
    TdcTime,
    TdcFires,
    ChargeFractionTs2,
    ChargeFractionTs4,
    Ts2FractionVsTdc,
    Ts4FractionVsTdc,
    TotalChargeVsTdc,
}

impl Quantity {
    pub const COUNT: usize = 12;

    pub const ALL: [Quantity; Self::COUNT] = [
        Quantity::PulseCharge,
        Quantity::PulsePedestal,
        Quantity::TotalCharge,
        Quantity::TotalAdc,
        Quantity::ChargeTime,
        Quantity::TdcTime,
        Quantity::TdcFires,
        Quantity::ChargeFractionTs2,
        Quantity::ChargeFractionTs4,
        Quantity::Ts2FractionVsTdc,
        Quantity::Ts4FractionVsTdc,
        Quantity::TotalChargeVsTdc,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Quantity::PulseCharge => "h1_fC",
            Quantity::PulsePedestal => "h1_ped",
            Quantity::TotalCharge => "h1_energy",
            Quantity::TotalAdc => "h1_energyADC",
            Quantity::ChargeTime => "h1_chg_time",
            Quantity::TdcTime => "h1_TDC_time",
            Quantity::TdcFires => "h1_nTDC",
            Quantity::ChargeFractionTs2 => "h1_chgfracTS2",
            Quantity::ChargeFractionTs4 => "h1_chgfracTS4",
            Quantity::Ts2FractionVsTdc => "h2_chgfracTS2vsTDC",
            Quantity::Ts4FractionVsTdc => "h2_chgfracTS4vsTDC",
            Quantity::TotalChargeVsTdc => "h2_TotFCvsTDC",
        }
    }

    pub fn is_2d(self) -> bool {
        matches!(
            self,
            Quantity::Ts2FractionVsTdc | Quantity::Ts4FractionVsTdc | Quantity::TotalChargeVsTdc
        )
    }

    /// Filled only for digis with exactly one TDC fire
    pub fn is_tdc_conditioned(self) -> bool {
        self.is_2d() || self == Quantity::TdcTime
    }

    /// Fixed bin layout of this quantity
    pub fn layout(self) -> Result<FixedLayout> {
        const TIME: (usize, f64, f64) = (50, 40.0, 140.0);
        const ENERGY: (usize, f64, f64) = (40, 5000.0, 25000.0);
        const TS2: (usize, f64, f64) = (30, 0.0, 15.0);
        const TS4: (usize, f64, f64) = (35, 0.0, 70.0);

        let layout = match self {
            Quantity::PulseCharge | Quantity::PulsePedestal => FixedLayout::one_d(8, -0.5, 7.5)?,
            Quantity::TotalCharge => {
                FixedLayout::one_d(ENERGY.0, ENERGY.1, ENERGY.2)?.with_stat_overflows()
            }
            Quantity::TotalAdc => FixedLayout::one_d(40, 0.0, 500.0)?.with_stat_overflows(),
            Quantity::ChargeTime | Quantity::TdcTime => FixedLayout::one_d(TIME.0, TIME.1, TIME.2)?,
            Quantity::TdcFires => FixedLayout::one_d(10, -0.5, 9.5)?,
            Quantity::ChargeFractionTs2 => {
                FixedLayout::one_d(TS2.0, TS2.1, TS2.2)?.with_stat_overflows()
            }
            Quantity::ChargeFractionTs4 => {
                FixedLayout::one_d(TS4.0, TS4.1, TS4.2)?.with_stat_overflows()
            }
            Quantity::Ts2FractionVsTdc => FixedLayout::two_d(TIME, TS2)?,
            Quantity::Ts4FractionVsTdc => FixedLayout::two_d(TIME, TS4)?,
            Quantity::TotalChargeVsTdc => FixedLayout::two_d(TIME, ENERGY)?,
        };
        Ok(layout)
    }

    /// Distribution name for a slot and charge bin
    pub fn distribution_name(self, slot: &ChannelSlot, bin: ChargeBin) -> String {
        format!(
            "{}_ieta{}_iphi{}_idepth{}_fC{}",
            self.prefix(),
            slot.eta_label(),
            slot.phi_label(),
            slot.depth(),
            bin.index()
        )
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for Quantity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Quantity::ALL
            .into_iter()
            .find(|q| q.prefix() == s)
            .ok_or_else(|| Error::UnknownDistribution(s.to_string()))
    }
}

/// Decode a distribution name back into its key
pub fn parse_distribution_name(name: &str) -> Result<(Quantity, ChannelSlot, ChargeBin)> {
    let unknown = || Error::UnknownDistribution(name.to_string());

    let (head, bin) = name.rsplit_once("_fC").ok_or_else(unknown)?;
    let (head, depth) = head.rsplit_once("_idepth").ok_or_else(unknown)?;
    let (head, phi) = head.rsplit_once("_iphi").ok_or_else(unknown)?;
    let (prefix, eta) = head.rsplit_once("_ieta").ok_or_else(unknown)?;

    let quantity: Quantity = prefix.parse()?;
    let bin = bin
        .parse::<usize>()
        .map_err(|_| unknown())
        .and_then(ChargeBin::from_index)?;
    let depth: i32 = depth.parse().map_err(|_| unknown())?;

    let slot = match (eta, phi) {
        ("HEM", phi) | ("HEP", phi) => {
            let half = if eta == "HEM" { EtaHalf::Hem } else { EtaHalf::Hep };
            let iphi = phi.parse().map_err(|_| unknown())?;
            ChannelSlot::Aggregate(AggregateChannelKey::eta_half(half, iphi, depth)?)
        }
        (eta, "all") => {
            let ieta = eta.parse().map_err(|_| unknown())?;
            ChannelSlot::Aggregate(AggregateChannelKey::all_phi(ieta, depth)?)
        }
        (eta, phi) => {
            let ieta = eta.parse().map_err(|_| unknown())?;
            let iphi = phi.parse().map_err(|_| unknown())?;
            ChannelSlot::Real(ChannelKey::new(ieta, iphi, depth)?)
        }
    };
    Ok((quantity, slot, bin))
}

/// Booked layouts of every quantity, built once
#[derive(Debug, Clone)]
pub struct QuantityCatalogue {
    layouts: [FixedLayout; Quantity::COUNT],
}

impl QuantityCatalogue {
    pub fn new() -> Result<Self> {
        let mut layouts = Vec::with_capacity(Quantity::COUNT);
        for quantity in Quantity::ALL {
            layouts.push(quantity.layout()?);
        }
        let layouts = layouts
            .try_into()
            .map_err(|_| Error::data_shape("quantity catalogue", Quantity::COUNT, 0))?;
        Ok(Self { layouts })
    }

    pub fn layout(&self, quantity: Quantity) -> &FixedLayout {
        &self.layouts[quantity.index()]
    }

    /// One empty distribution per quantity, in [`Quantity::ALL`] order
    pub fn book_all(&self) -> Vec<Distribution> {
        self.layouts.iter().map(|layout| layout.book()).collect()
    }
}

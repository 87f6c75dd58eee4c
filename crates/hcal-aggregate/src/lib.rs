//! Per-channel distribution accumulation and hierarchical aggregation
//!
//! A [`HistogramAccumulator`] owns the distributions of every touched
//! (slot, charge bin) pair. Reduced digis are filled into their real
//! channel slots; the [`AggregationEngine`] then builds the inclusive charge
//! bin, the all-phi aggregates and the HEM/HEP aggregates. The result can be
//! snapshotted into a name-addressed [`DistributionStore`] and read back
//! through the [`DistributionLookup`] trait.
//!
//! # Example
//!
//! ```rust
//! use hcal_aggregate::{AggregationEngine, DistributionLookup, HistogramAccumulator, Quantity};
//! use hcal_core::{AggregateChannelKey, ChannelKey, ChargeBin};
//!
//! let mut acc = HistogramAccumulator::new().unwrap();
//! let channel = ChannelKey::new(20, 7, 1).unwrap();
//! acc.fill(channel, ChargeBin::Mid, Quantity::TotalCharge, 9000.0, 1.0).unwrap();
//!
//! AggregationEngine::new().run(&mut acc).unwrap();
//!
//! let all_phi = AggregateChannelKey::all_phi(20, 1).unwrap().into();
//! assert_eq!(DistributionLookup::entries(&acc, &all_phi, ChargeBin::Inclusive), 1);
//! ```

pub mod accumulator;
pub mod aggregation;
pub mod lookup;
pub mod quantity;
pub mod store;

pub use accumulator::{ChargeBinSet, HistogramAccumulator, HistogramSet};
pub use aggregation::{AggregationEngine, AggregationPhase, AggregationReport};
pub use lookup::DistributionLookup;
pub use quantity::{parse_distribution_name, Quantity, QuantityCatalogue};
pub use store::DistributionStore;

//! Core types for calorimeter timing calibration
//!
//! This crate holds the vocabulary shared by every stage of the pipeline:
//!
//! - [`ChannelKey`]: a validated `(ieta, iphi, depth)` readout channel
//! - [`AggregateChannelKey`] / [`ChannelSlot`]: aggregation targets with
//!   wildcard dimensions, kept distinct from real channels
//! - [`ChargeBin`] / [`ChargeThresholds`]: charge classification of digis
//! - [`CalibrationConfig`]: run constants
//! - [`Error`] / [`Result`]: the shared error type

pub mod channel;
pub mod charge;
pub mod config;
pub mod error;

pub use channel::{
    valid_ietas, AggregateChannelKey, ChannelKey, ChannelSlot, EtaHalf, EtaSelector,
    PhiSelector, BARREL_MAX_ABS_IETA, MAX_ABS_IETA, MAX_DEPTH, MAX_IPHI, MIN_DEPTH, MIN_IPHI,
};
pub use charge::{ChargeBin, ChargeThresholds};
pub use config::CalibrationConfig;
pub use error::{Error, Result};

/// Number of time slices in one digi
pub const SAMPLES_PER_DIGI: usize = 8;

//! Per-channel timing calibration for segmented calorimeter readout
//!
//! This crate re-exports the calibration workspace and adds the end-to-end
//! [`TimingPipeline`]:
//!
//! - [`hcal_core`]: channel keys, charge bins, configuration, errors
//! - [`hcal_histogram`]: weighted fixed-layout distributions
//! - [`hcal_digi`]: pedestals, digis, reduction and event sources
//! - [`hcal_aggregate`]: accumulation, hierarchical aggregation, persisted store
//! - [`hcal_summary`]: per-channel summaries, profiles, correction tables
//!
//! # Example
//!
//! ```rust
//! use hcal_timing::hcal_core::{CalibrationConfig, ChannelKey};
//! use hcal_timing::hcal_digi::{Digi, EventRecord, PedestalTable, VecEventSource};
//! use hcal_timing::TimingPipeline;
//!
//! let pedestals = PedestalTable::parse_str("20 7 1 HE 3 3 3 3 0x1\n").unwrap();
//! let pipeline = TimingPipeline::new(CalibrationConfig::default(), pedestals).unwrap();
//!
//! let mut event = EventRecord::default();
//! let digi = Digi::new(
//!     ChannelKey::new(20, 7, 1).unwrap(),
//!     &[3.0, 900.0, 6003.0, 2003.0, 203.0, 3.0, 3.0, 3.0],
//!     &[2, 50, 120, 80, 20, 2, 2, 2],
//!     &[0, 1, 2, 3, 0, 1, 2, 3],
//!     79.0,
//!     80.0,
//!     1,
//! )
//! .unwrap();
//! event.push_digi(&digi);
//!
//! let output = pipeline.run(&mut VecEventSource::new(vec![event])).unwrap();
//! assert_eq!(output.summary.events, 1);
//! assert_eq!(output.records.len(), 1);
//! ```

pub mod pipeline;

// Re-export all workspace crates
pub use hcal_aggregate;
pub use hcal_core;
pub use hcal_digi;
pub use hcal_histogram;
pub use hcal_summary;

pub use pipeline::{
    correction_table_name, PipelineOutput, RunSummary, TimingPipeline, DEFAULT_BATCH_SIZE,
    DISTRIBUTIONS_FILE,
};

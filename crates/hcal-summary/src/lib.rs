//! Per-channel timing summaries, profiles and correction tables
//!
//! The [`SummaryStatsEngine`] reads the TDC-time, charge-fraction and
//! total-charge distributions of every populated real channel at the
//! measurement charge bin and derives a gated, quantized phase adjustment.
//! [`ProfileBuilder`] summarizes the aggregate slots along eta and phi, and
//! [`ReportWriter`] writes the correction table.
//!
//! Everything works through [`hcal_aggregate::DistributionLookup`], so the
//! same code runs on a live accumulator or on a loaded distribution store.

mod error;
pub mod profile;
pub mod report;
pub mod summary;

pub use error::{Error, Result};
pub use profile::{Profile, ProfileAxis, ProfileBuilder, ProfilePoint};
pub use report::{CorrectionRow, ReportWriter, CORRECTION_COLUMNS};
pub use summary::{Measurement, SlotStatistics, SummaryRecord, SummaryStatsEngine};

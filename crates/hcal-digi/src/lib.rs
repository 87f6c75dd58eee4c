//! Digi-level processing for timing calibration
//!
//! - [`PedestalTable`]: per-capacitor baselines loaded once per run
//! - [`Digi`] and [`peak_window`]: the validated eight-slice readout and the
//!   peak-relative integration window
//! - [`DigiReducer`]: pedestal subtraction, charge-bin classification and
//!   feature extraction
//! - [`EventRecord`] / [`EventSource`]: the event stream feeding the reducer
//!
//! # Example
//!
//! ```rust
//! use hcal_core::{ChannelKey, ChargeBin, ChargeThresholds};
//! use hcal_digi::{Digi, DigiReducer, PedestalTable};
//!
//! let table = PedestalTable::parse_str("-17 5 1 HE 3 3 3 3 0x1\n").unwrap();
//! let reducer = DigiReducer::new(&table, ChargeThresholds::default());
//!
//! let digi = Digi::new(
//!     ChannelKey::new(-17, 5, 1).unwrap(),
//!     &[3.0, 800.0, 5003.0, 2003.0, 103.0, 3.0, 3.0, 3.0],
//!     &[2, 50, 110, 80, 20, 2, 2, 2],
//!     &[0, 1, 2, 3, 0, 1, 2, 3],
//!     79.5,
//!     80.0,
//!     1,
//! )
//! .unwrap();
//!
//! let reduced = reducer.reduce(&digi).digi.unwrap();
//! assert_eq!(reduced.bin, ChargeBin::Mid);
//! ```

pub mod digi;
pub mod event;
pub mod pedestal;
pub mod reducer;

pub use digi::{peak_window, windowed_sum, Digi, MAX_CAPID};
pub use event::{write_json_lines, EventRecord, EventSource, JsonLinesEvents, VecEventSource};
pub use pedestal::{PedestalEntry, PedestalTable, CAPACITORS};
pub use reducer::{DigiReducer, ReducedDigi, ReducedEvent, ReducerDiagnostics, Reduction};

//! Event records and sources
//!
//! An event carries parallel per-digi arrays as produced by the ntuple
//! maker. [`EventRecord::digis`] checks that the arrays line up and turns
//! them into validated [`Digi`]s.

use crate::digi::Digi;
use hcal_core::{ChannelKey, Error, Result};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// One event's digis as parallel arrays
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    pub run: u32,
    pub lumi_section: u32,
    pub event: u64,
    pub bunch_crossing: u32,
    pub ieta: Vec<i32>,
    pub iphi: Vec<i32>,
    pub depth: Vec<i32>,
    pub capid: Vec<Vec<u8>>,
    pub charge_fc: Vec<Vec<f64>>,
    pub adc: Vec<Vec<i32>>,
    pub charge_time: Vec<f64>,
    pub tdc_time: Vec<f64>,
    pub n_tdc: Vec<u32>,
}

impl EventRecord {
    pub fn digi_count(&self) -> usize {
        self.ieta.len()
    }

    /// Append one digi to the parallel arrays
    pub fn push_digi(&mut self, digi: &Digi) {
        self.ieta.push(digi.channel.ieta());
        self.iphi.push(digi.channel.iphi());
        self.depth.push(digi.channel.depth());
        self.capid.push(digi.capid.to_vec());
        self.charge_fc.push(digi.charge_fc.to_vec());
        self.adc.push(digi.adc.to_vec());
        self.charge_time.push(digi.charge_time);
        self.tdc_time.push(digi.tdc_time);
        self.n_tdc.push(digi.n_tdc);
    }

    /// Validate the record and build its digis
    pub fn digis(&self) -> Result<Vec<Digi>> {
        let n = self.digi_count();
        let lengths = [
            ("iphi", self.iphi.len()),
            ("depth", self.depth.len()),
            ("capid", self.capid.len()),
            ("charge_fc", self.charge_fc.len()),
            ("adc", self.adc.len()),
            ("charge_time", self.charge_time.len()),
            ("tdc_time", self.tdc_time.len()),
            ("n_tdc", self.n_tdc.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(Error::data_shape(
                    &format!("event {} array {name}", self.event),
                    n,
                    len,
                ));
            }
        }

        (0..n)
            .map(|i| {
                let channel = ChannelKey::new(self.ieta[i], self.iphi[i], self.depth[i])?;
                Digi::new(
                    channel,
                    &self.charge_fc[i],
                    &self.adc[i],
                    &self.capid[i],
                    self.charge_time[i],
                    self.tdc_time[i],
                    self.n_tdc[i],
                )
            })
            .collect()
    }
}

/// A finite, ordered stream of events
pub trait EventSource {
    /// Next event, or `None` once the source is exhausted
    fn next_event(&mut self) -> Result<Option<EventRecord>>;

    /// Number of events still to come, if known
    fn remaining_hint(&self) -> Option<usize> {
        None
    }
}

/// In-memory event source
#[derive(Debug, Clone, Default)]
pub struct VecEventSource {
    events: std::vec::IntoIter<EventRecord>,
}

impl VecEventSource {
    pub fn new(events: Vec<EventRecord>) -> Self {
        Self {
            events: events.into_iter(),
        }
    }
}

impl EventSource for VecEventSource {
    fn next_event(&mut self) -> Result<Option<EventRecord>> {
        Ok(self.events.next())
    }

    fn remaining_hint(&self) -> Option<usize> {
        Some(self.events.len())
    }
}

/// Events stored one JSON object per line
///
/// Blank lines are skipped. A malformed line is reported with its line
/// number.
pub struct JsonLinesEvents<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> JsonLinesEvents<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl JsonLinesEvents<std::io::BufReader<std::fs::File>> {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(std::io::BufReader::new(file)))
    }
}

impl<R: BufRead> EventSource for JsonLinesEvents<R> {
    fn next_event(&mut self) -> Result<Option<EventRecord>> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&line)
                .map(Some)
                .map_err(|e| Error::parse(self.line_no, e.to_string()));
        }
        Ok(None)
    }
}

/// Write events one JSON object per line
pub fn write_json_lines<W: std::io::Write>(mut writer: W, events: &[EventRecord]) -> Result<()> {
    for event in events {
        serde_json::to_writer(&mut writer, event)?;
        writeln!(writer)?;
    }
    Ok(())
}

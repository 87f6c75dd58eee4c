//! Per-channel, per-capacitor pedestal baselines
//!
//! Tables are line-oriented text with whitespace-separated columns:
//!
//! ```text
//! #U fC  << this is the unit
//! #  eta  phi  dep  det  cap0  cap1  cap2  cap3  DetId
//!    -17   5    1   HE   3.1   3.0   3.2   2.9   0x4a1b2c3d
//! ```
//!
//! A row may also carry four per-capacitor widths between the baselines and
//! the channel id, as written by the pedestal maker.

use hcal_core::{ChannelKey, Error, Result};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Number of capacitors cycling through the time slices
pub const CAPACITORS: usize = 4;

/// Baselines of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct PedestalEntry {
    pub detector: String,
    pub baselines: [f64; CAPACITORS],
    pub widths: Option<[f64; CAPACITORS]>,
    pub channel_id: String,
}

/// Read-only lookup of pedestal baselines
#[derive(Debug, Clone, Default)]
pub struct PedestalTable {
    entries: HashMap<ChannelKey, PedestalEntry>,
    skipped_rows: usize,
}

impl PedestalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the table for a pedestal run under `dir`
    pub fn path_for_run(dir: impl AsRef<Path>, run: u32) -> PathBuf {
        dir.as_ref().join("pedestals").join(format!("ped_{run}.txt"))
    }

    /// Load `pedestals/ped_{run}.txt` below `dir`
    #[instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn load(dir: impl AsRef<Path>, run: u32) -> Result<Self> {
        let path = Self::path_for_run(&dir, run);
        info!("Using pedestal table {}", path.display());
        let file = std::fs::File::open(&path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a table from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = Self::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            table.parse_line(index + 1, &line)?;
        }
        debug!(
            channels = table.entries.len(),
            skipped = table.skipped_rows,
            "Pedestal table parsed"
        );
        Ok(table)
    }

    /// Parse a table held in memory
    pub fn parse_str(text: &str) -> Result<Self> {
        Self::from_reader(text.as_bytes())
    }

    fn parse_line(&mut self, line_no: usize, line: &str) -> Result<()> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let with_widths = match fields.len() {
            9 => false,
            13 => true,
            n => {
                return Err(Error::parse(
                    line_no,
                    format!("expected 9 or 13 fields, found {n}"),
                ))
            }
        };

        let int = |i: usize, what: &str| -> Result<i32> {
            fields[i]
                .parse::<i32>()
                .map_err(|e| Error::parse(line_no, format!("bad {what} '{}': {e}", fields[i])))
        };
        let float = |i: usize| -> Result<f64> {
            fields[i]
                .parse::<f64>()
                .map_err(|e| Error::parse(line_no, format!("bad value '{}': {e}", fields[i])))
        };

        let (ieta, iphi, depth) = (int(0, "eta")?, int(1, "phi")?, int(2, "depth")?);
        let baselines = [float(4)?, float(5)?, float(6)?, float(7)?];
        let widths = if with_widths {
            Some([float(8)?, float(9)?, float(10)?, float(11)?])
        } else {
            None
        };

        // Rows for other detector regions share the file
        let Ok(key) = ChannelKey::new(ieta, iphi, depth) else {
            self.skipped_rows += 1;
            return Ok(());
        };
        self.entries.insert(
            key,
            PedestalEntry {
                detector: fields[3].to_string(),
                baselines,
                widths,
                channel_id: fields[fields.len() - 1].to_string(),
            },
        );
        Ok(())
    }

    /// Baseline of `capid` for `channel`
    ///
    /// A channel absent from the table, or a capid above 3, resolves to 0.0,
    /// which callers treat as a missing pedestal.
    pub fn baseline(&self, channel: &ChannelKey, capid: u8) -> f64 {
        self.entries
            .get(channel)
            .and_then(|entry| entry.baselines.get(capid as usize))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn entry(&self, channel: &ChannelKey) -> Option<&PedestalEntry> {
        self.entries.get(channel)
    }

    /// Insert or replace the baselines of one channel
    pub fn insert(&mut self, channel: ChannelKey, entry: PedestalEntry) {
        self.entries.insert(channel, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows that addressed channels outside this detector half
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Write the table in the text format it is read from
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let mut keys: Vec<&ChannelKey> = self.entries.keys().collect();
        keys.sort_by_key(|k| (k.iphi(), k.ieta(), k.depth()));

        writeln!(writer, "#U fC  << this is the unit")?;
        writeln!(
            writer,
            "#{:>16}{:>16}{:>16}{:>16}{:>16}{:>16}{:>16}{:>16}{:>16}",
            "eta", "phi", "dep", "det", "cap0", "cap1", "cap2", "cap3", "DetId"
        )?;
        for key in keys {
            let entry = &self.entries[key];
            let mut row = format!(
                "{:>17}{:>16}{:>16}{:>16}",
                key.ieta(),
                key.iphi(),
                key.depth(),
                entry.detector
            );
            for value in entry.baselines.iter().chain(entry.widths.iter().flatten()) {
                row.push_str(&format!("{:>16}", format!("{value:.5}")));
            }
            writeln!(writer, "{row}{:>16}", entry.channel_id)?;
        }
        Ok(())
    }
}

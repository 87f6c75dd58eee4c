//! Correction table output
//!
//! One CSV row per summarized channel, with a fixed header and fixed decimal
//! precision per column.

use crate::summary::SummaryRecord;
use crate::{Error, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{info, instrument};

/// Column names of the correction table, in order
pub const CORRECTION_COLUMNS: [&str; 9] = [
    "nDigis",
    "iEta",
    "iPhi",
    "Depth",
    "Mean TDC time[ns]",
    " TDC time RMS[ns]",
    " Uncertainty",
    "Adjustment[ns]",
    "Adjustment[phase units]",
];

/// One row of the correction table as written
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionRow {
    pub digi_count: u64,
    pub ieta: i32,
    pub iphi: i32,
    pub depth: i32,
    pub mean_time: f64,
    pub rms_time: f64,
    pub uncertainty: f64,
    pub adjustment_ns: f64,
    pub adjustment: i64,
}

impl From<&SummaryRecord> for CorrectionRow {
    fn from(record: &SummaryRecord) -> Self {
        Self {
            digi_count: record.digi_count(),
            ieta: record.channel.ieta(),
            iphi: record.channel.iphi(),
            depth: record.channel.depth(),
            mean_time: record.stats.mean_time,
            rms_time: record.stats.rms_time,
            uncertainty: record.stats.mean_time_error,
            adjustment_ns: record.correction_ns,
            adjustment: record.adjustment,
        }
    }
}

impl CorrectionRow {
    fn to_fields(&self) -> [String; 9] {
        [
            self.digi_count.to_string(),
            self.ieta.to_string(),
            self.iphi.to_string(),
            self.depth.to_string(),
            format!("{:.2}", self.mean_time),
            format!("{:.2}", self.rms_time),
            format!("{:.3}", self.uncertainty),
            format!("{:.1}", self.adjustment_ns),
            self.adjustment.to_string(),
        ]
    }

    fn from_record(row: usize, record: &StringRecord) -> Result<Self> {
        if record.len() != CORRECTION_COLUMNS.len() {
            return Err(Error::InvalidRow {
                row,
                message: format!(
                    "expected {} fields, got {}",
                    CORRECTION_COLUMNS.len(),
                    record.len()
                ),
            });
        }
        fn field<T: FromStr>(record: &StringRecord, row: usize, index: usize) -> Result<T> {
            let text = record.get(index).unwrap_or_default().trim();
            text.parse().map_err(|_| Error::InvalidRow {
                row,
                message: format!("bad {} value '{}'", CORRECTION_COLUMNS[index].trim(), text),
            })
        }
        Ok(Self {
            digi_count: field(record, row, 0)?,
            ieta: field(record, row, 1)?,
            iphi: field(record, row, 2)?,
            depth: field(record, row, 3)?,
            mean_time: field(record, row, 4)?,
            rms_time: field(record, row, 5)?,
            uncertainty: field(record, row, 6)?,
            adjustment_ns: field(record, row, 7)?,
            adjustment: field(record, row, 8)?,
        })
    }
}

/// Writes and reads correction tables
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportWriter;

impl ReportWriter {
    pub fn new() -> Self {
        Self
    }

    /// The header line exactly as written
    pub fn header() -> String {
        CORRECTION_COLUMNS.join(",")
    }

    #[instrument(skip_all, fields(rows = records.len()))]
    pub fn write<W: Write>(&self, writer: W, records: &[SummaryRecord]) -> Result<()> {
        let mut out = WriterBuilder::new().has_headers(false).from_writer(writer);
        out.write_record(CORRECTION_COLUMNS)?;
        for record in records {
            out.write_record(CorrectionRow::from(record).to_fields())?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>, records: &[SummaryRecord]) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)?;
        self.write(file, records)?;
        info!(path = %path.display(), rows = records.len(), "Correction table written");
        Ok(())
    }

    /// Read a correction table back, checking the header
    pub fn read<R: Read>(&self, reader: R) -> Result<Vec<CorrectionRow>> {
        let mut input = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let header = input.headers()?;
        if !header.iter().eq(CORRECTION_COLUMNS) {
            return Err(Error::Header(header.iter().collect::<Vec<_>>().join(",")));
        }

        let mut rows = Vec::new();
        for (index, record) in input.records().enumerate() {
            // Row numbers count the header as row 1
            rows.push(CorrectionRow::from_record(index + 2, &record?)?);
        }
        Ok(rows)
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<Vec<CorrectionRow>> {
        let file = std::fs::File::open(path)?;
        self.read(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{Measurement, SlotStatistics};
    use approx::assert_relative_eq;
    use hcal_core::ChannelKey;

    fn record(ieta: i32, mean: f64, adjustment: i64) -> SummaryRecord {
        SummaryRecord {
            channel: ChannelKey::new(ieta, 12, 3).unwrap(),
            stats: SlotStatistics {
                digi_count: 42,
                mean_time: mean,
                mean_time_error: 0.12345,
                rms_time: 1.23456,
                median_time: Some(mean),
                median_time_error: 0.577,
                ts2_fraction: Measurement::default(),
                ts4_fraction: Measurement::default(),
                total_charge: Measurement::default(),
            },
            correction_ns: 81.0 - mean,
            pull: (81.0 - mean) / 0.12345,
            adjustment,
        }
    }

    #[test]
    fn test_exact_layout() {
        let mut buffer = Vec::new();
        ReportWriter::new()
            .write(&mut buffer, &[record(-17, 79.4567, 3)])
            .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "nDigis,iEta,iPhi,Depth,Mean TDC time[ns], TDC time RMS[ns], Uncertainty,Adjustment[ns],Adjustment[phase units]"
        );
        assert_eq!(lines.next().unwrap(), "42,-17,12,3,79.46,1.23,0.123,1.5,3");
        assert!(lines.next().is_none());
        assert_eq!(ReportWriter::header(), text.lines().next().unwrap());
    }

    #[test]
    fn test_read_back() {
        let records = [record(20, 82.3, -3), record(21, 80.95, 0)];
        let mut buffer = Vec::new();
        let writer = ReportWriter::new();
        writer.write(&mut buffer, &records).unwrap();
        let rows = writer.read(buffer.as_slice()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ieta, 20);
        assert_eq!(rows[0].adjustment, -3);
        assert_relative_eq!(rows[0].mean_time, 82.3);
        assert_relative_eq!(rows[0].adjustment_ns, -1.3);
        assert_eq!(rows[1].adjustment, 0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let writer = ReportWriter::new();
        assert!(matches!(
            writer.read("a,b,c\n1,2,3\n".as_bytes()),
            Err(Error::Header(_))
        ));

        let bad = format!("{}\n42,-17,12,3,abc,1.23,0.123,1.5,3\n", ReportWriter::header());
        assert!(matches!(
            writer.read(bad.as_bytes()),
            Err(Error::InvalidRow { row: 2, .. })
        ));

        let short = format!("{}\n42,-17\n", ReportWriter::header());
        assert!(matches!(
            writer.read(short.as_bytes()),
            Err(Error::InvalidRow { row: 2, .. })
        ));
    }
}

//! End-to-end timing calibration run
//!
//! Pedestals are loaded once; events are pulled from an [`EventSource`] in
//! batches, reduced and filled; the accumulator is aggregated once the
//! source is exhausted, then summarized into per-channel corrections.

use hcal_aggregate::{AggregationEngine, AggregationReport, DistributionStore, HistogramAccumulator};
use hcal_core::CalibrationConfig;
use hcal_digi::{DigiReducer, EventRecord, EventSource, PedestalTable, ReducerDiagnostics};
use hcal_summary::{
    Profile, ProfileBuilder, ReportWriter, Result, SummaryRecord, SummaryStatsEngine,
};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Events reduced and filled together
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// File name of the persisted distributions inside an output directory
pub const DISTRIBUTIONS_FILE: &str = "timing_distributions.json";

/// File name of the correction table inside an output directory
pub fn correction_table_name(config: &CalibrationConfig) -> String {
    format!("corrections_fC{}.csv", config.measurement_bin.index())
}

/// Counters of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub events: u64,
    pub diagnostics: ReducerDiagnostics,
    pub aggregation: AggregationReport,
    /// Distributions in the persisted store
    pub distributions_written: usize,
    pub channels_summarized: usize,
    pub channels_adjusted: usize,
}

/// Everything a run produces
#[derive(Debug)]
pub struct PipelineOutput {
    pub config: CalibrationConfig,
    pub accumulator: HistogramAccumulator,
    pub records: Vec<SummaryRecord>,
    pub summary: RunSummary,
}

impl PipelineOutput {
    pub fn store(&self) -> DistributionStore {
        DistributionStore::from_accumulator(&self.accumulator)
    }

    /// Non-empty eta and phi profiles at the measurement charge bin
    pub fn profiles(&self) -> Result<Vec<Profile>> {
        ProfileBuilder::new(self.config.target_time_ns)
            .all_profiles(&self.accumulator, self.config.measurement_bin)
    }
}

/// Drives pedestal lookup, reduction, fill, aggregation and summary
#[derive(Debug, Clone)]
pub struct TimingPipeline {
    config: CalibrationConfig,
    pedestals: PedestalTable,
    batch_size: usize,
}

impl TimingPipeline {
    pub fn new(config: CalibrationConfig, pedestals: PedestalTable) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pedestals,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Pipeline using the pedestal table of `run` under `dir`
    pub fn for_run(config: CalibrationConfig, dir: impl AsRef<Path>, run: u32) -> Result<Self> {
        let pedestals = PedestalTable::load(dir, run)?;
        Self::new(config, pedestals)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn pedestals(&self) -> &PedestalTable {
        &self.pedestals
    }

    /// Reduce and fill every event of `source`
    ///
    /// Returns the still-raw accumulator with the reducer counters.
    #[instrument(skip_all, fields(batch = self.batch_size))]
    pub fn accumulate<S>(&self, source: &mut S) -> Result<(HistogramAccumulator, ReducerDiagnostics)>
    where
        S: EventSource + ?Sized,
    {
        let reducer = DigiReducer::new(&self.pedestals, self.config.thresholds);
        let mut acc = HistogramAccumulator::new()?;
        let mut diagnostics = ReducerDiagnostics::default();
        let mut batch: Vec<EventRecord> = Vec::with_capacity(self.batch_size);
        let interval = self.config.progress_interval.max(1);
        let mut seen: u64 = 0;

        loop {
            let next = source.next_event()?;
            let exhausted = next.is_none();
            if let Some(event) = next {
                if seen % interval == 0 {
                    info!(event = seen, "Processing");
                }
                seen += 1;
                batch.push(event);
            }

            if batch.len() >= self.batch_size || (exhausted && !batch.is_empty()) {
                let reduced = reducer.reduce_events(&batch)?;
                for event in &reduced {
                    diagnostics.merge(&event.diagnostics);
                }
                acc.fill_events(&reduced)?;
                debug!(events = batch.len(), "Batch filled");
                batch.clear();
            }
            if exhausted {
                break;
            }
        }

        info!(
            events = acc.events(),
            digis = diagnostics.digis_seen,
            accepted = diagnostics.accepted(),
            missing_pedestals = diagnostics.missing_pedestals,
            "Event loop finished"
        );
        Ok((acc, diagnostics))
    }

    /// Full run without writing anything
    #[instrument(skip_all)]
    pub fn run<S>(&self, source: &mut S) -> Result<PipelineOutput>
    where
        S: EventSource + ?Sized,
    {
        let (mut accumulator, diagnostics) = self.accumulate(source)?;
        let aggregation = AggregationEngine::new().run(&mut accumulator)?;
        let records = SummaryStatsEngine::new(self.config.clone())?.summarize(&accumulator)?;

        let summary = RunSummary {
            events: accumulator.events(),
            diagnostics,
            aggregation,
            distributions_written: 0,
            channels_summarized: records.len(),
            channels_adjusted: records.iter().filter(|r| r.adjustment != 0).count(),
        };
        Ok(PipelineOutput {
            config: self.config.clone(),
            accumulator,
            records,
            summary,
        })
    }

    /// Full run writing the distribution store and the correction table
    /// into `out_dir`
    pub fn run_to_dir<S>(&self, source: &mut S, out_dir: impl AsRef<Path>) -> Result<RunSummary>
    where
        S: EventSource + ?Sized,
    {
        let out_dir = out_dir.as_ref();
        std::fs::create_dir_all(out_dir)?;

        let mut output = self.run(source)?;
        let store = output.store();
        store.save(out_dir.join(DISTRIBUTIONS_FILE))?;
        ReportWriter::new().save(out_dir.join(correction_table_name(&self.config)), &output.records)?;

        output.summary.distributions_written = store.len();
        info!(
            events = output.summary.events,
            channels = output.summary.channels_summarized,
            adjusted = output.summary.channels_adjusted,
            distributions = store.len(),
            "Run complete"
        );
        Ok(output.summary)
    }
}

use std::io::{self, Write};

use crate::config::{MealDetectorConfig, RowAlignment};
use crate::error::{ConfigError, FilterError, PipelineError};
use crate::filters::{FilterStep, MealUkf};
use crate::output::{ResultTableWriter, TraceWriter};
use crate::types::{ResultRow, RunSummary};

const PROGRESS_EVERY: usize = 1000;

/// Single pass over a CGM series, one result row per sample.
pub struct MealDetector<'a> {
    ukf: MealUkf<'a>,
    alignment: RowAlignment,
    sample_count: usize,
}

impl<'a> MealDetector<'a> {
    pub fn new(config: &'a MealDetectorConfig, samples: &'a [f64]) -> Result<Self, ConfigError> {
        let ukf = MealUkf::new(config, samples)?;
        log::debug!(
            "UT weights: mu={} gamma={} mean={:?} cov={:?}",
            ukf.weights().mu,
            ukf.weights().gamma,
            ukf.weights().weights_mean.to_vec(),
            ukf.weights().weights_cov.to_vec()
        );
        Ok(Self {
            ukf,
            alignment: config.variants.row_alignment,
            sample_count: samples.len(),
        })
    }

    pub fn ukf(&self) -> &MealUkf<'a> {
        &self.ukf
    }

    /// Filter evaluation behind result row `row`.
    pub fn step(&self, row: usize) -> Result<FilterStep, FilterError> {
        self.ukf.evaluate(self.alignment.filter_index(row))
    }

    pub fn run<W: Write>(
        &self,
        table: &mut ResultTableWriter<W>,
    ) -> Result<RunSummary, PipelineError> {
        self.run_inner::<W, io::Sink>(table, None)
    }

    pub fn run_with_trace<W: Write, T: Write>(
        &self,
        table: &mut ResultTableWriter<W>,
        trace: &mut TraceWriter<T>,
    ) -> Result<RunSummary, PipelineError> {
        self.run_inner(table, Some(trace))
    }

    fn run_inner<W: Write, T: Write>(
        &self,
        table: &mut ResultTableWriter<W>,
        mut trace: Option<&mut TraceWriter<T>>,
    ) -> Result<RunSummary, PipelineError> {
        log::info!("Evaluating {} samples ({:?} rows)", self.sample_count, self.alignment);

        let mut summary = RunSummary::default();
        for row in 0..self.sample_count {
            let step = match self.step(row) {
                Ok(step) => step,
                Err(source) => {
                    log::warn!("Aborting after {} rows: {}", summary.rows_written, source);
                    table.flush()?;
                    if let Some(trace) = trace.as_mut() {
                        trace.flush()?;
                    }
                    return Err(PipelineError::Filter { row, source });
                }
            };

            let result = ResultRow {
                index: row,
                value: step.updated_covariance,
            };
            table.write_row(&result)?;
            if let Some(trace) = trace.as_mut() {
                trace.write_step(&step)?;
            }
            summary.record(&result);

            if (row + 1) % PROGRESS_EVERY == 0 {
                log::debug!("{} / {} rows", row + 1, self.sample_count);
            }
        }

        table.flush()?;
        if let Some(trace) = trace.as_mut() {
            trace.flush()?;
        }

        log::info!(
            "Wrote {} rows (min {:?}, max {:?} at row {:?})",
            summary.rows_written,
            summary.min_covariance,
            summary.max_covariance,
            summary.max_index
        );
        Ok(summary)
    }
}

//! End-to-end sequencing of a sensor CSV.
//!
//! ```text
//! CSV ──▶ load ──▶ preprocess ──▶ select length ──▶ make windows ──▶ export
//! ```

use crate::audit::SharedAuditLog;
use crate::config::Config;
use crate::core::{make_windows, LengthSelection, SequenceError, WindowSet};
use crate::export::{export_windows, ExportError, ExportSummary};
use crate::preprocess::{PreprocessReport, Preprocessor};
use crate::table::{load_csv, RawTable, TableError, TimeSeriesTable};
use std::path::Path;

/// Everything produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The table the windows were cut from
    pub table: TimeSeriesTable,
    /// Preprocessing record, absent when preprocessing was skipped
    pub report: Option<PreprocessReport>,
    /// Length selection, absent when the length was given explicitly
    pub selection: Option<LengthSelection>,
    pub windows: WindowSet,
}

/// Loads, cleans and sequences sensor tables according to a [`Config`].
pub struct SequencePipeline {
    config: Config,
    audit: SharedAuditLog,
    preprocess: bool,
}

impl SequencePipeline {
    pub fn new(config: Config, audit: SharedAuditLog) -> Self {
        Self {
            config,
            audit,
            preprocess: true,
        }
    }

    /// Skip preprocessing and sequence the table as loaded.
    pub fn without_preprocessing(mut self) -> Self {
        self.preprocess = false;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load a CSV file and turn it into a validated table.
    pub fn load_table<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(TimeSeriesTable, Option<PreprocessReport>), PipelineError> {
        let raw = load_csv(path.as_ref())?;
        self.audit.record_rows_loaded(raw.row_count() as u64);
        tracing::info!(
            path = %path.as_ref().display(),
            rows = raw.row_count(),
            columns = raw.columns.len(),
            "table loaded"
        );
        self.prepare(raw)
    }

    /// Turn an already-loaded raw table into a validated table.
    pub fn prepare(
        &self,
        raw: RawTable,
    ) -> Result<(TimeSeriesTable, Option<PreprocessReport>), PipelineError> {
        if !self.preprocess {
            return Ok((raw.into_table()?, None));
        }

        let preprocessor =
            Preprocessor::new(self.config.preprocess.clone()).with_audit_log(self.audit.clone());
        let (table, report) = preprocessor.run(raw)?;
        Ok((table, Some(report)))
    }

    /// Select a length (unless one is given) and build windows over `table`.
    pub fn sequence(
        &self,
        table: &TimeSeriesTable,
        length: Option<usize>,
    ) -> Result<(Option<LengthSelection>, WindowSet), PipelineError> {
        let (selection, length) = match length {
            Some(length) => (None, length),
            None => {
                let selection = self.config.length.resolve(table.row_count())?;
                tracing::info!(
                    candidate = selection.candidate,
                    lower = selection.lower,
                    upper = selection.upper,
                    length = selection.length,
                    "sequence length selected"
                );
                (Some(selection), selection.length)
            }
        };

        let windows = make_windows(table, length)?;
        self.audit.record_windows_built(windows.len() as u64);
        tracing::info!(windows = windows.len(), length, "windows built");

        Ok((selection, windows))
    }

    /// Load, clean and sequence a CSV file.
    pub fn run<P: AsRef<Path>>(
        &self,
        path: P,
        length: Option<usize>,
    ) -> Result<PipelineOutput, PipelineError> {
        let (table, report) = self.load_table(path)?;
        let (selection, windows) = self.sequence(&table, length)?;
        Ok(PipelineOutput {
            table,
            report,
            selection,
            windows,
        })
    }

    /// Export the windows of a run into `dir`.
    pub fn export<P: AsRef<Path>>(
        &self,
        output: &PipelineOutput,
        dir: P,
    ) -> Result<ExportSummary, PipelineError> {
        let summary = export_windows(&output.windows, dir)?;
        self.audit.record_export();
        Ok(summary)
    }
}

/// Pipeline errors.
#[derive(Debug)]
pub enum PipelineError {
    Table(TableError),
    Sequence(SequenceError),
    Export(ExportError),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Table(e) => write!(f, "Table error: {e}"),
            PipelineError::Sequence(e) => write!(f, "Sequence error: {e}"),
            PipelineError::Export(e) => write!(f, "Export error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Table(e) => Some(e),
            PipelineError::Sequence(e) => Some(e),
            PipelineError::Export(e) => Some(e),
        }
    }
}

impl From<TableError> for PipelineError {
    fn from(e: TableError) -> Self {
        PipelineError::Table(e)
    }
}

impl From<SequenceError> for PipelineError {
    fn from(e: SequenceError) -> Self {
        PipelineError::Sequence(e)
    }
}

impl From<ExportError> for PipelineError {
    fn from(e: ExportError) -> Self {
        PipelineError::Export(e)
    }
}

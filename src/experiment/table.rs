//! Result Table - rows accumulated across a sweep
//!
//! The table lives in memory for the whole sweep and is written once, at
//! the end, alongside a JSON sidecar of [`TrialRecord`]s.

use std::path::{Path, PathBuf};

use tracing::info;

use super::result_row::{ResultRow, CELL_SEPARATOR};
use super::trial_record::TrialRecord;
use crate::config::paths::RESULTS_FILE_NAME;
use crate::Result;

/// JSON sidecar holding per-trial provenance.
pub const RECORDS_FILE_NAME: &str = "dpdk_perf_results.json";

/// Header, rows, and their trial records.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    header: Vec<String>,
    rows: Vec<ResultRow>,
    records: Vec<TrialRecord>,
}

impl ResultTable {
    /// Create an empty table with the given column names.
    #[must_use]
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            records: Vec::new(),
        }
    }

    /// True when no rows have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Column names.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Rows in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Trial records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Append a row and its provenance.
    pub fn push(&mut self, row: ResultRow, record: TrialRecord) {
        self.rows.push(row);
        self.records.push(record);
    }

    /// Header line followed by one line per row, each newline-terminated.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.header.join(CELL_SEPARATOR);
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.render());
            out.push('\n');
        }
        out
    }

    /// Write the table and the JSON sidecar into `dir`, creating it if needed.
    ///
    /// Returns the path of the table file.
    ///
    /// # Errors
    ///
    /// Returns an IO or JSON error if either file cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let table_path = dir.join(RESULTS_FILE_NAME);
        std::fs::write(&table_path, self.render())?;

        let records_path = dir.join(RECORDS_FILE_NAME);
        let json = serde_json::to_string_pretty(&self.records)?;
        std::fs::write(&records_path, json)?;

        info!(
            rows = self.rows.len(),
            table = %table_path.display(),
            records = %records_path.display(),
            "results written"
        );
        Ok(table_path)
    }
}

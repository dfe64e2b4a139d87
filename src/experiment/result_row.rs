//! One line of the result table

use std::fmt;

use serde::{Deserialize, Serialize};

use super::trial_id::TrialId;

/// Cell separator in the result table.
pub const CELL_SEPARATOR: &str = ", ";

/// Trial id followed by ordered cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    trial_id: TrialId,
    cells: Vec<String>,
}

impl ResultRow {
    /// Start a row for `trial_id` with no cells.
    #[must_use]
    pub const fn new(trial_id: TrialId) -> Self {
        Self {
            trial_id,
            cells: Vec::new(),
        }
    }

    /// Append one cell.
    pub fn push(&mut self, cell: impl fmt::Display) {
        self.cells.push(cell.to_string());
    }

    /// Append one cell, builder style.
    #[must_use]
    pub fn with(mut self, cell: impl fmt::Display) -> Self {
        self.push(cell);
        self
    }

    /// Trial that produced the row.
    #[must_use]
    pub const fn trial_id(&self) -> &TrialId {
        &self.trial_id
    }

    /// Cells after the trial id.
    #[must_use]
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Number of columns including the id.
    #[must_use]
    pub fn width(&self) -> usize {
        self.cells.len() + 1
    }

    /// Comma-and-space joined line, without trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut line = self.trial_id.to_string();
        for cell in &self.cells {
            line.push_str(CELL_SEPARATOR);
            line.push_str(cell);
        }
        line
    }
}

impl fmt::Display for ResultRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

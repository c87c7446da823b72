// ============================================================
// Layer 4 — Markdown Row Preprocessor
// ============================================================
// Markdown tables contain rows with empty sources (blank
// markdown cells) or missing ranks. Those rows carry nothing
// to learn from, so they are dropped before the dataset is
// built.

use serde::Deserialize;

use crate::domain::cell::MarkdownCell;

/// A markdown table row as it appears on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMarkdownRow {
    pub id:       String,
    pub cell_id:  String,
    pub source:   Option<String>,
    pub rank:     Option<f64>,
    pub pct_rank: Option<f64>,
}

impl RawMarkdownRow {
    fn into_cell(self) -> Option<MarkdownCell> {
        Some(MarkdownCell {
            id:       self.id,
            cell_id:  self.cell_id,
            source:   self.source.filter(|s| !s.is_empty())?,
            rank:     self.rank?,
            pct_rank: self.pct_rank?,
        })
    }
}

/// Keep only rows where every field is present.
pub fn drop_incomplete(rows: Vec<RawMarkdownRow>) -> Vec<MarkdownCell> {
    let total = rows.len();
    let cells: Vec<MarkdownCell> = rows.into_iter().filter_map(RawMarkdownRow::into_cell).collect();
    if cells.len() < total {
        tracing::debug!("Dropped {} incomplete markdown rows", total - cells.len());
    }
    cells
}

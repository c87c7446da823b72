// ============================================================
// Layer 3 — Notebook Cell Types
// ============================================================
// A notebook is an ordered list of cells. Each cell is either
// code or markdown and has a position ("rank") in the notebook.
//
// Code cells keep their true relative order at inference time;
// only markdown cells have to be placed by the model.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The two kinds of notebook cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Code,
    Markdown,
}

/// One row of the validation cell table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Notebook id
    pub id:        String,
    pub cell_id:   String,
    pub cell_type: CellType,
    /// Absolute position of the cell in its notebook
    pub rank:      f64,
}

/// A markdown cell with its text and normalised target rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownCell {
    pub id:       String,
    pub cell_id:  String,
    pub source:   String,
    pub rank:     f64,
    /// Position in the notebook divided by the number of cells, in [0, 1]
    pub pct_rank: f64,
}

/// Context features precomputed for every notebook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotebookFeatures {
    /// Sampled code cell sources, in notebook order
    pub codes:      Vec<String>,
    pub total_code: usize,
    pub total_md:   usize,
}

impl NotebookFeatures {
    /// Fraction of markdown cells in the notebook, 0 for an empty notebook.
    pub fn markdown_fraction(&self) -> f32 {
        let total = self.total_md + self.total_code;
        if total == 0 {
            0.0
        } else {
            self.total_md as f32 / total as f32
        }
    }
}

/// Feature lookup keyed by notebook id.
pub type FeatureTable = HashMap<String, NotebookFeatures>;

/// Ground-truth cell order keyed by notebook id.
pub type NotebookOrders = HashMap<String, Vec<String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_fraction_of_mixed_notebook() {
        let fts = NotebookFeatures { codes: vec![], total_code: 3, total_md: 1 };
        assert!((fts.markdown_fraction() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn markdown_fraction_of_empty_notebook_is_zero() {
        assert_eq!(NotebookFeatures::default().markdown_fraction(), 0.0);
    }

    #[test]
    fn cell_type_parses_lowercase() {
        let t: CellType = serde_json::from_str("\"markdown\"").unwrap();
        assert_eq!(t, CellType::Markdown);
        let t: CellType = serde_json::from_str("\"code\"").unwrap();
        assert_eq!(t, CellType::Code);
    }
}

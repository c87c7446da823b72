// ============================================================
// Layer 3 — Rank Merging
// ============================================================
// Turns per-cell predictions into a predicted notebook order:
//
//   1. Every cell gets a baseline percentile rank within its
//      (notebook, cell type) group. For code cells this is the
//      ground-truth relative position.
//   2. Markdown cells replace the baseline with the model output.
//   3. Each notebook is sorted by the merged rank.

use anyhow::{bail, Result};
use std::collections::HashMap;

use crate::domain::cell::{Cell, CellType};

/// Percentile rank of every value, averaging ties.
///
/// Matches the usual `rank(pct=True)` definition: the 1-based
/// average rank divided by the number of values.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // positions i..=j share the average of ranks i+1..=j+1
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg / n as f64;
        }
        i = j + 1;
    }
    ranks
}

/// Baseline rank of each cell within its (notebook, cell type) group.
pub fn baseline_ranks(cells: &[Cell]) -> Vec<f64> {
    let mut groups: HashMap<(&str, CellType), Vec<usize>> = HashMap::new();
    for (i, cell) in cells.iter().enumerate() {
        groups.entry((cell.id.as_str(), cell.cell_type)).or_default().push(i);
    }

    let mut out = vec![0.0; cells.len()];
    for members in groups.values() {
        let values: Vec<f64> = members.iter().map(|&i| cells[i].rank).collect();
        for (&i, pct) in members.iter().zip(percentile_ranks(&values)) {
            out[i] = pct;
        }
    }
    out
}

/// Merge baseline ranks with markdown predictions keyed by
/// (notebook id, cell id).
pub fn merge_predictions(
    cells:       &[Cell],
    predictions: &HashMap<(String, String), f32>,
) -> Result<Vec<f64>> {
    let mut merged = baseline_ranks(cells);
    for (i, cell) in cells.iter().enumerate() {
        if cell.cell_type != CellType::Markdown {
            continue;
        }
        let key = (cell.id.clone(), cell.cell_id.clone());
        match predictions.get(&key) {
            Some(&pred) => merged[i] = pred as f64,
            None => bail!(
                "no prediction for markdown cell '{}' of notebook '{}'",
                cell.cell_id,
                cell.id
            ),
        }
    }
    Ok(merged)
}

/// Predicted cell-id order of every notebook, sorted by merged rank.
///
/// The sort is stable, so cells with equal ranks keep table order.
pub fn predicted_orders(cells: &[Cell], merged: &[f64]) -> Vec<(String, Vec<String>)> {
    let mut by_notebook: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut notebook_ids: Vec<&str> = Vec::new();
    for (i, cell) in cells.iter().enumerate() {
        let entry = by_notebook.entry(cell.id.as_str()).or_insert_with(|| {
            notebook_ids.push(cell.id.as_str());
            Vec::new()
        });
        entry.push(i);
    }

    notebook_ids.sort_unstable();
    notebook_ids
        .into_iter()
        .map(|id| {
            let mut members = by_notebook.remove(id).unwrap_or_default();
            members.sort_by(|&a, &b| merged[a].total_cmp(&merged[b]));
            let order = members.iter().map(|&i| cells[i].cell_id.clone()).collect();
            (id.to_string(), order)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(id: &str, cell_id: &str, cell_type: CellType, rank: f64) -> Cell {
        Cell { id: id.into(), cell_id: cell_id.into(), cell_type, rank }
    }

    #[test]
    fn percentile_ranks_of_distinct_values() {
        let ranks = percentile_ranks(&[30.0, 10.0, 20.0, 40.0]);
        assert_eq!(ranks, vec![0.75, 0.25, 0.5, 1.0]);
    }

    #[test]
    fn percentile_ranks_average_ties() {
        let ranks = percentile_ranks(&[1.0, 1.0, 2.0]);
        assert_eq!(ranks, vec![0.5, 0.5, 1.0]);
    }

    #[test]
    fn percentile_ranks_of_nothing() {
        assert!(percentile_ranks(&[]).is_empty());
    }

    #[test]
    fn baseline_is_per_notebook_and_type() {
        let cells = vec![
            cell("nb1", "c1", CellType::Code, 0.0),
            cell("nb1", "m1", CellType::Markdown, 1.0),
            cell("nb1", "c2", CellType::Code, 2.0),
            cell("nb2", "c3", CellType::Code, 0.0),
        ];
        assert_eq!(baseline_ranks(&cells), vec![0.5, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn markdown_cells_take_predictions() {
        let cells = vec![
            cell("nb1", "c1", CellType::Code, 0.0),
            cell("nb1", "c2", CellType::Code, 2.0),
            cell("nb1", "m1", CellType::Markdown, 1.0),
        ];
        let mut preds = HashMap::new();
        preds.insert(("nb1".to_string(), "m1".to_string()), 0.1_f32);

        let merged = merge_predictions(&cells, &preds).unwrap();
        assert_eq!(merged[0], 0.5);
        assert_eq!(merged[1], 1.0);
        assert!((merged[2] - 0.1).abs() < 1e-6);

        let orders = predicted_orders(&cells, &merged);
        assert_eq!(orders, vec![("nb1".to_string(), vec!["m1".into(), "c1".into(), "c2".into()])]);
    }

    #[test]
    fn missing_markdown_prediction_is_an_error() {
        let cells = vec![cell("nb1", "m1", CellType::Markdown, 0.0)];
        assert!(merge_predictions(&cells, &HashMap::new()).is_err());
    }

    #[test]
    fn predicted_orders_group_by_notebook() {
        let cells = vec![
            cell("b", "x2", CellType::Code, 1.0),
            cell("a", "y1", CellType::Code, 0.0),
            cell("b", "x1", CellType::Code, 0.0),
        ];
        let merged = baseline_ranks(&cells);
        let orders = predicted_orders(&cells, &merged);
        assert_eq!(orders[0], ("a".to_string(), vec!["y1".to_string()]));
        assert_eq!(orders[1], ("b".to_string(), vec!["x1".to_string(), "x2".to_string()]));
    }
}

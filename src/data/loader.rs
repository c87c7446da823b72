// ============================================================
// Layer 4 — Table Loader
// ============================================================
// Reads the precomputed inputs of a training run:
//
//   *_mark.csv     markdown cells   (id, cell_id, source, rank, pct_rank, ...)
//   val.csv        every val cell   (id, cell_id, cell_type, rank, ...)
//   *_fts.json     notebook id → { codes, total_code, total_md }
//   train_orders   notebook id → whitespace separated cell ids
//
// Columns that are not needed (parent_id, ancestor_id, ...) are
// ignored. Any unreadable file or malformed row is fatal.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs::File, io::BufReader, path::Path};

use crate::data::preprocessor::{drop_incomplete, RawMarkdownRow};
use crate::domain::cell::{Cell, FeatureTable, MarkdownCell, NotebookOrders};

/// Load the markdown cell table, dropping incomplete rows.
pub fn read_markdown_cells(path: &Path) -> Result<Vec<MarkdownCell>> {
    let rows: Vec<RawMarkdownRow> = read_csv(path)?;
    let total = rows.len();
    let cells = drop_incomplete(rows);
    tracing::info!(
        "Loaded {} markdown cells from '{}' ({} incomplete rows dropped)",
        cells.len(),
        path.display(),
        total - cells.len()
    );
    Ok(cells)
}

/// Load the full validation cell table (code and markdown).
pub fn read_cells(path: &Path) -> Result<Vec<Cell>> {
    let cells: Vec<Cell> = read_csv(path)?;
    tracing::info!("Loaded {} cells from '{}'", cells.len(), path.display());
    Ok(cells)
}

/// Load the per-notebook feature document.
pub fn read_features(path: &Path) -> Result<FeatureTable> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open features '{}'", path.display()))?;
    let table: FeatureTable = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Malformed features document '{}'", path.display()))?;
    tracing::info!("Loaded features for {} notebooks", table.len());
    Ok(table)
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    id:         String,
    cell_order: String,
}

/// Load the ground-truth order table.
pub fn read_orders(path: &Path) -> Result<NotebookOrders> {
    let rows: Vec<OrderRow> = read_csv(path)?;
    let orders: NotebookOrders = rows
        .into_iter()
        .map(|row| {
            let ids = row.cell_order.split_whitespace().map(str::to_string).collect();
            (row.id, ids)
        })
        .collect();
    tracing::info!("Loaded ground-truth orders for {} notebooks", orders.len());
    Ok(orders)
}

fn read_csv<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;

    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| {
            // +2: one for the header, one for 1-based line numbers
            row.with_context(|| format!("Malformed row {} in '{}'", i + 2, path.display()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::CellType;
    use std::io::Write;

    fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn markdown_table_drops_incomplete_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "mark.csv",
            "id,cell_id,cell_type,source,rank,pct_rank,parent_id\n\
             nb1,m1,markdown,# Title,0,0.0,p\n\
             nb1,m2,markdown,,2,0.5,p\n\
             nb2,m3,markdown,Notes,1,1.0,\n",
        );

        let cells = read_markdown_cells(&path).unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].source, "# Title");
        assert_eq!(cells[1].cell_id, "m3");
        assert_eq!(cells[1].pct_rank, 1.0);
    }

    #[test]
    fn reads_cells_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        let cells = write(
            dir.path(),
            "val.csv",
            "id,cell_id,cell_type,rank\nnb1,c1,code,0\nnb1,m1,markdown,1\n",
        );
        let orders = write(dir.path(), "orders.csv", "id,cell_order\nnb1,c1 m1\n");

        let cells = read_cells(&cells).unwrap();
        assert_eq!(cells[1].cell_type, CellType::Markdown);

        let orders = read_orders(&orders).unwrap();
        assert_eq!(orders["nb1"], vec!["c1".to_string(), "m1".to_string()]);
    }

    #[test]
    fn reads_features() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "fts.json",
            r#"{"nb1": {"codes": ["import os"], "total_code": 1, "total_md": 2}}"#,
        );
        let table = read_features(&path).unwrap();
        assert_eq!(table["nb1"].codes, vec!["import os".to_string()]);
        assert_eq!(table["nb1"].total_md, 2);
    }

    #[test]
    fn malformed_rows_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "val.csv", "id,cell_id,cell_type,rank\nnb1,c1,table,0\n");
        let err = read_cells(&path).unwrap_err();
        assert!(format!("{err:#}").contains("row 2"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_cells(Path::new("/nonexistent/val.csv")).is_err());
    }
}

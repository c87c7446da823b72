// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per finished epoch to {out}/metrics.csv:
//
//   fold,epoch,train_loss,lr,optimizer_steps,skipped_steps
//   0,0,0.2134,2.9e-5,12,0
//
// `skipped_steps` counts accumulation windows whose loss was not
// finite and whose update was therefore dropped. The header is
// written only while the file is empty, so rows from several runs
// into one directory accumulate.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub fold:            usize,
    /// Starts at 0, like the checkpoint names
    pub epoch:           usize,
    /// Mean L1 loss over the epoch's batches
    pub train_loss:      f64,
    /// Learning rate after the epoch's last update
    pub lr:              f64,
    pub optimizer_steps: usize,
    pub skipped_steps:   usize,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        let is_new = file.metadata()?.len() == 0;

        let mut w = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
        w.serialize(m)
            .with_context(|| format!("Cannot write to '{}'", self.csv_path.display()))?;
        w.flush()?;

        tracing::debug!("Logged fold {} epoch {}: train_loss={:.4}", m.fold, m.epoch, m.train_loss);
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn row(epoch: usize) -> EpochMetrics {
        EpochMetrics {
            fold: 1,
            epoch,
            train_loss: 0.25,
            lr: 3e-5,
            optimizer_steps: 4,
            skipped_steps: 0,
        }
    }

    #[test]
    fn header_once_then_one_row_per_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&row(0)).unwrap();
        logger.log(&row(1)).unwrap();

        // A second logger on the same directory must not repeat the header.
        MetricsLogger::new(dir.path()).unwrap().log(&row(2)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "fold,epoch,train_loss,lr,optimizer_steps,skipped_steps");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("1,0,0.25,"));
        assert!(lines[3].starts_with("1,2,"));
        assert!(lines[1].ends_with(",4,0"));

        let rows: Vec<EpochMetrics> = csv::Reader::from_path(logger.csv_path())
            .unwrap()
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows, vec![row(0), row(1), row(2)]);
    }
}

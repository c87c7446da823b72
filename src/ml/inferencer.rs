// ============================================================
// Layer 5 — Validation Inference
// ============================================================
// Runs the trained model over the whole validation set and puts
// every prediction back at its sample position:
//
//   model.valid()            (no autodiff, dropout disabled)
//       │
//       ▼
//   loader (n_workers)  →  batches in any order
//       │
//       ▼
//   preds[position] = model(batch)
//
// The caller then merges these with the code-cell ranks and
// scores the resulting orderings.

use anyhow::{anyhow, Result};
use burn::data::dataset::Dataset;
use burn::prelude::*;
use std::collections::HashMap;

use crate::data::dataset::{BatchedDataset, MarkdownDataset};
use crate::ml::model::MarkdownRanker;
use crate::ml::trainer::{batch_loader, progress_bar};

/// Predicted rank of every sample, indexed by sample position.
pub fn predict<B: Backend>(
    model:      &MarkdownRanker<B>,
    dataset:    &MarkdownDataset,
    batch_size: usize,
    n_workers:  usize,
    device:     &B::Device,
) -> Result<Vec<f32>> {
    let batches = BatchedDataset::new(dataset.clone(), batch_size, false)?;
    let mut preds: Vec<Option<f32>> = vec![None; batches.num_samples()];
    let pb      = progress_bar(batches.len())?;
    let loader  = batch_loader::<B>(batches, n_workers, device.clone());

    for batch in loader.iter() {
        let output = model.forward(batch.input_ids, batch.attention_mask, batch.fts);
        let values: Vec<f32> = output
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow!("Cannot read predictions: {e:?}"))?;

        for (&position, value) in batch.positions.iter().zip(values) {
            if let Some(slot) = preds.get_mut(position) {
                *slot = Some(value);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    preds
        .into_iter()
        .enumerate()
        .map(|(i, p)| p.ok_or_else(|| anyhow!("No prediction for validation sample {i}")))
        .collect()
}

/// Key predictions by (notebook id, cell id).
pub fn predictions_by_cell(
    dataset: &MarkdownDataset,
    preds:   &[f32],
) -> Result<HashMap<(String, String), f32>> {
    preds
        .iter()
        .enumerate()
        .map(|(position, &pred)| {
            let cell = dataset
                .cell(position)
                .ok_or_else(|| anyhow!("Prediction {position} has no matching cell"))?;
            Ok(((cell.id.clone(), cell.cell_id.clone()), pred))
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{SampleEncoder, SequenceLimits};
    use crate::domain::cell::{FeatureTable, MarkdownCell, NotebookFeatures};
    use crate::infra::tokenizer_store::write_word_level;
    use crate::ml::model::MarkdownRankerConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn dataset(dir: &std::path::Path) -> MarkdownDataset {
        let tokenizer = write_word_level(dir, &["a", "b"]).unwrap();
        let limits = SequenceLimits { md_max_len: 4, code_max_len: 3, total_max_len: 6 };
        let encoder = SampleEncoder::new(tokenizer, limits).unwrap();
        let cells = ["nb1", "nb1", "nb2", "nb2", "nb2"]
            .iter()
            .enumerate()
            .map(|(i, id)| MarkdownCell {
                id:       id.to_string(),
                cell_id:  format!("m{i}"),
                source:   "a b".into(),
                rank:     0.0,
                pct_rank: 0.5,
            })
            .collect();
        let mut features = FeatureTable::new();
        for id in ["nb1", "nb2"] {
            features.insert(
                id.into(),
                NotebookFeatures { codes: vec!["b".into()], total_code: 1, total_md: 2 },
            );
        }
        MarkdownDataset::new(cells, features, encoder).unwrap()
    }

    #[test]
    fn one_prediction_per_sample_including_the_tail() {
        let dir = tempfile::tempdir().unwrap();
        let data = dataset(dir.path());
        let device = Default::default();
        let model: MarkdownRanker<TestBackend> = MarkdownRankerConfig::new(6, 6)
            .with_d_model(4)
            .with_num_heads(1)
            .with_num_layers(1)
            .with_d_ff(8)
            .with_dropout(0.0)
            .init(&device);

        // batch 2 over 5 samples: the last batch holds one sample
        let preds = predict(&model, &data, 2, 0, &device).unwrap();
        assert_eq!(preds.len(), 5);
        assert!(preds.iter().all(|p| p.is_finite()));

        let keyed = predictions_by_cell(&data, &preds).unwrap();
        assert_eq!(keyed.len(), 5);
        assert_eq!(keyed[&("nb2".to_string(), "m4".to_string())], preds[4]);
    }

    #[test]
    fn more_predictions_than_cells_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let data = dataset(dir.path());
        assert!(predictions_by_cell(&data, &[0.1; 6]).is_err());
    }
}

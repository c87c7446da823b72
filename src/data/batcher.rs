// ============================================================
// Layer 4 — Markdown Batcher
// ============================================================
// Implements Burn's Batcher trait to stack MarkdownSamples into
// tensors on the target device.
//
//   Input:  N samples (one BatchedDataset item), sequences of length S
//   Output: MarkdownBatch with ids/mask [N, S], fts/targets [N, 1]
//
// The loader runs with batch_size 1, so every loader item is one
// pre-grouped batch; the batcher flattens and stacks it.
//
// Sample positions travel with the batch so predictions can be
// put back in dataset order whatever order the workers finish in.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::MarkdownSample;

#[derive(Debug, Clone)]
pub struct MarkdownBatch<B: Backend> {
    /// Dataset position of every row
    pub positions: Vec<usize>,

    /// Token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Markdown fraction of the notebook — shape: [batch_size, 1]
    pub fts: Tensor<B, 2>,

    /// Target ranks — shape: [batch_size, 1]
    pub targets: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct MarkdownBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> MarkdownBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn stack(&self, items: Vec<MarkdownSample>) -> MarkdownBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map_or(0, |s| s.input_ids.len());

        let ids_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();
        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();
        let fts: Vec<f32>     = items.iter().map(|s| s.fts).collect();
        let targets: Vec<f32> = items.iter().map(|s| s.target).collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(ids_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let attention_mask = Tensor::<B, 1, Int>::from_ints(mask_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let fts = Tensor::<B, 1>::from_floats(fts.as_slice(), &self.device)
            .reshape([batch_size, 1]);
        let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), &self.device)
            .reshape([batch_size, 1]);

        MarkdownBatch {
            positions: items.iter().map(|s| s.position).collect(),
            input_ids,
            attention_mask,
            fts,
            targets,
        }
    }
}

impl<B: Backend> Batcher<Vec<MarkdownSample>, MarkdownBatch<B>> for MarkdownBatcher<B> {
    fn batch(&self, items: Vec<Vec<MarkdownSample>>) -> MarkdownBatch<B> {
        self.stack(items.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn sample(position: usize, ids: Vec<u32>, target: f32) -> MarkdownSample {
        let mask = ids.iter().map(|&id| u32::from(id != 0)).collect();
        MarkdownSample { position, input_ids: ids, attention_mask: mask, fts: 0.5, target }
    }

    #[test]
    fn stacks_samples_into_tensors() {
        let batcher = MarkdownBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.stack(vec![
            sample(7, vec![2, 4, 3, 0], 0.1),
            sample(3, vec![2, 5, 6, 3], 0.9),
        ]);

        assert_eq!(batch.positions, vec![7, 3]);
        assert_eq!(batch.input_ids.dims(), [2, 4]);
        assert_eq!(batch.attention_mask.dims(), [2, 4]);
        assert_eq!(batch.fts.dims(), [2, 1]);

        let targets: Vec<f32> = batch.targets.into_data().to_vec().unwrap();
        assert_eq!(targets, vec![0.1, 0.9]);
        let mask: Vec<i64> = batch
            .attention_mask
            .into_data()
            .convert::<i64>()
            .to_vec()
            .unwrap();
        assert_eq!(mask, vec![1, 1, 1, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn batch_flattens_grouped_items() {
        let batcher = MarkdownBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![vec![
            sample(0, vec![2, 4, 3], 0.0),
            sample(1, vec![2, 5, 3], 0.5),
            sample(2, vec![2, 6, 3], 1.0),
        ]]);
        assert_eq!(batch.positions, vec![0, 1, 2]);
        assert_eq!(batch.input_ids.dims(), [3, 3]);
    }
}

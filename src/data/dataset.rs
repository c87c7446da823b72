// ============================================================
// Layer 4 — Markdown Dataset
// ============================================================
// Turns markdown cells into fixed-length token sequences:
//
//   [CLS] markdown [SEP] [PAD].. | [CLS] code₁ [SEP] [PAD].. | [CLS] code₂ ..
//   └──── md_max_len ──────────┘ └──── code_max_len - 1 ────┘
//
// The whole sequence is then cut or padded to total_max_len.
// Each code segment drops its last position so consecutive
// snippets share the budget. The extra scalar feature is the
// fraction of markdown cells in the notebook.
//
// Tokenisation happens in `get`, so the data loader workers do
// it in parallel with the training step.

use anyhow::{anyhow, bail, Result};
use burn::data::dataset::Dataset;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::domain::cell::{FeatureTable, MarkdownCell, NotebookFeatures};
use crate::infra::tokenizer_store::SpecialTokens;

/// One tokenised markdown cell with its target rank.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownSample {
    /// Index of the sample inside its dataset
    pub position:       usize,
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Fraction of markdown cells in the notebook
    pub fts:            f32,
    /// Normalised rank of the cell, in [0, 1]
    pub target:         f32,
}

/// Sequence length budget of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceLimits {
    pub md_max_len:    usize,
    pub code_max_len:  usize,
    pub total_max_len: usize,
}

/// Builds samples from cells; shared by every loader worker.
#[derive(Clone)]
pub struct SampleEncoder {
    tokenizer: Arc<Tokenizer>,
    special:   SpecialTokens,
    limits:    SequenceLimits,
}

impl SampleEncoder {
    pub fn new(tokenizer: Tokenizer, limits: SequenceLimits) -> Result<Self> {
        if limits.md_max_len < 2 || limits.code_max_len < 2 {
            bail!("segment lengths must leave room for [CLS] and [SEP]");
        }
        let special = SpecialTokens::from_tokenizer(&tokenizer)?;
        Ok(Self { tokenizer: Arc::new(tokenizer), special, limits })
    }

    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    /// `[CLS] tokens [SEP]` padded to exactly `max_len`.
    fn encode_segment(&self, text: &str, max_len: usize) -> Result<(Vec<u32>, Vec<u32>)> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        let tokens = enc.get_ids();
        let body = &tokens[..tokens.len().min(max_len - 2)];

        let mut ids = Vec::with_capacity(max_len);
        ids.push(self.special.cls);
        ids.extend_from_slice(body);
        ids.push(self.special.sep);
        let mut mask = vec![1u32; ids.len()];

        ids.resize(max_len, self.special.pad);
        mask.resize(max_len, 0);
        Ok((ids, mask))
    }

    pub fn encode(
        &self,
        position: usize,
        cell:     &MarkdownCell,
        features: &NotebookFeatures,
    ) -> Result<MarkdownSample> {
        let limits = self.limits;
        let (mut input_ids, mut attention_mask) =
            self.encode_segment(&cell.source, limits.md_max_len)?;

        for code in &features.codes {
            if input_ids.len() >= limits.total_max_len {
                break;
            }
            let (ids, mask) = self.encode_segment(code, limits.code_max_len)?;
            input_ids.extend_from_slice(&ids[..ids.len() - 1]);
            attention_mask.extend_from_slice(&mask[..mask.len() - 1]);
        }

        input_ids.truncate(limits.total_max_len);
        attention_mask.truncate(limits.total_max_len);
        input_ids.resize(limits.total_max_len, self.special.pad);
        attention_mask.resize(limits.total_max_len, 0);

        Ok(MarkdownSample {
            position,
            input_ids,
            attention_mask,
            fts:    features.markdown_fraction(),
            target: cell.pct_rank as f32,
        })
    }
}

/// Markdown cells of one split, exposed through Burn's Dataset trait.
#[derive(Clone)]
pub struct MarkdownDataset {
    cells:    Arc<Vec<MarkdownCell>>,
    features: Arc<FeatureTable>,
    encoder:  SampleEncoder,
    /// Rows of `cells` visible through this dataset
    indices:  Vec<usize>,
}

impl MarkdownDataset {
    /// Every cell must have an entry in the feature table.
    pub fn new(
        cells:    Vec<MarkdownCell>,
        features: FeatureTable,
        encoder:  SampleEncoder,
    ) -> Result<Self> {
        if let Some(cell) = cells.iter().find(|c| !features.contains_key(&c.id)) {
            bail!("notebook '{}' has no features (cell '{}')", cell.id, cell.cell_id);
        }
        let indices = (0..cells.len()).collect();
        Ok(Self {
            cells: Arc::new(cells),
            features: Arc::new(features),
            encoder,
            indices,
        })
    }

    /// A view over the given rows of this dataset.
    pub fn subset(&self, rows: &[usize]) -> Self {
        Self {
            cells:    Arc::clone(&self.cells),
            features: Arc::clone(&self.features),
            encoder:  self.encoder.clone(),
            indices:  rows.iter().map(|&r| self.indices[r]).collect(),
        }
    }

    /// The cell behind a sample position.
    pub fn cell(&self, position: usize) -> Option<&MarkdownCell> {
        self.indices.get(position).map(|&row| &self.cells[row])
    }
}

impl Dataset<MarkdownSample> for MarkdownDataset {
    fn get(&self, index: usize) -> Option<MarkdownSample> {
        let cell = self.cell(index)?;
        let features = self.features.get(&cell.id)?;
        match self.encoder.encode(index, cell, features) {
            Ok(sample) => Some(sample),
            Err(e) => {
                tracing::error!("Cannot encode cell '{}': {e:#}", cell.cell_id);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

/// Groups consecutive samples into whole batches.
///
/// Each item is one batch, so loader workers never split a batch
/// across partitions and the batch count is known up front.
#[derive(Clone)]
pub struct BatchedDataset {
    samples:    MarkdownDataset,
    batch_size: usize,
    drop_last:  bool,
}

impl BatchedDataset {
    pub fn new(samples: MarkdownDataset, batch_size: usize, drop_last: bool) -> Result<Self> {
        if batch_size == 0 {
            bail!("batch_size must be greater than zero");
        }
        Ok(Self { samples, batch_size, drop_last })
    }

    pub fn num_samples(&self) -> usize {
        if self.drop_last {
            self.len() * self.batch_size
        } else {
            self.samples.len()
        }
    }
}

impl Dataset<Vec<MarkdownSample>> for BatchedDataset {
    fn get(&self, index: usize) -> Option<Vec<MarkdownSample>> {
        if index >= self.len() {
            return None;
        }
        let start = index * self.batch_size;
        let end = (start + self.batch_size).min(self.samples.len());
        (start..end).map(|i| self.samples.get(i)).collect()
    }

    fn len(&self) -> usize {
        if self.drop_last {
            self.samples.len() / self.batch_size
        } else {
            self.samples.len().div_ceil(self.batch_size)
        }
    }
}

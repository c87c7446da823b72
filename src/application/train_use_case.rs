// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a cross-validated training run:
//
//   Step 1: Seed the backend, prepare the output directory  (Layer 6)
//   Step 2: Load the tokenizer of the encoder               (Layer 6)
//   Step 3: Read tables and features, build datasets        (Layer 4)
//   Step 4: Pick the requested folds                        (Layer 4)
//   Step 5: Per fold: build model, train, predict           (Layer 5)
//   Step 6: Merge predictions and score the orderings       (Layer 3)
//
// The backend is chosen at runtime from the config; everything
// below `execute` is generic over it.

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray, Wgpu},
    module::AutodiffModule,
    data::dataset::Dataset,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::path::{Path, PathBuf};

use crate::application::config::{ConfigError, RunConfig};
use crate::data::{
    dataset::{MarkdownDataset, SampleEncoder},
    loader,
    splitter::KFold,
};
use crate::domain::{
    cell::{Cell, NotebookOrders},
    kendall::score_orders,
    ranking::{merge_predictions, predicted_orders},
};
use crate::infra::{
    checkpoint::{self, CheckpointManager},
    device::{BackendKind, DeviceSpec},
    metrics::MetricsLogger,
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    inferencer::{predict, predictions_by_cell},
    model::{MarkdownRanker, MarkdownRankerConfig},
    trainer::{train_fold, FoldOutputs, ResumeState},
};

/// Architecture file inside the model directory
const ARCH_FILE: &str = "config.json";
/// Pretrained weights inside the model directory
const WEIGHTS_FILE: &str = "model.bin";

// ─── Inputs ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub train_mark:     PathBuf,
    pub train_features: PathBuf,
    pub val_mark:       PathBuf,
    pub val_features:   PathBuf,
    pub val:            PathBuf,
    pub orders:         PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ResumeOptions {
    /// Load `model_path` into the model before training
    pub load_model: bool,
    pub model_path: PathBuf,
    pub optimizer:  Option<PathBuf>,
    pub scheduler:  Option<PathBuf>,
}

impl ResumeOptions {
    /// Optimizer and scheduler state belong to one fold's run.
    pub fn check_folds(&self, fold_index: &[usize]) -> Result<(), ConfigError> {
        let restores_state = self.optimizer.is_some() || self.scheduler.is_some();
        if restores_state && fold_index.len() > 1 {
            return Err(ConfigError::ResumeFolds(fold_index.len()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoldScore {
    pub fold:  usize,
    pub score: f64,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: RunConfig,
    paths:  DataPaths,
    resume: ResumeOptions,
}

impl TrainUseCase {
    pub fn new(config: RunConfig, paths: DataPaths, resume: ResumeOptions) -> Self {
        Self { config, paths, resume }
    }

    pub fn execute(&self) -> Result<Vec<FoldScore>> {
        self.config.validate()?;
        self.resume.check_folds(&self.config.fold_index)?;
        let primary = self
            .config
            .device_specs()?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no device configured"))?;

        tracing::info!("Backend: {}", self.config.backend);
        match self.config.backend {
            BackendKind::Wgpu => {
                let device = primary.to_wgpu();
                tracing::info!("Using wgpu device {:?}", device);
                self.run::<Autodiff<Wgpu>>(device)
            }
            BackendKind::Ndarray => {
                if !matches!(primary, DeviceSpec::Default | DeviceSpec::Cpu) {
                    tracing::warn!("ndarray backend runs on the CPU; ignoring device '{}'", primary);
                }
                self.run::<Autodiff<NdArray<f32>>>(NdArrayDevice::Cpu)
            }
        }
    }

    fn run<B: AutodiffBackend>(&self, device: B::Device) -> Result<Vec<FoldScore>> {
        let cfg = &self.config;

        // ── Step 1: Seed and outputs ──────────────────────────────────────────
        B::seed(cfg.seed);
        let checkpoints = CheckpointManager::new(&cfg.output_dir)?;
        let metrics     = MetricsLogger::new(&cfg.output_dir)?;
        checkpoints.save_run_config(cfg)?;

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        let tokenizer = TokenizerStore::new(&cfg.model_name).load()?;
        let encoder   = SampleEncoder::new(tokenizer, cfg.sequence_limits())?;

        // ── Step 3: Tables and datasets ───────────────────────────────────────
        let p = &self.paths;
        let train_data = MarkdownDataset::new(
            loader::read_markdown_cells(&p.train_mark)?,
            loader::read_features(&p.train_features)?,
            encoder.clone(),
        )
        .context("Cannot build the training dataset")?;
        let val_data = MarkdownDataset::new(
            loader::read_markdown_cells(&p.val_mark)?,
            loader::read_features(&p.val_features)?,
            encoder.clone(),
        )
        .context("Cannot build the validation dataset")?;
        let val_cells = loader::read_cells(&p.val)?;
        let orders    = loader::read_orders(&p.orders)?;
        tracing::info!(
            "{} training / {} validation markdown cells, {} validation cells",
            train_data.len(),
            val_data.len(),
            val_cells.len()
        );

        // ── Step 4: Folds ─────────────────────────────────────────────────────
        let folds = KFold::new(cfg.num_folds)
            .with_seed(cfg.seed)
            .select(train_data.len(), &cfg.fold_index)?;

        let ranker_cfg = self.ranker_config(encoder.vocab_size())?;
        let arch_out = checkpoints.dir().join(format!("{}_{ARCH_FILE}", cfg.name));
        ranker_cfg
            .save(&arch_out)
            .with_context(|| format!("Cannot write '{}'", arch_out.display()))?;

        let outputs = FoldOutputs { checkpoints: &checkpoints, metrics: &metrics };
        let resume = ResumeState {
            optimizer: self.resume.optimizer.clone(),
            scheduler: self.resume.scheduler.clone(),
        };

        // ── Steps 5–6: Train, predict, score ──────────────────────────────────
        let mut scores = Vec::with_capacity(folds.len());
        for fold in folds {
            tracing::info!(
                "Fold {}: {} training rows ({} held out)",
                fold.index,
                fold.train.len(),
                fold.holdout.len()
            );

            let model = self.build_model::<B>(&ranker_cfg, &device)?;
            let model = train_fold(
                cfg,
                fold.index,
                model,
                train_data.subset(&fold.train),
                &resume,
                &outputs,
                &device,
            )?;

            let preds = predict(&model.valid(), &val_data, cfg.batch_size, cfg.n_workers, &device)?;
            let score = score_fold(&val_data, &preds, &val_cells, &orders)?;
            tracing::info!("Fold {} score: {:.6}", fold.index, score);
            scores.push(FoldScore { fold: fold.index, score });
        }
        tracing::info!("Metrics written to '{}'", metrics.csv_path().display());

        Ok(scores)
    }

    /// Architecture from the model directory if it has one,
    /// otherwise from the run config.
    fn ranker_config(&self, vocab_size: usize) -> Result<MarkdownRankerConfig> {
        let cfg = &self.config;
        let arch_path = cfg.model_name.join(ARCH_FILE);
        let ranker_cfg = if arch_path.exists() {
            MarkdownRankerConfig::load(&arch_path)
                .map_err(|e| anyhow!("Cannot read architecture '{}': {e:?}", arch_path.display()))?
        } else {
            MarkdownRankerConfig::from_settings(vocab_size, cfg.total_max_len, &cfg.encoder)
        };

        if ranker_cfg.vocab_size < vocab_size {
            bail!(
                "model vocabulary ({}) is smaller than the tokenizer's ({})",
                ranker_cfg.vocab_size,
                vocab_size
            );
        }
        if ranker_cfg.max_seq_len < cfg.total_max_len {
            bail!(
                "model accepts {} positions but total_max_len is {}",
                ranker_cfg.max_seq_len,
                cfg.total_max_len
            );
        }
        Ok(ranker_cfg)
    }

    /// Fresh model, then pretrained weights, then the resume checkpoint.
    fn build_model<B: Backend>(
        &self,
        ranker_cfg: &MarkdownRankerConfig,
        device:     &B::Device,
    ) -> Result<MarkdownRanker<B>> {
        let mut model = ranker_cfg.init::<B>(device);

        let pretrained = self.config.model_name.join(WEIGHTS_FILE);
        if pretrained.exists() {
            model = checkpoint::load_model(model, &pretrained, device)?;
            tracing::info!("Loaded pretrained weights from '{}'", pretrained.display());
        }
        if self.resume.load_model {
            model = load_checkpoint(model, &self.resume.model_path, device)?;
        }
        Ok(model)
    }
}

fn load_checkpoint<B: Backend>(
    model:  MarkdownRanker<B>,
    path:   &Path,
    device: &B::Device,
) -> Result<MarkdownRanker<B>> {
    let model = checkpoint::load_model(model, path, device)?;
    tracing::info!("Resumed model weights from '{}'", path.display());
    Ok(model)
}

/// Kendall tau of the orderings implied by the predictions.
pub fn score_fold(
    val_data:  &MarkdownDataset,
    preds:     &[f32],
    val_cells: &[Cell],
    orders:    &NotebookOrders,
) -> Result<f64> {
    let keyed     = predictions_by_cell(val_data, preds)?;
    let merged    = merge_predictions(val_cells, &keyed)?;
    let predicted = predicted_orders(val_cells, &merged);
    score_orders(orders, &predicted)
}

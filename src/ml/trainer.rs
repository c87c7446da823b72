// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One fold of training with gradient accumulation:
//
//   for each batch (idx):
//       forward → L1 loss → backward → accumulate gradients
//       if idx % accumulation_steps == 0 or idx is the last batch:
//           AdamW step at the scheduler's current rate
//           scheduler.step()
//
// Mixed-precision loss scaling has no Burn counterpart; its
// overflow handling is kept instead: a window that saw a
// non-finite loss drops its update, but the gradients are still
// cleared and the schedule still advances.
//
// Backends:
//   - Training runs on B (an Autodiff backend)
//   - model.valid() moves the model to B::InnerBackend for
//     inference, see inferencer.rs
//
// After every epoch the model, optimizer and scheduler state are
// written to the output directory and a metrics row is appended.

use anyhow::{bail, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    data::dataset::Dataset,
    optim::{AdamWConfig, GradientsAccumulator, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::{path::PathBuf, sync::Arc};

use crate::application::config::RunConfig;
use crate::data::{
    batcher::{MarkdownBatch, MarkdownBatcher},
    dataset::{BatchedDataset, MarkdownDataset},
};
use crate::infra::{
    checkpoint::{self, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::MarkdownRanker;
use crate::ml::scheduler::LinearWarmupScheduler;

/// Optimizer and scheduler state to restore before the first epoch.
#[derive(Debug, Clone, Default)]
pub struct ResumeState {
    pub optimizer: Option<PathBuf>,
    pub scheduler: Option<PathBuf>,
}

/// Whether the batch at `batch_idx` closes an accumulation window.
pub fn is_step_boundary(batch_idx: usize, n_batches: usize, accumulation_steps: usize) -> bool {
    batch_idx % accumulation_steps == 0 || batch_idx + 1 == n_batches
}

/// Length of the learning-rate schedule, in optimizer steps.
pub fn total_optimizer_steps(epochs: usize, n_batches: usize, accumulation_steps: usize) -> usize {
    epochs * n_batches / accumulation_steps
}

/// Progress bar text: 1-based epoch, mean loss so far, current rate.
pub(crate) fn progress_message(epoch: usize, loss_sum: f64, seen: usize, lr: f64) -> String {
    format!("Epoch {} Loss: {:.4} lr: {:e}", epoch + 1, loss_sum / seen.max(1) as f64, lr)
}

/// One loader item per batch; workers only engage when `n_workers > 0`.
pub(crate) fn batch_loader<B: Backend>(
    dataset:   BatchedDataset,
    n_workers: usize,
    device:    B::Device,
) -> Arc<dyn DataLoader<MarkdownBatch<B>>> {
    let builder = DataLoaderBuilder::new(MarkdownBatcher::<B>::new(device)).batch_size(1);
    let builder = if n_workers > 0 { builder.num_workers(n_workers) } else { builder };
    builder.build(dataset)
}

pub(crate) fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} {bar:30.cyan/blue} {pos}/{len} [{elapsed_precise}<{eta_precise}]")?,
    );
    Ok(pb)
}

/// Everything a fold's training loop writes to.
pub struct FoldOutputs<'a> {
    pub checkpoints: &'a CheckpointManager,
    pub metrics:     &'a MetricsLogger,
}

pub fn train_fold<B: AutodiffBackend>(
    cfg:     &RunConfig,
    fold:    usize,
    model:   MarkdownRanker<B>,
    dataset: MarkdownDataset,
    resume:  &ResumeState,
    outputs: &FoldOutputs<'_>,
    device:  &B::Device,
) -> Result<MarkdownRanker<B>> {
    if dataset.len() < cfg.batch_size {
        bail!(
            "fold {fold} has {} training samples, fewer than batch_size {}",
            dataset.len(),
            cfg.batch_size
        );
    }

    let batches   = BatchedDataset::new(dataset, cfg.batch_size, true)?;
    let n_batches = batches.len();
    let accum     = cfg.accumulation_steps;

    // ── Schedule and optimizer ────────────────────────────────────────────────
    let mut scheduler = match &resume.scheduler {
        Some(path) => {
            let s = checkpoint::load_scheduler(path)?;
            tracing::info!("Resumed scheduler at step {} from '{}'", s.current_step(), path.display());
            s
        }
        None => LinearWarmupScheduler::new(
            cfg.lr,
            cfg.warmup_ratio,
            total_optimizer_steps(cfg.epochs, n_batches, accum),
        ),
    };

    let mut optim = AdamWConfig::new()
        .with_weight_decay(cfg.weight_decay)
        .init::<B, MarkdownRanker<B>>();
    if let Some(path) = &resume.optimizer {
        optim = checkpoint::load_optimizer::<B, _>(optim, path, device)?;
        tracing::info!("Resumed optimizer state from '{}'", path.display());
    }

    let loader = batch_loader::<B>(batches, cfg.n_workers, device.clone());
    tracing::info!(
        "Fold {}: {} batches/epoch, {} optimizer steps scheduled",
        fold, n_batches, scheduler.total_steps()
    );

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut model = model;
    for epoch in 0..cfg.epochs {
        let pb = progress_bar(n_batches)?;
        let mut accumulator = GradientsAccumulator::<MarkdownRanker<B>>::new();

        let mut loss_sum      = 0.0f64;
        let mut seen          = 0usize;
        let mut window_finite = true;
        let mut steps         = 0usize;
        let mut skipped       = 0usize;

        for (idx, batch) in loader.iter().enumerate() {
            let (loss, _) = model.forward_loss(
                batch.input_ids,
                batch.attention_mask,
                batch.fts,
                batch.targets,
            );
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum      += loss_val;
            seen          += 1;
            window_finite &= loss_val.is_finite();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            accumulator.accumulate(&model, grads);

            if is_step_boundary(idx, n_batches, accum) {
                let grads = accumulator.grads();
                if window_finite {
                    model = optim.step(scheduler.lr(), model, grads);
                    steps += 1;
                } else {
                    skipped += 1;
                    tracing::warn!("Non-finite loss at batch {}; update skipped", idx);
                }
                scheduler.step();
                window_finite = true;
            }

            pb.set_message(progress_message(epoch, loss_sum, seen, scheduler.lr()));
            pb.inc(1);
        }
        pb.finish();

        // The loader stops at the first sample that fails to load.
        if seen < n_batches {
            bail!(
                "fold {fold} epoch {}: loader stopped after {seen} of {n_batches} batches",
                epoch + 1
            );
        }

        let train_loss = loss_sum / seen as f64;
        outputs
            .checkpoints
            .save_epoch(&cfg.name, fold, epoch, &model, &optim, &scheduler)?;
        outputs.metrics.log(&EpochMetrics {
            fold,
            epoch,
            train_loss,
            lr: scheduler.lr(),
            optimizer_steps: steps,
            skipped_steps: skipped,
        })?;
        tracing::info!(
            "Fold {} epoch {}: loss={:.4}, steps={}, skipped={}",
            fold, epoch + 1, train_loss, steps, skipped
        );
    }

    Ok(model)
}

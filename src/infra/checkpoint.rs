// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists the three pieces of training state after every epoch:
//
//   {out}/{name}_model_{fold}_{epoch}.bin  ← model weights
//   {out}/{name}_optim_{fold}_{epoch}.bin  ← AdamW moments
//   {out}/{name}_sched_{fold}_{epoch}.bin  ← scheduler state (JSON)
//
// Epochs are numbered from 0. Weights and optimizer state use
// Burn's BinFileRecorder at full precision; it appends the
// `.bin` extension itself, so we hand it the stem.
//
// The resolved run configuration is written once per run as
// {out}/run_config.json.

use anyhow::{Context, Result};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{BinFileRecorder, FullPrecisionSettings, Recorder},
    tensor::backend::AutodiffBackend,
};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::application::config::RunConfig;
use crate::ml::model::MarkdownRanker;
use crate::ml::scheduler::LinearWarmupScheduler;

type BinRecorder = BinFileRecorder<FullPrecisionSettings>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Model,
    Optimizer,
    Scheduler,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ArtifactKind::Model     => "model",
            ArtifactKind::Optimizer => "optim",
            ArtifactKind::Scheduler => "sched",
        };
        f.write_str(tag)
    }
}

/// `codebert` + Model + fold 2 + epoch 3 → `codebert_model_2_3.bin`
pub fn artifact_file_name(name: &str, kind: ArtifactKind, fold: usize, epoch: usize) -> String {
    format!("{name}_{kind}_{fold}_{epoch}.bin")
}

pub struct CheckpointManager {
    dir:      PathBuf,
    recorder: BinRecorder,
}

impl CheckpointManager {
    /// Creates the output directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir, recorder: BinRecorder::new() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, name: &str, kind: ArtifactKind, fold: usize, epoch: usize) -> PathBuf {
        self.dir.join(artifact_file_name(name, kind, fold, epoch))
    }

    /// Write model, optimizer and scheduler state for one epoch.
    pub fn save_epoch<B, O>(
        &self,
        name:      &str,
        fold:      usize,
        epoch:     usize,
        model:     &MarkdownRanker<B>,
        optim:     &O,
        scheduler: &LinearWarmupScheduler,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<MarkdownRanker<B>, B>,
    {
        let model_path = self.artifact_path(name, ArtifactKind::Model, fold, epoch);
        model
            .clone()
            .save_file(model_path.with_extension(""), &self.recorder)
            .with_context(|| format!("Failed to save model to '{}'", model_path.display()))?;

        let optim_path = self.artifact_path(name, ArtifactKind::Optimizer, fold, epoch);
        <BinRecorder as Recorder<B>>::record(
            &self.recorder,
            optim.to_record(),
            optim_path.with_extension(""),
        )
        .with_context(|| format!("Failed to save optimizer to '{}'", optim_path.display()))?;

        let sched_path = self.artifact_path(name, ArtifactKind::Scheduler, fold, epoch);
        fs::write(&sched_path, serde_json::to_vec(scheduler)?)
            .with_context(|| format!("Failed to save scheduler to '{}'", sched_path.display()))?;

        tracing::debug!("Saved fold {} epoch {} checkpoint to '{}'", fold, epoch, self.dir.display());
        Ok(())
    }

    pub fn save_run_config(&self, cfg: &RunConfig) -> Result<PathBuf> {
        let path = self.dir.join("run_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        Ok(path)
    }
}

/// Load weights into an already-built model of the same shape.
pub fn load_model<B: Backend>(
    model:  MarkdownRanker<B>,
    path:   &Path,
    device: &B::Device,
) -> Result<MarkdownRanker<B>> {
    model
        .load_file(path.with_extension(""), &BinRecorder::new(), device)
        .with_context(|| format!("Cannot load model weights from '{}'", path.display()))
}

pub fn load_optimizer<B, O>(optim: O, path: &Path, device: &B::Device) -> Result<O>
where
    B: AutodiffBackend,
    O: Optimizer<MarkdownRanker<B>, B>,
{
    let record = <BinRecorder as Recorder<B>>::load(&BinRecorder::new(), path.with_extension(""), device)
        .with_context(|| format!("Cannot load optimizer state from '{}'", path.display()))?;
    Ok(optim.load_record(record))
}

pub fn load_scheduler(path: &Path) -> Result<LinearWarmupScheduler> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read scheduler state '{}'", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("Malformed scheduler state in '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::MarkdownRankerConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn artifact_names_follow_the_layout() {
        assert_eq!(artifact_file_name("codebert", ArtifactKind::Model, 2, 3), "codebert_model_2_3.bin");
        assert_eq!(artifact_file_name("run", ArtifactKind::Optimizer, 0, 0), "run_optim_0_0.bin");
        assert_eq!(artifact_file_name("run", ArtifactKind::Scheduler, 1, 4), "run_sched_1_4.bin");
    }

    #[test]
    fn model_weights_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("out")).unwrap();
        let device = Default::default();
        let cfg = MarkdownRankerConfig::new(12, 6)
            .with_d_model(4)
            .with_num_heads(1)
            .with_num_layers(1)
            .with_d_ff(8);

        let model: MarkdownRanker<TestBackend> = cfg.init(&device);
        let path = ckpt.artifact_path("t", ArtifactKind::Model, 0, 0);
        model.clone().save_file(path.with_extension(""), &BinRecorder::new()).unwrap();
        assert!(path.exists());

        let fresh: MarkdownRanker<TestBackend> = cfg.init(&device);
        let loaded = load_model(fresh, &path, &device).unwrap();
        let a: Vec<f32> = model.head.weight.val().into_data().to_vec().unwrap();
        let b: Vec<f32> = loaded.head.weight.val().into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn scheduler_state_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s_sched_0_0.bin");
        let mut sched = LinearWarmupScheduler::new(1e-3, 0.1, 20);
        sched.step();
        fs::write(&path, serde_json::to_vec(&sched).unwrap()).unwrap();
        assert_eq!(load_scheduler(&path).unwrap(), sched);
    }

    #[test]
    fn missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_scheduler(&dir.path().join("nope.bin")).unwrap_err();
        assert!(format!("{err:#}").contains("nope.bin"));
    }
}

// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// All hyperparameters of a run, read from a YAML file:
//
//   seed: 42
//   epochs: 5
//   batch_size: 32
//   accumulation_steps: 4
//   lr: 3.0e-5
//   num_folds: 5
//   fold_index: [0]
//   model_name: models/codebert-base
//   md_max_len: 64
//   total_max_len: 512
//   n_workers: 8
//   name: codebert
//
// Command-line overrides are applied on top, then `validate`
// rejects anything training could not run with. The resolved
// config is passed by reference to every component that needs
// it and saved next to the checkpoints.

use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::data::dataset::SequenceLimits;
use crate::data::splitter::{check_folds, SplitError};
use crate::infra::device::{parse_devices, BackendKind, DeviceSpec};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}'")]
    Read {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config '{path}'")]
    Parse {
        path:   PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),

    #[error(transparent)]
    Folds(#[from] SplitError),

    #[error("md_max_len ({md_max_len}) must be at least 2 and no larger than total_max_len ({total_max_len})")]
    SequenceLengths { md_max_len: usize, total_max_len: usize },

    #[error("code_max_len must be at least 2, got {0}")]
    CodeLength(usize),

    #[error("learning rate must be positive, got {0}")]
    LearningRate(f64),

    #[error("warmup_ratio must lie in [0, 1), got {0}")]
    WarmupRatio(f64),

    #[error("run name '{0}' must be non-empty and contain no path separators")]
    Name(String),

    #[error("invalid device list: {0}")]
    Devices(String),

    #[error("{0} devices listed; training runs on exactly one")]
    MultiDevice(usize),

    #[error("optimizer or scheduler state can only resume a single fold, {0} selected")]
    ResumeFolds(usize),

    #[error("encoder d_model ({d_model}) must be divisible by num_heads ({num_heads})")]
    Heads { d_model: usize, num_heads: usize },
}

/// Shape of the transformer encoder built when the model
/// directory carries no architecture file of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub d_model:    usize,
    pub num_heads:  usize,
    pub num_layers: usize,
    pub d_ff:       usize,
    pub dropout:    f64,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            d_model:    256,
            num_heads:  8,
            num_layers: 6,
            d_ff:       1024,
            dropout:    0.1,
        }
    }
}

fn default_code_max_len() -> usize { 23 }
fn default_warmup_ratio() -> f64 { 0.05 }
fn default_weight_decay() -> f32 { 0.01 }
fn default_output_dir() -> PathBuf { PathBuf::from("outputs") }
fn default_devices() -> Vec<String> { vec!["default".to_string()] }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub seed:               u64,
    pub epochs:             usize,
    pub batch_size:         usize,
    /// Batches per optimizer step
    pub accumulation_steps: usize,
    pub lr:                 f64,
    pub num_folds:          usize,
    /// Folds to train, each in 0..num_folds
    pub fold_index:         Vec<usize>,
    /// Directory with tokenizer.json and optional pretrained weights
    pub model_name:         PathBuf,
    pub md_max_len:         usize,
    pub total_max_len:      usize,
    pub n_workers:          usize,
    /// Prefix of every artifact file name
    pub name:               String,

    #[serde(default = "default_code_max_len")]
    pub code_max_len:       usize,
    #[serde(default = "default_warmup_ratio")]
    pub warmup_ratio:       f64,
    #[serde(default = "default_weight_decay")]
    pub weight_decay:       f32,
    #[serde(default = "default_output_dir")]
    pub output_dir:         PathBuf,
    #[serde(default)]
    pub backend:            BackendKind,
    #[serde(default = "default_devices")]
    pub devices:            Vec<String>,
    #[serde(default)]
    pub encoder:            EncoderSettings,
}

/// Values given on the command line that replace file values.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub epochs:     Option<usize>,
    pub fold_index: Option<Vec<usize>>,
    pub name:       Option<String>,
    pub devices:    Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    pub fn apply(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(epochs) = overrides.epochs {
            self.epochs = epochs;
        }
        if let Some(folds) = overrides.fold_index {
            self.fold_index = folds;
        }
        if let Some(name) = overrides.name {
            self.name = name;
        }
        if let Some(devices) = overrides.devices {
            self.devices = devices;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("epochs", self.epochs),
            ("batch_size", self.batch_size),
            ("accumulation_steps", self.accumulation_steps),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(field));
            }
        }

        check_folds(&self.fold_index, self.num_folds)?;

        if self.md_max_len < 2 || self.total_max_len < self.md_max_len {
            return Err(ConfigError::SequenceLengths {
                md_max_len:    self.md_max_len,
                total_max_len: self.total_max_len,
            });
        }
        if self.code_max_len < 2 {
            return Err(ConfigError::CodeLength(self.code_max_len));
        }
        if self.lr.is_nan() || self.lr <= 0.0 {
            return Err(ConfigError::LearningRate(self.lr));
        }
        if !(0.0..1.0).contains(&self.warmup_ratio) {
            return Err(ConfigError::WarmupRatio(self.warmup_ratio));
        }
        if self.name.is_empty() || self.name.contains(['/', '\\']) {
            return Err(ConfigError::Name(self.name.clone()));
        }
        if self.encoder.num_heads == 0 || self.encoder.d_model % self.encoder.num_heads != 0 {
            return Err(ConfigError::Heads {
                d_model:   self.encoder.d_model,
                num_heads: self.encoder.num_heads,
            });
        }
        let devices = self.device_specs()?;
        if devices.len() > 1 {
            return Err(ConfigError::MultiDevice(devices.len()));
        }
        Ok(())
    }

    pub fn device_specs(&self) -> Result<Vec<DeviceSpec>, ConfigError> {
        parse_devices(&self.devices).map_err(ConfigError::Devices)
    }

    pub fn sequence_limits(&self) -> SequenceLimits {
        SequenceLimits {
            md_max_len:    self.md_max_len,
            code_max_len:  self.code_max_len,
            total_max_len: self.total_max_len,
        }
    }
}

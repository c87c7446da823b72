// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// Every flag of the `notebook-ranker` command. Flag names keep
// the snake_case spelling of the data files they point at.
//
// Three groups:
//   - data inputs      (--train_mark_path, --val_path, ...)
//   - resume state     (--load_model, --model_path, ...)
//   - config overrides (--epochs, --fold_index, ...)

use clap::Args;
use std::path::PathBuf;

use crate::application::config::ConfigOverrides;
use crate::application::train_use_case::{DataPaths, ResumeOptions};

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// YAML run configuration
    #[arg(long, default_value = "configs/codebert-base.yaml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub resume: ResumeArgs,

    #[command(flatten)]
    pub overrides: OverrideArgs,
}

#[derive(Args, Debug)]
pub struct DataArgs {
    /// Markdown cells used for training
    #[arg(long = "train_mark_path", default_value = "data/train_mark.csv")]
    pub train_mark_path: PathBuf,

    /// Per-notebook features of the training notebooks
    #[arg(long = "train_features_path", default_value = "data/train_fts.json")]
    pub train_features_path: PathBuf,

    /// Markdown cells used for validation
    #[arg(long = "val_mark_path", default_value = "data/val_mark.csv")]
    pub val_mark_path: PathBuf,

    /// Per-notebook features of the validation notebooks
    #[arg(long = "val_features_path", default_value = "data/val_fts.json")]
    pub val_features_path: PathBuf,

    /// Every validation cell, code and markdown
    #[arg(long = "val_path", default_value = "data/val.csv")]
    pub val_path: PathBuf,

    /// Ground-truth cell order of every notebook
    #[arg(long = "orders_path", default_value = "data/train_orders.csv")]
    pub orders_path: PathBuf,
}

#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Load the weights at --model_path before training
    #[arg(long = "load_model")]
    pub load_model: bool,

    #[arg(long = "model_path", default_value = "outputs/model.bin")]
    pub model_path: PathBuf,

    /// Optimizer state saved by an earlier run
    #[arg(long = "optim_path")]
    pub optim_path: Option<PathBuf>,

    /// Scheduler state saved by an earlier run
    #[arg(long = "sched_path")]
    pub sched_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct OverrideArgs {
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Comma separated fold indices, e.g. 0,2
    #[arg(long = "fold_index", value_delimiter = ',')]
    pub fold_index: Option<Vec<usize>>,

    /// Run name used as the artifact prefix
    #[arg(long)]
    pub name: Option<String>,

    /// Training device, e.g. gpu:1 (a list with more than one entry is rejected)
    #[arg(long, value_delimiter = ',')]
    pub devices: Option<Vec<String>>,

    #[arg(long = "output_dir")]
    pub output_dir: Option<PathBuf>,
}

impl From<DataArgs> for DataPaths {
    fn from(a: DataArgs) -> Self {
        DataPaths {
            train_mark:     a.train_mark_path,
            train_features: a.train_features_path,
            val_mark:       a.val_mark_path,
            val_features:   a.val_features_path,
            val:            a.val_path,
            orders:         a.orders_path,
        }
    }
}

impl From<ResumeArgs> for ResumeOptions {
    fn from(a: ResumeArgs) -> Self {
        ResumeOptions {
            load_model: a.load_model,
            model_path: a.model_path,
            optimizer:  a.optim_path,
            scheduler:  a.sched_path,
        }
    }
}

impl From<OverrideArgs> for ConfigOverrides {
    fn from(a: OverrideArgs) -> Self {
        ConfigOverrides {
            epochs:     a.epochs,
            fold_index: a.fold_index,
            name:       a.name,
            devices:    a.devices,
            output_dir: a.output_dir,
        }
    }
}

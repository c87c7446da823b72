// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap, resolves the run config
// and hands off to the training use case. The fold scores are
// printed here; everything else is logged by the lower layers.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::TrainArgs;

use crate::application::config::RunConfig;
use crate::application::train_use_case::TrainUseCase;

#[derive(Parser, Debug)]
#[command(
    name = "notebook-ranker",
    version,
    about = "Train a model that places markdown cells inside notebooks, with K-fold validation."
)]
pub struct Cli {
    #[command(flatten)]
    pub args: TrainArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let args = self.args;

        let config = RunConfig::from_file(&args.config)?.apply(args.overrides.into());
        tracing::info!(
            "Run '{}' from '{}': folds {:?} of {}",
            config.name,
            args.config.display(),
            config.fold_index,
            config.num_folds
        );

        let use_case = TrainUseCase::new(config, args.data.into(), args.resume.into());
        for fold in use_case.execute()? {
            println!("Preds score for fold {} {}", fold.fold, fold.score);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_point_at_the_data_directory() {
        let cli = Cli::try_parse_from(["notebook-ranker"]).unwrap();
        assert_eq!(cli.args.config, PathBuf::from("configs/codebert-base.yaml"));
        assert_eq!(cli.args.data.val_path, PathBuf::from("data/val.csv"));
        assert!(!cli.args.resume.load_model);
        assert!(cli.args.overrides.epochs.is_none());
    }

    #[test]
    fn snake_case_flags_and_lists() {
        let cli = Cli::try_parse_from([
            "notebook-ranker",
            "--train_mark_path", "x.csv",
            "--load_model",
            "--optim_path", "o.bin",
            "--fold_index", "0,3",
            "--devices", "gpu:3,gpu:4",
        ])
        .unwrap();
        assert_eq!(cli.args.data.train_mark_path, PathBuf::from("x.csv"));
        assert!(cli.args.resume.load_model);
        assert_eq!(cli.args.resume.optim_path, Some(PathBuf::from("o.bin")));
        assert_eq!(cli.args.overrides.fold_index, Some(vec![0, 3]));
        assert_eq!(
            cli.args.overrides.devices,
            Some(vec!["gpu:3".to_string(), "gpu:4".to_string()])
        );
    }

    #[test]
    fn missing_config_file_is_reported() {
        let cli = Cli::try_parse_from(["notebook-ranker", "--config", "/nonexistent/run.yaml"]).unwrap();
        let err = cli.run().unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/run.yaml"));
    }
}

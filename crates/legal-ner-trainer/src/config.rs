//! Command line interface and the validated run configuration.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use legal_ner_core::{AlignmentConfig, DatasetKind, DatasetSource, TruncationPolicy};

use crate::models::ModelSelection;

/// Environment variable naming the external training command.
pub const TRAINER_CMD_ENV: &str = "LEGAL_NER_TRAINER_CMD";

/// Shuffle seed of the combined training split.
pub const TRAIN_SHUFFLE_SEED: u64 = 502124;

/// Shuffle seed of the combined validation split.
pub const VALID_SHUFFLE_SEED: u64 = 183099;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(name = "train")]
#[command(about = "Fine-tune transformer encoders for legal named entity recognition")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Prepare every selected checkpoint and run the external trainer on it
    Train(TrainOptions),
    /// Validate the configuration and write run artifacts only
    Prepare(TrainOptions),
    /// Score a prediction file (the training framework's metric hook)
    Evaluate(EvaluateOptions),
}

/// Options shared by `train` and `prepare`.
#[derive(Debug, Clone, Args)]
pub struct TrainOptions {
    /// Path of train dataset file
    #[arg(long, default_value = "data/NER_TRAIN/NER_TRAIN_ALL.json")]
    pub ds_train_path: PathBuf,

    /// Path of validation dataset file
    #[arg(long, default_value = "data/NER_DEV/NER_DEV_ALL.json")]
    pub ds_valid_path: PathBuf,

    /// German train split (JSON Lines), used by the german and combined datasets
    #[arg(long, default_value = "data/GERMAN/train.jsonl")]
    pub german_train_path: PathBuf,

    /// German validation split (JSON Lines)
    #[arg(long, default_value = "data/GERMAN/validation.jsonl")]
    pub german_valid_path: PathBuf,

    /// Share of German sentences kept in the combined dataset
    #[arg(long, default_value_t = 1.0)]
    pub german_fraction: f64,

    /// Output folder
    #[arg(long, default_value = "results/")]
    pub output_folder: PathBuf,

    /// Batch size
    #[arg(long, default_value_t = 1)]
    pub batch: usize,

    /// Number of training epochs
    #[arg(long, default_value_t = 5)]
    pub num_epochs: usize,

    /// Learning rate
    #[arg(long, default_value_t = 1e-5)]
    pub lr: f64,

    /// Weight decay
    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Warmup ratio
    #[arg(long, default_value_t = 0.06)]
    pub warmup_ratio: f64,

    /// all for all models, roberta for roberta base, luke_b for luke base,
    /// mluke_b for multilingual luke base
    #[arg(long, default_value = "all")]
    pub models: String,

    /// indian, german, combined
    #[arg(long, default_value = "indian")]
    pub dataset: String,

    /// Eval steps (-1 for every epoch)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub eval_steps: i64,

    /// Maximum sub-word pieces per example
    #[arg(long, default_value_t = 512)]
    pub max_length: usize,

    /// Keep overflowing pieces as extra windows sharing this many pieces
    #[arg(long)]
    pub stride: Option<usize>,

    /// Directory holding `<checkpoint>/tokenizer.json`
    #[arg(long, default_value = "tokenizers")]
    pub tokenizer_root: PathBuf,

    /// External training command, run once per checkpoint
    #[arg(long, env = TRAINER_CMD_ENV)]
    pub trainer_cmd: Option<String>,

    /// Shuffle seed of the combined train split
    #[arg(long, default_value_t = TRAIN_SHUFFLE_SEED)]
    pub train_seed: u64,

    /// Shuffle seed of the combined validation split
    #[arg(long, default_value_t = VALID_SHUFFLE_SEED)]
    pub valid_seed: u64,
}

/// Options of the `evaluate` subcommand.
#[derive(Debug, Clone, Args)]
pub struct EvaluateOptions {
    /// indian, german, combined
    #[arg(long, default_value = "indian")]
    pub dataset: String,

    /// Safetensors file with `predictions` [N, S, L] and `label_ids` [N, S]
    #[arg(long)]
    pub predictions: PathBuf,

    /// Write the full report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Credit type-mismatched overlaps in the partial regime
    #[arg(long)]
    pub lenient_partial: bool,
}

/// Training configuration after validation.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub dataset: DatasetKind,
    pub models: ModelSelection,
    pub train: DatasetSource,
    pub valid: DatasetSource,
    pub output_folder: PathBuf,
    pub tokenizer_root: PathBuf,
    pub alignment: AlignmentConfig,
    pub hyper: Hyperparameters,
    pub trainer_cmd: Option<String>,
}

/// Optimisation settings passed through to the training framework.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyperparameters {
    pub batch: usize,
    pub num_epochs: usize,
    pub lr: f64,
    pub weight_decay: f64,
    pub warmup_ratio: f64,
    /// `None` evaluates every epoch
    pub eval_steps: Option<u64>,
}

impl TrainOptions {
    /// Validate keywords and values. Nothing is read from disk.
    pub fn resolve(&self) -> Result<TrainConfig> {
        let dataset: DatasetKind = self.dataset.parse()?;
        let models: ModelSelection = self.models.parse()?;
        models.ensure_compatible(dataset)?;

        if self.batch == 0 {
            bail!("batch size must be at least 1");
        }
        if !(self.german_fraction > 0.0 && self.german_fraction <= 1.0) {
            bail!(
                "german fraction must be in (0, 1], got {}",
                self.german_fraction
            );
        }
        let truncation = match self.stride {
            Some(stride) if stride >= self.max_length => {
                bail!(
                    "stride {stride} must be smaller than max length {}",
                    self.max_length
                )
            }
            Some(stride) => TruncationPolicy::Window { stride },
            None => TruncationPolicy::Truncate,
        };

        let (train, valid) = match dataset {
            DatasetKind::Indian => (
                DatasetSource::new(&self.ds_train_path),
                DatasetSource::new(&self.ds_valid_path),
            ),
            DatasetKind::German => (
                DatasetSource::new(&self.german_train_path),
                DatasetSource::new(&self.german_valid_path),
            ),
            DatasetKind::Combined => (
                DatasetSource::new(&self.ds_train_path)
                    .with_secondary(&self.german_train_path)
                    .with_fraction(self.german_fraction)
                    .with_seed(self.train_seed),
                DatasetSource::new(&self.ds_valid_path)
                    .with_secondary(&self.german_valid_path)
                    .with_fraction(self.german_fraction)
                    .with_seed(self.valid_seed),
            ),
        };

        Ok(TrainConfig {
            dataset,
            models,
            train,
            valid,
            output_folder: self.output_folder.clone(),
            tokenizer_root: self.tokenizer_root.clone(),
            alignment: AlignmentConfig::default()
                .with_max_length(self.max_length)
                .with_truncation(truncation),
            hyper: Hyperparameters {
                batch: self.batch,
                num_epochs: self.num_epochs,
                lr: self.lr,
                weight_decay: self.weight_decay,
                warmup_ratio: self.warmup_ratio,
                eval_steps: u64::try_from(self.eval_steps).ok(),
            },
            trainer_cmd: self.trainer_cmd.clone(),
        })
    }
}

impl TrainConfig {
    /// `tokenizer.json` of a checkpoint.
    pub fn tokenizer_path(&self, checkpoint: &str) -> PathBuf {
        self.tokenizer_root.join(checkpoint).join("tokenizer.json")
    }

    /// The configured training command.
    pub fn require_trainer_cmd(&self) -> Result<&str> {
        self.trainer_cmd
            .as_deref()
            .filter(|cmd| !cmd.trim().is_empty())
            .with_context(|| {
                format!("no training command configured (use --trainer-cmd or {TRAINER_CMD_ENV})")
            })
    }
}

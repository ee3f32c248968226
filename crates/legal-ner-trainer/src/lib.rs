//! # Legal NER Trainer
//!
//! Training driver for the legal NER models. Validates the run
//! configuration, encodes the selected dataset for every checkpoint, writes
//! the run artifacts and hands the optimisation loop to an external training
//! framework. The `evaluate` subcommand is the framework's metric hook.

pub mod backend;
pub mod config;
pub mod convert;
pub mod driver;
pub mod metrics;
pub mod models;
pub mod plan;
pub mod prepare;

pub use backend::{ExternalCommandBackend, TrainingBackend};
pub use config::{Cli, Commands, EvaluateOptions, Hyperparameters, TrainConfig, TrainOptions};
pub use driver::run;
pub use metrics::{MetricsOutput, compute_metrics, compute_metrics_from_ids};
pub use models::{ALL_CHECKPOINTS, ModelSelection};
pub use plan::{LabelMap, RunPlan, TrainingArguments};
pub use prepare::{PreparedRun, prepare_run};

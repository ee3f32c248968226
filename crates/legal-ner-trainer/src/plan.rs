//! Per-checkpoint run plan: training arguments and label map.

use std::collections::BTreeMap;
use std::path::PathBuf;

use legal_ner_core::LabelScheme;
use serde::{Deserialize, Serialize};

use crate::config::{Hyperparameters, TrainConfig};
use crate::models::uses_prefix_space;

/// Metric the framework tracks to pick the best checkpoint.
pub const METRIC_FOR_BEST_MODEL: &str = "f1-strict";

/// Training arguments, serialized with the framework's field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingArguments {
    pub output_dir: PathBuf,
    pub num_train_epochs: usize,
    pub learning_rate: f64,
    pub per_device_train_batch_size: usize,
    pub per_device_eval_batch_size: usize,
    pub gradient_accumulation_steps: usize,
    pub gradient_checkpointing: bool,
    pub warmup_ratio: f64,
    pub weight_decay: f64,
    pub evaluation_strategy: String,
    pub eval_steps: Option<u64>,
    pub save_strategy: String,
    pub load_best_model_at_end: bool,
    pub save_total_limit: usize,
    pub fp16: bool,
    pub fp16_full_eval: bool,
    pub metric_for_best_model: String,
    pub dataloader_num_workers: usize,
    pub dataloader_pin_memory: bool,
    pub max_steps: i64,
}

impl TrainingArguments {
    pub fn new(output_dir: PathBuf, hyper: &Hyperparameters) -> Self {
        let evaluation_strategy = match hyper.eval_steps {
            Some(_) => "steps",
            None => "epoch",
        };
        Self {
            output_dir,
            num_train_epochs: hyper.num_epochs,
            learning_rate: hyper.lr,
            per_device_train_batch_size: hyper.batch,
            per_device_eval_batch_size: hyper.batch,
            gradient_accumulation_steps: 1,
            gradient_checkpointing: true,
            warmup_ratio: hyper.warmup_ratio,
            weight_decay: hyper.weight_decay,
            evaluation_strategy: evaluation_strategy.to_string(),
            eval_steps: hyper.eval_steps,
            save_strategy: "epoch".to_string(),
            load_best_model_at_end: false,
            save_total_limit: 2,
            fp16: false,
            fp16_full_eval: false,
            metric_for_best_model: METRIC_FOR_BEST_MODEL.to_string(),
            dataloader_num_workers: 4,
            dataloader_pin_memory: true,
            max_steps: -1,
        }
    }
}

/// Label map handed to the model head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    pub id2label: BTreeMap<usize, String>,
    pub label2id: BTreeMap<String, usize>,
    pub num_labels: usize,
}

impl From<&LabelScheme> for LabelMap {
    fn from(scheme: &LabelScheme) -> Self {
        Self {
            id2label: scheme.id2label(),
            label2id: scheme.label2id(),
            num_labels: scheme.len(),
        }
    }
}

/// Everything the framework needs to fine-tune one checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlan {
    pub checkpoint: String,
    /// `<output>/all/<checkpoint>`
    pub output_dir: PathBuf,
    /// Where the final model is saved.
    pub final_model_dir: PathBuf,
    pub add_prefix_space: bool,
    pub args: TrainingArguments,
    pub label_map: LabelMap,
}

impl RunPlan {
    pub fn new(config: &TrainConfig, scheme: &LabelScheme, checkpoint: &str) -> Self {
        let output_dir = config.output_folder.join("all").join(checkpoint);
        Self {
            checkpoint: checkpoint.to_string(),
            final_model_dir: config.output_folder.clone(),
            add_prefix_space: uses_prefix_space(checkpoint),
            args: TrainingArguments::new(output_dir.clone(), &config.hyper),
            label_map: LabelMap::from(scheme),
            output_dir,
        }
    }
}

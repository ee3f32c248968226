//! # Legal NER
//!
//! Named entity recognition for legal text.
//!
//! - [`core`]: label schemes, dataset adapters and the entity span evaluator
//! - [`trainer`]: run preparation, training delegation and the metric hook

pub use legal_ner_core as core;
pub use legal_ner_trainer as trainer;

pub use legal_ner_core::{
    DatasetKind, EvalConfig, EvaluationReport, LabelScheme, LegalNerError, Regime, SpanEvaluator,
    dataset_adapter,
};
pub use legal_ner_trainer::{ModelSelection, compute_metrics_from_ids};

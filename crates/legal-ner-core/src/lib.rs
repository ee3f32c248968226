//! # Legal NER Core
//!
//! Label vocabularies, dataset alignment and span-level evaluation for named
//! entity recognition over legal text (Indian, German and combined corpora).
//!
//! ## Quick Start
//!
//! ```rust
//! use legal_ner_core::{DatasetKind, EvalConfig, LabelScheme, SpanEvaluator};
//!
//! let scheme = LabelScheme::for_dataset(DatasetKind::Indian);
//! let evaluator = SpanEvaluator::new(&scheme, EvalConfig::default());
//!
//! let gold = ["B-COURT", "I-COURT", "O", "B-JUDGE"];
//! let pred = ["B-COURT", "I-COURT", "O", "O"];
//! let report = evaluator.evaluate_tags(&gold, &pred).unwrap().report();
//!
//! assert!((report.strict().precision - 1.0).abs() < 1e-6);
//! assert!((report.strict().recall - 0.5).abs() < 1e-6);
//! ```
pub mod adapter;
pub mod error;
pub mod eval;
pub mod labels;

// Re-export primary API
pub use adapter::{
    AlignmentConfig, AlignmentWarning, CharSpan, DatasetAdapter, DatasetSource, DocumentWarning,
    EncodedExample, HfTokenizer, LoadedDataset, SubwordEncoding, SubwordTokenizer,
    TruncationPolicy, WordSegmenter, WordSequence, dataset_adapter,
};
pub use error::{LegalNerError, Result};
pub use eval::{
    EntitySpan, EvalConfig, EvaluationReport, MatchOutcome, NerEvalResults, Regime, RegimeCounts,
    RegimeScore, SpanEvaluator, decode_spans,
};
pub use labels::{BioTag, DatasetKind, IGNORE_INDEX, LabelScheme};

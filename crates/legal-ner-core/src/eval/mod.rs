//! # Entity Span Evaluation
//!
//! SemEval-2013 style entity scoring under four regimes (strict, exact,
//! partial, type match) with a per-type breakdown.

pub mod evaluator;
pub mod matching;
pub mod report;
pub mod results;
pub mod spans;

pub use evaluator::{EvalConfig, SpanEvaluator};
pub use matching::{MatchOutcome, SpanAlignment, align_spans};
pub use report::{EvaluationReport, RegimeScore, ScoreTable};
pub use results::{F1_EPSILON, NerEvalResults, Regime, RegimeCounts, RegimeTable};
pub use spans::{EntitySpan, decode_spans};

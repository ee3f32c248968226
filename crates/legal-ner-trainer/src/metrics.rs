//! Metric hook: scores framework predictions with the span evaluator.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use candle_core::{D, DType, Device, Tensor};
use legal_ner_core::{BioTag, EvalConfig, EvaluationReport, LabelScheme, SpanEvaluator};
use serde::Serialize;
use tracing::{debug, info};

/// Logits tensor `[N, S, L]` in a prediction file.
pub const PREDICTIONS_KEY: &str = "predictions";

/// Gold label ids `[N, S]` in a prediction file.
pub const LABEL_IDS_KEY: &str = "label_ids";

/// Report plus the flat metric dictionary the framework logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsOutput {
    pub metrics: BTreeMap<String, f64>,
    pub report: EvaluationReport,
}

impl From<EvaluationReport> for MetricsOutput {
    fn from(report: EvaluationReport) -> Self {
        Self {
            metrics: report.metric_map(),
            report,
        }
    }
}

/// Entity types present in the gold labels.
///
/// Rows holding an unknown id or an invalid tag contribute nothing; the
/// evaluator skips them as well.
pub fn gold_types(scheme: &LabelScheme, label_ids: &[Vec<i64>]) -> BTreeSet<String> {
    let mut types = BTreeSet::new();
    for (row, ids) in label_ids.iter().enumerate() {
        match row_types(scheme, ids) {
            Ok(found) => types.extend(found.into_iter().map(str::to_string)),
            Err(err) => debug!(row, error = %err, "no gold types from malformed row"),
        }
    }
    types
}

fn row_types<'s>(
    scheme: &'s LabelScheme,
    ids: &[i64],
) -> legal_ner_core::Result<Vec<&'s str>> {
    let mut types = Vec::new();
    for &id in ids {
        let Some(label) = scheme.label_for_index(id)? else {
            continue;
        };
        if let Some(ty) = BioTag::parse(label)?.entity_type() {
            types.push(ty);
        }
    }
    Ok(types)
}

/// Score predicted label ids against gold ids, one example per row.
///
/// Scoring is restricted to entity types that occur in the gold labels.
pub fn compute_metrics_from_ids(
    scheme: &LabelScheme,
    predictions: &[Vec<i64>],
    label_ids: &[Vec<i64>],
    lenient_partial: bool,
) -> Result<EvaluationReport> {
    if predictions.len() != label_ids.len() {
        bail!(
            "{} prediction rows for {} label rows",
            predictions.len(),
            label_ids.len()
        );
    }
    let types = gold_types(scheme, label_ids);
    debug!(?types, "scoring gold entity types");

    let config = EvalConfig::new()
        .with_restrict_to(types)
        .with_lenient_partial_types(lenient_partial);
    let evaluator = SpanEvaluator::new(scheme, config);
    let results = evaluator.evaluate_corpus(
        label_ids
            .iter()
            .zip(predictions)
            .map(|(gold, pred)| (gold.as_slice(), pred.as_slice())),
    );
    Ok(results.report())
}

/// Read logits and gold ids from a safetensors file and arg-max the logits.
pub fn load_predictions(path: &Path) -> Result<(Vec<Vec<i64>>, Vec<Vec<i64>>)> {
    let tensors = candle_core::safetensors::load(path, &Device::Cpu)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let tensor = |key: &str| -> Result<&Tensor> {
        tensors
            .get(key)
            .with_context(|| format!("{} has no `{key}` tensor", path.display()))
    };
    let logits = tensor(PREDICTIONS_KEY)?;
    let labels = tensor(LABEL_IDS_KEY)?;

    let (rows, seq_len, num_labels) = logits.dims3()?;
    let label_dims = labels.dims2()?;
    if label_dims != (rows, seq_len) {
        bail!(
            "predictions are [{rows}, {seq_len}, {num_labels}] but label ids are [{}, {}]",
            label_dims.0,
            label_dims.1
        );
    }
    if rows == 0 || seq_len == 0 {
        return Ok((vec![Vec::new(); rows], vec![Vec::new(); rows]));
    }

    let predictions = logits
        .argmax(D::Minus1)?
        .to_dtype(DType::I64)?
        .to_vec2::<i64>()?;
    let gold = labels.to_dtype(DType::I64)?.to_vec2::<i64>()?;
    Ok((predictions, gold))
}

/// Score a prediction file.
pub fn compute_metrics(
    scheme: &LabelScheme,
    path: &Path,
    lenient_partial: bool,
) -> Result<MetricsOutput> {
    let (predictions, label_ids) = load_predictions(path)?;
    let report = compute_metrics_from_ids(scheme, &predictions, &label_ids, lenient_partial)?;
    info!(
        examples = report.documents,
        skipped = report.skipped,
        f1_strict = report.strict().f1,
        "computed metrics"
    );
    Ok(MetricsOutput::from(report))
}

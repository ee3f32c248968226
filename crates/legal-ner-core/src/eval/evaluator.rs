//! # Span Evaluator
//!
//! Scores predicted label sequences against gold ones at the entity level.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::matching::align_spans;
use super::results::NerEvalResults;
use super::spans::{EntitySpan, decode_spans, mask_ignored};
use crate::error::{LegalNerError, Result};
use crate::labels::{BioTag, LabelScheme};

/// Evaluation options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Credit type-mismatched overlaps in the partial regime, as in the
    /// original SemEval definition.
    pub lenient_partial_types: bool,
    /// Score only spans of these types; `None` scores every type.
    pub restrict_to: Option<BTreeSet<String>>,
}

impl EvalConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_lenient_partial_types(mut self, lenient: bool) -> Self {
        self.lenient_partial_types = lenient;
        self
    }

    /// Restrict scoring to a set of entity types.
    #[must_use]
    pub fn with_restrict_to<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restrict_to = Some(types.into_iter().map(Into::into).collect());
        self
    }

    fn keeps(&self, span: &EntitySpan) -> bool {
        self.restrict_to
            .as_ref()
            .is_none_or(|types| types.contains(&span.entity_type))
    }
}

/// Entity-level evaluator bound to a label scheme.
#[derive(Debug, Clone)]
pub struct SpanEvaluator<'s> {
    scheme: &'s LabelScheme,
    config: EvalConfig,
}

impl<'s> SpanEvaluator<'s> {
    pub fn new(scheme: &'s LabelScheme, config: EvalConfig) -> Self {
        Self { scheme, config }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate one document given as tag strings.
    ///
    /// # Errors
    ///
    /// `LengthMismatch`, `InvalidTag`, or `UnknownLabel` for a type outside
    /// the scheme.
    pub fn evaluate_tags<G, P>(&self, gold: &[G], pred: &[P]) -> Result<NerEvalResults>
    where
        G: AsRef<str>,
        P: AsRef<str>,
    {
        let gold: Vec<Option<&str>> = gold.iter().map(|t| Some(t.as_ref())).collect();
        let pred: Vec<Option<&str>> = pred.iter().map(|t| Some(t.as_ref())).collect();
        self.evaluate_masked(&gold, &pred)
    }

    /// Evaluate one document given as label ids, where `IGNORE_INDEX` marks
    /// positions excluded from scoring.
    ///
    /// # Errors
    ///
    /// `LabelIdOutOfRange` for ids outside the scheme, `LengthMismatch` for
    /// sequences of different length.
    pub fn evaluate_ids(&self, gold: &[i64], pred: &[i64]) -> Result<NerEvalResults> {
        let gold = gold
            .iter()
            .map(|&id| self.scheme.label_for_index(id))
            .collect::<Result<Vec<_>>>()?;
        let pred = pred
            .iter()
            .map(|&id| self.scheme.label_for_index(id))
            .collect::<Result<Vec<_>>>()?;
        self.evaluate_masked(&gold, &pred)
    }

    /// Evaluate one document where `None` marks ignored positions.
    pub fn evaluate_masked(
        &self,
        gold: &[Option<&str>],
        pred: &[Option<&str>],
    ) -> Result<NerEvalResults> {
        let (gold_tags, pred_tags) = mask_ignored(gold, pred)?;
        self.check_types(&gold_tags)?;
        self.check_types(&pred_tags)?;

        let gold_spans = self.filter(decode_spans(&gold_tags));
        let pred_spans = self.filter(decode_spans(&pred_tags));
        Ok(self.score_spans(&gold_spans, &pred_spans))
    }

    /// Score already-decoded spans of one document.
    pub fn score_spans(&self, gold: &[EntitySpan], pred: &[EntitySpan]) -> NerEvalResults {
        let alignment = align_spans(gold, pred);
        let lenient = self.config.lenient_partial_types;
        let mut results = NerEvalResults {
            documents: 1,
            ..Default::default()
        };

        for &(g, _, outcome) in &alignment.pairs {
            results.overall.record_pair(outcome, lenient);
            results
                .type_table(&gold[g].entity_type)
                .record_pair(outcome, lenient);
        }
        for &g in &alignment.missed {
            results.overall.record_missed();
            results.type_table(&gold[g].entity_type).record_missed();
        }
        for &p in &alignment.spurious {
            results.overall.record_spurious();
            results.type_table(&pred[p].entity_type).record_spurious();
        }

        results
    }

    /// Evaluate many documents of label ids and merge the counts.
    ///
    /// Documents that cannot be scored are logged and counted as skipped.
    pub fn evaluate_corpus<'a, I>(&self, documents: I) -> NerEvalResults
    where
        I: IntoIterator<Item = (&'a [i64], &'a [i64])>,
    {
        let mut total = NerEvalResults::new();
        for (index, (gold, pred)) in documents.into_iter().enumerate() {
            match self.evaluate_ids(gold, pred) {
                Ok(results) => total.merge(&results),
                Err(e) => {
                    warn!(document = index, error = %e, "skipping document");
                    total.skipped += 1;
                }
            }
        }
        total
    }

    fn check_types(&self, tags: &[BioTag<'_>]) -> Result<()> {
        match tags
            .iter()
            .filter_map(BioTag::entity_type)
            .find(|ty| !self.scheme.contains_type(ty))
        {
            Some(ty) => Err(LegalNerError::UnknownLabel {
                label: ty.to_string(),
                dataset: self.scheme.kind().to_string(),
            }),
            None => Ok(()),
        }
    }

    fn filter(&self, spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
        if self.config.restrict_to.is_none() {
            return spans;
        }
        spans.into_iter().filter(|s| self.config.keeps(s)).collect()
    }
}

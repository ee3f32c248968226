//! # Span Alignment
//!
//! One-to-one pairing of gold and predicted spans. Every overlapping pair is
//! a candidate; candidates are accepted best-first and neither side is reused.

use serde::{Deserialize, Serialize};

use super::spans::EntitySpan;

/// How a gold span and a predicted span relate once paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Same boundaries, same type
    ExactBoth,
    /// Same boundaries, different type
    ExactBoundaryWrongType,
    /// Overlapping boundaries, same type
    OverlapSameType,
    /// Overlapping boundaries, different type
    OverlapWrongType,
}

impl MatchOutcome {
    /// Classify a pair; `None` when the spans share no token.
    pub fn classify(gold: &EntitySpan, pred: &EntitySpan) -> Option<Self> {
        if !gold.overlaps(pred) {
            return None;
        }
        Some(match (gold.same_boundary(pred), gold.same_type(pred)) {
            (true, true) => Self::ExactBoth,
            (true, false) => Self::ExactBoundaryWrongType,
            (false, true) => Self::OverlapSameType,
            (false, false) => Self::OverlapWrongType,
        })
    }

    /// Lower is better.
    fn rank(self) -> u8 {
        match self {
            Self::ExactBoth => 0,
            Self::ExactBoundaryWrongType => 1,
            Self::OverlapSameType => 2,
            Self::OverlapWrongType => 3,
        }
    }
}

/// Result of pairing one document's spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanAlignment {
    /// `(gold index, predicted index, outcome)`
    pub pairs: Vec<(usize, usize, MatchOutcome)>,
    /// Gold spans left unpaired
    pub missed: Vec<usize>,
    /// Predicted spans left unpaired
    pub spurious: Vec<usize>,
}

/// Pair gold and predicted spans greedily by match quality.
///
/// Ties are broken by the smaller then the larger `(start, end, type)` of the
/// two spans, which makes the pairing independent of which side is gold.
pub fn align_spans(gold: &[EntitySpan], pred: &[EntitySpan]) -> SpanAlignment {
    let mut candidates: Vec<(usize, usize, MatchOutcome)> = Vec::new();
    for (g, gold_span) in gold.iter().enumerate() {
        for (p, pred_span) in pred.iter().enumerate() {
            if let Some(outcome) = MatchOutcome::classify(gold_span, pred_span) {
                candidates.push((g, p, outcome));
            }
        }
    }

    candidates.sort_by(|&(g1, p1, o1), &(g2, p2, o2)| {
        let (lo1, hi1) = ordered_keys(&gold[g1], &pred[p1]);
        let (lo2, hi2) = ordered_keys(&gold[g2], &pred[p2]);
        o1.rank()
            .cmp(&o2.rank())
            .then_with(|| lo1.cmp(&lo2))
            .then_with(|| hi1.cmp(&hi2))
    });

    let mut gold_used = vec![false; gold.len()];
    let mut pred_used = vec![false; pred.len()];
    let mut alignment = SpanAlignment::default();

    for (g, p, outcome) in candidates {
        if gold_used[g] || pred_used[p] {
            continue;
        }
        gold_used[g] = true;
        pred_used[p] = true;
        alignment.pairs.push((g, p, outcome));
    }

    alignment.missed = (0..gold.len()).filter(|&g| !gold_used[g]).collect();
    alignment.spurious = (0..pred.len()).filter(|&p| !pred_used[p]).collect();
    alignment
}

type SpanKey<'a> = (usize, usize, &'a str);

fn ordered_keys<'a>(a: &'a EntitySpan, b: &'a EntitySpan) -> (SpanKey<'a>, SpanKey<'a>) {
    let (ka, kb) = (a.key(), b.key());
    if ka <= kb { (ka, kb) } else { (kb, ka) }
}

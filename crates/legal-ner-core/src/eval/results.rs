//! # Evaluation Counts
//!
//! SemEval-2013 Task 9.1 counts per regime, merged across documents and
//! broken down by entity type.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::matching::MatchOutcome;

/// Denominator guard of the F1 formula.
pub const F1_EPSILON: f64 = 1e-9;

/// A scoring regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Exact boundary and exact type
    Strict,
    /// Exact boundary, type ignored
    Exact,
    /// Overlap credited with half weight
    Partial,
    /// Overlap with matching type
    EntType,
}

impl Regime {
    pub const ALL: [Regime; 4] = [Self::Strict, Self::Exact, Self::Partial, Self::EntType];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Exact => "exact",
            Self::Partial => "partial",
            Self::EntType => "ent_type",
        }
    }

    /// Key of this regime's F1 in the training framework's metric dict.
    pub fn metric_key(self) -> &'static str {
        match self {
            Self::Strict => "f1-strict",
            Self::Exact => "f1-exact",
            Self::Partial => "f1-partial",
            Self::EntType => "f1-type-match",
        }
    }

    /// Credit given to a partial match.
    pub fn partial_weight(self) -> f64 {
        match self {
            Self::Partial => 0.5,
            _ => 0.0,
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a paired outcome is counted in one regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Correct,
    Incorrect,
    Partial,
}

impl Regime {
    pub(crate) fn verdict(self, outcome: MatchOutcome, lenient_partial_types: bool) -> Verdict {
        use MatchOutcome::*;
        use Verdict::*;

        match (self, outcome) {
            (_, ExactBoth) => Correct,
            (Self::Strict, _) => Incorrect,
            (Self::Exact, ExactBoundaryWrongType) => Correct,
            (Self::Exact, _) => Incorrect,
            (Self::Partial, OverlapSameType) => Partial,
            (Self::Partial, ExactBoundaryWrongType) if lenient_partial_types => Correct,
            (Self::Partial, OverlapWrongType) if lenient_partial_types => Partial,
            (Self::Partial, _) => Incorrect,
            (Self::EntType, OverlapSameType) => Correct,
            (Self::EntType, _) => Incorrect,
        }
    }
}

/// SemEval counts for one regime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeCounts {
    /// Number of correct matches
    pub correct: usize,
    /// Number of incorrect matches
    pub incorrect: usize,
    /// Number of partial matches
    pub partial: usize,
    /// Number of missed gold entities
    pub missed: usize,
    /// Number of spurious predicted entities
    pub spurious: usize,
}

impl RegimeCounts {
    /// Gold entity count.
    #[must_use]
    pub fn possible(&self) -> usize {
        self.correct + self.incorrect + self.partial + self.missed
    }

    /// Predicted entity count.
    #[must_use]
    pub fn actual(&self) -> usize {
        self.correct + self.incorrect + self.partial + self.spurious
    }

    fn credit(&self, partial_weight: f64) -> f64 {
        self.correct as f64 + partial_weight * self.partial as f64
    }

    #[must_use]
    pub fn precision(&self, partial_weight: f64) -> f64 {
        match self.actual() {
            0 => 0.0,
            actual => self.credit(partial_weight) / actual as f64,
        }
    }

    #[must_use]
    pub fn recall(&self, partial_weight: f64) -> f64 {
        match self.possible() {
            0 => 0.0,
            possible => self.credit(partial_weight) / possible as f64,
        }
    }

    #[must_use]
    pub fn f1(&self, partial_weight: f64) -> f64 {
        let p = self.precision(partial_weight);
        let r = self.recall(partial_weight);
        2.0 * p * r / (p + r + F1_EPSILON)
    }

    pub(crate) fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Correct => self.correct += 1,
            Verdict::Incorrect => self.incorrect += 1,
            Verdict::Partial => self.partial += 1,
        }
    }

    /// Merge counts from another set.
    pub fn merge(&mut self, other: &RegimeCounts) {
        self.correct += other.correct;
        self.incorrect += other.incorrect;
        self.partial += other.partial;
        self.missed += other.missed;
        self.spurious += other.spurious;
    }
}

/// Counts for all four regimes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeTable {
    pub strict: RegimeCounts,
    pub exact: RegimeCounts,
    pub partial: RegimeCounts,
    pub ent_type: RegimeCounts,
}

impl RegimeTable {
    pub fn get(&self, regime: Regime) -> &RegimeCounts {
        match regime {
            Regime::Strict => &self.strict,
            Regime::Exact => &self.exact,
            Regime::Partial => &self.partial,
            Regime::EntType => &self.ent_type,
        }
    }

    fn get_mut(&mut self, regime: Regime) -> &mut RegimeCounts {
        match regime {
            Regime::Strict => &mut self.strict,
            Regime::Exact => &mut self.exact,
            Regime::Partial => &mut self.partial,
            Regime::EntType => &mut self.ent_type,
        }
    }

    pub(crate) fn record_pair(&mut self, outcome: MatchOutcome, lenient_partial_types: bool) {
        for regime in Regime::ALL {
            self.get_mut(regime)
                .record(regime.verdict(outcome, lenient_partial_types));
        }
    }

    pub(crate) fn record_missed(&mut self) {
        for regime in Regime::ALL {
            self.get_mut(regime).missed += 1;
        }
    }

    pub(crate) fn record_spurious(&mut self) {
        for regime in Regime::ALL {
            self.get_mut(regime).spurious += 1;
        }
    }

    pub fn merge(&mut self, other: &RegimeTable) {
        for regime in Regime::ALL {
            self.get_mut(regime).merge(other.get(regime));
        }
    }
}

/// Complete evaluation counts, overall and per entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerEvalResults {
    pub overall: RegimeTable,
    /// Pairs and misses count toward the gold type, spurious spans toward
    /// the predicted type.
    pub by_type: BTreeMap<String, RegimeTable>,
    /// Documents scored
    pub documents: usize,
    /// Documents skipped because their labels could not be scored
    pub skipped: usize,
}

impl NerEvalResults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self, regime: Regime) -> &RegimeCounts {
        self.overall.get(regime)
    }

    pub(crate) fn type_table(&mut self, entity_type: &str) -> &mut RegimeTable {
        self.by_type.entry(entity_type.to_string()).or_default()
    }

    /// Merge results from another evaluation.
    pub fn merge(&mut self, other: &NerEvalResults) {
        self.overall.merge(&other.overall);
        for (entity_type, table) in &other.by_type {
            self.type_table(entity_type).merge(table);
        }
        self.documents += other.documents;
        self.skipped += other.skipped;
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Regime::Strict, MatchOutcome::ExactBoundaryWrongType, false, Verdict::Incorrect)]
    #[case(Regime::Exact, MatchOutcome::ExactBoundaryWrongType, false, Verdict::Correct)]
    #[case(Regime::Exact, MatchOutcome::OverlapSameType, false, Verdict::Incorrect)]
    #[case(Regime::Partial, MatchOutcome::OverlapSameType, false, Verdict::Partial)]
    #[case(Regime::Partial, MatchOutcome::ExactBoundaryWrongType, false, Verdict::Incorrect)]
    #[case(Regime::Partial, MatchOutcome::ExactBoundaryWrongType, true, Verdict::Correct)]
    #[case(Regime::Partial, MatchOutcome::OverlapWrongType, false, Verdict::Incorrect)]
    #[case(Regime::Partial, MatchOutcome::OverlapWrongType, true, Verdict::Partial)]
    #[case(Regime::EntType, MatchOutcome::OverlapSameType, false, Verdict::Correct)]
    #[case(Regime::EntType, MatchOutcome::ExactBoundaryWrongType, true, Verdict::Incorrect)]
    fn test_verdicts(
        #[case] regime: Regime,
        #[case] outcome: MatchOutcome,
        #[case] lenient: bool,
        #[case] expected: Verdict,
    ) {
        assert_eq!(regime.verdict(outcome, lenient), expected);
    }

    #[test]
    fn test_exact_both_is_always_correct() {
        for regime in Regime::ALL {
            for lenient in [false, true] {
                assert_eq!(
                    regime.verdict(MatchOutcome::ExactBoth, lenient),
                    Verdict::Correct
                );
            }
        }
    }

    #[test]
    fn test_zero_denominators() {
        let counts = RegimeCounts::default();
        assert_eq!(counts.precision(0.0), 0.0);
        assert_eq!(counts.recall(0.5), 0.0);
        assert_eq!(counts.f1(0.5), 0.0);
    }

    #[test]
    fn test_partial_weight() {
        let counts = RegimeCounts {
            correct: 1,
            partial: 1,
            missed: 2,
            ..Default::default()
        };
        assert_eq!(counts.possible(), 4);
        assert_eq!(counts.actual(), 2);
        assert!((counts.precision(0.5) - 0.75).abs() < 1e-9);
        assert!((counts.recall(0.5) - 0.375).abs() < 1e-9);
        assert!((counts.precision(0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_merge() {
        let mut a = NerEvalResults::new();
        a.overall.record_pair(MatchOutcome::ExactBoth, false);
        a.type_table("COURT").record_pair(MatchOutcome::ExactBoth, false);
        a.documents = 1;

        let mut b = NerEvalResults::new();
        b.overall.record_missed();
        b.type_table("COURT").record_missed();
        b.type_table("JUDGE").record_spurious();
        b.documents = 1;
        b.skipped = 1;

        a.merge(&b);
        assert_eq!(a.documents, 2);
        assert_eq!(a.skipped, 1);
        assert_eq!(a.counts(Regime::Strict).correct, 1);
        assert_eq!(a.counts(Regime::Partial).missed, 1);
        assert_eq!(a.by_type["COURT"].ent_type.possible(), 2);
        assert_eq!(a.by_type["JUDGE"].exact.spurious, 1);
    }
}

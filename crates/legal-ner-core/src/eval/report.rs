//! # Evaluation Report
//!
//! Precision, recall and F1 per regime, derived from merged counts.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::results::{NerEvalResults, Regime, RegimeCounts, RegimeTable};

/// Scores of one regime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeScore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub counts: RegimeCounts,
}

impl RegimeScore {
    pub fn from_counts(counts: RegimeCounts, regime: Regime) -> Self {
        let weight = regime.partial_weight();
        Self {
            precision: counts.precision(weight),
            recall: counts.recall(weight),
            f1: counts.f1(weight),
            counts,
        }
    }
}

/// Scores of all four regimes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub strict: RegimeScore,
    pub exact: RegimeScore,
    pub partial: RegimeScore,
    pub ent_type: RegimeScore,
}

impl ScoreTable {
    fn from_table(table: &RegimeTable) -> Self {
        let score = |regime| RegimeScore::from_counts(*table.get(regime), regime);
        Self {
            strict: score(Regime::Strict),
            exact: score(Regime::Exact),
            partial: score(Regime::Partial),
            ent_type: score(Regime::EntType),
        }
    }

    pub fn get(&self, regime: Regime) -> &RegimeScore {
        match regime {
            Regime::Strict => &self.strict,
            Regime::Exact => &self.exact,
            Regime::Partial => &self.partial,
            Regime::EntType => &self.ent_type,
        }
    }
}

/// Final report of an evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    #[serde(flatten)]
    pub overall: ScoreTable,
    pub by_type: BTreeMap<String, ScoreTable>,
    pub documents: usize,
    pub skipped: usize,
}

impl EvaluationReport {
    pub fn strict(&self) -> &RegimeScore {
        &self.overall.strict
    }

    pub fn exact(&self) -> &RegimeScore {
        &self.overall.exact
    }

    pub fn partial(&self) -> &RegimeScore {
        &self.overall.partial
    }

    pub fn ent_type(&self) -> &RegimeScore {
        &self.overall.ent_type
    }

    pub fn score(&self, regime: Regime) -> &RegimeScore {
        self.overall.get(regime)
    }

    /// F1 per regime under the training framework's metric names.
    ///
    /// # Examples
    /// ```
    /// use legal_ner_core::EvaluationReport;
    ///
    /// let metrics = EvaluationReport::default().metric_map();
    /// assert_eq!(metrics.len(), 4);
    /// assert_eq!(metrics["f1-type-match"], 0.0);
    /// ```
    pub fn metric_map(&self) -> BTreeMap<String, f64> {
        Regime::ALL
            .iter()
            .map(|&regime| (regime.metric_key().to_string(), self.score(regime).f1))
            .collect()
    }

    /// Format as markdown table.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::from(
            "| Regime | Precision | Recall | F1 | COR | INC | PAR | MIS | SPU |\n\
             |--------|-----------|--------|----|-----|-----|-----|-----|-----|\n",
        );
        for regime in Regime::ALL {
            let s = self.score(regime);
            let c = &s.counts;
            out.push_str(&format!(
                "| {} | {:.1}% | {:.1}% | {:.1}% | {} | {} | {} | {} | {} |\n",
                regime,
                s.precision * 100.0,
                s.recall * 100.0,
                s.f1 * 100.0,
                c.correct,
                c.incorrect,
                c.partial,
                c.missed,
                c.spurious,
            ));
        }
        if !self.by_type.is_empty() {
            out.push_str("\n| Type | Strict F1 | Exact F1 | Partial F1 | Type F1 | Support |\n");
            out.push_str("|------|-----------|----------|------------|---------|---------|\n");
            for (ty, table) in &self.by_type {
                out.push_str(&format!(
                    "| {} | {:.1}% | {:.1}% | {:.1}% | {:.1}% | {} |\n",
                    ty,
                    table.strict.f1 * 100.0,
                    table.exact.f1 * 100.0,
                    table.partial.f1 * 100.0,
                    table.ent_type.f1 * 100.0,
                    table.strict.counts.possible(),
                ));
            }
        }
        out
    }
}

impl From<&NerEvalResults> for EvaluationReport {
    fn from(results: &NerEvalResults) -> Self {
        Self {
            overall: ScoreTable::from_table(&results.overall),
            by_type: results
                .by_type
                .iter()
                .map(|(ty, table)| (ty.clone(), ScoreTable::from_table(table)))
                .collect(),
            documents: results.documents,
            skipped: results.skipped,
        }
    }
}

impl NerEvalResults {
    /// Derive precision, recall and F1 from the counts.
    #[must_use]
    pub fn report(&self) -> EvaluationReport {
        EvaluationReport::from(self)
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markdown())
    }
}

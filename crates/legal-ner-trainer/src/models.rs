//! Pretrained checkpoint catalog and the model selection keyword.

use std::fmt;
use std::str::FromStr;

use legal_ner_core::{DatasetKind, LegalNerError};

/// Every checkpoint fine-tuned by the `all` selection.
pub const ALL_CHECKPOINTS: &[&str] = &[
    "dslim/bert-large-NER",
    "Jean-Baptiste/roberta-large-ner-english",
    "nlpaueb/legal-bert-base-uncased",
    "saibo/legal-roberta-base",
    "nlpaueb/bert-base-uncased-eurlex",
    "nlpaueb/bert-base-uncased-echr",
    "studio-ousia/luke-base",
    "studio-ousia/luke-large",
    "studio-ousia/mluke-base",
];

/// Which checkpoints to fine-tune.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSelection {
    All,
    Roberta,
    LukeBase,
    MlukeBase,
}

impl ModelSelection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Roberta => "roberta",
            Self::LukeBase => "luke_b",
            Self::MlukeBase => "mluke_b",
        }
    }

    /// Checkpoints in training order.
    pub fn checkpoints(self) -> &'static [&'static str] {
        match self {
            Self::All => ALL_CHECKPOINTS,
            Self::Roberta => &["roberta-base"],
            Self::LukeBase => &["studio-ousia/luke-base"],
            Self::MlukeBase => &["studio-ousia/mluke-base"],
        }
    }

    /// Reject selections the dataset was not set up for.
    ///
    /// The German and combined corpora are multilingual and only supported
    /// with mLUKE.
    pub fn ensure_compatible(self, dataset: DatasetKind) -> Result<(), LegalNerError> {
        match dataset {
            DatasetKind::German | DatasetKind::Combined if self != Self::MlukeBase => {
                Err(LegalNerError::IncompatibleModel {
                    dataset: dataset.to_string(),
                    required: Self::MlukeBase.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ModelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelSelection {
    type Err = LegalNerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "roberta" => Ok(Self::Roberta),
            "luke_b" => Ok(Self::LukeBase),
            "mluke_b" => Ok(Self::MlukeBase),
            _ => Err(LegalNerError::UnsupportedModel(s.to_string())),
        }
    }
}

/// Whether a checkpoint uses a byte-level BPE tokenizer that needs a prefix
/// space for pre-tokenized input (RoBERTa and LUKE families).
pub fn uses_prefix_space(checkpoint: &str) -> bool {
    checkpoint.contains("luke") || checkpoint.contains("roberta")
}

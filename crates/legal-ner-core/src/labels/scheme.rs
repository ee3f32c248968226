//! # Label Scheme
//!
//! The ordered label vocabulary for one dataset variant. Index 0 is always
//! `O`, followed by every `B-<type>` and then every `I-<type>` in catalog
//! order, so the mapping is identical across training and evaluation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LegalNerError, Result};
use crate::labels::bio::BioTag;
use crate::labels::catalog::{COMMON_TYPES, GERMAN_TYPES, INDIAN_TYPES};

/// Label id marking tokens that never contribute to loss or scoring.
pub const IGNORE_INDEX: i64 = -100;

/// Supported dataset variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Indian court judgements annotated with character spans.
    Indian,
    /// German federal court decisions, pre-tokenized with tags.
    German,
    /// Indian and German data relabeled into a common type set.
    Combined,
}

impl DatasetKind {
    /// Every supported variant.
    pub const ALL: [DatasetKind; 3] = [Self::Indian, Self::German, Self::Combined];

    /// The CLI keyword for this variant.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Indian => "indian",
            Self::German => "german",
            Self::Combined => "combined",
        }
    }

    /// Entity types of this variant in label order.
    #[must_use]
    pub fn entity_types(self) -> &'static [&'static str] {
        match self {
            Self::Indian => INDIAN_TYPES,
            Self::German => GERMAN_TYPES,
            Self::Combined => COMMON_TYPES,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = LegalNerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indian" => Ok(Self::Indian),
            "german" => Ok(Self::German),
            "combined" => Ok(Self::Combined),
            _ => Err(LegalNerError::UnsupportedDataset(s.to_string())),
        }
    }
}

/// Ordered label vocabulary for one dataset variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelScheme {
    kind: DatasetKind,
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelScheme {
    /// Build the scheme for a dataset variant.
    ///
    /// # Examples
    /// ```
    /// use legal_ner_core::{DatasetKind, LabelScheme};
    ///
    /// let scheme = LabelScheme::for_dataset(DatasetKind::Indian);
    /// assert_eq!(scheme.len(), 29);
    /// assert_eq!(scheme.label(0), Some("O"));
    /// assert_eq!(scheme.id("B-COURT").unwrap(), 1);
    /// assert_eq!(scheme.id("I-COURT").unwrap(), 15);
    /// ```
    #[must_use]
    pub fn for_dataset(kind: DatasetKind) -> Self {
        let types = kind.entity_types();
        let mut labels = Vec::with_capacity(1 + types.len() * 2);
        labels.push("O".to_string());
        labels.extend(types.iter().map(|ty| format!("B-{ty}")));
        labels.extend(types.iter().map(|ty| format!("I-{ty}")));

        let index = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();

        Self {
            kind,
            labels,
            index,
        }
    }

    /// Dataset variant this scheme was built for.
    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Number of labels, including `O`.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always `false`: every scheme contains at least `O`.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All labels in index order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Index of the non-entity tag.
    pub fn outside_id(&self) -> usize {
        0
    }

    /// Entity types in label order.
    pub fn entity_types(&self) -> &'static [&'static str] {
        self.kind.entity_types()
    }

    /// Check whether an entity type belongs to this scheme.
    pub fn contains_type(&self, ty: &str) -> bool {
        self.entity_types().contains(&ty)
    }

    /// Index of a label string.
    ///
    /// # Errors
    ///
    /// `InvalidTag` if the string is not a BIO tag, `UnknownLabel` if its
    /// type is not part of this scheme.
    pub fn id(&self, label: &str) -> Result<usize> {
        BioTag::parse(label)?;
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| LegalNerError::UnknownLabel {
                label: label.to_string(),
                dataset: self.kind.to_string(),
            })
    }

    /// Index of a parsed tag.
    pub fn id_of(&self, tag: BioTag<'_>) -> Result<usize> {
        match tag {
            BioTag::Outside => Ok(self.outside_id()),
            other => self.id(&other.to_string()),
        }
    }

    /// Label string for an index.
    pub fn label(&self, id: usize) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Label string for a model-side id, where `IGNORE_INDEX` maps to `None`.
    ///
    /// # Errors
    ///
    /// `LabelIdOutOfRange` for any other id outside the scheme.
    pub fn label_for_index(&self, id: i64) -> Result<Option<&str>> {
        if id == IGNORE_INDEX {
            return Ok(None);
        }
        usize::try_from(id)
            .ok()
            .and_then(|i| self.label(i))
            .map(Some)
            .ok_or(LegalNerError::LabelIdOutOfRange {
                id,
                len: self.len(),
            })
    }

    /// `id -> label` map in the shape the training framework expects.
    pub fn id2label(&self) -> BTreeMap<usize, String> {
        self.labels.iter().cloned().enumerate().collect()
    }

    /// `label -> id` map in the shape the training framework expects.
    pub fn label2id(&self) -> BTreeMap<String, usize> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect()
    }
}

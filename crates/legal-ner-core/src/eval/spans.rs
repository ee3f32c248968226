//! # Entity Spans
//!
//! Reconstruction of contiguous entity spans from per-token BIO tags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LegalNerError, Result};
use crate::labels::BioTag;

/// A maximal run of tokens sharing one entity type. `end` is inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub entity_type: String,
}

impl EntitySpan {
    pub fn new(start: usize, end: usize, entity_type: impl Into<String>) -> Self {
        Self {
            start,
            end,
            entity_type: entity_type.into(),
        }
    }

    /// Number of tokens covered.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Spans always cover at least one token.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Same start and end.
    pub fn same_boundary(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end
    }

    /// Share at least one token.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn same_type(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type
    }

    /// Ordering key used to break ties during matching.
    pub(crate) fn key(&self) -> (usize, usize, &str) {
        (self.start, self.end, &self.entity_type)
    }
}

impl fmt::Display for EntitySpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}..={}]", self.entity_type, self.start, self.end)
    }
}

/// Decode BIO tags into entity spans.
///
/// `O` closes the open span, `B-T` closes it and opens a `T` span, and `I-T`
/// extends an open `T` span or else opens a new one.
///
/// # Examples
/// ```
/// use legal_ner_core::{BioTag, EntitySpan, decode_spans};
///
/// let tags: Vec<_> = ["B-COURT", "I-COURT", "O", "I-JUDGE"]
///     .iter()
///     .map(|t| BioTag::parse(t).unwrap())
///     .collect();
/// assert_eq!(
///     decode_spans(&tags),
///     [EntitySpan::new(0, 1, "COURT"), EntitySpan::new(3, 3, "JUDGE")]
/// );
/// ```
pub fn decode_spans(tags: &[BioTag<'_>]) -> Vec<EntitySpan> {
    let mut spans = Vec::new();
    let mut open: Option<(usize, &str)> = None;

    let mut close = |open: &mut Option<(usize, &str)>, end: usize| {
        if let Some((start, ty)) = open.take() {
            spans.push(EntitySpan::new(start, end, ty));
        }
    };

    for (i, tag) in tags.iter().enumerate() {
        match *tag {
            BioTag::Outside => close(&mut open, i.saturating_sub(1)),
            BioTag::Begin(ty) => {
                close(&mut open, i.saturating_sub(1));
                open = Some((i, ty));
            }
            BioTag::Inside(ty) => match open {
                Some((_, current)) if current == ty => {}
                _ => {
                    close(&mut open, i.saturating_sub(1));
                    open = Some((i, ty));
                }
            },
        }
    }
    close(&mut open, tags.len().saturating_sub(1));

    spans
}

/// Drop positions whose gold tag is ignored and parse what remains.
///
/// A predicted ignore at a scored position counts as `O`.
pub(crate) fn mask_ignored<'a>(
    gold: &[Option<&'a str>],
    pred: &[Option<&'a str>],
) -> Result<(Vec<BioTag<'a>>, Vec<BioTag<'a>>)> {
    if gold.len() != pred.len() {
        return Err(LegalNerError::LengthMismatch {
            expected: gold.len(),
            actual: pred.len(),
        });
    }

    let mut gold_tags = Vec::with_capacity(gold.len());
    let mut pred_tags = Vec::with_capacity(pred.len());
    for (g, p) in gold.iter().zip(pred) {
        let Some(g) = *g else { continue };
        gold_tags.push(BioTag::parse(g)?);
        pred_tags.push(match *p {
            Some(p) => BioTag::parse(p)?,
            None => BioTag::Outside,
        });
    }
    Ok((gold_tags, pred_tags))
}

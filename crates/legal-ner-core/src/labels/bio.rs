//! # BIO Tags
//!
//! Parsing and classification of `O` / `B-<type>` / `I-<type>` tag strings.

use std::fmt;

use crate::error::{LegalNerError, Result};

/// A parsed BIO tag borrowing its entity type from the source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BioTag<'a> {
    /// Token outside any entity.
    Outside,
    /// First token of an entity of the given type.
    Begin(&'a str),
    /// Continuation token of an entity of the given type.
    Inside(&'a str),
}

impl<'a> BioTag<'a> {
    /// Parse a tag string.
    ///
    /// # Errors
    ///
    /// Returns `LegalNerError::InvalidTag` for anything other than `O`,
    /// `B-<type>` or `I-<type>` with a non-empty type.
    ///
    /// # Examples
    /// ```
    /// use legal_ner_core::BioTag;
    ///
    /// assert_eq!(BioTag::parse("B-COURT").unwrap(), BioTag::Begin("COURT"));
    /// assert_eq!(BioTag::parse("O").unwrap(), BioTag::Outside);
    /// assert!(BioTag::parse("X-COURT").is_err());
    /// ```
    pub fn parse(tag: &'a str) -> Result<Self> {
        if tag == "O" {
            return Ok(BioTag::Outside);
        }
        match tag.split_once('-') {
            Some(("B", ty)) if !ty.is_empty() => Ok(BioTag::Begin(ty)),
            Some(("I", ty)) if !ty.is_empty() => Ok(BioTag::Inside(ty)),
            _ => Err(LegalNerError::InvalidTag(tag.to_string())),
        }
    }

    /// Get the entity type for this tag.
    pub fn entity_type(&self) -> Option<&'a str> {
        match self {
            BioTag::Begin(ty) | BioTag::Inside(ty) => Some(ty),
            BioTag::Outside => None,
        }
    }

    /// The same tag with an `Inside` prefix promoted to `Begin`.
    pub fn to_begin(self) -> Self {
        match self {
            BioTag::Inside(ty) => BioTag::Begin(ty),
            other => other,
        }
    }

    /// Check if transitioning from `from` tag to `to` tag is well-formed IOB2.
    ///
    /// An `I-T` tag must follow `B-T` or `I-T`.
    pub fn is_valid_transition(from: BioTag<'_>, to: BioTag<'_>) -> bool {
        match to {
            BioTag::Inside(ty) => from.entity_type() == Some(ty),
            BioTag::Outside | BioTag::Begin(_) => true,
        }
    }

    /// Check a whole sequence (starting after an implicit `O`).
    pub fn is_well_formed(tags: &[BioTag<'_>]) -> bool {
        let mut prev = BioTag::Outside;
        for &tag in tags {
            if !BioTag::is_valid_transition(prev, tag) {
                return false;
            }
            prev = tag;
        }
        true
    }
}

impl fmt::Display for BioTag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BioTag::Outside => write!(f, "O"),
            BioTag::Begin(ty) => write!(f, "B-{ty}"),
            BioTag::Inside(ty) => write!(f, "I-{ty}"),
        }
    }
}

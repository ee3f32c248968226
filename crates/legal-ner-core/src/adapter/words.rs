//! # Word Segmentation and Span Labeling
//!
//! Splits raw judgement text into words with byte offsets and projects
//! character-offset annotations onto those words as BIO tags.

use std::fmt;
use std::ops::Range;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::labels::LabelScheme;

/// Word pattern: alphanumeric runs joined by inner `-`, `'`, `.` or `/`
/// (e.g. `Sec.302`, `w.e.f`, `2/3`), or a single other visible character.
const WORD_PATTERN: &str = r"\w+(?:[-'’./]\w+)*|[^\w\s]";

/// A word extracted from a document with its byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word<'t> {
    /// The word text
    pub text: &'t str,
    /// Start byte offset in the document
    pub start: usize,
    /// End byte offset in the document (exclusive)
    pub end: usize,
}

/// An entity annotation in character (Unicode scalar) offsets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharSpan {
    /// First character of the entity
    pub start: usize,
    /// One past the last character of the entity
    pub end: usize,
    /// Entity type, without BIO prefix
    pub label: String,
}

impl CharSpan {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }
}

/// A recoverable problem found while aligning annotations to words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignmentWarning {
    /// Offsets are empty, reversed, or run past the end of the text.
    OutOfBounds {
        start: usize,
        end: usize,
        text_chars: usize,
    },
    /// The span covers no word (whitespace only).
    NoWords {
        start: usize,
        end: usize,
        label: String,
    },
    /// The span touches a word already labeled by an earlier annotation.
    Overlap {
        start: usize,
        end: usize,
        label: String,
    },
    /// The annotation type is not part of the label scheme.
    UnknownLabel { label: String },
    /// The tag list of a pre-tokenized record does not match its tokens.
    TagCountMismatch { tokens: usize, tags: usize },
    /// A record could not be parsed and was skipped.
    Unparseable { reason: String },
}

impl fmt::Display for AlignmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds {
                start,
                end,
                text_chars,
            } => write!(
                f,
                "span {start}..{end} is outside a text of {text_chars} characters"
            ),
            Self::NoWords { start, end, label } => {
                write!(f, "{label} span {start}..{end} covers no word")
            }
            Self::Overlap { start, end, label } => write!(
                f,
                "{label} span {start}..{end} overlaps an earlier annotation"
            ),
            Self::UnknownLabel { label } => write!(f, "unknown label {label:?}"),
            Self::TagCountMismatch { tokens, tags } => {
                write!(f, "{tokens} tokens but {tags} tags")
            }
            Self::Unparseable { reason } => write!(f, "unparseable record: {reason}"),
        }
    }
}

/// Regex-based word segmenter for raw document text.
#[derive(Debug, Clone)]
pub struct WordSegmenter {
    re_word: Regex,
}

impl WordSegmenter {
    /// Create a new segmenter.
    ///
    /// # Errors
    ///
    /// Returns `LegalNerError::Regex` if the word pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            re_word: Regex::new(WORD_PATTERN)?,
        })
    }

    /// Split text into words.
    ///
    /// # Examples
    /// ```
    /// use legal_ner_core::WordSegmenter;
    ///
    /// let segmenter = WordSegmenter::new().unwrap();
    /// let words = segmenter.segment("Sec. 302 IPC, Delhi High Court");
    /// let texts: Vec<_> = words.iter().map(|w| w.text).collect();
    /// assert_eq!(texts, ["Sec", ".", "302", "IPC", ",", "Delhi", "High", "Court"]);
    /// ```
    pub fn segment<'t>(&self, text: &'t str) -> Vec<Word<'t>> {
        self.re_word
            .find_iter(text)
            .map(|m| Word {
                text: m.as_str(),
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }
}

/// Indices of the words overlapping the byte range `start..end`.
fn covered_words(words: &[Word<'_>], start: usize, end: usize) -> Range<usize> {
    let first = words.partition_point(|w| w.end <= start);
    let last = words.partition_point(|w| w.start < end);
    first..last.max(first)
}

/// Byte offset of every character boundary, including the end of the text.
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect()
}

/// Project character-offset annotations onto words as BIO tags.
///
/// Every word overlapping an annotation is tagged, so a span that cuts a word
/// is widened to the tightest enclosing run of words. Annotations are applied
/// in `(start, end)` order and the earlier one wins on conflict. `words`
/// must be in document order, as [`WordSegmenter::segment`] returns them.
pub fn label_words(
    text: &str,
    words: &[Word<'_>],
    spans: &[CharSpan],
    scheme: &LabelScheme,
) -> (Vec<String>, Vec<AlignmentWarning>) {
    let mut tags = vec!["O".to_string(); words.len()];
    let mut taken = vec![false; words.len()];
    let mut warnings = Vec::new();

    let boundaries = char_boundaries(text);
    let text_chars = boundaries.len() - 1;

    let mut ordered: Vec<&CharSpan> = spans.iter().collect();
    ordered.sort_by_key(|span| (span.start, span.end));

    for span in ordered {
        if !scheme.contains_type(&span.label) {
            warnings.push(AlignmentWarning::UnknownLabel {
                label: span.label.clone(),
            });
            continue;
        }
        if span.start >= span.end || span.end > text_chars {
            warnings.push(AlignmentWarning::OutOfBounds {
                start: span.start,
                end: span.end,
                text_chars,
            });
            continue;
        }

        let byte_start = boundaries[span.start];
        let byte_end = boundaries[span.end];
        let covered = covered_words(words, byte_start, byte_end);

        if covered.is_empty() {
            warnings.push(AlignmentWarning::NoWords {
                start: span.start,
                end: span.end,
                label: span.label.clone(),
            });
            continue;
        }
        if taken[covered.clone()].contains(&true) {
            warnings.push(AlignmentWarning::Overlap {
                start: span.start,
                end: span.end,
                label: span.label.clone(),
            });
            continue;
        }

        for (n, i) in covered.enumerate() {
            let prefix = if n == 0 { "B" } else { "I" };
            tags[i] = format!("{prefix}-{}", span.label);
            taken[i] = true;
        }
    }

    (tags, warnings)
}

#[cfg(test)]
mod tests {
    use quickcheck::QuickCheck;

    use super::*;
    use crate::labels::DatasetKind;

    fn indian() -> LabelScheme {
        LabelScheme::for_dataset(DatasetKind::Indian)
    }

    #[test]
    fn test_segment_offsets() {
        let segmenter = WordSegmenter::new().unwrap();
        let text = "In the High Court of Delhi";
        let words = segmenter.segment(text);

        assert_eq!(words.len(), 6);
        for word in &words {
            assert_eq!(&text[word.start..word.end], word.text);
        }
    }

    #[test]
    fn test_segment_keeps_compound_tokens() {
        let segmenter = WordSegmenter::new().unwrap();
        let words = segmenter.segment("Crl.A. 1/2019 w.e.f. today");
        let texts: Vec<_> = words.iter().map(|w| w.text).collect();
        assert_eq!(texts, ["Crl.A", ".", "1/2019", "w.e.f", ".", "today"]);
    }

    #[test]
    fn test_segment_empty() {
        let segmenter = WordSegmenter::new().unwrap();
        assert!(segmenter.segment("").is_empty());
        assert!(segmenter.segment("   \n\t").is_empty());
    }

    #[test]
    fn test_label_words_basic() {
        let segmenter = WordSegmenter::new().unwrap();
        let text = "Heard by Justice R. Banumathi in Supreme Court";
        let words = segmenter.segment(text);
        let spans = vec![
            CharSpan::new(17, 29, "JUDGE"),
            CharSpan::new(33, 46, "COURT"),
        ];

        let (tags, warnings) = label_words(text, &words, &spans, &indian());
        assert!(warnings.is_empty());
        assert_eq!(
            tags,
            [
                "O", "O", "O", "B-JUDGE", "I-JUDGE", "I-JUDGE", "O", "B-COURT", "I-COURT"
            ]
        );
    }

    #[test]
    fn test_covered_words() {
        let segmenter = WordSegmenter::new().unwrap();
        let text = "in the High Court of Delhi";
        let words = segmenter.segment(text);

        assert_eq!(covered_words(&words, 7, 17), 2..4);
        assert_eq!(covered_words(&words, 8, 9), 2..3);
        assert_eq!(covered_words(&words, 6, 7), 2..2);
        assert_eq!(covered_words(&words, 0, text.len()), 0..6);
        assert!(covered_words(&words, text.len(), text.len()).is_empty());
    }

    #[test]
    fn prop_covered_words_matches_scan() {
        fn prop(text: String, a: usize, b: usize) -> bool {
            let segmenter = WordSegmenter::new().unwrap();
            let words = segmenter.segment(&text);
            let (a, b) = (a % (text.len() + 1), b % (text.len() + 1));
            let (start, end) = (a.min(b), a.max(b));
            let scanned: Vec<usize> = words
                .iter()
                .enumerate()
                .filter(|(_, w)| w.start < end && start < w.end)
                .map(|(i, _)| i)
                .collect();
            covered_words(&words, start, end).collect::<Vec<_>>() == scanned
        }
        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(String, usize, usize) -> bool);
    }

    #[test]
    fn test_label_words_widens_partial_word() {
        let segmenter = WordSegmenter::new().unwrap();
        let text = "the Petitioners filed";
        let words = segmenter.segment(text);
        // "Petition" only; the whole word is tagged.
        let spans = vec![CharSpan::new(4, 12, "PETITIONER")];

        let (tags, warnings) = label_words(text, &words, &spans, &indian());
        assert!(warnings.is_empty());
        assert_eq!(tags, ["O", "B-PETITIONER", "O"]);
    }

    #[test]
    fn test_label_words_uses_character_offsets() {
        let segmenter = WordSegmenter::new().unwrap();
        // Multi-byte characters before the entity.
        let text = "«Müller» vs. State";
        let words = segmenter.segment(text);
        let spans = vec![CharSpan::new(1, 7, "PETITIONER")];

        let (tags, warnings) = label_words(text, &words, &spans, &indian());
        assert!(warnings.is_empty());
        assert_eq!(tags[1], "B-PETITIONER");
        assert_eq!(words[1].text, "Müller");
    }

    #[test]
    fn test_label_words_warnings() {
        let segmenter = WordSegmenter::new().unwrap();
        let text = "State of Kerala  v. Joseph";
        let words = segmenter.segment(text);
        let spans = vec![
            CharSpan::new(0, 15, "RESPONDENT"),
            CharSpan::new(9, 15, "GPE"),
            CharSpan::new(15, 16, "OTHER_PERSON"),
            CharSpan::new(20, 90, "PETITIONER"),
            CharSpan::new(20, 26, "SPACESHIP"),
        ];

        let (tags, warnings) = label_words(text, &words, &spans, &indian());
        assert_eq!(tags[..3], ["B-RESPONDENT", "I-RESPONDENT", "I-RESPONDENT"]);
        assert_eq!(tags[5], "O");
        assert_eq!(warnings.len(), 4);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, AlignmentWarning::Overlap { label, .. } if label == "GPE")));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, AlignmentWarning::NoWords { .. })));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, AlignmentWarning::OutOfBounds { .. })));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, AlignmentWarning::UnknownLabel { .. })));
    }
}

//! # Sub-word Label Alignment
//!
//! Turns a labeled word sequence into fixed-length model inputs: the first
//! piece of every word carries the word's label id, everything else carries
//! [`IGNORE_INDEX`]. Long sequences are truncated or cut into windows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::datasets::WordSequence;
use super::subword::{SubwordEncoding, SubwordTokenizer};
use crate::error::{LegalNerError, Result};
use crate::labels::{BioTag, IGNORE_INDEX, LabelScheme};

/// What to do with sequences longer than the model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TruncationPolicy {
    /// Keep the first window only.
    #[default]
    Truncate,
    /// Keep every window; consecutive windows share `stride` pieces.
    Window { stride: usize },
}

/// Sub-word alignment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Maximum pieces per example, special tokens included
    pub max_length: usize,
    /// Overflow handling
    pub truncation: TruncationPolicy,
    /// Pad every example to `max_length`
    pub pad_to_max_length: bool,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            max_length: 512,
            truncation: TruncationPolicy::Truncate,
            pad_to_max_length: true,
        }
    }
}

impl AlignmentConfig {
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.truncation = truncation;
        self
    }

    pub fn with_padding(mut self, pad_to_max_length: bool) -> Self {
        self.pad_to_max_length = pad_to_max_length;
        self
    }

    /// Content pieces per window for sequences encoded by `tokenizer`.
    ///
    /// # Errors
    ///
    /// Returns `LegalNerError::InvalidConfig` when `max_length` leaves no
    /// room next to the tokenizer's special tokens, or the window stride
    /// does not fit inside what remains.
    pub fn content_budget_for(&self, tokenizer: &dyn SubwordTokenizer) -> Result<usize> {
        self.content_budget(tokenizer.num_special_tokens()?)
    }

    /// Content pieces per window once `specials` special tokens are added.
    fn content_budget(&self, specials: usize) -> Result<usize> {
        let budget = self.max_length.saturating_sub(specials);
        if budget == 0 {
            return Err(LegalNerError::InvalidConfig(format!(
                "max_length {} leaves no room next to {specials} special tokens",
                self.max_length
            )));
        }
        if let TruncationPolicy::Window { stride } = self.truncation {
            if stride >= budget {
                return Err(LegalNerError::InvalidConfig(format!(
                    "stride {stride} must be smaller than the {budget} content pieces per window"
                )));
            }
        }
        Ok(budget)
    }
}

/// One model input window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedExample {
    /// Source sequence id
    pub id: String,
    /// Window index within the source sequence
    pub window: usize,
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
    /// Label id per piece, or `IGNORE_INDEX`
    pub labels: Vec<i64>,
    /// Byte offsets of each piece inside its word
    pub offsets: Vec<(usize, usize)>,
    /// Source word of each piece
    pub word_ids: Vec<Option<u32>>,
}

impl EncodedExample {
    /// Number of pieces, padding included.
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Labels at scored positions only.
    pub fn scored_labels(&self) -> impl Iterator<Item = i64> + '_ {
        self.labels.iter().copied().filter(|&l| l != IGNORE_INDEX)
    }

    fn push(&mut self, enc: &SubwordEncoding, i: usize, label: i64) {
        self.input_ids.push(enc.ids[i]);
        self.attention_mask.push(1);
        self.labels.push(label);
        self.offsets.push(enc.offsets[i]);
        self.word_ids.push(enc.word_ids[i]);
    }

    fn pad_to(&mut self, len: usize, pad_id: u32) {
        let missing = len.saturating_sub(self.input_ids.len());
        self.input_ids.extend(std::iter::repeat_n(pad_id, missing));
        self.attention_mask.extend(std::iter::repeat_n(0, missing));
        self.labels.extend(std::iter::repeat_n(IGNORE_INDEX, missing));
        self.offsets.extend(std::iter::repeat_n((0, 0), missing));
        self.word_ids.extend(std::iter::repeat_n(None, missing));
    }

    /// Promote the first labeled piece from `I-T` to `B-T`.
    fn repair_leading_inside(&mut self, scheme: &LabelScheme) -> Result<bool> {
        let Some(slot) = self.labels.iter_mut().find(|l| **l != IGNORE_INDEX) else {
            return Ok(false);
        };
        let Some(label) = scheme.label_for_index(*slot)? else {
            return Ok(false);
        };
        let tag = BioTag::parse(label)?;
        if BioTag::is_valid_transition(BioTag::Outside, tag) {
            return Ok(false);
        }
        *slot = scheme.id_of(tag.to_begin())? as i64;
        Ok(true)
    }
}

/// Encode a labeled word sequence into one or more model input windows.
///
/// # Errors
///
/// `LengthMismatch` if tokens and tags differ in length, `InvalidTag` /
/// `UnknownLabel` for tags outside the scheme, `InvalidConfig` when the
/// window budget is unusable, and any tokenizer failure.
pub fn align_sequence(
    sequence: &WordSequence,
    tokenizer: &dyn SubwordTokenizer,
    scheme: &LabelScheme,
    config: &AlignmentConfig,
) -> Result<Vec<EncodedExample>> {
    if sequence.tokens.len() != sequence.ner_tags.len() {
        return Err(LegalNerError::LengthMismatch {
            expected: sequence.tokens.len(),
            actual: sequence.ner_tags.len(),
        });
    }
    let word_labels = sequence
        .ner_tags
        .iter()
        .map(|tag| scheme.id(tag).map(|id| id as i64))
        .collect::<Result<Vec<_>>>()?;

    let words: Vec<&str> = sequence.tokens.iter().map(String::as_str).collect();
    let enc = tokenizer.encode_words(&words)?;
    enc.validate(words.len())?;

    // Layout: leading specials, content pieces, trailing specials.
    let n = enc.len();
    let first = (0..n).find(|&i| !enc.is_special(i)).unwrap_or(n);
    let last = (first..n).rev().find(|&i| !enc.is_special(i)).map_or(first, |i| i + 1);
    let leading = 0..first;
    let content = first..last;
    let trailing = last..n;

    let piece_label = |i: usize| -> i64 {
        match enc.word_ids[i] {
            Some(w) if !enc.is_special(i) => {
                let continues = i > 0 && enc.word_ids[i - 1] == Some(w);
                if continues {
                    IGNORE_INDEX
                } else {
                    word_labels[w as usize]
                }
            }
            _ => IGNORE_INDEX,
        }
    };

    let budget = config.content_budget(leading.len() + trailing.len())?;
    let step = match config.truncation {
        TruncationPolicy::Truncate => None,
        TruncationPolicy::Window { stride } => Some(budget - stride),
    };

    let mut examples = Vec::new();
    let mut start = content.start;
    loop {
        let end = (start + budget).min(content.end);
        let mut example = EncodedExample {
            id: sequence.id.clone(),
            window: examples.len(),
            input_ids: Vec::with_capacity(config.max_length),
            attention_mask: Vec::with_capacity(config.max_length),
            labels: Vec::with_capacity(config.max_length),
            offsets: Vec::with_capacity(config.max_length),
            word_ids: Vec::with_capacity(config.max_length),
        };
        for i in leading.clone() {
            example.push(&enc, i, IGNORE_INDEX);
        }
        for i in start..end {
            example.push(&enc, i, piece_label(i));
        }
        for i in trailing.clone() {
            example.push(&enc, i, IGNORE_INDEX);
        }
        if example.repair_leading_inside(scheme)? {
            debug!(id = %sequence.id, window = example.window, "window starts inside an entity, promoted to B-");
        }
        if config.pad_to_max_length {
            example.pad_to(config.max_length, tokenizer.pad_id());
        }
        examples.push(example);

        match step {
            Some(step) if end < content.end => start += step,
            _ => {
                if end < content.end {
                    debug!(
                        id = %sequence.id,
                        dropped = content.end - end,
                        "sequence truncated"
                    );
                }
                break;
            }
        }
    }

    Ok(examples)
}

#[cfg(test)]
mod tests {
    use quickcheck::{Arbitrary, Gen, QuickCheck};
    use rstest::rstest;

    use super::*;
    use crate::adapter::subword::fake::{CLS, ChunkTokenizer, PAD, SEP};
    use crate::adapter::subword::{HfTokenizer, hf};
    use crate::labels::DatasetKind;

    fn sequence(tokens: &[&str], tags: &[&str]) -> WordSequence {
        WordSequence {
            id: "doc".into(),
            tokens: tokens.iter().map(|s| s.to_string()).collect(),
            ner_tags: tags.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn indian() -> LabelScheme {
        LabelScheme::for_dataset(DatasetKind::Indian)
    }

    #[test]
    fn test_first_piece_carries_label() {
        let scheme = indian();
        let seq = sequence(&["Supreme", "Court", "held"], &["B-COURT", "I-COURT", "O"]);
        let config = AlignmentConfig::default().with_max_length(12);

        let examples =
            align_sequence(&seq, &ChunkTokenizer { piece_len: 3 }, &scheme, &config).unwrap();
        assert_eq!(examples.len(), 1);

        let ex = &examples[0];
        // [CLS] Sup rem e Cou rt hel d [SEP] + 3 pad
        assert_eq!(ex.len(), 12);
        assert_eq!(ex.input_ids[0], CLS);
        assert_eq!(ex.input_ids[8], SEP);
        assert_eq!(ex.input_ids[9..], [PAD, PAD, PAD]);
        assert_eq!(ex.attention_mask, [1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0]);
        assert_eq!(
            ex.labels,
            [-100, 1, -100, -100, 15, -100, 0, -100, -100, -100, -100, -100]
        );
        assert_eq!(ex.word_ids[4], Some(1));
    }

    #[test]
    fn test_no_padding() {
        let scheme = indian();
        let seq = sequence(&["Delhi"], &["B-GPE"]);
        let config = AlignmentConfig::default().with_padding(false);

        let examples =
            align_sequence(&seq, &ChunkTokenizer { piece_len: 10 }, &scheme, &config).unwrap();
        assert_eq!(examples[0].len(), 3);
        assert_eq!(examples[0].scored_labels().count(), 1);
    }

    #[test]
    fn test_empty_sequence() {
        let scheme = indian();
        let seq = sequence(&[], &[]);
        let config = AlignmentConfig::default().with_padding(false);

        let examples =
            align_sequence(&seq, &ChunkTokenizer { piece_len: 2 }, &scheme, &config).unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].labels, [-100, -100]);
    }

    #[test]
    fn test_truncate_keeps_first_window() {
        let scheme = indian();
        let seq = sequence(
            &["In", "High", "Court", "of", "Delhi"],
            &["O", "B-COURT", "I-COURT", "I-COURT", "I-COURT"],
        );
        let config = AlignmentConfig::default()
            .with_max_length(4)
            .with_padding(false);

        let examples =
            align_sequence(&seq, &ChunkTokenizer { piece_len: 10 }, &scheme, &config).unwrap();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].labels, [-100, 0, 1, -100]);
    }

    #[test]
    fn test_windows_repair_inside_start() {
        let scheme = indian();
        let seq = sequence(
            &["In", "High", "Court", "of", "Delhi"],
            &["O", "B-COURT", "I-COURT", "I-COURT", "I-COURT"],
        );
        let config = AlignmentConfig::default()
            .with_max_length(4)
            .with_truncation(TruncationPolicy::Window { stride: 0 })
            .with_padding(false);

        let examples =
            align_sequence(&seq, &ChunkTokenizer { piece_len: 10 }, &scheme, &config).unwrap();
        let labels: Vec<_> = examples.iter().map(|e| e.labels.clone()).collect();
        assert_eq!(
            labels,
            vec![
                vec![-100, 0, 1, -100],
                vec![-100, 1, 15, -100],
                vec![-100, 1, -100],
            ]
        );
        assert_eq!(
            examples.iter().map(|e| e.window).collect::<Vec<_>>(),
            [0, 1, 2]
        );
    }

    #[rstest]
    #[case(0, 3)]
    #[case(1, 4)]
    fn test_window_count(#[case] stride: usize, #[case] windows: usize) {
        let scheme = indian();
        let seq = sequence(&["a", "b", "c", "d", "e"], &["O"; 5]);
        let config = AlignmentConfig::default()
            .with_max_length(4)
            .with_truncation(TruncationPolicy::Window { stride })
            .with_padding(false);

        let examples =
            align_sequence(&seq, &ChunkTokenizer { piece_len: 1 }, &scheme, &config).unwrap();
        assert_eq!(examples.len(), windows);
    }

    #[rstest]
    #[case(AlignmentConfig::default().with_max_length(2))]
    #[case(AlignmentConfig::default()
        .with_max_length(4)
        .with_truncation(TruncationPolicy::Window { stride: 2 }))]
    fn test_unusable_budget(#[case] config: AlignmentConfig) {
        let seq = sequence(&["a"], &["O"]);
        let result = align_sequence(&seq, &ChunkTokenizer { piece_len: 1 }, &indian(), &config);
        assert!(matches!(result, Err(LegalNerError::InvalidConfig(_))));
    }

    #[test]
    fn test_tag_errors() {
        let scheme = indian();
        let tok = ChunkTokenizer { piece_len: 1 };
        let config = AlignmentConfig::default();

        let mismatch = align_sequence(&sequence(&["a", "b"], &["O"]), &tok, &scheme, &config);
        assert!(matches!(mismatch, Err(LegalNerError::LengthMismatch { .. })));

        let unknown = align_sequence(&sequence(&["a"], &["B-GRT"]), &tok, &scheme, &config);
        assert!(matches!(unknown, Err(LegalNerError::UnknownLabel { .. })));
    }

    #[derive(Debug, Clone)]
    struct Tagged {
        tokens: Vec<String>,
        tags: Vec<String>,
    }

    impl Arbitrary for Tagged {
        fn arbitrary(g: &mut Gen) -> Self {
            const WORDS: &[&str] = &["a", "bc", "def", "ghij", "klmnopq"];
            const TAGS: &[&str] = &["O", "B-COURT", "I-COURT", "B-JUDGE", "I-JUDGE"];
            let len = usize::arbitrary(g) % 24;
            let mut tokens = Vec::with_capacity(len);
            let mut tags = Vec::with_capacity(len);
            for _ in 0..len {
                tokens.push(g.choose(WORDS).copied().unwrap_or("a").to_string());
                tags.push(g.choose(TAGS).copied().unwrap_or("O").to_string());
            }
            Self { tokens, tags }
        }
    }

    fn window_config(budget: u8, stride: u8) -> AlignmentConfig {
        let budget = usize::from(budget % 8) + 1;
        let stride = usize::from(stride) % budget;
        AlignmentConfig::default()
            .with_max_length(budget + 2)
            .with_truncation(TruncationPolicy::Window { stride })
            .with_padding(false)
    }

    #[test]
    fn prop_windows_never_start_inside() {
        fn prop(input: Tagged, budget: u8, stride: u8) -> bool {
            let scheme = indian();
            let seq = WordSequence {
                id: "q".into(),
                tokens: input.tokens,
                ner_tags: input.tags,
            };
            let config = window_config(budget, stride);
            let Ok(examples) =
                align_sequence(&seq, &ChunkTokenizer { piece_len: 2 }, &scheme, &config)
            else {
                return false;
            };
            examples.iter().all(|ex| {
                ex.scored_labels()
                    .next()
                    .and_then(|id| scheme.label(id as usize))
                    .and_then(|label| BioTag::parse(label).ok())
                    .is_none_or(|first| BioTag::is_valid_transition(BioTag::Outside, first))
            })
        }
        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(Tagged, u8, u8) -> bool);
    }

    /// Tags drawn so every `I-T` continues a `B-T` or `I-T`.
    #[derive(Debug, Clone)]
    struct WellFormed(Tagged);

    impl Arbitrary for WellFormed {
        fn arbitrary(g: &mut Gen) -> Self {
            let mut input = Tagged::arbitrary(g);
            let mut prev: Option<String> = None;
            for tag in &mut input.tags {
                if let Some(ty) = tag.strip_prefix("I-") {
                    let continues = prev
                        .as_deref()
                        .and_then(|p| p.get(2..))
                        .is_some_and(|prev_ty| prev_ty == ty);
                    if !continues {
                        *tag = format!("B-{ty}");
                    }
                }
                prev = Some(tag.clone());
            }
            Self(input)
        }
    }

    #[test]
    fn prop_windows_stay_well_formed() {
        fn prop(input: WellFormed, budget: u8, stride: u8) -> bool {
            let scheme = indian();
            let seq = WordSequence {
                id: "q".into(),
                tokens: input.0.tokens,
                ner_tags: input.0.tags,
            };
            let config = window_config(budget, stride);
            let Ok(examples) =
                align_sequence(&seq, &ChunkTokenizer { piece_len: 2 }, &scheme, &config)
            else {
                return false;
            };
            examples.iter().all(|ex| {
                let labels: Vec<&str> = ex
                    .scored_labels()
                    .filter_map(|id| scheme.label(id as usize))
                    .collect();
                let tags: Vec<BioTag<'_>> =
                    labels.iter().filter_map(|l| BioTag::parse(l).ok()).collect();
                tags.len() == labels.len() && BioTag::is_well_formed(&tags)
            })
        }
        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(WellFormed, u8, u8) -> bool);
    }

    #[rstest]
    #[case(AlignmentConfig::default().with_max_length(16), Some(14))]
    #[case(AlignmentConfig::default()
        .with_max_length(16)
        .with_truncation(TruncationPolicy::Window { stride: 13 }), Some(14))]
    #[case(AlignmentConfig::default()
        .with_max_length(16)
        .with_truncation(TruncationPolicy::Window { stride: 14 }), None)]
    #[case(AlignmentConfig::default().with_max_length(2), None)]
    fn test_content_budget_for_tokenizer(
        #[case] config: AlignmentConfig,
        #[case] expected: Option<usize>,
    ) {
        let result = config.content_budget_for(&ChunkTokenizer { piece_len: 1 });
        match expected {
            Some(budget) => assert_eq!(result.unwrap(), budget),
            None => assert!(matches!(result, Err(LegalNerError::InvalidConfig(_)))),
        }
    }

    #[test]
    fn test_word_piece_alignment() {
        let tok = HfTokenizer::from_json(&hf::word_piece_json(), None).unwrap();
        let seq = sequence(&["Supreme", "Court", "held"], &["B-COURT", "I-COURT", "O"]);
        let config = AlignmentConfig::default().with_max_length(8);

        let examples = align_sequence(&seq, &tok, &indian(), &config).unwrap();
        assert_eq!(examples.len(), 1);
        let ex = &examples[0];
        assert_eq!(ex.input_ids, [1, 4, 5, 6, 7, 2, 3, 3]);
        assert_eq!(ex.attention_mask, [1, 1, 1, 1, 1, 1, 0, 0]);
        assert_eq!(
            ex.labels,
            [IGNORE_INDEX, 1, IGNORE_INDEX, 15, 0, IGNORE_INDEX, IGNORE_INDEX, IGNORE_INDEX]
        );
        assert_eq!(
            ex.word_ids,
            [None, Some(0), Some(0), Some(1), Some(2), None, None, None]
        );
    }

    #[test]
    fn prop_one_label_per_word() {
        fn prop(input: Tagged) -> bool {
            let words = input.tokens.len();
            let seq = WordSequence {
                id: "q".into(),
                tokens: input.tokens,
                ner_tags: input.tags,
            };
            let config = AlignmentConfig::default().with_max_length(256);
            align_sequence(&seq, &ChunkTokenizer { piece_len: 2 }, &indian(), &config)
                .map(|examples| examples.len() == 1 && examples[0].scored_labels().count() == words)
                .unwrap_or(false)
        }
        QuickCheck::new()
            .tests(500)
            .quickcheck(prop as fn(Tagged) -> bool);
    }
}

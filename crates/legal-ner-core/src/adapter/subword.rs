//! # Sub-word Tokenizer Boundary
//!
//! The adapter only needs word-level pre-tokenized encoding with a
//! piece→word map; anything that can provide that plugs in here.

use std::path::Path;
use std::str::FromStr;

use serde_json::Value;
use tokenizers::Tokenizer;
use tracing::debug;

use crate::error::{LegalNerError, Result};

/// Sub-word encoding of one pre-tokenized word sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubwordEncoding {
    /// Vocabulary ids, special tokens included
    pub ids: Vec<u32>,
    /// Piece strings
    pub tokens: Vec<String>,
    /// Byte offsets of each piece inside its word
    pub offsets: Vec<(usize, usize)>,
    /// Source word of each piece; `None` for special tokens
    pub word_ids: Vec<Option<u32>>,
    /// `1` for special tokens, `0` otherwise
    pub special_tokens_mask: Vec<u32>,
}

impl SubwordEncoding {
    /// Number of pieces.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Check that all parallel arrays agree and word ids are in range.
    pub fn validate(&self, num_words: usize) -> Result<()> {
        let n = self.ids.len();
        for len in [
            self.tokens.len(),
            self.offsets.len(),
            self.word_ids.len(),
            self.special_tokens_mask.len(),
        ] {
            if len != n {
                return Err(LegalNerError::LengthMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }
        if let Some(bad) = self
            .word_ids
            .iter()
            .flatten()
            .find(|&&w| w as usize >= num_words)
        {
            return Err(LegalNerError::Tokenizer(format!(
                "piece mapped to word {bad} of a {num_words}-word sequence"
            )));
        }
        Ok(())
    }

    /// Whether the piece at `i` is a special token.
    pub fn is_special(&self, i: usize) -> bool {
        self.special_tokens_mask.get(i).is_some_and(|&m| m == 1)
            || self.word_ids.get(i).is_none_or(Option::is_none)
    }
}

/// A tokenizer that encodes pre-split words into sub-word pieces.
pub trait SubwordTokenizer {
    /// Encode a word sequence, adding the model's special tokens.
    fn encode_words(&self, words: &[&str]) -> Result<SubwordEncoding>;

    /// Id used for padding positions.
    fn pad_id(&self) -> u32;

    /// Special tokens added around every sequence.
    fn num_special_tokens(&self) -> Result<usize> {
        let enc = self.encode_words(&["a"])?;
        Ok((0..enc.len()).filter(|&i| enc.is_special(i)).count())
    }
}

/// Hugging Face `tokenizer.json` tokenizer.
pub struct HfTokenizer {
    inner: Tokenizer,
    pad_id: u32,
}

impl HfTokenizer {
    /// Load a `tokenizer.json` file.
    ///
    /// # Errors
    ///
    /// Returns `LegalNerError::Tokenizer` if the file is missing or invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(path.as_ref(), None)
    }

    /// Load a `tokenizer.json` file, overriding whether its byte-level
    /// pre-tokenizer prepends a space to every word.
    pub fn from_file_with_prefix_space(
        path: impl AsRef<Path>,
        add_prefix_space: bool,
    ) -> Result<Self> {
        Self::load(path.as_ref(), Some(add_prefix_space))
    }

    fn load(path: &Path, add_prefix_space: Option<bool>) -> Result<Self> {
        if !path.exists() {
            return Err(LegalNerError::Tokenizer(format!(
                "tokenizer not found at {}",
                path.display()
            )));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json, add_prefix_space).map_err(|e| match e {
            LegalNerError::Tokenizer(msg) => {
                LegalNerError::Tokenizer(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Build from serialized `tokenizer.json` content.
    ///
    /// `add_prefix_space`, when set, is written into every `ByteLevel`
    /// pre-tokenizer before the tokenizer is built.
    pub fn from_json(json: &str, add_prefix_space: Option<bool>) -> Result<Self> {
        let mut config: Value = serde_json::from_str(json)?;
        if let Some(add) = add_prefix_space {
            let patched = config
                .get_mut("pre_tokenizer")
                .is_some_and(|pre| set_prefix_space(pre, add));
            if !patched {
                debug!(add_prefix_space = add, "no byte-level pre-tokenizer to patch");
            }
        }
        let inner = Tokenizer::from_str(&config.to_string())
            .map_err(|e| LegalNerError::Tokenizer(e.to_string()))?;
        Self::from_tokenizer(inner)
    }

    /// Wrap an already-built tokenizer.
    ///
    /// Built-in truncation and padding are disabled; windowing and padding
    /// are done by the aligner so labels stay in step with pieces.
    pub fn from_tokenizer(mut inner: Tokenizer) -> Result<Self> {
        let pad_id = inner
            .get_padding()
            .map(|p| p.pad_id)
            .or_else(|| inner.token_to_id("<pad>"))
            .or_else(|| inner.token_to_id("[PAD]"))
            .unwrap_or(0);

        inner
            .with_truncation(None)
            .map_err(|e| LegalNerError::Tokenizer(e.to_string()))?;
        inner.with_padding(None);

        Ok(Self { inner, pad_id })
    }
}

/// Set `add_prefix_space` on `ByteLevel` pre-tokenizers, descending into
/// `Sequence`. Returns whether any was found.
fn set_prefix_space(pre: &mut Value, add: bool) -> bool {
    match pre.get("type").and_then(Value::as_str) {
        Some("ByteLevel") => {
            pre["add_prefix_space"] = Value::Bool(add);
            true
        }
        Some("Sequence") => pre
            .get_mut("pretokenizers")
            .and_then(Value::as_array_mut)
            .is_some_and(|items| {
                items
                    .iter_mut()
                    .fold(false, |found, item| set_prefix_space(item, add) | found)
            }),
        _ => false,
    }
}

impl SubwordTokenizer for HfTokenizer {
    fn encode_words(&self, words: &[&str]) -> Result<SubwordEncoding> {
        let encoding = self
            .inner
            .encode(words.to_vec(), true)
            .map_err(|e| LegalNerError::Tokenizer(format!("encode error: {e}")))?;

        let encoding = SubwordEncoding {
            ids: encoding.get_ids().to_vec(),
            tokens: encoding.get_tokens().to_vec(),
            offsets: encoding.get_offsets().to_vec(),
            word_ids: encoding.get_word_ids().to_vec(),
            special_tokens_mask: encoding.get_special_tokens_mask().to_vec(),
        };
        encoding.validate(words.len())?;
        Ok(encoding)
    }

    fn pad_id(&self) -> u32 {
        self.pad_id
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Deterministic tokenizer for tests: `[CLS] pieces... [SEP]`, every word
    //! split into chunks of at most `piece_len` characters.

    use super::*;

    pub const CLS: u32 = 1;
    pub const SEP: u32 = 2;
    pub const PAD: u32 = 0;

    pub struct ChunkTokenizer {
        pub piece_len: usize,
    }

    impl SubwordTokenizer for ChunkTokenizer {
        fn encode_words(&self, words: &[&str]) -> Result<SubwordEncoding> {
            let mut enc = SubwordEncoding::default();
            let mut push = |id: u32, tok: String, off: (usize, usize), word: Option<u32>| {
                enc.ids.push(id);
                enc.tokens.push(tok);
                enc.offsets.push(off);
                enc.special_tokens_mask.push(u32::from(word.is_none()));
                enc.word_ids.push(word);
            };

            push(CLS, "[CLS]".into(), (0, 0), None);
            for (w, word) in words.iter().enumerate() {
                let chars: Vec<(usize, char)> = word.char_indices().collect();
                for chunk in chars.chunks(self.piece_len.max(1)) {
                    let start = chunk[0].0;
                    let (last, c) = chunk[chunk.len() - 1];
                    let end = last + c.len_utf8();
                    push(
                        10 + w as u32,
                        word[start..end].to_string(),
                        (start, end),
                        Some(w as u32),
                    );
                }
            }
            push(SEP, "[SEP]".into(), (0, 0), None);
            Ok(enc)
        }

        fn pad_id(&self) -> u32 {
            PAD
        }
    }
}


#[cfg(test)]
pub(crate) mod hf {
    //! Small in-memory `tokenizer.json` documents.

    use serde_json::json;

    /// WordPiece with a BERT post-processor; `[PAD]` is id 3.
    pub fn word_piece_json() -> String {
        json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": {"type": "WhitespaceSplit"},
            "post_processor": {
                "type": "BertProcessing",
                "sep": ["[SEP]", 2],
                "cls": ["[CLS]", 1]
            },
            "decoder": null,
            "model": {
                "type": "WordPiece",
                "unk_token": "[UNK]",
                "continuing_subword_prefix": "##",
                "max_input_chars_per_word": 100,
                "vocab": {
                    "[UNK]": 0, "[CLS]": 1, "[SEP]": 2, "[PAD]": 3,
                    "Sup": 4, "##reme": 5, "Court": 6, "held": 7
                }
            }
        })
        .to_string()
    }

    /// Word-level vocabulary behind a byte-level pre-tokenizer that does not
    /// add a prefix space.
    pub fn byte_level_json() -> String {
        json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": {
                "type": "ByteLevel",
                "add_prefix_space": false,
                "trim_offsets": true,
                "use_regex": true
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "unk_token": "[UNK]",
                "vocab": {"[UNK]": 0, "Court": 1, "\u{120}Court": 2, "\u{120}High": 3}
            }
        })
        .to_string()
    }
}

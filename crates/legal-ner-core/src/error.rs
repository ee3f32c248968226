use thiserror::Error;

/// Errors that can occur while resolving labels, aligning datasets or scoring.
#[derive(Debug, Error)]
pub enum LegalNerError {
    /// The dataset keyword does not name a supported corpus.
    #[error("unsupported dataset {0:?} (expected one of: indian, german, combined)")]
    UnsupportedDataset(String),

    /// The model selection keyword does not name a known checkpoint group.
    #[error("unsupported model selection {0:?} (expected one of: all, roberta, luke_b, mluke_b)")]
    UnsupportedModel(String),

    /// The dataset can only be trained with a specific model family.
    #[error("the {dataset} dataset is not set up to train with models other than {required}")]
    IncompatibleModel {
        /// Dataset that imposed the restriction.
        dataset: String,
        /// Model selection the dataset requires.
        required: String,
    },

    /// A tag string is not `O`, `B-<type>` or `I-<type>`.
    #[error("invalid BIO tag: {0:?}")]
    InvalidTag(String),

    /// A well-formed tag whose type is not part of the label scheme.
    #[error("label {label:?} is not part of the {dataset} label scheme")]
    UnknownLabel {
        /// Offending label.
        label: String,
        /// Dataset whose scheme was consulted.
        dataset: String,
    },

    /// A label id outside the scheme range (and not the ignore sentinel).
    #[error("label id {id} is out of range for a scheme of {len} labels")]
    LabelIdOutOfRange {
        /// Offending id.
        id: i64,
        /// Size of the scheme.
        len: usize,
    },

    /// Gold and predicted sequences (or tokens and tags) differ in length.
    #[error("length mismatch: expected {expected} labels, got {actual}")]
    LengthMismatch {
        /// Length of the reference sequence.
        expected: usize,
        /// Length of the other sequence.
        actual: usize,
    },

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    Regex(#[from] regex::Error),

    /// The sub-word tokenizer failed to load or encode.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A dataset record could not be interpreted.
    #[error("malformed record {record} in {source_name}: {reason}")]
    MalformedRecord {
        /// File or stream the record came from.
        source_name: String,
        /// Zero-based record index.
        record: usize,
        /// What went wrong.
        reason: String,
    },

    /// Reading a dataset file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for legal NER operations.
pub type Result<T> = std::result::Result<T, LegalNerError>;

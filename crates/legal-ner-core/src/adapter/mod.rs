//! # Dataset Adapter
//!
//! Raw corpora → word sequences with BIO tags → sub-word model inputs with
//! one label per word on its first piece.

pub mod align;
pub mod datasets;
pub mod subword;
pub mod words;

pub use align::{AlignmentConfig, EncodedExample, TruncationPolicy, align_sequence};
pub use datasets::{
    CombinedAdapter, DatasetAdapter, DatasetSource, DocumentWarning, GermanAdapter, IndianAdapter,
    LoadedDataset, WordSequence, dataset_adapter, relabel_to_common, write_sequences,
};
pub use subword::{HfTokenizer, SubwordEncoding, SubwordTokenizer};
pub use words::{AlignmentWarning, CharSpan, Word, WordSegmenter, label_words};

//! # Label Vocabularies
//!
//! BIO tag parsing, per-dataset entity catalogs and the ordered label scheme
//! shared by the dataset adapter, the evaluator and the training driver.

pub mod bio;
pub mod catalog;
pub mod scheme;

pub use bio::BioTag;
pub use catalog::{COMMON_TYPES, GERMAN_NATIVE_TAGS, GERMAN_TYPES, INDIAN_TYPES, common_type};
pub use scheme::{DatasetKind, IGNORE_INDEX, LabelScheme};

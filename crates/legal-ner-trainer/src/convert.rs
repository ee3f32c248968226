//! Conversion of Indian character-span documents to pre-tokenized JSON Lines.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use legal_ner_core::adapter::{IndianAdapter, relabel_to_common, write_sequences};
use legal_ner_core::{DocumentWarning, WordSequence};
use tracing::{info, warn};

/// Outcome of a conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionSummary {
    pub sequences: usize,
    pub skipped: usize,
    pub warnings: Vec<DocumentWarning>,
}

/// Convert `input` into `{"id", "tokens", "ner_tags"}` lines at `output`,
/// optionally relabeled into the common scheme.
pub fn convert_indian(input: &Path, output: &Path, common: bool) -> Result<ConversionSummary> {
    let json = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let loaded = IndianAdapter::new()?.parse_documents(&json)?;

    let mut skipped = 0usize;
    let sequences: Vec<WordSequence> = if common {
        loaded
            .sequences
            .iter()
            .filter_map(|sequence| match relabel_to_common(sequence) {
                Ok(relabeled) => Some(relabeled),
                Err(e) => {
                    warn!(document = %sequence.id, error = %e, "cannot relabel");
                    skipped += 1;
                    None
                }
            })
            .collect()
    } else {
        loaded.sequences
    };

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_sequences(output, &sequences)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        sequences = sequences.len(),
        skipped,
        warnings = loaded.warnings.len(),
        output = %output.display(),
        "converted dataset"
    );

    Ok(ConversionSummary {
        sequences: sequences.len(),
        skipped,
        warnings: loaded.warnings,
    })
}

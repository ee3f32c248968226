//! # Dataset Variants
//!
//! Readers for the Indian judgement corpus (character-span annotations), the
//! German LER corpus (pre-tokenized JSON Lines) and their combination in the
//! common label scheme.

use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use oorandom::Rand64;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::align::{AlignmentConfig, EncodedExample, align_sequence};
use super::subword::SubwordTokenizer;
use super::words::{AlignmentWarning, CharSpan, WordSegmenter, label_words};
use crate::error::{LegalNerError, Result};
use crate::labels::{BioTag, DatasetKind, GERMAN_NATIVE_TAGS, LabelScheme, common_type};

/// A word-level labeled sequence, the unit every dataset is reduced to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSequence {
    #[serde(default)]
    pub id: String,
    pub tokens: Vec<String>,
    pub ner_tags: Vec<String>,
}

/// An alignment warning attributed to its source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWarning {
    pub document: String,
    #[serde(flatten)]
    pub warning: AlignmentWarning,
}

impl fmt::Display for DocumentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "document {}: {}", self.document, self.warning)
    }
}

/// Where a dataset split is read from.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSource {
    /// Indian document file, or the German JSONL file for the German variant
    pub primary: PathBuf,
    /// German JSONL file merged in by the combined variant
    pub secondary: Option<PathBuf>,
    /// Share of German records kept by the combined variant
    pub fraction: f64,
    /// Shuffle seed of the combined variant
    pub seed: u64,
}

impl DatasetSource {
    pub fn new(primary: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            secondary: None,
            fraction: 1.0,
            seed: 0,
        }
    }

    pub fn with_secondary(mut self, secondary: impl Into<PathBuf>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }

    pub fn with_fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Sequences read from a source plus everything that had to be repaired or
/// skipped on the way.
#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    pub sequences: Vec<WordSequence>,
    pub warnings: Vec<DocumentWarning>,
}

impl LoadedDataset {
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    fn warn(&mut self, document: impl Into<String>, warning: AlignmentWarning) {
        let warning = DocumentWarning {
            document: document.into(),
            warning,
        };
        warn!("{warning}");
        self.warnings.push(warning);
    }
}

/// Reads one dataset variant and encodes it for a tokenizer.
pub trait DatasetAdapter {
    /// Variant handled by this adapter.
    fn kind(&self) -> DatasetKind;

    /// Label scheme the loaded tags belong to.
    fn label_vocabulary(&self) -> &LabelScheme;

    /// Read a split into word sequences.
    fn load(&self, source: &DatasetSource) -> Result<LoadedDataset>;

    /// Encode one word sequence into model input windows.
    fn produce_token_sequence(
        &self,
        sequence: &WordSequence,
        tokenizer: &dyn SubwordTokenizer,
        config: &AlignmentConfig,
    ) -> Result<Vec<EncodedExample>> {
        align_sequence(sequence, tokenizer, self.label_vocabulary(), config)
    }

    /// Encode a whole split, skipping (and logging) sequences that fail.
    fn produce_token_sequences(
        &self,
        sequences: &[WordSequence],
        tokenizer: &dyn SubwordTokenizer,
        config: &AlignmentConfig,
    ) -> Vec<EncodedExample> {
        let mut examples = Vec::with_capacity(sequences.len());
        let mut skipped = 0usize;
        for sequence in sequences {
            match self.produce_token_sequence(sequence, tokenizer, config) {
                Ok(windows) => examples.extend(windows),
                Err(e) => {
                    skipped += 1;
                    warn!(document = %sequence.id, error = %e, "skipping sequence");
                }
            }
        }
        info!(
            sequences = sequences.len(),
            examples = examples.len(),
            skipped,
            "encoded split"
        );
        examples
    }
}

/// Adapter for the given dataset variant.
pub fn dataset_adapter(kind: DatasetKind) -> Result<Box<dyn DatasetAdapter>> {
    let adapter: Box<dyn DatasetAdapter> = match kind {
        DatasetKind::Indian => Box::new(IndianAdapter::new()?),
        DatasetKind::German => Box::new(GermanAdapter::new()),
        DatasetKind::Combined => Box::new(CombinedAdapter::new()?),
    };
    Ok(adapter)
}

// -- Indian ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIndianDocument {
    LabelStudio(LabelStudioDocument),
    Flat(FlatDocument),
}

#[derive(Debug, Deserialize)]
struct LabelStudioDocument {
    #[serde(default)]
    id: Option<Value>,
    data: LabelStudioData,
    #[serde(default)]
    annotations: Vec<LabelStudioAnnotation>,
}

#[derive(Debug, Deserialize)]
struct LabelStudioData {
    text: String,
}

#[derive(Debug, Deserialize)]
struct LabelStudioAnnotation {
    #[serde(default)]
    result: Vec<LabelStudioResult>,
}

#[derive(Debug, Deserialize)]
struct LabelStudioResult {
    value: LabelStudioValue,
}

#[derive(Debug, Deserialize)]
struct LabelStudioValue {
    start: usize,
    end: usize,
    labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FlatDocument {
    #[serde(default)]
    id: Option<Value>,
    text: String,
    #[serde(default)]
    annotations: Vec<CharSpan>,
}

impl RawIndianDocument {
    fn into_parts(self) -> (Option<Value>, String, Vec<CharSpan>) {
        match self {
            Self::LabelStudio(doc) => {
                // Only the first annotation set is used; later ones are
                // alternative annotator passes over the same text.
                let spans = doc
                    .annotations
                    .into_iter()
                    .next()
                    .map(|a| a.result)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|r| {
                        let label = r.value.labels.into_iter().next()?;
                        Some(CharSpan::new(r.value.start, r.value.end, label))
                    })
                    .collect();
                (doc.id, doc.data.text, spans)
            }
            Self::Flat(doc) => (doc.id, doc.text, doc.annotations),
        }
    }
}

fn document_id(id: Option<&Value>, index: usize) -> String {
    match id {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => index.to_string(),
    }
}

/// Adapter for the Indian judgement corpus.
#[derive(Debug, Clone)]
pub struct IndianAdapter {
    scheme: LabelScheme,
    segmenter: WordSegmenter,
}

impl IndianAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            scheme: LabelScheme::for_dataset(DatasetKind::Indian),
            segmenter: WordSegmenter::new()?,
        })
    }

    /// Parse a JSON array of documents.
    pub fn parse_documents(&self, json: &str) -> Result<LoadedDataset> {
        let documents: Vec<Value> = serde_json::from_str(json)?;
        let mut loaded = LoadedDataset::default();

        for (index, value) in documents.into_iter().enumerate() {
            let raw: RawIndianDocument = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(e) => {
                    loaded.warn(
                        index.to_string(),
                        AlignmentWarning::Unparseable {
                            reason: e.to_string(),
                        },
                    );
                    continue;
                }
            };
            let (id, text, spans) = raw.into_parts();
            let id = document_id(id.as_ref(), index);

            let words = self.segmenter.segment(&text);
            let (ner_tags, warnings) = label_words(&text, &words, &spans, &self.scheme);
            for warning in warnings {
                loaded.warn(id.clone(), warning);
            }
            loaded.sequences.push(WordSequence {
                id,
                tokens: words.iter().map(|w| w.text.to_string()).collect(),
                ner_tags,
            });
        }

        Ok(loaded)
    }
}

impl DatasetAdapter for IndianAdapter {
    fn kind(&self) -> DatasetKind {
        DatasetKind::Indian
    }

    fn label_vocabulary(&self) -> &LabelScheme {
        &self.scheme
    }

    fn load(&self, source: &DatasetSource) -> Result<LoadedDataset> {
        let json = fs::read_to_string(&source.primary)?;
        let loaded = self.parse_documents(&json)?;
        info!(
            path = %source.primary.display(),
            documents = loaded.len(),
            warnings = loaded.warnings.len(),
            "loaded indian split"
        );
        Ok(loaded)
    }
}

// -- German ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTag {
    Name(String),
    Index(u64),
}

#[derive(Debug, Deserialize)]
struct GermanRecord {
    #[serde(default)]
    id: Option<Value>,
    tokens: Vec<String>,
    ner_tags: Vec<RawTag>,
}

/// Adapter for the German LER corpus.
#[derive(Debug, Clone)]
pub struct GermanAdapter {
    scheme: LabelScheme,
}

impl Default for GermanAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl GermanAdapter {
    pub fn new() -> Self {
        Self {
            scheme: LabelScheme::for_dataset(DatasetKind::German),
        }
    }

    fn decode_tag(&self, tag: RawTag) -> std::result::Result<String, AlignmentWarning> {
        let name = match tag {
            RawTag::Name(name) => name,
            RawTag::Index(i) => GERMAN_NATIVE_TAGS
                .get(i as usize)
                .map(|s| s.to_string())
                .ok_or_else(|| AlignmentWarning::Unparseable {
                    reason: format!("tag index {i} out of range"),
                })?,
        };
        match self.scheme.id(&name) {
            Ok(_) => Ok(name),
            Err(_) => Err(AlignmentWarning::UnknownLabel { label: name }),
        }
    }

    /// Parse JSON Lines records, one sentence per line.
    pub fn parse_records(&self, reader: impl BufRead) -> Result<LoadedDataset> {
        let mut loaded = LoadedDataset::default();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: GermanRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    loaded.warn(
                        line_no.to_string(),
                        AlignmentWarning::Unparseable {
                            reason: e.to_string(),
                        },
                    );
                    continue;
                }
            };
            let id = document_id(record.id.as_ref(), line_no);

            if record.tokens.len() != record.ner_tags.len() {
                loaded.warn(
                    id,
                    AlignmentWarning::TagCountMismatch {
                        tokens: record.tokens.len(),
                        tags: record.ner_tags.len(),
                    },
                );
                continue;
            }

            let ner_tags = record
                .ner_tags
                .into_iter()
                .map(|tag| self.decode_tag(tag))
                .collect::<std::result::Result<Vec<_>, _>>();
            match ner_tags {
                Ok(ner_tags) => loaded.sequences.push(WordSequence {
                    id,
                    tokens: record.tokens,
                    ner_tags,
                }),
                Err(warning) => loaded.warn(id, warning),
            }
        }

        Ok(loaded)
    }
}

impl DatasetAdapter for GermanAdapter {
    fn kind(&self) -> DatasetKind {
        DatasetKind::German
    }

    fn label_vocabulary(&self) -> &LabelScheme {
        &self.scheme
    }

    fn load(&self, source: &DatasetSource) -> Result<LoadedDataset> {
        let file = fs::File::open(&source.primary)?;
        let loaded = self.parse_records(BufReader::new(file))?;
        info!(
            path = %source.primary.display(),
            sentences = loaded.len(),
            warnings = loaded.warnings.len(),
            "loaded german split"
        );
        Ok(loaded)
    }
}

// -- Combined -------------------------------------------------------------

/// Relabel a sequence into the common type set of the combined dataset.
///
/// # Errors
///
/// `InvalidTag` for malformed tags, `UnknownLabel` for a type with no
/// common counterpart.
pub fn relabel_to_common(sequence: &WordSequence) -> Result<WordSequence> {
    let ner_tags = sequence
        .ner_tags
        .iter()
        .map(|tag| {
            let relabeled = match BioTag::parse(tag)? {
                BioTag::Outside => BioTag::Outside,
                BioTag::Begin(ty) => BioTag::Begin(to_common(ty)?),
                BioTag::Inside(ty) => BioTag::Inside(to_common(ty)?),
            };
            Ok(relabeled.to_string())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(WordSequence {
        id: sequence.id.clone(),
        tokens: sequence.tokens.clone(),
        ner_tags,
    })
}

fn to_common(ty: &str) -> Result<&'static str> {
    common_type(ty).ok_or_else(|| LegalNerError::UnknownLabel {
        label: ty.to_string(),
        dataset: DatasetKind::Combined.to_string(),
    })
}

/// Fisher-Yates shuffle driven by a seeded PCG generator.
fn shuffle<T>(items: &mut [T], rng: &mut Rand64) {
    for i in (1..items.len()).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}

/// Adapter for the Indian + German union in the common label scheme.
#[derive(Debug, Clone)]
pub struct CombinedAdapter {
    scheme: LabelScheme,
    indian: IndianAdapter,
    german: GermanAdapter,
}

impl CombinedAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            scheme: LabelScheme::for_dataset(DatasetKind::Combined),
            indian: IndianAdapter::new()?,
            german: GermanAdapter::new(),
        })
    }

    /// Relabel, subsample the German part and shuffle the union.
    pub fn combine(
        &self,
        indian: LoadedDataset,
        german: LoadedDataset,
        fraction: f64,
        seed: u64,
    ) -> Result<LoadedDataset> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(LegalNerError::InvalidConfig(format!(
                "german fraction must be in (0, 1], got {fraction}"
            )));
        }
        let mut rng = Rand64::new(u128::from(seed));

        let mut german_sequences = german.sequences;
        shuffle(&mut german_sequences, &mut rng);
        let keep = (german_sequences.len() as f64 * fraction).floor() as usize;
        german_sequences.truncate(keep);

        let mut combined = LoadedDataset {
            sequences: Vec::with_capacity(indian.sequences.len() + german_sequences.len()),
            warnings: Vec::new(),
        };
        combined.warnings.extend(indian.warnings);
        combined.warnings.extend(german.warnings);

        for sequence in indian.sequences.iter().chain(&german_sequences) {
            match relabel_to_common(sequence) {
                Ok(relabeled) => combined.sequences.push(relabeled),
                Err(e) => combined.warn(
                    sequence.id.clone(),
                    AlignmentWarning::Unparseable {
                        reason: e.to_string(),
                    },
                ),
            }
        }
        shuffle(&mut combined.sequences, &mut rng);

        Ok(combined)
    }
}

impl DatasetAdapter for CombinedAdapter {
    fn kind(&self) -> DatasetKind {
        DatasetKind::Combined
    }

    fn label_vocabulary(&self) -> &LabelScheme {
        &self.scheme
    }

    fn load(&self, source: &DatasetSource) -> Result<LoadedDataset> {
        let german_path = source.secondary.as_deref().ok_or_else(|| {
            LegalNerError::InvalidConfig("the combined dataset needs a german split path".into())
        })?;

        let indian = self.indian.load(source)?;
        let german = self.german.load(&DatasetSource::new(german_path))?;
        let combined = self.combine(indian, german, source.fraction, source.seed)?;

        info!(
            sequences = combined.len(),
            fraction = source.fraction,
            seed = source.seed,
            "built combined split"
        );
        Ok(combined)
    }
}

/// Write sequences as JSON Lines (`{"id", "tokens", "ner_tags"}`).
pub fn write_sequences(path: &Path, sequences: &[WordSequence]) -> Result<()> {
    use std::io::Write;

    let mut out = std::io::BufWriter::new(fs::File::create(path)?);
    for sequence in sequences {
        serde_json::to_writer(&mut out, sequence)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

//! Entity type catalogs of the supported corpora and the mapping of both
//! corpora into the common type set used by the combined dataset.

/// Entity types of the Indian legal judgement corpus.
pub const INDIAN_TYPES: &[&str] = &[
    "COURT",
    "PETITIONER",
    "RESPONDENT",
    "JUDGE",
    "DATE",
    "ORG",
    "GPE",
    "STATUTE",
    "PROVISION",
    "PRECEDENT",
    "CASE_NUMBER",
    "WITNESS",
    "OTHER_PERSON",
    "LAWYER",
];

/// Entity types of the German legal entity recognition corpus.
pub const GERMAN_TYPES: &[&str] = &[
    "AN", "EUN", "GRT", "GS", "INN", "LD", "LDS", "LIT", "MRK", "ORG", "PER", "RR", "RS", "ST",
    "STR", "UN", "VO", "VS", "VT",
];

/// Tag order of the published German corpus, used to decode integer tags.
pub const GERMAN_NATIVE_TAGS: &[&str] = &[
    "B-AN", "B-EUN", "B-GRT", "B-GS", "B-INN", "B-LD", "B-LDS", "B-LIT", "B-MRK", "B-ORG", "B-PER",
    "B-RR", "B-RS", "B-ST", "B-STR", "B-UN", "B-VO", "B-VS", "B-VT", "I-AN", "I-EUN", "I-GRT",
    "I-GS", "I-INN", "I-LD", "I-LDS", "I-LIT", "I-MRK", "I-ORG", "I-PER", "I-RR", "I-RS", "I-ST",
    "I-STR", "I-UN", "I-VO", "I-VS", "I-VT", "O",
];

/// Entity types shared by the combined Indian + German dataset.
pub const COMMON_TYPES: &[&str] = &[
    "COURT",
    "PETITIONER",
    "RESPONDENT",
    "JUDGE",
    "LAWYER",
    "DATE",
    "ORG",
    "GPE",
    "STATUTE",
    "PROVISION",
    "PRECEDENT",
    "CASE_NUMBER",
    "WITNESS",
    "OTHER_PERSON",
    "LITERATURE",
];

/// Map an Indian or German entity type onto the common type set.
///
/// Types already in the common set map to themselves.
pub fn common_type(ty: &str) -> Option<&'static str> {
    let mapped = match ty {
        "GRT" => "COURT",
        "RR" => "JUDGE",
        "AN" => "LAWYER",
        "PER" => "OTHER_PERSON",
        "UN" | "INN" | "MRK" => "ORG",
        "LD" | "ST" | "STR" | "LDS" => "GPE",
        "GS" | "VO" | "EUN" | "VS" | "VT" => "STATUTE",
        "RS" => "PRECEDENT",
        "LIT" => "LITERATURE",
        other => return COMMON_TYPES.iter().copied().find(|&common| common == other),
    };
    Some(mapped)
}

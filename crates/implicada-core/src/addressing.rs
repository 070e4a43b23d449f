//! Addressing-mode detection.
//!
//! Classifies the grammatical stance the reply must adopt by scanning the
//! latest user utterance for pt-BR person markers. Detection is heuristic
//! and keyword-based; false negatives fall through to the default (direct).
//!
//! The resolved mode is a control input: it overwrites whatever mode the
//! model self-reports in its structured output.

use implicada_types::chat::Turn;
use implicada_types::reply::AddressingMode;

/// First-person-plural markers (co-construction, "nós").
const COLLECTIVE_MARKERS: &[&str] = &[
    "nos",
    "nosso",
    "nossa",
    "vamos",
    "juntos",
    "juntas",
    "a gente",
    "podemos",
    "poderiamos",
];

/// Third-person markers, including article + role-noun pairs.
const DESCRIPTIVE_MARKERS: &[&str] = &[
    "ele",
    "ela",
    "eles",
    "elas",
    "dele",
    "dela",
    "o interlocutor",
    "a interlocutora",
    "o paciente",
    "a paciente",
    "a pessoa",
    "o sujeito",
    "o cliente",
];

/// Second-person markers and directive verb phrases.
const DIRECT_MARKERS: &[&str] = &[
    "tu",
    "voce",
    "vc",
    "te",
    "teu",
    "tua",
    "contigo",
    "podes",
    "consegues",
    "me ajuda",
    "me ajude",
    "pode me",
    "me diga",
    "me explica",
];

/// Normalize text for marker matching: lowercase, fold diacritics,
/// collapse whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text.to_lowercase().chars().map(fold_diacritic).collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        _ => c,
    }
}

/// Word-boundary view of normalized text: punctuation becomes spaces and
/// the result is padded so every marker can match as ` marker `.
fn padded_words(normalized: &str) -> String {
    let cleaned: String = normalized
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    format!(" {} ", cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn contains_any(padded: &str, markers: &[&str]) -> bool {
    markers
        .iter()
        .any(|m| padded.contains(&format!(" {m} ")))
}

/// Classify a single piece of text.
///
/// Priority order is fixed: collective, then descriptive, then direct,
/// then the direct default.
pub fn classify(text: &str) -> AddressingMode {
    let padded = padded_words(&normalize(text));
    if contains_any(&padded, COLLECTIVE_MARKERS) {
        AddressingMode::Collective
    } else if contains_any(&padded, DESCRIPTIVE_MARKERS) {
        AddressingMode::Descriptive
    } else if contains_any(&padded, DIRECT_MARKERS) {
        AddressingMode::Direct
    } else {
        AddressingMode::Direct
    }
}

/// Detect the addressing mode for a turn.
///
/// Source fallback chain: the current message; failing that, the most
/// recent prior user message; failing that, the retrieved context text.
pub fn detect(message: &str, history: &[Turn], context: &str) -> AddressingMode {
    if !message.trim().is_empty() {
        return classify(message);
    }
    if let Some(turn) = history.iter().rev().find(|t| !t.message.trim().is_empty()) {
        return classify(&turn.message);
    }
    classify(context)
}

/// Normalize an explicit addressing override supplied by the caller.
///
/// Accepts the canonical mode names plus the legacy `TU`/`ELE`/`NOS`
/// aliases (and their possessive variants). Anything else falls back to
/// direct, matching the historical behavior of the override parameter.
pub fn normalize_override(raw: &str) -> AddressingMode {
    if let Ok(mode) = raw.trim().parse::<AddressingMode>() {
        return mode;
    }
    match normalize(raw).as_str() {
        "tu" => AddressingMode::Direct,
        "ele" | "ela" => AddressingMode::Descriptive,
        "nos" | "nosso" | "nossa" => AddressingMode::Collective,
        _ => AddressingMode::Direct,
    }
}

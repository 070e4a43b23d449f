//! Deterministic "last N messages" shortcut.
//!
//! A meta-question about the user's own message history is answered from
//! the database, never by the model: the model would answer it
//! unreliably. Detection is a keyword table over normalized text plus a
//! pattern table for the optional explicit count.

use std::sync::LazyLock;

use regex::Regex;

use crate::addressing::normalize;

/// Counts outside this range fall back to the default.
const MAX_COUNT: usize = 100;
const DEFAULT_COUNT: usize = 10;

/// Count patterns tried in order; group 1 captures the count.
static COUNT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(\d+)\s+(?:mensagens?|msgs?)").expect("valid regex"),
        Regex::new(r"ultimas?\s+(\d+)").expect("valid regex"),
    ]
});

/// A recognized request to enumerate the user's own last messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastMessagesRequest {
    pub count: usize,
}

/// Detect the shortcut intent.
///
/// Requires, on normalized text, the "ultimas" keyword, the "mensagens"
/// keyword, and a first-person-sent verb ("enviei"/"mandei"). The
/// explicit count is optional and must fall in [1, 100].
pub fn detect_last_messages_request(message: &str) -> Option<LastMessagesRequest> {
    let text = normalize(message);

    let asks_last = text.contains("ultimas");
    let about_messages = text.contains("mensagens");
    let first_person_sent = text.contains("enviei") || text.contains("mandei");
    if !(asks_last && about_messages && first_person_sent) {
        return None;
    }

    let count = COUNT_PATTERNS
        .iter()
        .find_map(|re| re.captures(&text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .filter(|n| (1..=MAX_COUNT).contains(n))
        .unwrap_or(DEFAULT_COUNT);

    Some(LastMessagesRequest { count })
}

/// Format the enumeration reply, oldest first.
pub fn format_last_messages(messages: &[String]) -> String {
    let lines: Vec<String> = messages
        .iter()
        .enumerate()
        .map(|(i, m)| format!("{}. \"{m}\"", i + 1))
        .collect();
    format!(
        "Aqui estão as últimas {} mensagens (da mais antiga para a mais recente):\n\n{}",
        messages.len(),
        lines.join("\n")
    )
}

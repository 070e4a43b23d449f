//! Follow-up question guarantee.
//!
//! The structured output contract asks the model for 1–2 follow-up
//! questions, but that is not a guarantee. This stage repairs the list:
//! entries are trimmed, truncated to the character cap, deduplicated by
//! exact match and capped; when the list comes back empty, a secondary,
//! narrower generation call produces 1–2 short open questions. A failure
//! of that secondary call is absorbed: an empty list is valid degraded
//! output, not an error.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use implicada_types::config::EngineConfig;
use implicada_types::llm::{LlmError, PromptMessage};
use implicada_types::reply::{AddressingMode, StructuredReply};

use crate::llm::provider::GenerationProvider;

/// Leading list markers and numbering on generated question lines.
static LINE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-\d.)\s]+").expect("valid regex"));

/// Ensures the reply carries at most `followup_limit` normalized
/// follow-up questions, generating them when the model produced none.
pub struct FollowupGuarantor;

impl FollowupGuarantor {
    /// Repair the follow-up list in place.
    ///
    /// Normalization always runs. The secondary generation call only runs
    /// when the normalized list is empty and `want_followups` is set.
    pub async fn ensure<G: GenerationProvider>(
        generator: &G,
        config: &EngineConfig,
        reply: &mut StructuredReply,
        user_message: &str,
    ) {
        reply.perguntas = normalize_followups(std::mem::take(&mut reply.perguntas), config);
        if !reply.perguntas.is_empty() {
            return;
        }

        match Self::generate_followups(
            generator,
            config,
            reply.posicao,
            user_message,
            &reply.devolucao,
        )
        .await
        {
            Ok(generated) if !generated.is_empty() => reply.perguntas = generated,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "follow-up generation failed; returning empty list");
            }
        }
    }

    /// The secondary, narrower generation call.
    ///
    /// Output is parsed as newline-separated items with leading list
    /// markers stripped, then normalized like model-provided questions.
    #[tracing::instrument(name = "generate_followups", skip_all, fields(mode = %mode))]
    pub async fn generate_followups<G: GenerationProvider>(
        generator: &G,
        config: &EngineConfig,
        mode: AddressingMode,
        user_message: &str,
        base_text: &str,
    ) -> Result<Vec<String>, LlmError> {
        let prompt = format!(
            "Gere de 1 a 2 perguntas de continuação, abertas e curtas (máx. {cap} caracteres cada), em português (Brasil).\n\
             Contexto:\n\
             - Posição escolhida: {mode}\n\
             - Mensagem do interagente: \"{message}\"\n\
             - Resposta que foi dada: \"{base}\"\n\
             Critérios:\n\
             - Evite perguntas retóricas ou genéricas.\n\
             - Se houver tensão/ambivalência, convide a notar o que muda na experiência/corpo.\n\
             - Sem enumerações; apenas uma pergunta por linha.",
            cap = config.followup_char_cap,
            message = truncate_chars(user_message.trim(), 500),
            base = truncate_chars(base_text.trim(), 1000),
        );

        let raw = generator
            .generate(config.followup_model(), &[PromptMessage::user(prompt)])
            .await?;

        let lines: Vec<String> = raw
            .lines()
            .map(|l| LINE_MARKER.replace(l, "").trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        Ok(normalize_followups(lines, config))
    }
}

/// Trim, truncate to the character cap, deduplicate by exact match,
/// cap list length.
pub fn normalize_followups(items: Vec<String>, config: &EngineConfig) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let question = truncate_chars(item.trim(), config.followup_char_cap);
        if question.is_empty() || !seen.insert(question.clone()) {
            continue;
        }
        out.push(question);
        if out.len() == config.followup_limit {
            break;
        }
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

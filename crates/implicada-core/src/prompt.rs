//! Prompt assembly.
//!
//! Builds the ordered message sequence sent to the generation service.
//! Block order is fixed and deterministic; empty optional blocks are
//! silently omitted (no placeholder inserted).
//!
//! Layout:
//! ```text
//! [MANIFESTO-IMPLICADA] + [INSTRUCOES-COMUNS] + [POSICAO-ESPECIFICA] + [PROTOCOLO-E-FORMATO]
//! (optional) retrieved context, labeled as indirect support material
//! prior turns, ascending, alternating user/model roles (last 10)
//! the current user message
//! ```

use implicada_types::chat::Turn;
use implicada_types::llm::PromptMessage;
use implicada_types::reply::AddressingMode;

use crate::persona::PersonaProfile;

/// Assembles role-tagged message blocks for the generation service.
pub struct PromptAssembler;

impl PromptAssembler {
    /// Build the full ordered prompt.
    ///
    /// `history` must already be in chronological (ascending-id) order;
    /// only the most recent `history_window` turns are replayed.
    pub fn assemble(
        persona: &PersonaProfile,
        mode: AddressingMode,
        context: &str,
        history: &[Turn],
        message: &str,
        history_window: usize,
    ) -> Vec<PromptMessage> {
        let header = format!(
            "[MANIFESTO-IMPLICADA]\n{}\n\n[INSTRUCOES-COMUNS]\n{}\n\n[POSICAO-ESPECIFICA]\n{}\n\n[PROTOCOLO-E-FORMATO]\n{}",
            persona.manifesto.trim(),
            persona.common_instructions.trim(),
            persona.voice_for(mode).trim(),
            persona.protocol_and_format.trim(),
        );

        let mut messages = Vec::with_capacity(2 + history.len() * 2 + 1);
        messages.push(PromptMessage::user(header));

        if !context.trim().is_empty() {
            messages.push(PromptMessage::user(format!(
                "Contexto útil (use indiretamente, reelabore):\n\n{context}"
            )));
        }

        let start = history.len().saturating_sub(history_window);
        for turn in &history[start..] {
            if !turn.message.is_empty() {
                messages.push(PromptMessage::user(turn.message.clone()));
            }
            if !turn.reply.is_empty() {
                messages.push(PromptMessage::model(turn.reply.clone()));
            }
        }

        messages.push(PromptMessage::user(message.to_string()));
        messages
    }
}

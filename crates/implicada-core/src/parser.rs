//! Strict parsing and repair of the structured model output.
//!
//! The model is instructed to emit only the contract JSON, optionally
//! code-fenced. Real output drifts, so parsing is an ordered chain of
//! strategies, each tagged in the result so tests can assert which path
//! fired:
//!
//! 1. strip fences and whitespace, parse directly;
//! 2. parse the first-`{`..last-`}` substring;
//! 3. synthesize a fallback object carrying the raw text verbatim (or the
//!    fixed fallback sentence when the raw text is empty).
//!
//! This stage never fails. Regardless of path, the addressing-mode field
//! is overwritten with the detector's mode: detection is a control input,
//! not a model output, and the model's self-reported mode is discarded.

use serde_json::{Map, Value};

use implicada_types::reply::{AddressingMode, ParsePath, StructuredReply};

/// Reply used when generation produced nothing usable.
pub const FALLBACK_REPLY: &str =
    "Eu reconheço que, neste momento, não tenho clareza suficiente para responder plenamente.";

/// Parse raw model output into a sanitized `StructuredReply`.
pub fn parse_structured(raw: &str, mode: AddressingMode) -> (StructuredReply, ParsePath) {
    let text = strip_fences(raw);

    if let Some(map) = parse_object(text) {
        return (sanitize(map, mode), ParsePath::Direct);
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            if let Some(map) = parse_object(&text[start..=end]) {
                return (sanitize(map, mode), ParsePath::Extracted);
            }
        }
    }

    let reply_text = if raw.trim().is_empty() {
        FALLBACK_REPLY.to_string()
    } else {
        raw.trim().to_string()
    };
    (StructuredReply::from_text(reply_text, mode), ParsePath::Fallback)
}

/// Strip a surrounding code fence (``` or ```json) and outer whitespace.
fn strip_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
        text = rest.trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Field-by-field sanitation: lists coerced to arrays of strings,
/// sub-objects to their default shapes, the mode always overwritten.
fn sanitize(map: Map<String, Value>, mode: AddressingMode) -> StructuredReply {
    StructuredReply {
        devolucao: str_field(&map, "devolucao"),
        perguntas: str_list(&map, "perguntas"),
        apontamentos_nao_compreendidos: str_list(&map, "apontamentos_nao_compreendidos"),
        limite: sub_object(&map, "limite"),
        silencio: sub_object(&map, "silencio"),
        posicao: mode,
        etica: sub_object(&map, "etica"),
    }
}

fn str_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn str_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn sub_object<T: serde::de::DeserializeOwned + Default>(
    map: &Map<String, Value>,
    key: &str,
) -> T {
    map.get(key)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "devolucao": "Eu noto o que trazes. O que muda agora?",
        "perguntas": ["O que muda no corpo?", "Onde está a tensão?"],
        "apontamentos_nao_compreendidos": ["contexto do trabalho"],
        "limite": { "fora_de_escopo": false, "observacao": "" },
        "silencio": { "sugerido": true, "duracao_s": 20 },
        "posicao": "descriptive",
        "etica": { "tensoes": ["autonomia"], "nota": "" }
    }"#;

    #[test]
    fn test_direct_parse() {
        let (reply, path) = parse_structured(VALID, AddressingMode::Direct);
        assert_eq!(path, ParsePath::Direct);
        assert_eq!(reply.perguntas.len(), 2);
        assert!(reply.silencio.sugerido);
        assert_eq!(reply.silencio.duracao_s, 20.0);
    }

    #[test]
    fn test_fenced_json_equals_unfenced() {
        let fenced = format!("```json\n{VALID}\n```");
        let (from_fenced, path) = parse_structured(&fenced, AddressingMode::Direct);
        let (from_plain, _) = parse_structured(VALID, AddressingMode::Direct);
        assert_eq!(path, ParsePath::Direct);
        assert_eq!(from_fenced.devolucao, from_plain.devolucao);
        assert_eq!(from_fenced.perguntas, from_plain.perguntas);
    }

    #[test]
    fn test_bare_fence_without_language_tag() {
        let fenced = format!("```\n{VALID}\n```");
        let (_, path) = parse_structured(&fenced, AddressingMode::Direct);
        assert_eq!(path, ParsePath::Direct);
    }

    #[test]
    fn test_trailing_prose_extracts_object() {
        let text = format!("Segue a resposta:\n{VALID}\nEspero que ajude.");
        let (reply, path) = parse_structured(&text, AddressingMode::Direct);
        assert_eq!(path, ParsePath::Extracted);
        assert_eq!(reply.perguntas.len(), 2);
    }

    #[test]
    fn test_plain_prose_falls_back_verbatim() {
        let prose = "Eu noto que a pergunta pede presença, não resposta.";
        let (reply, path) = parse_structured(prose, AddressingMode::Direct);
        assert_eq!(path, ParsePath::Fallback);
        assert_eq!(reply.devolucao, prose);
        assert!(reply.perguntas.is_empty());
        assert!(reply.apontamentos_nao_compreendidos.is_empty());
        assert!(!reply.limite.fora_de_escopo);
        assert!(!reply.silencio.sugerido);
        assert!(reply.etica.tensoes.is_empty());
    }

    #[test]
    fn test_empty_raw_uses_fallback_sentence() {
        let (reply, path) = parse_structured("   ", AddressingMode::Collective);
        assert_eq!(path, ParsePath::Fallback);
        assert_eq!(reply.devolucao, FALLBACK_REPLY);
        assert_eq!(reply.posicao, AddressingMode::Collective);
    }

    #[test]
    fn test_model_mode_is_discarded() {
        // The JSON self-reports "descriptive"; the detector said collective.
        let (reply, _) = parse_structured(VALID, AddressingMode::Collective);
        assert_eq!(reply.posicao, AddressingMode::Collective);
    }

    #[test]
    fn test_mode_override_is_idempotent() {
        let (first, _) = parse_structured(VALID, AddressingMode::Collective);
        let (second, _) = parse_structured(VALID, AddressingMode::Collective);
        assert_eq!(first.posicao, second.posicao);
    }

    #[test]
    fn test_non_array_perguntas_coerced_to_empty() {
        let text = r#"{"devolucao": "ok", "perguntas": "não é lista"}"#;
        let (reply, path) = parse_structured(text, AddressingMode::Direct);
        assert_eq!(path, ParsePath::Direct);
        assert!(reply.perguntas.is_empty());
    }

    #[test]
    fn test_missing_sub_objects_get_default_shape() {
        let text = r#"{"devolucao": "ok"}"#;
        let (reply, _) = parse_structured(text, AddressingMode::Direct);
        assert!(!reply.limite.fora_de_escopo);
        assert_eq!(reply.limite.observacao, "");
        assert_eq!(reply.silencio.duracao_s, 0.0);
        assert_eq!(reply.etica.nota, "");
    }

    #[test]
    fn test_malformed_sub_object_gets_default_shape() {
        let text = r#"{"devolucao": "ok", "silencio": "logo"}"#;
        let (reply, _) = parse_structured(text, AddressingMode::Direct);
        assert!(!reply.silencio.sugerido);
    }

    #[test]
    fn test_json_scalar_is_not_an_object() {
        let (reply, path) = parse_structured("42", AddressingMode::Direct);
        assert_eq!(path, ParsePath::Fallback);
        assert_eq!(reply.devolucao, "42");
    }

    #[test]
    fn test_unbalanced_braces_fall_back() {
        let (reply, path) = parse_structured("{ devolucao incompleta", AddressingMode::Direct);
        assert_eq!(path, ParsePath::Fallback);
        assert!(reply.devolucao.contains("devolucao incompleta"));
    }
}

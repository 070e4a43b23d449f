//! Structured reply contract and addressing modes.
//!
//! `StructuredReply` is the fixed JSON object the generative model is
//! instructed to emit. Field names are the wire contract (pt-BR) and must
//! not be renamed.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Grammatical stance the shaped reply must adopt.
///
/// Detection is a control input: whatever mode the model self-reports in
/// its JSON output is discarded and replaced by the detector's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressingMode {
    /// Second-person address ("tu").
    Direct,
    /// Third-person description ("o interlocutor").
    Descriptive,
    /// First-person plural co-construction ("nós").
    Collective,
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressingMode::Direct => write!(f, "direct"),
            AddressingMode::Descriptive => write!(f, "descriptive"),
            AddressingMode::Collective => write!(f, "collective"),
        }
    }
}

impl FromStr for AddressingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(AddressingMode::Direct),
            "descriptive" => Ok(AddressingMode::Descriptive),
            "collective" => Ok(AddressingMode::Collective),
            other => Err(format!("invalid addressing mode: '{other}'")),
        }
    }
}

impl Default for AddressingMode {
    fn default() -> Self {
        AddressingMode::Direct
    }
}

/// Out-of-scope flag with an optional note.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitNote {
    #[serde(default)]
    pub fora_de_escopo: bool,
    #[serde(default)]
    pub observacao: String,
}

/// Active-silence suggestion with a duration in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SilenceHint {
    #[serde(default)]
    pub sugerido: bool,
    #[serde(default)]
    pub duracao_s: f64,
}

/// Ethical tensions surfaced by the reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EthicsNote {
    #[serde(default)]
    pub tensoes: Vec<String>,
    #[serde(default)]
    pub nota: String,
}

/// The structured model-output contract.
///
/// The model emits only this JSON, optionally code-fenced. The parser
/// tolerates both and repairs near-misses; see `implicada-core::parser`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredReply {
    /// The shaped reply text.
    pub devolucao: String,
    /// 0..2 follow-up questions, each at most 140 characters.
    #[serde(default)]
    pub perguntas: Vec<String>,
    /// Points the model could not understand in the user's message.
    #[serde(default)]
    pub apontamentos_nao_compreendidos: Vec<String>,
    #[serde(default)]
    pub limite: LimitNote,
    #[serde(default)]
    pub silencio: SilenceHint,
    #[serde(default)]
    pub posicao: AddressingMode,
    #[serde(default)]
    pub etica: EthicsNote,
}

impl StructuredReply {
    /// A fully-defaulted reply carrying the given text and mode.
    pub fn from_text(text: String, mode: AddressingMode) -> Self {
        Self {
            devolucao: text,
            perguntas: Vec::new(),
            apontamentos_nao_compreendidos: Vec::new(),
            limite: LimitNote::default(),
            silencio: SilenceHint::default(),
            posicao: mode,
            etica: EthicsNote::default(),
        }
    }
}

/// Which parse strategy produced a `StructuredReply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePath {
    /// The (fence-stripped) text parsed directly as JSON.
    Direct,
    /// The first-`{`..last-`}` substring parsed as JSON.
    Extracted,
    /// Nothing parsed; a synthesized object carries the raw text.
    Fallback,
}

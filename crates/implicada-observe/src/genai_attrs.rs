//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! These follow the OTel GenAI Semantic Conventions specification for
//! consistent LLM call instrumentation across the codebase. All constants
//! are string slices usable in `tracing::span!` and `tracing::info_span!`
//! field names.
//!
//! Span naming convention: `"{operation} {model}"` (e.g., `"chat gemini-2.5-flash"`)

// --- Required attributes ---

/// The name of the operation being performed (e.g., "chat", "embeddings").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "gemini").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

// --- Recommended attributes ---

/// The model ID requested (e.g., "gemini-2.5-flash").
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

// --- Operation name values ---

/// Primary shaped-reply generation.
pub const OP_CHAT: &str = "chat";

/// Secondary follow-up question generation.
pub const OP_GENERATE_FOLLOWUPS: &str = "generate_followups";

/// Query/turn embedding.
pub const OP_EMBEDDINGS: &str = "embeddings";

// --- Provider name values ---

/// Gemini provider identifier.
pub const PROVIDER_GEMINI: &str = "gemini";

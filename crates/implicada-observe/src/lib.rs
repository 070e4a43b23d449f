//! Observability setup for Implicada.

pub mod genai_attrs;
pub mod tracing_setup;

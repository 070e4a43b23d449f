//! Core response-shaping pipeline for the Implicada conversational backend.
//!
//! Everything here is I/O-free except through the provider and repository
//! traits; concrete implementations live in implicada-infra.

pub mod addressing;
pub mod chat;
pub mod followup;
pub mod llm;
pub mod parser;
pub mod persona;
pub mod prompt;
pub mod retrieval;

//! # Infrastructure Layer
//!
//! Concrete adapters for the external collaborators: the Matrix chat
//! transport, the LLM providers, the image generation backend, and the
//! interactive terminal used for manual testing.

pub mod llm;
pub mod matrix;
pub mod media;
pub mod terminal;

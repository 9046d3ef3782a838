//! Risk Gate LLM - backend abstraction for the external findings provider
//!
//! The decision engine treats the generative-AI provider as a black box that
//! turns a (sanitized) prompt into text. This crate owns that boundary:
//! - [`LlmBackend`]: one system prompt plus one user prompt in, text out
//! - [`OpenAiBackend`]: chat-completions over HTTP with a hard timeout
//! - [`MockBackend`]: scripted answers, failures and delays with a call counter
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       risk-gate AI findings adapter     │
//! │  (sanitizes, prompts, parses findings)  │
//! └────────────────┬────────────────────────┘
//!                  │
//!                  ▼
//!           ┌─────────────┐
//!           │ LlmBackend  │
//!           │ (OpenAI /   │
//!           │  Mock)      │
//!           └─────────────┘
//! ```
//!
//! Nothing in this crate sanitizes content. Callers must run every payload
//! through the risk-gate sanitizer before building a [`CompletionRequest`].

pub mod backend;

// Re-export main types for convenience
pub use backend::traits::{CompletionRequest, CompletionResponse, LlmBackend, LlmError, Usage};
pub use backend::{MockBackend, MockFailure, OpenAiBackend};

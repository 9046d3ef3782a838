//! Risk Gate command-line front end.
//!
//! Wires the decision engine to an on-disk SQLite store and an optional
//! OpenAI-compatible provider, then runs one operation and prints JSON.

pub mod commands;
pub mod config;

pub use commands::{build_service, execute};
pub use config::{Args, Command};

//! toolprobe checks which models behind an OpenAI-compatible endpoint can be
//! trusted with tool calling.
//!
//! The crate is organized in a few layers:
//! - [`api`] defines the chat-completion and model-listing payloads, plus
//!   model discovery and filtering.
//! - [`core`] owns the endpoint client, the probe battery, scoring,
//!   run orchestration, the JSON report and configuration.
//! - [`cli`] parses arguments and renders console output.
//! - [`utils`] holds URL and logging helpers.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;

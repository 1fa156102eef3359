//! uiforge - generate Gradio/Streamlit front ends for ML tasks with an LLM
//!
//! This crate provides:
//! - Requirements analysis and code generation with a run-and-repair loop
//! - A supervisor owning the generated app's process and PID sidecar file
//! - LLM provider abstraction (OpenAI, Anthropic, Ollama)
//! - A mock inference server and OpenAPI schema extraction

pub mod cli;
pub mod config;
pub mod generator;
pub mod llm;
pub mod openapi;
pub mod paths;
pub mod server;
pub mod supervisor;

pub use config::Config;

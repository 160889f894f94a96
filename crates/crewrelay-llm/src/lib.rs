//! Crewrelay LLM - Completion Engine Abstraction
//!
//! This crate provides the completion engine integration for crewrelay:
//! - Provider: `LlmProvider` trait every engine implements
//! - OpenAI: chat completions via async-openai
//! - Mock: scripted provider for tests and offline runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::{MockProvider, MockReply};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use provider::LlmProvider;

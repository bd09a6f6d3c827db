//! # aida-llm
//!
//! Model generation behind the [`ChatProvider`] trait.
//!
//! - [`OpenAiChatProvider`]: non-streaming `/chat/completions` over `reqwest`
//! - [`UnconfiguredProvider`]: stands in when no API key is available

#![deny(unsafe_code)]

pub mod openai;
pub mod provider;
pub mod unconfigured;

pub use openai::{OpenAiChatProvider, OpenAiConfig};
pub use provider::{ChatProvider, CompletionOptions, ProviderError, ProviderResult};
pub use unconfigured::UnconfiguredProvider;

//! # aida-runtime
//!
//! Runs one chat turn end to end.
//!
//! [`TurnOrchestrator::handle_turn`] validates the request, runs the safety
//! gate and both rule engines, persists readings and baselines, and finally
//! assembles the six system segments sent to the [`aida_llm::ChatProvider`].

#![deny(unsafe_code)]

pub mod context;
pub mod directive;
pub mod errors;
pub mod orchestrator;
pub mod prompt;
pub mod protocol;

pub use context::ContextBundle;
pub use directive::SituationDirective;
pub use errors::{RuntimeError, TurnError};
pub use orchestrator::{CoachConfig, TurnOrchestrator, TurnOutcome, TurnRequest, TurnSource};
pub use prompt::system_prompt;
pub use protocol::ProtocolDocument;

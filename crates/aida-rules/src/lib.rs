//! # aida-rules
//!
//! The deterministic half of a chat turn. Everything here is pure and
//! runs before any model call.
//!
//! - [`extract`]: glucose, moment, symptom, baseline, and confirmation extractors
//! - [`safety`]: the safety gate that short-circuits with a canned reply
//! - [`engine`]: ordered pattern rule lists with a single `evaluate`
//! - [`phase`] / [`nutrition`]: the two built-in rule lists

#![deny(unsafe_code)]

pub mod engine;
pub mod extract;
pub mod nutrition;
pub mod phase;
pub mod safety;

pub use engine::{Rule, RuleContext, RuleMatch, RuleReply, RuleSet};
pub use extract::BaselineExtraction;
pub use nutrition::nutrition_rules;
pub use phase::phase_rules;
pub use safety::{BypassReason, SafetyBypass, SafetyDecision, SafetyEvaluator};

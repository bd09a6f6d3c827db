//! Coaching pipeline settings.

use aida_core::Phase;
use serde::{Deserialize, Serialize};

/// Windows, phase, and escalation details for each turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoachSettings {
    /// Phase that selects phase-rule replies.
    pub phase: Phase,
    /// Minimum weeks stated in the system prompt.
    pub phase_min_weeks: u32,
    /// Non-system turns examined by the safety gate.
    pub history_window: usize,
    /// Non-system turns forwarded to the model.
    pub conversation_window: usize,
    /// Recent readings listed in the memory context.
    pub recent_readings: usize,
    /// Contact line appended to the severe hyperglycemia reply.
    pub escalation_contact: String,
}

impl Default for CoachSettings {
    fn default() -> Self {
        Self {
            phase: Phase::Fase1,
            phase_min_weeks: 2,
            history_window: 12,
            conversation_window: 20,
            recent_readings: 6,
            escalation_contact: "https://wa.me/5214531030592".to_string(),
        }
    }
}

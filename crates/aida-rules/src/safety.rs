//! Safety gate evaluated before every other stage.
//!
//! The gate reads a short rolling history plus the current message so a
//! symptom or number mentioned a turn earlier still counts. Decisions are
//! checked in a fixed order and the first one that applies wins.

use std::fmt;

use aida_core::Moment;
use serde::Serialize;
use tracing::debug;

use crate::extract::{detect_moment, first_glucose_mention, has_hypo_symptoms, has_severe_symptoms};

const HYPO_MAX: u16 = 69;
const HYPO_WITH_SYMPTOMS_MAX: u16 = 80;
const HYPER_SEVERE_MIN: u16 = 300;
const HYPER_VERY_HIGH_MIN: u16 = 350;

const HYPO_REPLY: &str = "Tu glucosa está baja y eso puede explicar el mareo.\n\
Toma AHORA 1 opción: ½ cucharada de miel o ½ manzana o guayaba.\n\
Espera 15 min y vuelve a medir.\n\
Escríbeme el número. Si empeoras o te desmayas, urgencias.";

const HYPER_SEVERE_REPLY: &str = "Esa glucosa es muy alta y con esos síntomas es importante atenderlo YA.\n\
Busca urgencias o atención médica inmediata.\n\
Si puedes, hidrátate con agua y evita comer más por ahora.";

const HYPER_VERY_HIGH_REPLY: &str = "Esa lectura es alta.\n\
Hidrátate con agua y evita carbohidratos por ahora.\n\
Si tienes vómito, respiración agitada, confusión o dolor en pecho: urgencias.\n\
Dime si fue en ayuno, 2h postcomida o antes de dormir.";

/// Why the gate answered instead of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassReason {
    /// Low glucose, or borderline low with hypoglycemic cues.
    HypoSafety,
    /// Very high glucose with a severe symptom.
    HyperSevereSafety,
    /// Very high glucose without severe symptoms.
    HyperVeryHigh,
}

impl BypassReason {
    /// Wire and metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HypoSafety => "hypo_safety",
            Self::HyperSevereSafety => "hyper_severe_safety",
            Self::HyperVeryHigh => "hyper_very_high",
        }
    }
}

impl fmt::Display for BypassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canned safety reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SafetyBypass {
    /// Decision that fired.
    pub reason: BypassReason,
    /// Reply sent to the user verbatim.
    pub reply: String,
}

/// Outcome of the safety gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SafetyDecision {
    /// Stop the turn and send this reply.
    Bypass(SafetyBypass),
    /// Continue with the detected moment and reading.
    Proceed {
        /// Moment detected over history and message.
        moment: Moment,
        /// Reading detected over history and message.
        glucose: Option<u16>,
    },
}

impl SafetyDecision {
    /// Whether the gate answered the turn.
    pub fn is_bypass(&self) -> bool {
        matches!(self, Self::Bypass(_))
    }
}

/// Deterministic safety gate.
#[derive(Clone, Debug, Default)]
pub struct SafetyEvaluator {
    escalation_contact: Option<String>,
}

impl SafetyEvaluator {
    /// Gate whose severe reply ends with the given contact line.
    pub fn new(escalation_contact: impl Into<String>) -> Self {
        let contact = escalation_contact.into();
        Self {
            escalation_contact: (!contact.trim().is_empty()).then_some(contact),
        }
    }

    /// Evaluate `message` together with the rendered `history`.
    pub fn evaluate(&self, message: &str, history: &str) -> SafetyDecision {
        let combined = if history.is_empty() {
            message.to_string()
        } else {
            format!("{history}\n{message}")
        };

        let glucose = first_glucose_mention(&combined);
        let Some(value) = glucose else {
            return SafetyDecision::Proceed {
                moment: detect_moment(&combined),
                glucose: None,
            };
        };

        if value <= HYPO_MAX || (value <= HYPO_WITH_SYMPTOMS_MAX && has_hypo_symptoms(&combined)) {
            debug!(glucose = value, "hypoglycemia bypass");
            return self.bypass(BypassReason::HypoSafety);
        }

        let severe = has_severe_symptoms(&combined);
        if value >= HYPER_SEVERE_MIN && severe {
            debug!(glucose = value, "severe hyperglycemia bypass");
            return self.bypass(BypassReason::HyperSevereSafety);
        }
        if value >= HYPER_VERY_HIGH_MIN {
            debug!(glucose = value, "very high glucose bypass");
            return self.bypass(BypassReason::HyperVeryHigh);
        }

        SafetyDecision::Proceed {
            moment: detect_moment(&combined),
            glucose,
        }
    }

    fn bypass(&self, reason: BypassReason) -> SafetyDecision {
        let reply = match reason {
            BypassReason::HypoSafety => HYPO_REPLY.to_string(),
            BypassReason::HyperSevereSafety => match &self.escalation_contact {
                Some(contact) => format!("{HYPER_SEVERE_REPLY}\nSi quieres, escríbeme aquí: {contact}"),
                None => HYPER_SEVERE_REPLY.to_string(),
            },
            BypassReason::HyperVeryHigh => HYPER_VERY_HIGH_REPLY.to_string(),
        };
        SafetyDecision::Bypass(SafetyBypass { reason, reply })
    }
}

//! System segments injected ahead of the conversation.

use aida_core::{Baseline, ChatMessage, Reading};
use chrono::SecondsFormat;
use serde_json::Value;

use crate::protocol::ProtocolDocument;

const NOT_AVAILABLE: &str = "N/D";

/// The six system segments of a model turn, in send order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextBundle {
    /// Persona and rules.
    pub system_prompt: String,
    /// Baseline and recent readings.
    pub memory: String,
    /// Rendered progress snapshot.
    pub progress: String,
    /// Client-supplied onboarding data.
    pub onboarding: String,
    /// Current protocol rules.
    pub protocol: String,
    /// Situational instruction.
    pub directive: String,
}

impl ContextBundle {
    /// System segments followed by the conversation tail.
    pub fn into_messages(self, conversation: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(6 + conversation.len());
        messages.extend(
            [
                self.system_prompt,
                self.memory,
                self.progress,
                self.onboarding,
                self.protocol,
                self.directive,
            ]
            .into_iter()
            .map(ChatMessage::system),
        );
        messages.extend(conversation);
        messages
    }
}

/// Memory block: stored baseline, last reading, recent readings.
pub fn memory_context(baseline: &Baseline, last: Option<&Reading>, recent: &[Reading]) -> String {
    let baseline_line = if baseline.a1c.is_some() || baseline.avg_glucose.is_some() {
        format!(
            "Baseline registrado: A1c={} | Promedio={}",
            baseline.a1c.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string()),
            baseline
                .avg_glucose
                .map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string()),
        )
    } else {
        "Baseline: no registrado.".to_string()
    };

    let last_line = last.map_or_else(
        || "Última lectura: no hay.".to_string(),
        |r| format!("Última lectura: {} mg/dL ({}) {}", r.glucose, r.moment, timestamp(r)),
    );

    let recent_lines = if recent.is_empty() {
        "- (sin lecturas recientes)".to_string()
    } else {
        recent
            .iter()
            .map(|r| format!("- {} ({}) {}", r.glucose, r.moment, timestamp(r)))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Memoria del usuario (NO inventar, usar solo esto):\n\
         {baseline_line}\n\
         {last_line}\n\
         Lecturas recientes:\n\
         {recent_lines}\n\
         \n\
         Uso: si hay mejora vs histórico, menciónala breve (\"hace X lecturas estabas más alto...\")."
    )
}

/// Onboarding block. `null` counts as absent.
pub fn onboarding_context(onboarding: Option<&Value>) -> String {
    match onboarding {
        Some(value) if !value.is_null() => {
            format!("Datos base del usuario (onboarding):\n{value}")
        }
        _ => "No hay datos de onboarding.".to_string(),
    }
}

/// Protocol block with the whole document as compact JSON.
pub fn protocol_context(protocol: &ProtocolDocument) -> String {
    format!(
        "Reglas del protocolo actual (usar como referencia educativa, no repetir literal):\n{}",
        protocol.as_value()
    )
}

fn timestamp(reading: &Reading) -> String {
    reading.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aida_core::{Moment, Symptoms};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn reading(glucose: u16, moment: Moment) -> Reading {
        Reading {
            id: 1,
            user_id: "dev-1".into(),
            glucose,
            moment,
            symptoms: Symptoms::NONE,
            created_at: Utc.with_ymd_and_hms(2026, 3, 2, 7, 30, 0).unwrap(),
        }
    }

    #[test]
    fn empty_memory() {
        let text = memory_context(&Baseline::default(), None, &[]);
        assert_eq!(
            text,
            "Memoria del usuario (NO inventar, usar solo esto):\n\
             Baseline: no registrado.\n\
             Última lectura: no hay.\n\
             Lecturas recientes:\n\
             - (sin lecturas recientes)\n\
             \n\
             Uso: si hay mejora vs histórico, menciónala breve (\"hace X lecturas estabas más alto...\")."
        );
    }

    #[test]
    fn memory_with_readings_and_partial_baseline() {
        let baseline = Baseline {
            a1c: Some(8.5),
            avg_glucose: None,
            set_at: Some(Utc::now()),
        };
        let last = reading(118, Moment::Fasting);
        let recent = vec![last.clone(), reading(160, Moment::PostMeal)];
        let text = memory_context(&baseline, Some(&last), &recent);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "Baseline registrado: A1c=8.5 | Promedio=N/D");
        assert_eq!(lines[2], "Última lectura: 118 mg/dL (AYUNO) 2026-03-02T07:30:00Z");
        assert_eq!(lines[4], "- 118 (AYUNO) 2026-03-02T07:30:00Z");
        assert_eq!(lines[5], "- 160 (POSTCOMIDA) 2026-03-02T07:30:00Z");
    }

    #[test]
    fn onboarding_present_and_absent() {
        assert_eq!(onboarding_context(None), "No hay datos de onboarding.");
        assert_eq!(onboarding_context(Some(&Value::Null)), "No hay datos de onboarding.");
        assert_eq!(
            onboarding_context(Some(&json!({"edad": 52}))),
            "Datos base del usuario (onboarding):\n{\"edad\":52}"
        );
    }

    #[test]
    fn protocol_block_is_compact_json() {
        let doc = ProtocolDocument::from_value(json!({"name": "Fase 1"}));
        assert_eq!(
            protocol_context(&doc),
            "Reglas del protocolo actual (usar como referencia educativa, no repetir literal):\n{\"name\":\"Fase 1\"}"
        );
    }

    #[test]
    fn bundle_orders_segments_before_conversation() {
        let bundle = ContextBundle {
            system_prompt: "a".into(),
            memory: "b".into(),
            progress: "c".into(),
            onboarding: "d".into(),
            protocol: "e".into(),
            directive: "f".into(),
        };
        let messages = bundle.into_messages(vec![ChatMessage::user("hola")]);
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b", "c", "d", "e", "f", "hola"]);
        assert!(messages[..6].iter().all(|m| m.role == aida_core::Role::System));
    }
}

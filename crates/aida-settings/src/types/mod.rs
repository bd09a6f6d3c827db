//! Settings type definitions.

mod coach;
mod llm;
mod push;
mod server;

pub use coach::CoachSettings;
pub use llm::LlmSettings;
pub use push::PushSettings;
pub use server::{LoggingSettings, ServerSettings};

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AidaSettings {
    /// HTTP listener and file locations.
    pub server: ServerSettings,
    /// Language model provider.
    pub llm: LlmSettings,
    /// Coaching pipeline knobs.
    pub coach: CoachSettings,
    /// Log output.
    pub logging: LoggingSettings,
    /// Web push delivery.
    pub push: PushSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let s: AidaSettings = serde_json::from_str(r#"{"server":{"port":9000}}"#).unwrap();
        assert_eq!(s.server.port, 9000);
        assert_eq!(s.server.host, ServerSettings::default().host);
        assert_eq!(s.llm.model, "gpt-4.1-mini");
    }

    #[test]
    fn serializes_camel_case_keys() {
        let v = serde_json::to_value(AidaSettings::default()).unwrap();
        assert!(v["server"]["dbPath"].is_string());
        assert!(v["coach"]["phaseMinWeeks"].is_number());
        assert!(v["llm"]["apiKeyEnv"].is_string());
        assert_eq!(v["push"]["vapidPrivateKeyEnv"], "VAPID_PRIVATE_KEY");
    }
}

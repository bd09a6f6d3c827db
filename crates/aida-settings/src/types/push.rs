//! Web push delivery settings.

use serde::{Deserialize, Serialize};

/// VAPID credentials are read from the environment variables named here.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushSettings {
    /// Variable holding the base64url raw P-256 private key.
    pub vapid_private_key_env: String,
    /// Variable holding the VAPID subject (`mailto:` or `https:` URL).
    pub vapid_subject_env: String,
    /// Time-to-live sent to the push service, in seconds.
    pub ttl_secs: u32,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            vapid_private_key_env: "VAPID_PRIVATE_KEY".to_string(),
            vapid_subject_env: "VAPID_SUBJECT".to_string(),
            ttl_secs: 2_419_200,
        }
    }
}

impl PushSettings {
    /// Private key and subject, when both variables are set and non-empty.
    pub fn vapid_credentials(&self) -> Option<(String, String)> {
        let key = read_non_empty(&self.vapid_private_key_env)?;
        let subject = read_non_empty(&self.vapid_subject_env)?;
        Some((key, subject))
    }
}

fn read_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

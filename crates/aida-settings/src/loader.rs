//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`AidaSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `AIDA_*` environment variable overrides (highest priority)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::AidaSettings;

/// Resolve the path to the settings file (`~/.aida/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".aida").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<AidaSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<AidaSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<AidaSettings> {
    let defaults = serde_json::to_value(AidaSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored (fall back to file/default).
pub fn apply_env_overrides(settings: &mut AidaSettings) {
    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read_env_string("AIDA_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("AIDA_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("AIDA_DB_PATH") {
        settings.server.db_path = v;
    }
    if let Some(v) = read_env_string("AIDA_PROTOCOL_PATH") {
        settings.server.protocol_path = v;
    }

    // ── LLM ─────────────────────────────────────────────────────────
    if let Some(v) = read_env_string("AIDA_MODEL") {
        settings.llm.model = v;
    }
    if let Some(v) = read_env_string("AIDA_LLM_BASE_URL") {
        settings.llm.base_url = v;
    }
    if let Some(v) = read_env_f64("AIDA_TEMPERATURE", 0.0, 2.0) {
        settings.llm.temperature = v;
    }

    // ── Coach ───────────────────────────────────────────────────────
    if let Some(v) = read_env_string("AIDA_PHASE") {
        match v.parse() {
            Ok(phase) => settings.coach.phase = phase,
            Err(_) => tracing::warn!(key = "AIDA_PHASE", value = %v, "invalid phase env var, ignoring"),
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("AIDA_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_string("AIDA_LOG_FORMAT") {
        settings.logging.format = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a finite `f64` within a range.
pub fn parse_f64_range(val: &str, min: f64, max: f64) -> Option<f64> {
    let n: f64 = val.trim().parse().ok()?;
    (n.is_finite() && n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_f64(name: &str, min: f64, max: f64) -> Option<f64> {
    let val = std::env::var(name).ok()?;
    let result = parse_f64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid float env var, ignoring");
    }
    result
}

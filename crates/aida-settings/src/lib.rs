//! # aida-settings
//!
//! Configuration for the AIDA backend, loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`AidaSettings::default()`]
//! 2. **User file**: `~/.aida/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `AIDA_*` overrides (highest priority)
//!
//! The binary applies CLI flags on top of the loaded value.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<AidaSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from the default path with env var
/// overrides. If loading fails, returns compiled defaults.
pub fn get_settings() -> &'static AidaSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// # Errors
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: AidaSettings) -> std::result::Result<(), AidaSettings> {
    SETTINGS.set(settings)
}

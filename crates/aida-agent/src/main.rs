//! # aida-agent
//!
//! AIDA server binary: loads settings, opens the database, wires the
//! provider and orchestrator together, and serves HTTP until ctrl-c.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use aida_core::logging::{LogFormat, init_subscriber};
use aida_llm::{ChatProvider, OpenAiChatProvider, OpenAiConfig, UnconfiguredProvider};
use aida_runtime::{CoachConfig, ProtocolDocument, TurnOrchestrator};
use aida_server::{AidaServer, PushSender, ServerConfig, VapidConfig, WebPushSender};
use aida_settings::{AidaSettings, LlmSettings, PushSettings};
use aida_store::{ConnectionConfig, SqliteStore};
use anyhow::{Context, Result};
use clap::Parser;

/// AIDA glucose-coaching server.
#[derive(Parser, Debug)]
#[command(name = "aida", about = "AIDA glucose-coaching server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the `SQLite` database (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Settings file (default `~/.aida/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Protocol JSON file (overrides settings).
    #[arg(long)]
    protocol: Option<PathBuf>,

    /// Log level filter (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Apply flags over loaded settings.
    fn apply(self, settings: &mut AidaSettings) {
        if let Some(host) = self.host {
            settings.server.host = host;
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(db_path) = self.db_path {
            settings.server.db_path = db_path.to_string_lossy().into_owned();
        }
        if let Some(protocol) = self.protocol {
            settings.server.protocol_path = protocol.to_string_lossy().into_owned();
        }
        if let Some(level) = self.log_level {
            settings.logging.level = level;
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// OpenAI provider when a key is available, otherwise one that fails every call.
fn build_provider(llm: &LlmSettings) -> Result<Arc<dyn ChatProvider>> {
    let Some(api_key) = llm.api_key() else {
        tracing::warn!(
            env = llm.api_key_env.as_str(),
            "no API key found, model replies are disabled"
        );
        return Ok(Arc::new(UnconfiguredProvider::new(&llm.model, &llm.api_key_env)));
    };
    if llm.provider != "openai" {
        tracing::warn!(provider = llm.provider.as_str(), "unknown provider, using OpenAI wire format");
    }
    let provider = OpenAiChatProvider::new(OpenAiConfig {
        api_key,
        base_url: llm.base_url.clone(),
        model: llm.model.clone(),
        timeout: llm.timeout_ms.map(Duration::from_millis),
    })
    .context("Failed to build OpenAI client")?;
    Ok(Arc::new(provider))
}

/// Web push sender when VAPID credentials are present.
fn build_push_sender(push: &PushSettings) -> Result<Option<Arc<dyn PushSender>>> {
    let Some((private_key, subject)) = push.vapid_credentials() else {
        tracing::warn!(
            key_env = push.vapid_private_key_env.as_str(),
            subject_env = push.vapid_subject_env.as_str(),
            "VAPID credentials not set, push delivery disabled"
        );
        return Ok(None);
    };
    let sender = WebPushSender::new(VapidConfig {
        private_key,
        subject,
        ttl_secs: push.ttl_secs,
    })
    .context("Failed to build push client")?;
    let sender: Arc<dyn PushSender> = Arc::new(sender);
    Ok(Some(sender))
}

fn open_store(db_path: &Path) -> Result<SqliteStore> {
    ensure_parent_dir(db_path)?;
    let pool = aida_store::new_file(&db_path.to_string_lossy(), &ConnectionConfig::default())
        .context("Failed to open database")?;
    {
        let conn = pool.get().context("Failed to get DB connection")?;
        let applied = aida_store::run_migrations(&conn).context("Failed to run migrations")?;
        tracing::info!(applied, path = %db_path.display(), "database ready");
    }
    Ok(SqliteStore::new(pool))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(aida_settings::settings_path);
    let mut settings = aida_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings: {}", settings_path.display()))?;
    args.apply(&mut settings);

    init_subscriber(
        &settings.logging.level,
        LogFormat::from_setting(&settings.logging.format),
    );
    let _ = aida_settings::init_settings(settings.clone());

    let metrics_handle = match aida_server::metrics::install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics recorder unavailable");
            None
        }
    };

    let store = open_store(Path::new(&settings.server.db_path))?;
    let protocol = ProtocolDocument::load(&settings.server.protocol_path)
        .context("Failed to load protocol")?;
    let provider = build_provider(&settings.llm)?;
    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        phase = %settings.coach.phase,
        "coach configured"
    );

    let orchestrator = Arc::new(TurnOrchestrator::new(
        Arc::new(store),
        provider,
        protocol,
        CoachConfig::from_settings(&settings),
    ));

    let mut server =
        AidaServer::new(ServerConfig::from(&settings.server), orchestrator, metrics_handle);
    if let Some(sender) = build_push_sender(&settings.push)? {
        server = server.with_push_sender(sender);
    }
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("AIDA listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server
        .shutdown()
        .graceful_shutdown(vec![handle], None)
        .await;
    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_default_to_none() {
        let cli = Cli::parse_from(["aida"]);
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.settings.is_none());
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::parse_from([
            "aida",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--db-path",
            "/tmp/aida-test.db",
            "--protocol",
            "/tmp/p.json",
            "--log-level",
            "debug",
        ]);
        let mut settings = AidaSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.db_path, "/tmp/aida-test.db");
        assert_eq!(settings.server.protocol_path, "/tmp/p.json");
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn absent_flags_keep_settings() {
        let mut settings = AidaSettings::default();
        settings.server.port = 4000;
        Cli::parse_from(["aida"]).apply(&mut settings);
        assert_eq!(settings.server.port, 4000);
    }

    #[test]
    fn ensure_parent_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("aida.db");
        ensure_parent_dir(&path).unwrap();
        assert!(path.parent().unwrap().exists());
    }

    #[test]
    fn bare_file_name_needs_no_parent() {
        ensure_parent_dir(Path::new("aida.db")).unwrap();
    }

    #[test]
    fn open_store_runs_migrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("aida.db");
        let _store = open_store(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_key_yields_unconfigured_provider() {
        let llm = LlmSettings {
            api_key_env: "AIDA_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..LlmSettings::default()
        };
        let provider = build_provider(&llm).unwrap();
        assert_eq!(provider.name(), "unconfigured");
    }

    #[test]
    fn missing_vapid_disables_push() {
        let push = PushSettings {
            vapid_private_key_env: "AIDA_TEST_VAPID_KEY_NEVER_SET".into(),
            ..PushSettings::default()
        };
        assert!(build_push_sender(&push).unwrap().is_none());
    }
}

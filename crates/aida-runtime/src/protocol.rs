//! Protocol document loaded once at startup.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::errors::RuntimeError;

const DEFAULT_NAME: &str = "Fase 1";

/// The current protocol as free-form JSON.
///
/// Only `name` is interpreted. The rest is injected into model context verbatim.
#[derive(Clone, Debug, PartialEq)]
pub struct ProtocolDocument {
    raw: Value,
}

impl ProtocolDocument {
    /// Read and parse a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let fail = |message: String| RuntimeError::Protocol {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        let raw: Value = serde_json::from_str(&content).map_err(|e| fail(e.to_string()))?;
        if !raw.is_object() {
            return Err(fail("expected a JSON object".to_string()));
        }
        let doc = Self { raw };
        info!(path = %path.display(), name = doc.name(), "protocol loaded");
        Ok(doc)
    }

    /// Wrap an already-parsed value.
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    /// Display name, `Fase 1` when the document has none.
    pub fn name(&self) -> &str {
        self.raw
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_NAME)
    }

    /// The full document.
    pub fn as_value(&self) -> &Value {
        &self.raw
    }
}

impl Default for ProtocolDocument {
    fn default() -> Self {
        Self::from_value(serde_json::json!({ "name": DEFAULT_NAME }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn loads_name_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fase1.json");
        std::fs::write(&path, r#"{"name":"Protocolo Base","reglas":["sin tortilla"]}"#).unwrap();
        let doc = ProtocolDocument::load(&path).unwrap();
        assert_eq!(doc.name(), "Protocolo Base");
        assert_eq!(doc.as_value()["reglas"][0], "sin tortilla");
    }

    #[test]
    fn missing_name_defaults() {
        assert_eq!(ProtocolDocument::from_value(json!({"reglas": []})).name(), "Fase 1");
        assert_eq!(ProtocolDocument::from_value(json!({"name": "  "})).name(), "Fase 1");
    }

    #[test]
    fn missing_file_is_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProtocolDocument::load(dir.path().join("nope.json")).unwrap_err();
        assert_matches!(err, RuntimeError::Protocol { .. });
    }

    #[test]
    fn non_object_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let err = ProtocolDocument::load(&path).unwrap_err();
        assert_matches!(err, RuntimeError::Protocol { ref message, .. } if message == "expected a JSON object");
    }

    #[test]
    fn bundled_protocol_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../protocols/fase1.json");
        let doc = ProtocolDocument::load(path).unwrap();
        assert_eq!(doc.name(), "Fase 1");
    }
}

//! Placeholder provider used when no API key is configured.

use aida_core::ChatMessage;
use async_trait::async_trait;

use crate::provider::{ChatProvider, CompletionOptions, ProviderError, ProviderResult};

/// Fails every completion with [`ProviderError::Auth`].
///
/// Lets the server start and serve rule and safety replies without a key.
#[derive(Clone, Debug)]
pub struct UnconfiguredProvider {
    model: String,
    key_env: String,
}

impl UnconfiguredProvider {
    /// `key_env` names the variable the operator should set.
    pub fn new(model: impl Into<String>, key_env: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            key_env: key_env.into(),
        }
    }
}

#[async_trait]
impl ChatProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        "unconfigured"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> ProviderResult<Option<String>> {
        Err(ProviderError::Auth {
            message: format!("{} is not set", self.key_env),
        })
    }
}

//! `POST /api/chat`.

use aida_core::ChatMessage;
use aida_runtime::{RuntimeError, TurnRequest};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, warn};

use crate::errors::ApiError;
use crate::metrics::CHAT_ERRORS_TOTAL;
use crate::server::AppState;

/// Request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    /// Device identifier.
    #[serde(default)]
    pub device_id: String,
    /// Conversation so far.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Optional onboarding answers.
    #[serde(default)]
    pub onboarding: Option<Value>,
}

/// Success body.
#[derive(Debug, Serialize)]
pub struct ChatResponseBody {
    /// Always `true`.
    pub ok: bool,
    /// Reply text.
    pub reply: String,
    /// Whether the safety gate answered.
    pub bypass: bool,
}

/// Run one coaching turn.
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequestBody>, JsonRejection>,
) -> Result<Json<ChatResponseBody>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected chat body");
        metrics::counter!(CHAT_ERRORS_TOTAL, "kind" => "bad_request").increment(1);
        ApiError::BadRequest(rejection.body_text())
    })?;

    let request = TurnRequest {
        device_id: body.device_id,
        messages: body.messages,
        onboarding: body.onboarding,
    };

    match state.orchestrator.handle_turn(request).await {
        Ok(outcome) => Ok(Json(ChatResponseBody {
            ok: true,
            bypass: outcome.bypass(),
            reply: outcome.reply,
        })),
        Err(err) => {
            log_failure(&err);
            Err(err.into())
        }
    }
}

fn log_failure(err: &RuntimeError) {
    metrics::counter!(CHAT_ERRORS_TOTAL, "kind" => err.kind()).increment(1);
    if err.is_client_error() {
        warn!(error = %err, "invalid chat turn");
    } else {
        error!(error = %err, kind = err.kind(), "chat turn failed");
    }
}

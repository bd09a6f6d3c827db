//! `POST /api/push/subscribe`, `/api/push/unsubscribe` and `/api/push/send`.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::errors::ApiError;
use crate::metrics::PUSH_SUBSCRIPTIONS_TOTAL;
use crate::push::{PushKeys, PushSubscription};
use crate::server::AppState;
use crate::webpush::{PushMessage, deliver};

/// User id used when the client sends none.
pub const DEFAULT_USER_ID: &str = "demo-user";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeBody {
    user_id: Option<String>,
    subscription: Option<RawSubscription>,
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    endpoint: Option<String>,
    keys: Option<RawKeys>,
}

#[derive(Debug, Deserialize)]
struct RawKeys {
    p256dh: Option<String>,
    auth: Option<String>,
}

impl RawSubscription {
    fn validate(self) -> Option<PushSubscription> {
        let keys = self.keys?;
        Some(PushSubscription {
            endpoint: non_empty(self.endpoint)?,
            keys: PushKeys {
                p256dh: non_empty(keys.p256dh)?,
                auth: non_empty(keys.auth)?,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnsubscribeBody {
    user_id: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendBody {
    user_id: Option<String>,
    title: Option<String>,
    body: Option<String>,
    url: Option<String>,
}

impl SendBody {
    fn message(self) -> PushMessage {
        let defaults = PushMessage::default();
        PushMessage {
            title: self.title.unwrap_or(defaults.title),
            body: self.body.unwrap_or(defaults.body),
            url: self.url.unwrap_or(defaults.url),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn user_or_default(user_id: Option<String>) -> String {
    user_id.unwrap_or_else(|| DEFAULT_USER_ID.to_string())
}

fn bad_request() -> ApiError {
    ApiError::BadRequest("Bad request".into())
}

/// Register a browser push subscription.
pub async fn subscribe_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(raw) = payload.map_err(|_| bad_request())?;
    let body: SubscribeBody = serde_json::from_value(raw).map_err(|_| bad_request())?;

    let user_id = user_or_default(body.user_id);
    let subscription = body
        .subscription
        .and_then(RawSubscription::validate)
        .ok_or_else(|| ApiError::BadRequest("Invalid subscription".into()))?;

    let count = state.push.upsert(&user_id, subscription);
    metrics::counter!(PUSH_SUBSCRIPTIONS_TOTAL).increment(1);
    info!(user_id = %user_id, count, "push subscription registered");
    Ok(Json(json!({ "ok": true })))
}

/// Remove a subscription by endpoint.
pub async fn unsubscribe_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(raw) = payload.map_err(|_| bad_request())?;
    let body: UnsubscribeBody = serde_json::from_value(raw).map_err(|_| bad_request())?;

    let user_id = user_or_default(body.user_id);
    let endpoint = non_empty(body.endpoint)
        .ok_or_else(|| ApiError::BadRequest("Invalid subscription".into()))?;

    let removed = state.push.remove(&user_id, &endpoint);
    info!(user_id = %user_id, removed, "push subscription removed");
    Ok(Json(json!({ "ok": true, "removed": removed })))
}

/// Deliver a notification to every subscription of a user.
///
/// 404 when the user has no subscriptions, 500 when VAPID is not configured.
pub async fn send_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(raw) = payload.map_err(|_| bad_request())?;
    let mut body: SendBody = serde_json::from_value(raw).map_err(|_| bad_request())?;

    let user_id = user_or_default(body.user_id.take());
    if state.push.get(&user_id).is_empty() {
        return Err(ApiError::NotFound(format!(
            "No subscriptions for userId={user_id}"
        )));
    }
    let Some(sender) = state.push_sender.as_deref() else {
        error!("push send requested without VAPID credentials");
        return Err(ApiError::Internal("Missing VAPID env vars".into()));
    };

    let report = deliver(&state.push, sender, &user_id, &body.message())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(json!({
        "ok": true,
        "sent": report.sent,
        "failed": report.failed,
    })))
}

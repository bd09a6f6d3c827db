//! Web push delivery.
//!
//! Payloads are encrypted and VAPID-signed with `web-push`, then POSTed to
//! the subscription endpoint with the shared `reqwest` client. Endpoints
//! answering 404 or 410 are gone for good and get pruned from the registry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, info, warn};
use web_push::{
    ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushError, WebPushMessageBuilder,
};

use crate::metrics::PUSH_DELIVERIES_TOTAL;
use crate::push::{PushRegistry, PushSubscription};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from a single delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum PushSendError {
    /// Encryption or VAPID signing failed.
    #[error("web push build error: {0}")]
    Build(#[from] WebPushError),

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Push service no longer knows the endpoint (404/410).
    #[error("subscription gone ({status})")]
    Gone {
        /// HTTP status.
        status: u16,
    },

    /// Any other non-success status.
    #[error("push service rejected the message ({status})")]
    Rejected {
        /// HTTP status.
        status: u16,
    },
}

impl PushSendError {
    /// Whether the subscription should be dropped.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone { .. })
    }
}

/// Delivers an already-serialized payload to one subscription.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Send `payload` to `subscription`.
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<(), PushSendError>;
}

/// VAPID signing material.
#[derive(Clone, Debug)]
pub struct VapidConfig {
    /// Base64url raw P-256 private key.
    pub private_key: String,
    /// `mailto:` or `https:` contact claim.
    pub subject: String,
    /// TTL header in seconds.
    pub ttl_secs: u32,
}

/// [`PushSender`] speaking RFC 8030 with aes128gcm payloads.
pub struct WebPushSender {
    vapid: VapidConfig,
    client: reqwest::Client,
}

impl WebPushSender {
    /// Build a sender with its own HTTP client.
    pub fn new(vapid: VapidConfig) -> Result<Self, PushSendError> {
        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self { vapid, client })
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &[u8],
    ) -> Result<(), PushSendError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.as_str(),
            subscription.keys.p256dh.as_str(),
            subscription.keys.auth.as_str(),
        );
        let mut signature = VapidSignatureBuilder::from_base64(&self.vapid.private_key, web_push::URL_SAFE_NO_PAD, &info)?;
        signature.add_claim("sub", self.vapid.subject.as_str());

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_ttl(self.vapid.ttl_secs);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature.build()?);
        let message = builder.build()?;

        let mut request = self
            .client
            .post(subscription.endpoint.as_str())
            .header("TTL", self.vapid.ttl_secs.to_string());
        if let Some(body) = message.payload {
            request = request
                .header(CONTENT_ENCODING, "aes128gcm")
                .header(CONTENT_TYPE, "application/octet-stream");
            for (name, value) in body.crypto_headers {
                request = request.header(name, value);
            }
            request = request.body(body.content);
        }

        let status = request.send().await?.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(PushSendError::Gone {
                status: status.as_u16(),
            });
        }
        Err(PushSendError::Rejected {
            status: status.as_u16(),
        })
    }
}

/// Notification shown by the service worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Page opened on click.
    pub url: String,
}

impl Default for PushMessage {
    fn default() -> Self {
        Self {
            title: "AIDA".to_string(),
            body: "Notificación de prueba ✅".to_string(),
            url: "/chat".to_string(),
        }
    }
}

/// Outcome of fanning one message out to a user's subscriptions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Accepted by the push service.
    pub sent: usize,
    /// Any failure, pruned or not.
    pub failed: usize,
    /// Failures that removed the subscription.
    pub pruned: usize,
}

/// Send `message` to every subscription of `user_id`, pruning dead endpoints.
pub async fn deliver(
    registry: &PushRegistry,
    sender: &dyn PushSender,
    user_id: &str,
    message: &PushMessage,
) -> Result<DeliveryReport, serde_json::Error> {
    let payload = serde_json::to_vec(message)?;
    let subscriptions = registry.get(user_id);
    let results = futures::future::join_all(
        subscriptions
            .iter()
            .map(|subscription| sender.send(subscription, &payload)),
    )
    .await;

    let mut report = DeliveryReport::default();
    for (subscription, result) in subscriptions.iter().zip(results) {
        match result {
            Ok(()) => {
                report.sent += 1;
                debug!(user_id, endpoint = %subscription.endpoint, "push delivered");
            }
            Err(e) => {
                report.failed += 1;
                if e.is_gone() && registry.remove(user_id, &subscription.endpoint) {
                    report.pruned += 1;
                }
                warn!(user_id, endpoint = %subscription.endpoint, error = %e, "push delivery failed");
            }
        }
    }

    for (status, count) in [
        ("sent", report.sent),
        ("failed", report.failed),
        ("pruned", report.pruned),
    ] {
        metrics::counter!(PUSH_DELIVERIES_TOTAL, "status" => status)
            .increment(u64::try_from(count).unwrap_or(u64::MAX));
    }
    info!(
        user_id,
        sent = report.sent,
        failed = report.failed,
        pruned = report.pruned,
        "push fan-out complete"
    );
    Ok(report)
}

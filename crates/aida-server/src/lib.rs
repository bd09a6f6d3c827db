//! # aida-server
//!
//! Axum HTTP surface for the coaching backend.
//!
//! - `POST /api/chat`: one coaching turn
//! - `POST /api/push/subscribe` and `/api/push/unsubscribe`: web-push registrations
//! - `POST /api/push/send`: VAPID-signed delivery to a user's subscriptions
//! - `GET /health`: liveness
//! - `GET /metrics`: Prometheus text
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod push;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod webpush;

pub use config::ServerConfig;
pub use errors::ApiError;
pub use push::{PushKeys, PushRegistry, PushSubscription};
pub use server::{AidaServer, AppState};
pub use shutdown::ShutdownCoordinator;
pub use webpush::{DeliveryReport, PushMessage, PushSendError, PushSender, VapidConfig, WebPushSender};

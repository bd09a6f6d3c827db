//! # aida-progress
//!
//! Progress snapshot over a user's most recent readings.
//!
//! [`compute_metrics`] derives averages, trend, variability, threshold
//! percentages, and A1c estimates from up to 14 readings (newest first)
//! plus the stored baseline. [`render_progress`] turns the snapshot into the
//! text block injected into model context.
//!
//! Windows are ranked by recency, not by calendar day: "last 7" means the
//! seven newest readings regardless of how many days they span.

#![deny(unsafe_code)]

pub mod metrics;
pub mod render;

pub use metrics::{HALF_WINDOW, ProgressMetrics, TrendLabel, WINDOW, compute_metrics};
pub use render::render_progress;

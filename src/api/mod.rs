//! API layer
//!
//! HTTP handlers for:
//! - Public pages (landing, failure, health)
//! - The protected secret
//! - Metrics (Prometheus)

pub mod metrics;
mod pages;
mod secret;

pub use metrics::metrics_router;
pub use pages::pages_router;
pub use secret::{SECRET_MESSAGE, secret_router};

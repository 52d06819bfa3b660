//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Authentication Metrics
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("secretgate_logins_total", "OAuth callbacks by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref SESSION_CHECKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("secretgate_session_checks_total", "Session gate decisions by result"),
        &["result"]
    ).expect("metric can be created");
    pub static ref LOGOUTS_TOTAL: IntCounter = IntCounter::new(
        "secretgate_logouts_total",
        "Total number of logout requests"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("secretgate_errors_total", "Total number of error responses"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Call once at startup; registering twice fails.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(LOGINS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SESSION_CHECKS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(LOGOUTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ERRORS_TOTAL.clone()))?;

    tracing::info!("Metrics registry initialized");
    Ok(())
}

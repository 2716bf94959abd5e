//! Prometheus metrics for billing-api.

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, TextEncoder, histogram_opts, opts,
    register_histogram_vec, register_int_counter_vec,
};
use std::sync::OnceLock;

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "billing_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Invoice lifecycle counter.
pub static INVOICE_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Payment mutation counter.
pub static PAYMENT_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Authentication attempt counter.
pub static AUTH_ATTEMPTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);

    INVOICE_OPERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_invoice_operations_total",
                "Invoice operations by type"
            ),
            &["operation"]
        )
        .expect("Failed to register INVOICE_OPERATIONS_TOTAL")
    });

    PAYMENT_OPERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "billing_payment_operations_total",
                "Payment operations by type"
            ),
            &["operation"]
        )
        .expect("Failed to register PAYMENT_OPERATIONS_TOTAL")
    });

    AUTH_ATTEMPTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("billing_auth_attempts_total", "Auth attempts by outcome"),
            &["endpoint", "outcome"]
        )
        .expect("Failed to register AUTH_ATTEMPTS_TOTAL")
    });
}

pub fn record_invoice_operation(operation: &str) {
    if let Some(counter) = INVOICE_OPERATIONS_TOTAL.get() {
        counter.with_label_values(&[operation]).inc();
    }
}

pub fn record_payment_operation(operation: &str) {
    if let Some(counter) = PAYMENT_OPERATIONS_TOTAL.get() {
        counter.with_label_values(&[operation]).inc();
    }
}

pub fn record_auth_attempt(endpoint: &str, outcome: &str) {
    if let Some(counter) = AUTH_ATTEMPTS_TOTAL.get() {
        counter.with_label_values(&[endpoint, outcome]).inc();
    }
}

/// Render the registry in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

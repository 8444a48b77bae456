//! Prometheus metrics for the gateway.

use std::time::Duration;

use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_histogram, register_int_counter_vec, Histogram, IntCounterVec,
};

static REQUESTS: OnceCell<IntCounterVec> = OnceCell::new();
static SIGN_LATENCY: OnceCell<Histogram> = OnceCell::new();

/// Register the gateway metrics with the default registry. Idempotent, so
/// building several routers in one process is fine.
pub fn install() {
    REQUESTS.get_or_init(|| {
        register_int_counter_vec!(
            "bakergate_requests_total",
            "Requests handled, by route and outcome",
            &["route", "outcome"]
        )
        .expect("register_int_counter_vec")
    });
    SIGN_LATENCY.get_or_init(|| {
        register_histogram!(
            "bakergate_sign_duration_seconds",
            "End-to-end latency of sign requests (seconds)",
            exponential_buckets(0.001, 2.0, 15).expect("buckets")
        )
        .expect("register_histogram")
    });
}

pub(crate) fn observe(route: &str, outcome: &str) {
    if let Some(counter) = REQUESTS.get() {
        counter.with_label_values(&[route, outcome]).inc();
    }
}

pub(crate) fn observe_sign_duration(elapsed: Duration) {
    if let Some(histogram) = SIGN_LATENCY.get() {
        histogram.observe(elapsed.as_secs_f64());
    }
}

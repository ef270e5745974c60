use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Business Metrics
    pub static ref USERS_REGISTERED_TOTAL: IntCounter = register_int_counter!(
        "users_registered_total",
        "Total number of registered users"
    )
    .unwrap();

    pub static ref SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "submissions_total",
        "Total number of lesson submissions",
        &["result"]
    )
    .unwrap();

    pub static ref ANSWERS_GRADED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_graded_total",
        "Total number of problem answers graded",
        &["correct"]
    )
    .unwrap();

    pub static ref LESSONS_COMPLETED_TOTAL: IntCounter = register_int_counter!(
        "lessons_completed_total",
        "Total number of newly completed lessons"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Record a graded submission (fresh grading, not a replay)
pub fn record_submission_graded() {
    SUBMISSIONS_TOTAL.with_label_values(&["graded"]).inc();
}

/// Record an idempotent replay of a previous submission
pub fn record_submission_duplicate() {
    SUBMISSIONS_TOTAL.with_label_values(&["duplicate"]).inc();
}

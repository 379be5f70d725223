// ============================================================================
// PROMETHEUS METRICS - Sistema de Observabilidad
// ============================================================================

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

lazy_static! {
    // ========================================================================
    // HTTP REQUEST METRICS
    // ========================================================================

    /// Total de requests HTTP por método, endpoint y status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "endpoint", "status"]
    )
    .unwrap();

    /// Duración de requests HTTP en segundos
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "endpoint"],
        vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // ========================================================================
    // TOKEN LIFECYCLE METRICS
    // ========================================================================

    /// Tokens emitidos por tipo de redención
    pub static ref TOKENS_ISSUED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "redeem_tokens_issued_total",
        "Total redemption tokens issued",
        &["redeem_type"]
    )
    .unwrap();

    /// Colisiones de string de token durante la generación
    pub static ref TOKEN_COLLISIONS_TOTAL: IntCounter = register_int_counter!(
        "redeem_token_collisions_total",
        "Token string collisions hit during generation"
    )
    .unwrap();

    /// Intentos de redención por resultado
    pub static ref REDEMPTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "redeem_redemptions_total",
        "Redemption attempts by outcome",
        &["outcome"]
    )
    .unwrap();

    /// Tokens borrados por limpiezas de historial de admin
    pub static ref HISTORY_TOKENS_DELETED_TOTAL: IntCounter = register_int_counter!(
        "redeem_history_tokens_deleted_total",
        "Tokens deleted by admin history clears"
    )
    .unwrap();
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn record_http_request(method: &str, endpoint: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration_secs);
}

pub fn record_token_issued(redeem_type: &str) {
    TOKENS_ISSUED_TOTAL.with_label_values(&[redeem_type]).inc();
}

pub fn record_token_collision() {
    TOKEN_COLLISIONS_TOTAL.inc();
}

/// `outcome` is one of success, already_used, not_found.
pub fn record_redemption(outcome: &str) {
    REDEMPTIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_history_cleared(deleted: u64) {
    HISTORY_TOKENS_DELETED_TOTAL.inc_by(deleted);
}

/// Force registration of the lazy metrics so the first /metrics scrape sees
/// them even before any traffic.
pub fn init_metrics() {
    lazy_static::initialize(&HTTP_REQUESTS_TOTAL);
    lazy_static::initialize(&HTTP_REQUEST_DURATION_SECONDS);
    lazy_static::initialize(&TOKENS_ISSUED_TOTAL);
    lazy_static::initialize(&TOKEN_COLLISIONS_TOTAL);
    lazy_static::initialize(&REDEMPTIONS_TOTAL);
    lazy_static::initialize(&HISTORY_TOKENS_DELETED_TOTAL);
}

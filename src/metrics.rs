use std::sync::LazyLock;

use prometheus::*;

static METRIC_EXTRACTION_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "facereg_extraction_count",
        "count of face embedding extractions",
        &["outcome"]
    )
    .unwrap()
});

static METRIC_EXTRACTION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "facereg_extraction_duration",
        "duration of the per-image extraction in seconds",
        &["outcome"]
    )
    .unwrap()
});

static METRIC_REGISTERED_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "facereg_registered_count",
        "count of photos processed by registration",
        &["outcome"]
    )
    .unwrap()
});

/// 记录一次特征提取，`outcome` 为 `ok`、`no_face` 或 `error`
pub fn observe_extraction(outcome: &str, duration: f64) {
    METRIC_EXTRACTION_COUNT.with_label_values(&[outcome]).inc();
    METRIC_EXTRACTION_DURATION.with_label_values(&[outcome]).observe(duration);
}

pub fn inc_registered(outcome: &str) {
    METRIC_REGISTERED_COUNT.with_label_values(&[outcome]).inc();
}

/// 以文本格式导出所有指标
pub fn gather_text() -> Result<String> {
    let encoder = TextEncoder::new();
    encoder.encode_to_string(&prometheus::gather())
}

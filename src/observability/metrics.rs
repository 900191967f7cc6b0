use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub lifecycle_operations_total: IntCounterVec,
    pub lifecycle_operation_seconds: HistogramVec,
    pub jobs_created_total: IntCounter,
    pub earnings_write_failures_total: IntCounter,
    pub location_stamp_failures_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let lifecycle_operations_total = IntCounterVec::new(
            Opts::new(
                "lifecycle_operations_total",
                "Lifecycle operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid lifecycle_operations_total metric");

        let lifecycle_operation_seconds = HistogramVec::new(
            HistogramOpts::new(
                "lifecycle_operation_seconds",
                "Latency of lifecycle operations in seconds",
            ),
            &["operation"],
        )
        .expect("valid lifecycle_operation_seconds metric");

        let jobs_created_total = IntCounter::new("jobs_created_total", "Jobs opened in pending")
            .expect("valid jobs_created_total metric");

        let earnings_write_failures_total = IntCounter::new(
            "earnings_write_failures_total",
            "Completed jobs whose earnings record could not be written",
        )
        .expect("valid earnings_write_failures_total metric");

        let location_stamp_failures_total = IntCounter::new(
            "location_stamp_failures_total",
            "Courier location stamps dropped after a transition",
        )
        .expect("valid location_stamp_failures_total metric");

        registry
            .register(Box::new(lifecycle_operations_total.clone()))
            .expect("register lifecycle_operations_total");
        registry
            .register(Box::new(lifecycle_operation_seconds.clone()))
            .expect("register lifecycle_operation_seconds");
        registry
            .register(Box::new(jobs_created_total.clone()))
            .expect("register jobs_created_total");
        registry
            .register(Box::new(earnings_write_failures_total.clone()))
            .expect("register earnings_write_failures_total");
        registry
            .register(Box::new(location_stamp_failures_total.clone()))
            .expect("register location_stamp_failures_total");

        Self {
            registry,
            lifecycle_operations_total,
            lifecycle_operation_seconds,
            jobs_created_total,
            earnings_write_failures_total,
            location_stamp_failures_total,
        }
    }

    pub fn observe(&self, operation: &str, outcome: &str, elapsed_secs: f64) {
        self.lifecycle_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
        self.lifecycle_operation_seconds
            .with_label_values(&[operation])
            .observe(elapsed_secs);
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

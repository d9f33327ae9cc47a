use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use tracing::warn;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref POLLS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_polls_total",
        "Total node list requests issued"
    ))
    .expect("valid metric");
    pub static ref POLL_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_poll_failures_total",
        "Total node list requests that failed"
    ))
    .expect("valid metric");
    pub static ref STALE_RESPONSES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_stale_responses_total",
        "Total responses discarded because a newer one was already applied"
    ))
    .expect("valid metric");
    pub static ref DETAIL_REQUESTS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_detail_requests_total",
        "Total node history requests issued"
    ))
    .expect("valid metric");
    pub static ref DETAIL_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "dashboard_detail_failures_total",
        "Total node history requests that failed"
    ))
    .expect("valid metric");
    pub static ref NODES_CURRENT: Gauge = Gauge::with_opts(Opts::new(
        "dashboard_nodes_current",
        "Number of nodes in the last applied node list"
    ))
    .expect("valid metric");
    pub static ref POLL_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "dashboard_poll_latency_seconds",
            "Time taken by one node list request"
        )
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])
    )
    .expect("valid metric");
}

pub fn init_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(POLLS_TOTAL.clone()),
        Box::new(POLL_FAILURES_TOTAL.clone()),
        Box::new(STALE_RESPONSES_TOTAL.clone()),
        Box::new(DETAIL_REQUESTS_TOTAL.clone()),
        Box::new(DETAIL_FAILURES_TOTAL.clone()),
        Box::new(NODES_CURRENT.clone()),
        Box::new(POLL_LATENCY_SECONDS.clone()),
    ];
    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            warn!("Failed to register metric: {}", e);
        }
    }
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

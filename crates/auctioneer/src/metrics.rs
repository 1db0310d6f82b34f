use {
    crate::infra::buyers::CallError,
    model::buyer::Buyer,
    rust_decimal::prelude::ToPrimitive,
    std::time::Duration,
};

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "engine")]
pub(crate) struct Metrics {
    /// Tracks the times and results of buyer bid requests.
    #[metric(labels("buyer", "result"))]
    pings: prometheus::HistogramVec,

    /// Tracks the times and results of buyer deliveries.
    #[metric(labels("buyer", "result"))]
    posts: prometheus::HistogramVec,

    /// Tracks how auctions end.
    #[metric(labels("outcome"))]
    auctions: prometheus::IntCounterVec,

    /// Winning bid amounts in dollars.
    #[metric(buckets(5, 10, 20, 40, 60, 80, 120, 200))]
    winning_bid: prometheus::Histogram,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }

    pub(crate) fn ping_ok(buyer: &Buyer, elapsed: Duration) {
        Self::get()
            .pings
            .with_label_values(&[&buyer.name, "success"])
            .observe(elapsed.as_secs_f64());
    }

    pub(crate) fn ping_rejected(buyer: &Buyer, elapsed: Duration) {
        Self::get()
            .pings
            .with_label_values(&[&buyer.name, "rejected"])
            .observe(elapsed.as_secs_f64());
    }

    pub(crate) fn ping_err(buyer: &Buyer, elapsed: Duration, err: &CallError) {
        Self::get()
            .pings
            .with_label_values(&[&buyer.name, call_error_label(err)])
            .observe(elapsed.as_secs_f64());
    }

    pub(crate) fn ping_timeout(buyer: &Buyer, elapsed: Duration) {
        Self::get()
            .pings
            .with_label_values(&[&buyer.name, "timeout"])
            .observe(elapsed.as_secs_f64());
    }

    pub(crate) fn post_ok(buyer: &Buyer, elapsed: Duration) {
        Self::get()
            .posts
            .with_label_values(&[&buyer.name, "success"])
            .observe(elapsed.as_secs_f64());
    }

    pub(crate) fn post_failed(buyer: &Buyer, elapsed: Duration) {
        Self::get()
            .posts
            .with_label_values(&[&buyer.name, "failed"])
            .observe(elapsed.as_secs_f64());
    }

    pub(crate) fn post_timeout(buyer: &Buyer, elapsed: Duration) {
        Self::get()
            .posts
            .with_label_values(&[&buyer.name, "timeout"])
            .observe(elapsed.as_secs_f64());
    }

    pub(crate) fn auction_completed(winning_bid: rust_decimal::Decimal) {
        Self::get()
            .auctions
            .with_label_values(&["completed"])
            .inc();
        Self::get()
            .winning_bid
            .observe(winning_bid.to_f64().unwrap_or(0.0));
    }

    pub(crate) fn auction_no_bids() {
        Self::get().auctions.with_label_values(&["no_bids"]).inc();
    }

    pub(crate) fn auction_post_exhausted() {
        Self::get()
            .auctions
            .with_label_values(&["post_exhausted"])
            .inc();
    }
}

fn call_error_label(err: &CallError) -> &'static str {
    match err {
        CallError::Http(_) => "transport",
        CallError::Status { .. } => "bad_status",
        CallError::ResponseTooLarge => "too_large",
        CallError::Decode(_) => "bad_json",
    }
}

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub events_total: IntCounterVec,
    pub events_dropped_total: IntCounterVec,
    pub ride_requests_total: IntCounterVec,
    pub match_latency_seconds: HistogramVec,
    pub connected_clients: IntGauge,
    pub available_drivers: IntGauge,
    pub notifications_dropped_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let events_total = IntCounterVec::new(
            Opts::new("events_total", "Inbound client events by name"),
            &["event"],
        )
        .expect("valid events_total metric");

        let events_dropped_total = IntCounterVec::new(
            Opts::new("events_dropped_total", "Inbound events dropped by reason"),
            &["reason"],
        )
        .expect("valid events_dropped_total metric");

        let ride_requests_total = IntCounterVec::new(
            Opts::new("ride_requests_total", "Ride requests by outcome"),
            &["outcome"],
        )
        .expect("valid ride_requests_total metric");

        let match_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "match_latency_seconds",
                "Latency of nearest-driver matching in seconds",
            )
            .buckets(vec![0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01]),
            &["outcome"],
        )
        .expect("valid match_latency_seconds metric");

        let connected_clients = IntGauge::new("connected_clients", "Open client sockets")
            .expect("valid connected_clients metric");

        let available_drivers = IntGauge::new(
            "available_drivers",
            "Drivers that are available and have a known location",
        )
        .expect("valid available_drivers metric");

        let notifications_dropped_total = IntCounterVec::new(
            Opts::new(
                "notifications_dropped_total",
                "Outbound messages that could not be delivered",
            ),
            &["reason"],
        )
        .expect("valid notifications_dropped_total metric");

        registry
            .register(Box::new(events_total.clone()))
            .expect("register events_total");
        registry
            .register(Box::new(events_dropped_total.clone()))
            .expect("register events_dropped_total");
        registry
            .register(Box::new(ride_requests_total.clone()))
            .expect("register ride_requests_total");
        registry
            .register(Box::new(match_latency_seconds.clone()))
            .expect("register match_latency_seconds");
        registry
            .register(Box::new(connected_clients.clone()))
            .expect("register connected_clients");
        registry
            .register(Box::new(available_drivers.clone()))
            .expect("register available_drivers");
        registry
            .register(Box::new(notifications_dropped_total.clone()))
            .expect("register notifications_dropped_total");

        Self {
            registry,
            events_total,
            events_dropped_total,
            ride_requests_total,
            match_latency_seconds,
            connected_clients,
            available_drivers,
            notifications_dropped_total,
        }
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

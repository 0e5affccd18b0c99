use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub lifecycle_transitions_total: IntCounterVec,
    pub active_loads: IntGauge,
    pub notifications_in_queue: IntGauge,
    pub notifications_total: IntCounterVec,
    pub ratings_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let lifecycle_transitions_total = IntCounterVec::new(
            Opts::new(
                "lifecycle_transitions_total",
                "Load lifecycle operations by transition and outcome",
            ),
            &["transition", "outcome"],
        )
        .expect("valid lifecycle_transitions_total metric");

        let active_loads = IntGauge::new("active_loads", "Loads currently in assigned status")
            .expect("valid active_loads metric");

        let notifications_in_queue = IntGauge::new(
            "notifications_in_queue",
            "Notifications waiting for the dispatcher worker",
        )
        .expect("valid notifications_in_queue metric");

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Notifications handled by outcome"),
            &["outcome"],
        )
        .expect("valid notifications_total metric");

        let ratings_total = IntCounter::new("ratings_total", "Rating submissions accepted")
            .expect("valid ratings_total metric");

        registry
            .register(Box::new(lifecycle_transitions_total.clone()))
            .expect("register lifecycle_transitions_total");
        registry
            .register(Box::new(active_loads.clone()))
            .expect("register active_loads");
        registry
            .register(Box::new(notifications_in_queue.clone()))
            .expect("register notifications_in_queue");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(ratings_total.clone()))
            .expect("register ratings_total");

        Self {
            registry,
            lifecycle_transitions_total,
            active_loads,
            notifications_in_queue,
            notifications_total,
            ratings_total,
        }
    }

    pub fn record_transition(&self, transition: &str, outcome: &str) {
        self.lifecycle_transitions_total
            .with_label_values(&[transition, outcome])
            .inc();
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

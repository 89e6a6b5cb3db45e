use {
    crate::database::Postgres,
    chrono::{DateTime, Utc},
    std::time::Duration,
    tokio::time,
};

pub struct OrderEventsCleanerConfig {
    cleanup_interval: Duration,
    event_age_threshold: chrono::Duration,
}

impl OrderEventsCleanerConfig {
    pub fn new(cleanup_interval: Duration, event_age_threshold: Duration) -> Self {
        OrderEventsCleanerConfig {
            cleanup_interval,
            event_age_threshold: chrono::Duration::from_std(event_age_threshold).unwrap(),
        }
    }
}

pub struct OrderEventsCleaner {
    config: OrderEventsCleanerConfig,
    db: Postgres,
}

impl OrderEventsCleaner {
    pub fn new(config: OrderEventsCleanerConfig, db: Postgres) -> Self {
        OrderEventsCleaner { config, db }
    }

    pub async fn run_forever(self) -> ! {
        let mut interval = time::interval(self.config.cleanup_interval);
        loop {
            interval.tick().await;

            let timestamp: DateTime<Utc> = Utc::now() - self.config.event_age_threshold;
            match self.db.delete_order_events_before(timestamp).await {
                Ok(affected_rows_count) => {
                    tracing::debug!(affected_rows_count, timestamp = %timestamp.to_string(), "order events cleanup");
                    Metrics::get().order_events_cleanup_total.inc()
                }
                Err(err) => {
                    tracing::warn!(?err, "failed to delete order events before {}", timestamp)
                }
            }
        }
    }
}

#[derive(prometheus_metric_storage::MetricStorage)]
struct Metrics {
    /// The total number of successful `order_events` table cleanups
    #[metric(name = "periodic_db_cleanup")]
    order_events_cleanup_total: prometheus::IntCounter,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }
}

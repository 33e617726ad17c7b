use crate::agents::Order;
use prometheus::{
    linear_buckets, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use tracing::debug;

/// Labeled kitchen telemetry backed by a Prometheus registry
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Registry,
    order_completion_time: HistogramVec,
    task_accuracy: GaugeVec,
    resource_utilization: GaugeVec,
    resource_efficiency: GaugeVec,
}

impl MetricsCollector {
    /// Build the instruments and register them with a fresh registry
    pub fn new() -> prometheus::Result<Self> {
        let collector = Self {
            registry: Registry::new(),
            order_completion_time: HistogramVec::new(
                HistogramOpts::new(
                    "order_completion_time_seconds",
                    "Time taken to complete orders",
                )
                .buckets(linear_buckets(0.0, 300.0, 20)?),
                &["type", "complexity"],
            )?,
            task_accuracy: GaugeVec::new(
                Opts::new("task_accuracy_percent", "Accuracy of completed tasks"),
                &["station", "role"],
            )?,
            resource_utilization: GaugeVec::new(
                Opts::new("resource_utilization_percent", "Staff utilization rate"),
                &["role", "station"],
            )?,
            resource_efficiency: GaugeVec::new(
                Opts::new(
                    "resource_efficiency_percent",
                    "Resource utilization efficiency",
                ),
                &["resource_type"],
            )?,
        };
        collector.register(&collector.registry)?;
        Ok(collector)
    }

    /// Register every instrument with `registry`.
    ///
    /// Fails with `AlreadyReg` if any of them is already registered there.
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.order_completion_time.clone()))?;
        registry.register(Box::new(self.task_accuracy.clone()))?;
        registry.register(Box::new(self.resource_utilization.clone()))?;
        registry.register(Box::new(self.resource_efficiency.clone()))?;
        Ok(())
    }

    /// Observe a finished order; open orders are ignored
    pub fn record_order_completion(&self, order: &Order) {
        if let Some(seconds) = order.completion_seconds() {
            let complexity = order.complexity.to_string();
            self.order_completion_time
                .with_label_values(&[order.order_type.as_str(), complexity.as_str()])
                .observe(seconds);
            debug!("Order {} completed in {:.1}s", order.id, seconds);
        }
    }

    pub fn record_accuracy(&self, station: &str, role: &str, percent: f64) {
        self.task_accuracy
            .with_label_values(&[station, role])
            .set(percent);
    }

    pub fn record_utilization(&self, role: &str, station: &str, percent: f64) {
        self.resource_utilization
            .with_label_values(&[role, station])
            .set(percent);
    }

    pub fn record_efficiency(&self, resource_type: &str, percent: f64) {
        self.resource_efficiency
            .with_label_values(&[resource_type])
            .set(percent);
    }

    /// Text exposition of everything in the collector's registry
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_duplicate_registration_fails() {
        let collector = MetricsCollector::new().unwrap();
        let registry = Registry::new();

        collector.register(&registry).unwrap();
        let err = collector.register(&registry).unwrap_err();
        assert!(matches!(err, prometheus::Error::AlreadyReg));
    }

    #[test]
    fn test_gauges_are_labeled() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_utilization("line_cook", "grill", 80.0);
        collector.record_accuracy("grill", "line_cook", 95.5);
        collector.record_efficiency("oven", 42.0);

        assert_eq!(
            collector
                .resource_utilization
                .with_label_values(&["line_cook", "grill"])
                .get(),
            80.0
        );

        let text = collector.render().unwrap();
        assert!(text.contains(r#"task_accuracy_percent{role="line_cook",station="grill"} 95.5"#));
        assert!(text.contains(r#"resource_efficiency_percent{resource_type="oven"} 42"#));
    }

    #[test]
    fn test_order_completion_histogram() {
        let collector = MetricsCollector::new().unwrap();
        let received = Utc.with_ymd_and_hms(2024, 6, 1, 19, 0, 0).unwrap();

        let done = Order {
            id: "o1".to_string(),
            order_type: "main_course".to_string(),
            complexity: 3,
            received_at: received,
            completed_at: Some(received + Duration::minutes(12)),
        };
        let open = Order {
            completed_at: None,
            ..done.clone()
        };

        collector.record_order_completion(&done);
        collector.record_order_completion(&open);

        let histogram = collector
            .order_completion_time
            .with_label_values(&["main_course", "3"]);
        assert_eq!(histogram.get_sample_count(), 1);
        assert_eq!(histogram.get_sample_sum(), 720.0);
    }
}

use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Instant;
use tokio::sync::RwLock;

/// Flat snapshot of the most recent evaluation metrics
pub struct Monitor {
    metrics: RwLock<Map<String, Value>>,
    started: Instant,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor {
    pub fn new() -> Self {
        Self {
            metrics: RwLock::new(Map::new()),
            started: Instant::now(),
        }
    }

    pub async fn record_metric(&self, name: &str, value: impl Into<Value>) {
        self.metrics.write().await.insert(name.to_string(), value.into());
    }

    pub async fn get_metric(&self, name: &str) -> Option<Value> {
        self.metrics.read().await.get(name).cloned()
    }

    /// Copy of every metric plus the current `uptime_seconds`
    pub async fn get_metrics(&self) -> Map<String, Value> {
        let mut snapshot = self.metrics.read().await.clone();
        snapshot.insert(
            "uptime_seconds".to_string(),
            Value::from(self.started.elapsed().as_secs_f64()),
        );
        snapshot
    }

    /// Store a result batch under `{model}_{scenario}_` in one write
    pub async fn record_evaluation_result(
        &self,
        model: &str,
        scenario: &str,
        metrics: &BTreeMap<String, f64>,
    ) {
        let prefix = format!("{}_{}_", model, scenario);
        let mut guard = self.metrics.write().await;

        for (name, value) in metrics {
            guard.insert(format!("{}{}", prefix, name), Value::from(*value));
        }
        guard.insert(
            format!("{}last_evaluated", prefix),
            Value::from(Utc::now().to_rfc3339()),
        );
    }

    pub async fn reset(&self) {
        self.metrics.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_record_and_get() {
        let monitor = Monitor::new();
        monitor.record_metric("active_connections", 3).await;

        assert_eq!(monitor.get_metric("active_connections").await, Some(Value::from(3)));
        assert_eq!(monitor.get_metric("missing").await, None);
    }

    #[tokio::test]
    async fn test_evaluation_result_is_prefixed() {
        let monitor = Monitor::new();
        let metrics = BTreeMap::from([
            ("overall_score".to_string(), 0.8),
            ("coordination".to_string(), 0.6),
        ]);

        monitor.record_evaluation_result("gpt4", "busy_night", &metrics).await;
        let snapshot = monitor.get_metrics().await;

        assert_eq!(snapshot["gpt4_busy_night_overall_score"], 0.8);
        assert_eq!(snapshot["gpt4_busy_night_coordination"], 0.6);
        let stamp = snapshot["gpt4_busy_night_last_evaluated"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[tokio::test]
    async fn test_reset_keeps_uptime() {
        let monitor = Monitor::new();
        monitor.record_metric("x", 1).await;
        monitor.reset().await;

        let snapshot = monitor.get_metrics().await;
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot["uptime_seconds"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let monitor = Arc::new(Monitor::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let monitor = monitor.clone();
                tokio::spawn(async move {
                    monitor.record_metric(&format!("m{}", i), i).await;
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // 16 metrics plus uptime
        assert_eq!(monitor.get_metrics().await.len(), 17);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A kitchen ticket as seen by the telemetry layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Course or ticket type, e.g. `main_course`
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(default)]
    pub complexity: u32,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Seconds from ticket in to ticket out, if the order is done
    pub fn completion_seconds(&self) -> Option<f64> {
        self.completed_at.map(|done| {
            let millis = (done - self.received_at).num_milliseconds().max(0);
            millis as f64 / 1000.0
        })
    }
}

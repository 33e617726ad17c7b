use crate::eval::EvaluationMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the evaluation playground
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaygroundConfig {
    /// Log level when `--verbose` is not given (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub metrics: MetricsSettings,

    #[serde(default)]
    pub evaluation: EvaluationSettings,

    #[serde(default)]
    pub transport: TransportSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Prometheus exposition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

/// How evaluations are produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSettings {
    #[serde(default = "default_mode")]
    pub mode: EvaluationMode,

    /// Artificial latency of a synthetic evaluation
    #[serde(default = "default_simulated_delay_ms")]
    pub simulated_delay_ms: u64,

    /// Events generated per synthetic evaluation
    #[serde(default = "default_event_count")]
    pub event_count: usize,

    /// Fixed seed for reproducible synthetic scores
    #[serde(default)]
    pub seed: Option<u64>,

    /// Root of `{model}/{scenario}` run traces
    #[serde(default = "default_traces_dir")]
    pub traces_dir: PathBuf,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            simulated_delay_ms: default_simulated_delay_ms(),
            event_count: default_event_count(),
            seed: None,
            traces_dir: default_traces_dir(),
        }
    }
}

impl EvaluationSettings {
    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }
}

/// Real-time channel limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Outbound frames queued per connection before new ones are dropped
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Connection is closed after this long without a pong
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,

    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            outbound_capacity: default_outbound_capacity(),
            ping_interval_secs: default_ping_interval_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl TransportSettings {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_mode() -> EvaluationMode {
    EvaluationMode::Synthetic
}

fn default_simulated_delay_ms() -> u64 {
    2000
}

fn default_event_count() -> usize {
    5
}

fn default_traces_dir() -> PathBuf {
    PathBuf::from("./traces")
}

fn default_outbound_capacity() -> usize {
    256
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_idle_timeout_secs() -> u64 {
    60
}

fn default_write_timeout_secs() -> u64 {
    10
}

fn default_max_frame_bytes() -> usize {
    512 * 1024
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerSettings::default(),
            metrics: MetricsSettings::default(),
            evaluation: EvaluationSettings::default(),
            transport: TransportSettings::default(),
        }
    }
}

impl PlaygroundConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: PlaygroundConfig =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .context(format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.transport.outbound_capacity == 0 {
            anyhow::bail!("transport.outbound_capacity must be at least 1");
        }
        if self.transport.ping_interval_secs >= self.transport.idle_timeout_secs {
            anyhow::bail!("transport.ping_interval_secs must be shorter than idle_timeout_secs");
        }
        if !self.metrics.path.starts_with('/') {
            anyhow::bail!("metrics.path must start with '/'");
        }
        Ok(())
    }

    /// Generate a sample configuration
    pub fn sample() -> Self {
        Self {
            evaluation: EvaluationSettings {
                seed: Some(42),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single miner in the fleet. Static, read-only after startup.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    /// Host or host:port the device answers on
    pub address: String,
    pub id: String,
    /// ASIC chips on the board, used for the expected-hashrate derivation
    #[serde(default = "default_chip_count")]
    pub expected_chip_count: u16,
    /// Whether the firmware exposes `/api/system/stats`; some variants 404
    /// on it, so it is only polled when known to exist
    #[serde(default)]
    pub supports_secondary_endpoint: bool,
}

fn default_chip_count() -> u16 {
    1
}

/// Empirical constants tuned for the ASIC families in this deployment.
/// Configuration rather than literals so other device models can adjust them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Per-chip GH/s produced per MHz of ASIC frequency
    pub ghs_per_chip_mhz: f64,
    /// Raw voltage magnitudes above this are read as millivolts
    pub millivolt_threshold: f64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            ghs_per_chip_mhz: 2.04,
            millivolt_threshold: 100.0,
        }
    }
}

/// Where the security report text lives and which lines to drop from it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Report locations tried in order; the first readable one wins
    pub candidate_paths: Vec<PathBuf>,
    /// Case-insensitive patterns; any line containing one is dropped
    pub ignored_patterns: Vec<String>,
    /// Where the rendered report view is written
    pub output_path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            candidate_paths: vec![
                PathBuf::from("public/security_report.md"),
                PathBuf::from("security_report.md"),
            ],
            ignored_patterns: Vec::new(),
            output_path: PathBuf::from("public/security_report.html"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub devices: Vec<DeviceConfig>,
    /// When set, requests go through `{proxy_base}/{address}/...` instead of
    /// straight to the device
    pub proxy_base: Option<String>,
    pub poll_interval_ms: u64,
    pub fetch_timeout_ms: u64,
    /// Where each completed poll pass writes the rendered dashboard
    pub dashboard_path: PathBuf,
    pub tuning: TuningConfig,
    pub report: ReportConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            devices: vec![
                DeviceConfig {
                    name: "nerdqaxe++".to_string(),
                    address: "192.168.0.154".to_string(),
                    id: "nerdqaxe".to_string(),
                    expected_chip_count: 4,
                    supports_secondary_endpoint: true,
                },
                DeviceConfig {
                    name: "ak-bitaxe".to_string(),
                    address: "192.168.0.157".to_string(),
                    id: "ak-bitaxe".to_string(),
                    expected_chip_count: 1,
                    supports_secondary_endpoint: false,
                },
                DeviceConfig {
                    name: "ck-bitaxe".to_string(),
                    address: "192.168.0.156".to_string(),
                    id: "ck-bitaxe".to_string(),
                    expected_chip_count: 1,
                    supports_secondary_endpoint: false,
                },
            ],
            proxy_base: None,
            poll_interval_ms: 5_000,
            fetch_timeout_ms: 5_000,
            dashboard_path: PathBuf::from("public/index.html"),
            tuning: TuningConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Loads `path`, falling back to the built-in fleet when it is missing
    /// or malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.as_ref().display(), %err, "using default configuration");
                Self::default()
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Builds the URL for one device endpoint, honoring the proxy base when
    /// configured.
    pub fn device_url(
        &self,
        device: &DeviceConfig,
        endpoint: &str,
    ) -> Result<Url, url::ParseError> {
        let raw = match &self.proxy_base {
            Some(proxy) => format!(
                "{}/{}/{}",
                proxy.trim_end_matches('/'),
                device.address,
                endpoint
            ),
            None => format!("http://{}/{}", device.address, endpoint),
        };
        Url::parse(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_url_direct() {
        let config = ConsoleConfig::default();
        let url = config
            .device_url(&config.devices[0], "api/system/info")
            .unwrap();
        assert_eq!(url.as_str(), "http://192.168.0.154/api/system/info");
    }

    #[test]
    fn device_url_through_proxy() {
        let config = ConsoleConfig {
            proxy_base: Some("http://localhost:8000/proxy/".to_string()),
            ..ConsoleConfig::default()
        };
        let url = config
            .device_url(&config.devices[1], "api/system/stats")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/proxy/192.168.0.157/api/system/stats"
        );
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: ConsoleConfig = serde_json::from_str(
            r#"{
                "devices": [
                    { "name": "solo", "address": "10.0.0.2", "id": "solo" }
                ],
                "poll_interval_ms": 1000
            }"#,
        )
        .unwrap();
        assert_eq!(config.devices.len(), 1);
        assert_eq!(config.devices[0].expected_chip_count, 1);
        assert!(!config.devices[0].supports_secondary_endpoint);
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.fetch_timeout(), Duration::from_millis(5000));
        assert!((config.tuning.ghs_per_chip_mhz - 2.04).abs() < 1e-9);
    }
}

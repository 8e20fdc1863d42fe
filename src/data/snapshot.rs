use std::time::Duration;

use measurements::{Frequency, Power, Temperature, Voltage};

use super::hashrate::HashRate;

/// One point-in-time telemetry reading for a device, normalized from the
/// raw payload shapes the different firmware variants emit.
///
/// Every numeric field is optional: `None` means the device did not report
/// the metric this cycle, which is distinct from a real zero reading.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetrySnapshot {
    /// Whether the device answered at least one endpoint this cycle
    pub online: bool,
    /// The current hashrate of the device
    pub hashrate: Option<HashRate>,
    /// The hashrate the device should reach at its current frequency,
    /// derived from the per-chip throughput factor
    pub expected_hashrate: Option<HashRate>,
    /// The current power consumption of the device
    pub power: Option<Power>,
    /// The ASIC chip temperature
    pub asic_temperature: Option<Temperature>,
    /// The voltage regulator temperature, sometimes reported as PCB temperature
    pub vr_temperature: Option<Temperature>,
    /// The supply voltage at the board input
    pub input_voltage: Option<Voltage>,
    /// The ASIC core voltage
    pub asic_voltage: Option<Voltage>,
    /// The ASIC frequency set point
    pub frequency: Option<Frequency>,
    /// Fan duty as a percentage of full speed
    pub fan_percent: Option<f64>,
    /// The total uptime of the device's system
    pub uptime: Option<Duration>,
    /// The best share difficulty found since last boot, as the device reports it
    pub best_share_session: Option<String>,
    /// The best share difficulty ever recorded, as the device reports it
    pub best_share_all_time: Option<String>,
    /// Shares accepted by the pool this session
    pub shares_accepted: Option<u64>,
    /// Shares rejected by the pool this session
    pub shares_rejected: Option<u64>,
    /// Why the device is offline; present only when `online` is false
    pub error_message: Option<String>,
}

impl TelemetrySnapshot {
    /// An offline marker carrying the full failure text. Truncation for
    /// display happens at render time, never here.
    pub fn offline(message: impl Into<String>) -> Self {
        Self {
            online: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Current efficiency in J/TH; `None` unless both a positive hashrate
    /// and a power reading are present.
    pub fn efficiency_j_per_th(&self) -> Option<f64> {
        match (self.hashrate, self.power) {
            (Some(rate), Some(power)) => rate.efficiency(power),
            _ => None,
        }
    }

    /// Rejected shares as a percentage of all shares this session.
    ///
    /// `Some(0.0)` when counters are present but no shares were submitted
    /// yet; `None` when the device reported no counters at all.
    pub fn rejection_rate_percent(&self) -> Option<f64> {
        if self.shares_accepted.is_none() && self.shares_rejected.is_none() {
            return None;
        }
        let accepted = self.shares_accepted.unwrap_or(0);
        let rejected = self.shares_rejected.unwrap_or(0);
        let total = accepted + rejected;
        if total == 0 {
            return Some(0.0);
        }
        Some(rejected as f64 / total as f64 * 100.0)
    }
}

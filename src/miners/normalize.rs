use std::time::Duration;

use measurements::{Frequency, Power, Temperature, Voltage};
use serde_json::Value;
use strum::EnumIter;

use crate::config::TuningConfig;
use crate::data::hashrate::HashRate;
use crate::data::snapshot::TelemetrySnapshot;

/// The canonical metrics extractable from a merged device payload.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, EnumIter)]
pub enum MetricField {
    /// Current hashrate, reported in GH/s by this device family.
    Hashrate,
    /// Power consumption in watts.
    Power,
    /// ASIC chip temperature in °C.
    AsicTemperature,
    /// Voltage regulator (or PCB) temperature in °C.
    VrTemperature,
    /// Board input voltage; unit is ambiguous across firmware, see
    /// [`scale_voltage`].
    InputVoltage,
    /// ASIC core voltage; same unit ambiguity as input voltage.
    AsicVoltage,
    /// ASIC frequency in MHz.
    Frequency,
    /// Fan duty as a percentage of full speed.
    Fan,
    /// System uptime in seconds.
    Uptime,
    /// Best share difficulty since last boot.
    BestShareSession,
    /// Best share difficulty ever recorded.
    BestShareAllTime,
    /// Shares accepted by the pool.
    SharesAccepted,
    /// Shares rejected by the pool.
    SharesRejected,
}

impl MetricField {
    /// The ordered raw-key synonyms for this metric across the firmware
    /// variants in the fleet. The first key present in the payload wins.
    pub fn candidate_keys(self) -> &'static [&'static str] {
        match self {
            MetricField::Hashrate => &["hashRate", "hashrate"],
            MetricField::Power => &["power"],
            MetricField::AsicTemperature => &["temp", "temperature", "asicTemp"],
            MetricField::VrTemperature => &["vrTemp", "temp2", "pcb_temp"],
            MetricField::InputVoltage => &["voltage", "volts", "inputVoltage"],
            MetricField::AsicVoltage => &["asicVoltage", "coreVoltage", "vCore"],
            MetricField::Frequency => &["frequency", "freq"],
            MetricField::Fan => &["fanSpeed", "fan_duty", "fan"],
            MetricField::Uptime => &["uptime", "Seconds"],
            MetricField::BestShareSession => &["bestShare", "best_share", "bestDiff"],
            MetricField::BestShareAllTime => &["bestEver", "best_ever", "bestType"],
            MetricField::SharesAccepted => &["sharesAccepted", "accepted"],
            MetricField::SharesRejected => &["sharesRejected", "rejected"],
        }
    }
}

/// Returns the value under the first candidate key present in `raw`.
pub fn resolve<'a>(raw: &'a Value, field: MetricField) -> Option<&'a Value> {
    field.candidate_keys().iter().find_map(|key| raw.get(key))
}

fn resolve_f64(raw: &Value, field: MetricField) -> Option<f64> {
    resolve(raw, field).and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn resolve_u64(raw: &Value, field: MetricField) -> Option<u64> {
    resolve(raw, field).and_then(Value::as_u64)
}

/// Best-share values arrive either as a number or as a preformatted string
/// such as "4.29M"; both become a display string.
fn resolve_share(raw: &Value, field: MetricField) -> Option<String> {
    match resolve(raw, field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Disambiguates the raw voltage unit: magnitudes above the threshold are
/// millivolts, below it volts. Zero means the sensor reported nothing.
///
/// Applied independently to input and ASIC voltage; their natural ranges
/// differ, which is why the threshold is a tuning constant.
fn scale_voltage(raw: Option<f64>, millivolt_threshold: f64) -> Option<Voltage> {
    let value = raw?;
    if value <= 0.0 {
        return None;
    }
    if value > millivolt_threshold {
        Some(Voltage::from_millivolts(value))
    } else {
        Some(Voltage::from_volts(value))
    }
}

/// Maps a merged raw payload into the canonical snapshot. Pure, no I/O;
/// absent or invalid fields degrade to `None`, never fail the snapshot.
pub fn normalize(raw: &Value, tuning: &TuningConfig, expected_chip_count: u16) -> TelemetrySnapshot {
    let hashrate = resolve_f64(raw, MetricField::Hashrate)
        .filter(|v| *v >= 0.0)
        .map(HashRate::from_gigahashes);

    // A zero frequency is a placeholder some firmware emits while booting.
    let frequency = resolve_f64(raw, MetricField::Frequency)
        .filter(|v| *v > 0.0)
        .map(Frequency::from_megahertz);

    let expected_hashrate = frequency.map(|f| {
        HashRate::from_gigahashes(
            f.as_megahertz() * tuning.ghs_per_chip_mhz * f64::from(expected_chip_count),
        )
    });

    TelemetrySnapshot {
        online: true,
        hashrate,
        expected_hashrate,
        power: resolve_f64(raw, MetricField::Power).map(Power::from_watts),
        asic_temperature: resolve_f64(raw, MetricField::AsicTemperature)
            .map(Temperature::from_celsius),
        vr_temperature: resolve_f64(raw, MetricField::VrTemperature)
            .map(Temperature::from_celsius),
        input_voltage: scale_voltage(
            resolve_f64(raw, MetricField::InputVoltage),
            tuning.millivolt_threshold,
        ),
        asic_voltage: scale_voltage(
            resolve_f64(raw, MetricField::AsicVoltage),
            tuning.millivolt_threshold,
        ),
        frequency,
        // A stopped fan reads back as zero duty, which the firmware also
        // emits when no fan is fitted; treat it as unknown.
        fan_percent: resolve_f64(raw, MetricField::Fan).filter(|v| *v > 0.0),
        uptime: resolve_u64(raw, MetricField::Uptime)
            .filter(|v| *v > 0)
            .map(Duration::from_secs),
        best_share_session: resolve_share(raw, MetricField::BestShareSession),
        best_share_all_time: resolve_share(raw, MetricField::BestShareAllTime),
        shares_accepted: resolve_u64(raw, MetricField::SharesAccepted),
        shares_rejected: resolve_u64(raw, MetricField::SharesRejected),
        error_message: None,
    }
}

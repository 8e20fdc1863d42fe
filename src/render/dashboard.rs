use std::collections::HashMap;
use std::time::Duration;

use crate::config::DeviceConfig;
use crate::data::snapshot::TelemetrySnapshot;

/// Offline status labels are cut to this many characters; the full message
/// stays in the tooltip.
const ERROR_LABEL_LEN: usize = 15;

const UNKNOWN: &str = "--";

pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Days and hours once a day has elapsed, otherwise hours and minutes.
/// Unknown uptime is an explicit placeholder, never "0h 0m".
pub fn format_uptime(uptime: Option<Duration>) -> String {
    let Some(uptime) = uptime else {
        return UNKNOWN.to_string();
    };
    let seconds = uptime.as_secs();
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else {
        format!("{hours}h {minutes}m")
    }
}

fn stat(label: &str, value: &str, unit: &str) -> String {
    format!(
        "<div class=\"stat-item\"><span class=\"stat-label\">{label}</span>\
         <div class=\"stat-value\">{value} <span class=\"unit\">{unit}</span></div></div>"
    )
}

fn ext_stat(label: &str, value: &str) -> String {
    format!(
        "<div class=\"ext-stat-item\"><span class=\"ext-stat-label\">{label}</span>\
         <span class=\"ext-stat-value\">{value}</span></div>"
    )
}

fn fmt_or_unknown<T>(value: Option<T>, fmt: impl Fn(T) -> String) -> String {
    value.map(fmt).unwrap_or_else(|| UNKNOWN.to_string())
}

/// Pure projection of one device's state into its card markup. `None`
/// means the device has not completed a poll yet.
pub fn render_card(device: &DeviceConfig, snapshot: Option<&TelemetrySnapshot>) -> String {
    let mut s = String::new();
    s.push_str(&format!(
        "<div class=\"miner-card{}\" id=\"card-{}\">",
        match snapshot {
            Some(snap) if !snap.online => " offline",
            _ => "",
        },
        html_escape(&device.id)
    ));
    s.push_str("<div class=\"card-header\"><div>");
    s.push_str(&format!(
        "<h2 class=\"miner-name\">{}</h2><div class=\"miner-ip\">{}</div>",
        html_escape(&device.name),
        html_escape(&device.address)
    ));
    s.push_str("</div>");
    s.push_str(&render_status(snapshot));
    s.push_str("</div>");

    let empty = TelemetrySnapshot::default();
    let snap = match snapshot {
        Some(snap) if snap.online => snap,
        // Offline and not-yet-polled cards reset every metric to the
        // unknown placeholder rather than showing stale or zero values.
        _ => &empty,
    };

    s.push_str("<div class=\"stats-grid\">");
    s.push_str(&stat(
        "Hashrate",
        &fmt_or_unknown(snap.hashrate, |hr| format!("{:.0}", hr.as_gigahashes())),
        "GH/s",
    ));
    s.push_str(&stat(
        "Power",
        &fmt_or_unknown(snap.power, |p| format!("{:.0}", p.as_watts())),
        "W",
    ));
    s.push_str(&stat(
        "Temp",
        &fmt_or_unknown(snap.asic_temperature, |t| format!("{:.0}", t.as_celsius())),
        "&deg;C",
    ));
    s.push_str(&stat(
        "Efficiency",
        &fmt_or_unknown(snap.efficiency_j_per_th(), |e| format!("{e:.2}")),
        "J/TH",
    ));
    s.push_str("</div>");

    s.push_str("<div class=\"extended-stats\">");
    s.push_str(&ext_stat("Uptime", &format_uptime(snap.uptime)));
    s.push_str(&ext_stat(
        "Voltage",
        &fmt_or_unknown(snap.input_voltage, |v| format!("{:.3} V", v.as_volts())),
    ));
    s.push_str(&ext_stat(
        "ASIC Voltage",
        &fmt_or_unknown(snap.asic_voltage, |v| format!("{:.3} V", v.as_volts())),
    ));
    s.push_str(&ext_stat(
        "Frequency",
        &fmt_or_unknown(snap.frequency, |f| format!("{:.0} MHz", f.as_megahertz())),
    ));
    s.push_str(&ext_stat(
        "Fan",
        &fmt_or_unknown(snap.fan_percent, |f| format!("{f:.0}%")),
    ));
    s.push_str(&ext_stat(
        "VR Temp",
        &fmt_or_unknown(snap.vr_temperature, |t| {
            format!("{:.0} &deg;C", t.as_celsius())
        }),
    ));
    s.push_str(&ext_stat(
        "Expected",
        &fmt_or_unknown(snap.expected_hashrate, |hr| {
            format!("{:.0} GH/s", hr.as_gigahashes())
        }),
    ));
    s.push_str(&ext_stat(
        "Best Share",
        &html_escape(&fmt_or_unknown(snap.best_share_session.clone(), |v| v)),
    ));
    s.push_str(&ext_stat(
        "Best Ever",
        &html_escape(&fmt_or_unknown(snap.best_share_all_time.clone(), |v| v)),
    ));
    s.push_str(&ext_stat(
        "Shares",
        &format!(
            "{} / {}",
            fmt_or_unknown(snap.shares_accepted, |v| v.to_string()),
            fmt_or_unknown(snap.shares_rejected, |v| v.to_string())
        ),
    ));
    s.push_str(&ext_stat(
        "Rejected",
        &fmt_or_unknown(snap.rejection_rate_percent(), |r| format!("{r:.2}%")),
    ));
    s.push_str("</div></div>");
    s
}

fn render_status(snapshot: Option<&TelemetrySnapshot>) -> String {
    match snapshot {
        None => "<div class=\"miner-status status-active\">Connecting</div>".to_string(),
        Some(snap) if snap.online => {
            "<div class=\"miner-status status-active\">ACTIVE</div>".to_string()
        }
        Some(snap) => {
            let message = snap.error_message.as_deref().unwrap_or("Connection Failed");
            let label: String = message.chars().take(ERROR_LABEL_LEN).collect();
            format!(
                "<div class=\"miner-status status-offline\" title=\"{}\">{}</div>",
                html_escape(message),
                html_escape(&label)
            )
        }
    }
}

/// Assembles the full dashboard grid from the current snapshot map.
pub fn render_page(
    devices: &[DeviceConfig],
    snapshots: &HashMap<String, TelemetrySnapshot>,
) -> String {
    let mut s = String::new();
    s.push_str("<div class=\"miners-grid\">");
    for device in devices {
        s.push_str(&render_card(device, snapshots.get(&device.id)));
    }
    s.push_str("</div>");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;
    use crate::data::hashrate::HashRate;
    use measurements::{Power, Voltage};

    fn device() -> DeviceConfig {
        ConsoleConfig::default().devices[0].clone()
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(None), "--");
        assert_eq!(
            format_uptime(Some(Duration::from_secs(2 * 86_400 + 3 * 3_600))),
            "2d 3h"
        );
        assert_eq!(
            format_uptime(Some(Duration::from_secs(3 * 3_600 + 42 * 60))),
            "3h 42m"
        );
        assert_eq!(format_uptime(Some(Duration::from_secs(59))), "0h 0m");
    }

    #[test]
    fn online_card_shows_metrics() {
        let snapshot = TelemetrySnapshot {
            online: true,
            hashrate: Some(HashRate::from_gigahashes(512.4)),
            power: Some(Power::from_watts(21.3)),
            input_voltage: Some(Voltage::from_millivolts(1200.0)),
            fan_percent: Some(92.0),
            ..TelemetrySnapshot::default()
        };
        let card = render_card(&device(), Some(&snapshot));
        assert!(card.contains("ACTIVE"));
        assert!(card.contains("512 <span class=\"unit\">GH/s</span>"));
        assert!(card.contains("21 <span class=\"unit\">W</span>"));
        assert!(card.contains("1.200 V"));
        assert!(card.contains(">92%<"));
        // No power-to-hashrate pair missing here, but temp was never read.
        assert!(card.contains("-- <span class=\"unit\">&deg;C</span>"));
    }

    #[test]
    fn offline_card_truncates_error_and_keeps_full_tooltip() {
        let snapshot =
            TelemetrySnapshot::offline("network error: connection refused by peer");
        let card = render_card(&device(), Some(&snapshot));
        assert!(card.contains("miner-card offline"));
        assert!(card.contains(">network error: <"));
        assert!(card.contains("title=\"network error: connection refused by peer\""));
        // Metrics are reset to placeholders, never stale values.
        assert!(card.contains("-- <span class=\"unit\">GH/s</span>"));
    }

    #[test]
    fn unpolled_device_shows_connecting() {
        let card = render_card(&device(), None);
        assert!(card.contains("Connecting"));
    }

    #[test]
    fn device_names_are_escaped() {
        let mut dev = device();
        dev.name = "<script>x</script>".to_string();
        let card = render_card(&dev, None);
        assert!(!card.contains("<script>"));
        assert!(card.contains("&lt;script&gt;"));
    }

    #[test]
    fn page_contains_one_card_per_device() {
        let config = ConsoleConfig::default();
        let page = render_page(&config.devices, &HashMap::new());
        for dev in &config.devices {
            assert!(page.contains(&format!("card-{}", dev.id)));
        }
    }
}

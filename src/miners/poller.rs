use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{ConsoleConfig, DeviceConfig};
use crate::data::snapshot::TelemetrySnapshot;
use crate::miners::api::{FetchError, FetchJson};
use crate::miners::normalize;

const INFO_ENDPOINT: &str = "api/system/info";
const STATS_ENDPOINT: &str = "api/system/stats";

/// Polls one device and always produces a snapshot: telemetry when anything
/// answered, an offline marker otherwise. Failures never escape here, so
/// one device can never affect another's poll.
pub async fn poll_device(
    fetcher: &dyn FetchJson,
    config: &ConsoleConfig,
    device: &DeviceConfig,
) -> TelemetrySnapshot {
    match poll_inner(fetcher, config, device).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(device = %device.id, %err, "device poll failed");
            TelemetrySnapshot::offline(err.to_string())
        }
    }
}

async fn poll_inner(
    fetcher: &dyn FetchJson,
    config: &ConsoleConfig,
    device: &DeviceConfig,
) -> Result<TelemetrySnapshot, FetchError> {
    let info_url = config
        .device_url(device, INFO_ENDPOINT)
        .map_err(|e| FetchError::Unexpected(e.to_string()))?;

    // Stats does not exist on every firmware; only poll it where it does,
    // to avoid a guaranteed 404 each cycle. `None` means deliberately
    // unpolled, which is not a failure worth logging.
    let info = fetcher.fetch_json(&info_url);
    let stats = async {
        if !device.supports_secondary_endpoint {
            return None;
        }
        match config.device_url(device, STATS_ENDPOINT) {
            Ok(stats_url) => Some(fetcher.fetch_json(&stats_url).await),
            Err(e) => Some(Err(FetchError::Unexpected(e.to_string()))),
        }
    };
    let (info, stats) = tokio::join!(info, stats);

    if let Err(err) = &info {
        debug!(device = %device.id, %err, "primary endpoint failed");
    }
    if let Some(Err(err)) = &stats {
        debug!(device = %device.id, %err, "secondary endpoint failed");
    }

    let stats = stats.and_then(Result::ok);
    let merged = merge_payloads(info.ok().as_ref(), stats.as_ref());
    if merged.is_empty() {
        return Err(FetchError::EmptyResult);
    }

    Ok(normalize::normalize(
        &Value::Object(merged),
        &config.tuning,
        device.expected_chip_count,
    ))
}

/// Stats is the base and every info key overlays it, so info wins key
/// collisions while stats fills the gaps info does not provide.
fn merge_payloads(info: Option<&Value>, stats: Option<&Value>) -> Map<String, Value> {
    let mut merged = Map::new();
    if let Some(Value::Object(stats)) = stats {
        merged.extend(stats.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    if let Some(Value::Object(info)) = info {
        merged.extend(info.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

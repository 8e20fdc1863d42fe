use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ConsoleConfig;
use crate::data::snapshot::TelemetrySnapshot;
use crate::miners::api::FetchJson;
use crate::miners::poller;
use crate::render::dashboard;

/// The latest snapshot per device id. Each entry is written only by that
/// device's own poll task; no snapshot survives past the next pass that
/// reaches it.
pub type SnapshotMap = Arc<RwLock<HashMap<String, TelemetrySnapshot>>>;

/// Runs an immediate pass over the fleet, then one per interval measured
/// from the previous trigger. Passes are spawned without being awaited, so
/// a slow device may overlap the next pass; only its own card is affected.
pub struct Scheduler {
    config: Arc<ConsoleConfig>,
    fetcher: Arc<dyn FetchJson>,
    snapshots: SnapshotMap,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        config: Arc<ConsoleConfig>,
        fetcher: Arc<dyn FetchJson>,
        snapshots: SnapshotMap,
    ) -> Self {
        Self {
            config,
            fetcher,
            snapshots,
            cancel: CancellationToken::new(),
        }
    }

    pub fn snapshots(&self) -> SnapshotMap {
        self.snapshots.clone()
    }

    pub fn start(&self) -> JoinHandle<()> {
        let config = self.config.clone();
        let fetcher = self.fetcher.clone();
        let snapshots = self.snapshots.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            // The first tick fires immediately.
            let mut ticker = tokio::time::interval(config.poll_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tokio::spawn(run_pass(
                            config.clone(),
                            fetcher.clone(),
                            snapshots.clone(),
                        ));
                    }
                    _ = cancel.cancelled() => {
                        debug!("scheduler stopped");
                        break;
                    }
                }
            }
        })
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

async fn run_pass(
    config: Arc<ConsoleConfig>,
    fetcher: Arc<dyn FetchJson>,
    snapshots: SnapshotMap,
) {
    debug!("poll pass started");
    let polls = config.devices.iter().map(|device| {
        let fetcher = fetcher.clone();
        let snapshots = snapshots.clone();
        let config = &config;
        async move {
            let snapshot = poller::poll_device(fetcher.as_ref(), config, device).await;
            if !snapshot.online {
                warn!(
                    device = %device.id,
                    error = snapshot.error_message.as_deref().unwrap_or("unknown"),
                    "device offline"
                );
            }
            snapshots.write().await.insert(device.id.clone(), snapshot);
        }
    });
    futures::future::join_all(polls).await;
    debug!("poll pass complete");

    let page = {
        let map = snapshots.read().await;
        dashboard::render_page(&config.devices, &map)
    };
    if let Err(err) = tokio::fs::write(&config.dashboard_path, page).await {
        warn!(%err, path = %config.dashboard_path.display(), "failed to write dashboard");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miners::api::FetchError;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use url::Url;

    struct CountingFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl FetchJson for CountingFetcher {
        async fn fetch_json(&self, _url: &Url) -> Result<Value, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FetchError::Timeout)
            } else {
                Ok(json!({ "hashRate": 500.0, "power": 12.0 }))
            }
        }
    }

    fn test_config(name: &str) -> Arc<ConsoleConfig> {
        let mut config = ConsoleConfig::default();
        config.dashboard_path =
            std::env::temp_dir().join(format!("miner-console-{name}-{}.html", std::process::id()));
        Arc::new(config)
    }

    fn cleanup(path: &PathBuf) {
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_pass_covers_every_device() {
        let config = test_config("immediate");
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let snapshots: SnapshotMap = Arc::new(RwLock::new(HashMap::new()));
        let scheduler = Scheduler::new(config.clone(), fetcher.clone(), snapshots.clone());
        let handle = scheduler.start();

        // Paused time auto-advances once all tasks are idle, so the first
        // pass has settled by the time this sleep returns.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let map = snapshots.read().await;
        assert_eq!(map.len(), config.devices.len());
        for device in &config.devices {
            assert!(map[&device.id].online);
        }
        drop(map);

        scheduler.stop();
        handle.await.unwrap();
        cleanup(&config.dashboard_path);
    }

    #[tokio::test(start_paused = true)]
    async fn repeats_on_the_configured_interval() {
        let config = test_config("repeat");
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let snapshots: SnapshotMap = Arc::new(RwLock::new(HashMap::new()));
        let scheduler = Scheduler::new(config.clone(), fetcher.clone(), snapshots.clone());
        let handle = scheduler.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let after_first = fetcher.calls.load(Ordering::SeqCst);
        assert!(after_first > 0);

        tokio::time::sleep(config.poll_interval()).await;
        let after_second = fetcher.calls.load(Ordering::SeqCst);
        assert!(after_second > after_first);

        scheduler.stop();
        handle.await.unwrap();
        cleanup(&config.dashboard_path);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_devices_never_block_the_pass() {
        let config = test_config("failing");
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let snapshots: SnapshotMap = Arc::new(RwLock::new(HashMap::new()));
        let scheduler = Scheduler::new(config.clone(), fetcher, snapshots.clone());
        let handle = scheduler.start();

        tokio::time::sleep(Duration::from_millis(100)).await;

        let map = snapshots.read().await;
        assert_eq!(map.len(), config.devices.len());
        for snapshot in map.values() {
            assert!(!snapshot.online);
            assert!(snapshot.error_message.is_some());
        }
        drop(map);

        scheduler.stop();
        handle.await.unwrap();
        cleanup(&config.dashboard_path);
    }
}

//! Periodic refresh of every tracked node from its bridge.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, error};
use serde_json::json;

use crate::history::MessageType;
use crate::host::Controller;
use crate::registry::{Bridge, BridgeRegistry};

/// Polls every live bridge and pushes fresh state to the host.
pub struct SyncLoop {
    registry: Arc<BridgeRegistry>,
    host: Arc<dyn Controller>,
    poll_interval: Duration,
}

impl SyncLoop {
    pub fn new(registry: Arc<BridgeRegistry>, host: Arc<dyn Controller>, poll_interval: Duration) -> Self {
        SyncLoop {
            registry,
            host,
            poll_interval,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Refresh all live bridges concurrently.
    pub async fn tick(&self) {
        let bridges = self.registry.live().await;
        join_all(bridges.iter().map(|bridge| self.refresh_bridge(bridge))).await;
    }

    /// Tick forever.
    pub async fn run(&self) {
        loop {
            self.tick().await;
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn refresh_bridge(&self, bridge: &Bridge) {
        if bridge.is_discovering() {
            debug!("Skipping refresh of {} during discovery", bridge.address());
            return;
        }

        let mut guard = bridge.lock().await;
        let Some(session) = guard.session.clone() else {
            return;
        };

        match session.get_lights().await {
            Ok(lights) => {
                guard
                    .history
                    .record(MessageType::Poll, "lights", json!(lights.len()));
                guard.snapshot.lights = lights;
            }
            Err(e) => {
                error!("Failed to read lights from Hue bridge {}: {}", bridge.address(), e);
                guard.history.record_error(&e.to_string());
            }
        }

        match session.get_groups().await {
            Ok(groups) => {
                guard
                    .history
                    .record(MessageType::Poll, "groups", json!(groups.len()));
                guard.snapshot.groups = groups;
            }
            Err(e) => {
                error!("Failed to read groups from Hue bridge {}: {}", bridge.address(), e);
                guard.history.record_error(&e.to_string());
            }
        }

        let state = &mut *guard;
        let host = self.host.as_ref();
        for device in state.devices.values_mut() {
            device.refresh(&state.snapshot, host);
        }
        for group in state.groups.values_mut() {
            group.refresh(&state.snapshot, host);
        }
    }
}

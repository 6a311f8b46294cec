//! Reconciles what a bridge reports with the nodes tracked for it.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::device::Device;
use crate::errors::Error;
use crate::group::{Group, SceneEntry, group_address};
use crate::history::MessageType;
use crate::host::Controller;
use crate::registry::{Bridge, BridgeRegistry, BridgeState};
use crate::status::SceneData;
use crate::types::LightKind;

type Result<T> = std::result::Result<T, Error>;

/// What one discovery pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub lights_added: Vec<String>,
    pub groups_added: Vec<String>,
    pub groups_removed: Vec<String>,
    /// Lights skipped because their type is not one we drive.
    pub unsupported: usize,
    /// Another discovery was already running on this bridge.
    pub skipped: bool,
}

/// Turns bridge inventory into device and group records.
///
/// Records are only ever created here; a light seen on any bridge before
/// is never created again.
pub struct DiscoveryEngine {
    registry: Arc<BridgeRegistry>,
}

impl DiscoveryEngine {
    pub fn new(registry: Arc<BridgeRegistry>) -> Self {
        DiscoveryEngine { registry }
    }

    /// Run one discovery pass on a bridge.
    ///
    /// Lights are processed before groups. A failed light or group read
    /// aborts the pass with the error and leaves already tracked records
    /// alone; a failed scene read only empties the scene index.
    pub async fn discover(&self, bridge: &Bridge, host: &dyn Controller) -> Result<DiscoveryReport> {
        let Some(_guard) = bridge.begin_discovery() else {
            info!("Discovery already running on Hue bridge {}", bridge.address());
            return Ok(DiscoveryReport {
                skipped: true,
                ..Default::default()
            });
        };

        let mut guard = bridge.lock().await;
        let state: &mut BridgeState = &mut guard;
        let session = state
            .session
            .clone()
            .ok_or_else(|| Error::NotConnected(bridge.address().to_string()))?;

        info!("Starting Hue discovery on bridge {}", bridge.address());
        let mut report = DiscoveryReport::default();

        let lights = match session.get_lights().await {
            Ok(lights) => lights,
            Err(e) => {
                error!(
                    "Discover: failed to read lights from Hue bridge {}: {}",
                    bridge.address(),
                    e
                );
                state.history.record_error(&e.to_string());
                return Err(e);
            }
        };
        state
            .history
            .record(MessageType::Poll, "lights", json!(lights.len()));
        state.snapshot.lights = lights;
        info!(
            "{} light(s) found on {}, adding new ones",
            state.snapshot.lights.len(),
            bridge.address()
        );

        let mut ids: Vec<&String> = state.snapshot.lights.keys().collect();
        ids.sort_by(|a, b| by_id(a, b));
        for id in ids {
            let data = &state.snapshot.lights[id];
            let address = data.address();
            if state.devices.contains_key(&address) {
                continue;
            }

            let kind: LightKind = match data.light_type.parse() {
                Ok(kind) => kind,
                Err(_) => {
                    info!(
                        "Found unsupported {} light: {} ({})",
                        data.light_type, data.name, address
                    );
                    report.unsupported += 1;
                    continue;
                }
            };

            if !self.registry.claim_node(&address, bridge.address()).await {
                debug!("{} ({}) already tracked by another bridge", data.name, address);
                continue;
            }

            info!("Found {}: {} ({})", kind, data.name, address);
            let device = Device::new(kind, id, data);
            host.add_node(device.node_info());
            report.lights_added.push(address.clone());
            state.devices.insert(address, device);
        }

        state.snapshot.scenes = match session.get_scenes().await {
            Ok(scenes) => scenes,
            Err(e) => {
                warn!(
                    "Discover: failed to read scenes from Hue bridge {}: {}",
                    bridge.address(),
                    e
                );
                HashMap::new()
            }
        };

        let groups = match session.get_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                error!(
                    "Discover: failed to read groups from Hue bridge {}: {}",
                    bridge.address(),
                    e
                );
                state.history.record_error(&e.to_string());
                return Err(e);
            }
        };
        state
            .history
            .record(MessageType::Poll, "groups", json!(groups.len()));
        state.snapshot.groups = groups;

        let suffix = bridge.group_suffix(self.registry.is_multi_bridge().await);

        let mut ids: Vec<&String> = state.snapshot.groups.keys().collect();
        ids.sort_by(|a, b| by_id(a, b));
        for id in ids {
            let data = &state.snapshot.groups[id];
            let address = group_address(id, suffix);

            if data.lights.is_empty() {
                if state.groups.remove(&address).is_some() {
                    info!("Group {} has no lights left, removing {}", data.name, address);
                    self.registry.release_node(&address).await;
                    host.remove_node(&address);
                    report.groups_removed.push(address);
                }
                continue;
            }

            if let Some(group) = state.groups.get_mut(&address) {
                group.apply(data);
                continue;
            }

            if !self.registry.claim_node(&address, bridge.address()).await {
                continue;
            }
            let group = Group::new(&address, id, data);
            info!(
                "Found {} {} with {} light(s)",
                data.group_type,
                group.name(),
                data.lights.len()
            );
            host.add_node(group.node_info());
            report.groups_added.push(address.clone());
            state.groups.insert(address, group);
        }

        let vanished: Vec<String> = state
            .groups
            .values()
            .filter(|g| !state.snapshot.groups.contains_key(g.group_id()))
            .map(|g| g.address().to_string())
            .collect();
        for address in vanished {
            info!("Group {} is gone from the bridge, removing", address);
            state.groups.remove(&address);
            self.registry.release_node(&address).await;
            host.remove_node(&address);
            report.groups_removed.push(address);
        }

        for group in state.groups.values_mut() {
            group.set_scenes(scene_entries(
                bridge.address(),
                group.group_id(),
                &state.snapshot.scenes,
            ));
        }

        info!(
            "Discovery complete on {}: {} light(s) and {} group(s) added, {} group(s) removed",
            bridge.address(),
            report.lights_added.len(),
            report.groups_added.len(),
            report.groups_removed.len()
        );
        Ok(report)
    }
}

/// Scenes belonging to one group, numbered from 1 in scene id order.
fn scene_entries(
    bridge: &str,
    group_id: &str,
    scenes: &HashMap<String, SceneData>,
) -> Vec<SceneEntry> {
    let mut owned: Vec<(&String, &SceneData)> = scenes
        .iter()
        .filter(|(_, scene)| scene.group.as_deref() == Some(group_id))
        .collect();
    owned.sort_by(|a, b| a.0.cmp(b.0));

    owned
        .into_iter()
        .zip(1u32..)
        .map(|((scene_id, scene), ordinal)| SceneEntry {
            bridge: bridge.to_string(),
            group_id: group_id.to_string(),
            ordinal,
            scene_id: scene_id.clone(),
            name: scene.name.clone(),
        })
        .collect()
}

/// Numeric ids in numeric order, anything else after them.
fn by_id(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

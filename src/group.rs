//! Bridge groups mirrored as host nodes.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::context::CommandContext;
use crate::errors::Error;
use crate::host::{Command, Controller, Driver, NodeInfo};
use crate::payload::Payload;
use crate::status::{GroupData, Snapshot};
use crate::types::{Brightness, TransitionTime};

type Result<T> = std::result::Result<T, Error>;

/// Bridge id of the group every light belongs to.
pub const ALL_LIGHTS_GROUP: &str = "0";

const NODE_DEF: &str = "GROUP";

/// A scene a group can recall, addressed by the host with a 1-based ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneEntry {
    pub bridge: String,
    pub group_id: String,
    pub ordinal: u32,
    pub scene_id: String,
    pub name: String,
}

/// Node address for a bridge group.
///
/// With more than one bridge the address carries the bridge suffix, so
/// group "1" on two bridges yields two nodes.
///
/// ```
/// use hue_node_rs::group_address;
///
/// assert_eq!(group_address("1", None), "huegrp1");
/// assert_eq!(group_address("1", Some("1001012")), "huegrp1_1001012");
/// ```
pub fn group_address(group_id: &str, bridge_suffix: Option<&str>) -> String {
    match bridge_suffix {
        Some(suffix) => format!("huegrp{}_{}", group_id, suffix),
        None => format!("huegrp{}", group_id),
    }
}

/// A bridge group with at least one member light.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    address: String,
    group_id: String,
    name: String,
    group_type: String,
    lights: Vec<String>,
    any_on: bool,
    all_on: bool,
    scenes: Vec<SceneEntry>,
}

impl Group {
    pub fn new(address: &str, group_id: &str, data: &GroupData) -> Self {
        let mut group = Group {
            address: address.to_string(),
            group_id: group_id.to_string(),
            name: String::new(),
            group_type: String::new(),
            lights: Vec::new(),
            any_on: false,
            all_on: false,
            scenes: Vec::new(),
        };
        group.apply(data);
        group
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_type(&self) -> &str {
        &self.group_type
    }

    pub fn lights(&self) -> &[String] {
        &self.lights
    }

    pub fn any_on(&self) -> bool {
        self.any_on
    }

    pub fn all_on(&self) -> bool {
        self.all_on
    }

    pub fn scenes(&self) -> &[SceneEntry] {
        &self.scenes
    }

    pub(crate) fn set_scenes(&mut self, scenes: Vec<SceneEntry>) {
        self.scenes = scenes;
    }

    pub fn node_info(&self) -> NodeInfo {
        NodeInfo::new(&self.address, &self.name, NODE_DEF)
    }

    /// Replace membership and state with what the bridge reported.
    pub fn apply(&mut self, data: &GroupData) {
        self.name = if self.group_id == ALL_LIGHTS_GROUP {
            "All Lights".to_string()
        } else {
            data.name.clone()
        };
        self.group_type.clone_from(&data.group_type);
        self.lights.clone_from(&data.lights);
        self.any_on = data.state.any_on;
        self.all_on = data.state.all_on;
    }

    /// Update from the bridge's last polled snapshot and report to the host.
    pub fn refresh(&mut self, snapshot: &Snapshot, host: &dyn Controller) -> bool {
        let Some(data) = snapshot.groups.get(&self.group_id) else {
            debug!("group {} missing from bridge snapshot", self.group_id);
            return false;
        };
        self.apply(data);
        self.report(host);
        true
    }

    pub async fn query(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool> {
        match ctx.get_group(&self.group_id).await? {
            Some(data) => {
                self.apply(&data);
                self.report(ctx.host());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn handle(&mut self, ctx: &mut CommandContext<'_>, cmd: &Command) -> Result<bool> {
        let mut payload = Payload::new();
        match cmd.name.as_str() {
            "DON" | "DFON" => {
                payload.on(true);
                if let Some(value) = cmd.value_f64()? {
                    payload.brightness(&Brightness::clamped(value.round() as i64));
                }
                if cmd.name == "DFON" {
                    payload.transition(&TransitionTime::INSTANT);
                }
            }
            "DOF" | "DFOF" => {
                payload.on(false);
                if cmd.name == "DFOF" {
                    payload.transition(&TransitionTime::INSTANT);
                }
            }
            "SET_BRI" => {
                payload.on(true);
                payload.brightness(&Brightness::clamped(cmd.require_value()?.round() as i64));
            }
            "SET_SCENE" => {
                let raw = cmd.require_value()?;
                let entry = self
                    .scenes
                    .iter()
                    .find(|entry| f64::from(entry.ordinal) == raw.round())
                    .ok_or_else(|| Error::invalid_parameter(&cmd.name, "value", &raw.to_string()))?;
                debug!("group {} recalling scene {}", self.group_id, entry.name);
                payload.scene(&entry.scene_id);
            }
            "QUERY" => return self.query(ctx).await,
            _ => return Err(Error::unknown_command(&self.address, &cmd.name)),
        }

        let accepted = ctx.set_group(&self.group_id, &payload).await?;
        if payload.turns_on() {
            self.any_on = true;
            self.all_on = true;
        } else if payload.on == Some(false) {
            self.any_on = false;
            self.all_on = false;
        } else if payload.scene.is_some() {
            self.any_on = true;
        }
        self.report(ctx.host());
        Ok(accepted)
    }

    pub fn diagnostics(&self) -> Value {
        json!({
            "address": self.address,
            "group_id": self.group_id,
            "name": self.name,
            "type": self.group_type,
            "lights": self.lights,
            "any_on": self.any_on,
            "scenes": self.scenes.iter().map(|s| &s.name).collect::<Vec<_>>(),
        })
    }

    fn report(&self, host: &dyn Controller) {
        host.set_driver(&self.address, Driver::St, if self.any_on { 100.0 } else { 0.0 });
        host.set_driver(&self.address, Driver::Gv1, self.lights.len() as f64);
    }
}

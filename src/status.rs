//! Light, group and scene state as reported by the bridge.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::convert;
use crate::types::{Alert, Brightness, Effect, Mired, Xy};

/// One entry of `GET /lights`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct LightData {
    pub name: String,
    /// Capability string, e.g. "Extended color light".
    #[serde(rename = "type")]
    pub light_type: String,
    /// Hardware id; stable across bridge reboots, unlike the light id.
    pub uniqueid: String,
    #[serde(default)]
    pub modelid: Option<String>,
    #[serde(default)]
    pub manufacturername: Option<String>,
    pub state: LightState,
}

impl LightData {
    /// Host node address for this light.
    pub fn address(&self) -> String {
        convert::id_to_address(&self.uniqueid)
    }
}

/// Current state of a light.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct LightState {
    pub on: bool,
    #[serde(default)]
    pub bri: Option<Brightness>,
    #[serde(default)]
    pub hue: Option<u16>,
    #[serde(default)]
    pub sat: Option<u8>,
    #[serde(default)]
    pub xy: Option<Xy>,
    #[serde(default)]
    pub ct: Option<u16>,
    /// Kept as text; newer firmware reports modes this crate does not drive.
    #[serde(default)]
    pub alert: Option<String>,
    #[serde(default)]
    pub effect: Option<String>,
    #[serde(default)]
    pub colormode: Option<String>,
    #[serde(default)]
    pub reachable: bool,
}

impl LightState {
    pub fn alert(&self) -> Alert {
        self.alert
            .as_deref()
            .and_then(|a| a.parse().ok())
            .unwrap_or_default()
    }

    pub fn effect(&self) -> Effect {
        self.effect
            .as_deref()
            .and_then(|e| e.parse().ok())
            .unwrap_or_default()
    }

    /// Reported color temperature, if the light has one.
    pub fn mired(&self) -> Option<Mired> {
        self.ct.filter(|ct| *ct != 0).map(|ct| Mired::clamped(i64::from(ct)))
    }
}

/// One entry of `GET /groups`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct GroupData {
    #[serde(default)]
    pub name: String,
    /// Member light ids (bridge-local).
    #[serde(default)]
    pub lights: Vec<String>,
    #[serde(rename = "type", default)]
    pub group_type: String,
    #[serde(default)]
    pub state: GroupState,
}

/// Aggregate on-state of a group's members.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupState {
    #[serde(default)]
    pub all_on: bool,
    #[serde(default)]
    pub any_on: bool,
}

/// One entry of `GET /scenes`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct SceneData {
    pub name: String,
    /// Owning group for group scenes; absent for light scenes.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub lights: Vec<String>,
    #[serde(rename = "type", default)]
    pub scene_type: Option<String>,
}

/// Everything last pulled from one bridge.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub lights: HashMap<String, LightData>,
    pub groups: HashMap<String, GroupData>,
    pub scenes: HashMap<String, SceneData>,
}

impl Snapshot {
    /// Find a light by hardware-derived address, returning its current id.
    pub fn find_light(&self, address: &str) -> Option<(&String, &LightData)> {
        self.lights
            .iter()
            .find(|(_, light)| light.address() == address)
    }
}

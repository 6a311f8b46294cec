//! The home-automation controller side: nodes, drivers and commands.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Address of the top-level bridge node every device node hangs off.
pub const HUB_ADDRESS: &str = "huebridge";

/// A reportable value slot on a host node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString, Display, AsRefStr,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Driver {
    /// Status level, 0-100.
    St,
    /// x chromaticity, or member count on a group.
    Gv1,
    /// y chromaticity.
    Gv2,
    Gv3,
    Gv4,
    /// Raw brightness, 1-254.
    Gv5,
    /// Reachable.
    Gv6,
    /// Color temperature in Kelvin.
    Clitemp,
    /// Transition time in milliseconds.
    Rr,
}

/// A node registration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub address: String,
    pub name: String,
    /// Host-side node definition, e.g. `ECOLOR_LIGHT`.
    pub node_def: String,
    /// Address of the parent node.
    pub primary: String,
}

impl NodeInfo {
    pub fn new(address: &str, name: &str, node_def: &str) -> Self {
        NodeInfo {
            address: address.to_string(),
            name: name.to_string(),
            node_def: node_def.to_string(),
            primary: HUB_ADDRESS.to_string(),
        }
    }
}

/// The host platform this crate reports into.
pub trait Controller: Send + Sync {
    fn add_node(&self, node: NodeInfo);

    fn remove_node(&self, address: &str);

    fn set_driver(&self, address: &str, driver: Driver, value: f64);

    /// Show a persistent notice to the user.
    fn notice(&self, key: &str, text: &str);

    fn remove_notice(&self, key: &str);
}

/// A command sent by the host to one node.
///
/// # Examples
///
/// ```
/// use hue_node_rs::Command;
///
/// let cmd = Command::new("SET_HSB")
///     .with_query("H.uom56", "200")
///     .with_query("S.uom56", "100")
///     .with_query("BR.uom56", "150");
/// assert_eq!(cmd.param("BR"), Some("150"));
/// assert_eq!(cmd.param("B"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub query: HashMap<String, String>,
}

impl Command {
    pub fn new(name: &str) -> Self {
        Command {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl ToString) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    /// Look up a query field, ignoring any `.uom<N>` suffix on the key.
    pub fn param(&self, field: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key.split('.').next() == Some(field))
            .map(|(_, value)| value.as_str())
    }

    /// Numeric query field; absent fields are `None`.
    pub fn param_f64(&self, field: &str) -> Result<Option<f64>> {
        self.param(field)
            .map(|raw| self.parse_number(field, raw))
            .transpose()
    }

    pub fn require_f64(&self, field: &str) -> Result<f64> {
        self.param_f64(field)?
            .ok_or_else(|| Error::missing_parameter(&self.name, field))
    }

    /// Numeric command value, if one was sent.
    pub fn value_f64(&self) -> Result<Option<f64>> {
        self.value
            .as_deref()
            .map(|raw| self.parse_number("value", raw))
            .transpose()
    }

    pub fn require_value(&self) -> Result<f64> {
        self.value_f64()?
            .ok_or_else(|| Error::missing_parameter(&self.name, "value"))
    }

    fn parse_number(&self, field: &str, raw: &str) -> Result<f64> {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| Error::invalid_parameter(&self.name, field, raw))
    }
}

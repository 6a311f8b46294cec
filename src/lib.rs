//! # hue_node_rs
//!
//! An async Rust library that mirrors Philips Hue bridges into a
//! home-automation controller.
//!
//! Every light and group on one or more bridges becomes a controller node.
//! Node commands (on/off, brightness steps, colors, temperatures, scenes,
//! alerts, effects) are translated into Hue v1 REST calls, and a polling loop
//! keeps the controller's status values in sync with the bridges.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use hue_node_rs::{Command, HttpConnector, Hub, JsonFileStore, Settings};
//!
//! async fn run(host: Arc<dyn hue_node_rs::Controller>) -> Result<(), hue_node_rs::Error> {
//!     let mut params = HashMap::new();
//!     params.insert("bridges".to_string(), r#"["192.168.1.20"]"#.to_string());
//!     let settings = Settings::from_params(&params)?;
//!
//!     let connector = Arc::new(HttpConnector::new(&settings.devicetype));
//!     let store = Arc::new(JsonFileStore::new("hue_credentials.json"));
//!     let hub = Hub::new(settings, connector, store, host);
//!
//!     hub.start().await;
//!     hub.command("88010203040b0b", &Command::new("DON")).await;
//!     hub.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Pieces
//!
//! - [`convert`]: color space, brightness and temperature conversions
//! - [`BridgeRegistry`]: connection, pairing and credential persistence per bridge
//! - [`DiscoveryEngine`]: turns a bridge's lights, groups and scenes into nodes
//! - [`Device`] and [`Group`]: command translation for one light or one group
//! - [`SyncLoop`]: periodic refresh of node state
//! - [`Hub`]: the top-level node tying it all together
//!
//! The bridge transport sits behind the [`Connector`] and [`BridgeSession`]
//! traits; [`HttpConnector`] implements them over HTTP and is enabled by the
//! default `http` feature. The controller side sits behind [`Controller`].
//!
//! ## Feature Flags
//!
//! - `http` (default): the reqwest based bridge transport

mod config;
mod context;
pub mod convert;
mod device;
mod discovery;
mod engine;
mod errors;
mod group;
mod history;
mod host;
#[cfg(feature = "http")]
mod http;
mod hub;
mod payload;
mod registry;
mod response;
mod session;
mod status;
mod store;
mod sync;
mod types;

#[cfg(test)]
mod mock;

// Re-export public API
pub use config::Settings;
pub use context::CommandContext;
pub use device::{ColorFields, Device, TemperatureFields};
pub use discovery::{DiscoveredBridge, discover_bridges, discover_one};
pub use engine::{DiscoveryEngine, DiscoveryReport};
pub use errors::Error;
pub use group::{ALL_LIGHTS_GROUP, Group, SceneEntry, group_address};
pub use history::{HistoryEntry, HistorySummary, MessageHistory, MessageType};
pub use host::{Command, Controller, Driver, HUB_ADDRESS, NodeInfo};
#[cfg(feature = "http")]
pub use http::{HttpConnector, HttpSession};
pub use hub::Hub;
pub use payload::Payload;
pub use registry::{Bridge, BridgeRegistry, BridgeState, BridgeStatus, DiscoveryGuard};
pub use response::{ApiError, FieldResult};
pub use session::{BridgeSession, Connector};
pub use status::{GroupData, GroupState, LightData, LightState, SceneData, Snapshot};
pub use store::{CredentialStore, Credentials, JsonFileStore, MemoryStore};
pub use sync::SyncLoop;
pub use types::{
    Alert, Brightness, Color, Effect, HueSaturation, Kelvin, LightKind, Mired, TransitionTime, Xy,
};

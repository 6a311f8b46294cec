//! The top-level bridge node: wiring between host, registry and bridges.

use std::sync::Arc;

use futures::future::join_all;
use log::{error, info, warn};
use serde_json::{Value, json};

use crate::config::Settings;
use crate::context::CommandContext;
use crate::engine::{DiscoveryEngine, DiscoveryReport};
use crate::errors::Error;
use crate::host::{Command, Controller, Driver, HUB_ADDRESS, NodeInfo};
use crate::registry::{Bridge, BridgeRegistry};
use crate::session::Connector;
use crate::store::CredentialStore;
use crate::sync::SyncLoop;

type Result<T> = std::result::Result<T, Error>;

const HUB_NODE_DEF: &str = "HUEBR";

/// Everything one node server instance runs.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use hue_node_rs::{Hub, HttpConnector, JsonFileStore, Settings};
///
/// let settings = Settings::from_params(&params)?;
/// let connector = Arc::new(HttpConnector::new(&settings.devicetype));
/// let hub = Hub::new(settings, connector, Arc::new(JsonFileStore::new("hue.json")), host);
/// hub.start().await;
/// hub.run().await;
/// ```
pub struct Hub {
    settings: Settings,
    registry: Arc<BridgeRegistry>,
    engine: DiscoveryEngine,
    sync: SyncLoop,
    host: Arc<dyn Controller>,
}

impl Hub {
    pub fn new(
        settings: Settings,
        connector: Arc<dyn Connector>,
        store: Arc<dyn CredentialStore>,
        host: Arc<dyn Controller>,
    ) -> Self {
        let registry = Arc::new(
            BridgeRegistry::new(connector, store)
                .with_seed_credentials(settings.seed_credentials.clone()),
        );
        Hub {
            engine: DiscoveryEngine::new(registry.clone()),
            sync: SyncLoop::new(registry.clone(), host.clone(), settings.poll_interval),
            settings,
            registry,
            host,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<BridgeRegistry> {
        &self.registry
    }

    /// Register the hub node, connect bridges and run a first discovery.
    pub async fn start(&self) -> Vec<Result<DiscoveryReport>> {
        self.settings.apply_log_level();
        self.host.add_node(NodeInfo::new(HUB_ADDRESS, "Hue Bridge", HUB_NODE_DEF));
        info!("Started Hue node server");
        self.connect().await;
        self.discover().await
    }

    /// Connect (or retry) every configured bridge.
    pub async fn connect(&self) -> Vec<Arc<Bridge>> {
        let live = self
            .registry
            .connect(self.settings.configured_bridges(), self.host.as_ref())
            .await;
        let connected = if live.is_empty() { 0.0 } else { 1.0 };
        self.host.set_driver(HUB_ADDRESS, Driver::St, connected);
        live
    }

    /// Discovery on every live bridge, concurrently.
    pub async fn discover(&self) -> Vec<Result<DiscoveryReport>> {
        let bridges = self.registry.live().await;
        join_all(
            bridges
                .iter()
                .map(|bridge| self.engine.discover(bridge, self.host.as_ref())),
        )
        .await
    }

    /// One sync pass.
    pub async fn poll(&self) {
        self.sync.tick().await;
    }

    /// Sync at the configured interval, forever.
    pub async fn run(&self) {
        self.sync.run().await;
    }

    /// Route a host command to the node it addresses.
    ///
    /// Waits behind any discovery or sync running on the owning bridge.
    /// Returns false for rejected fields, transport failures and unknown
    /// nodes or commands; the reason is logged.
    pub async fn command(&self, address: &str, cmd: &Command) -> bool {
        if address == HUB_ADDRESS {
            return self.hub_command(cmd).await;
        }

        let Some(bridge) = self.registry.owner_of(address).await else {
            warn!("{} for unknown node {}", cmd.name, address);
            return false;
        };

        match self.dispatch(&bridge, address, cmd).await {
            Ok(accepted) => accepted,
            Err(e) if e.is_connection_failure() => {
                warn!(
                    "{} on {} not delivered, Hue bridge {} unavailable: {}",
                    cmd.name,
                    address,
                    bridge.address(),
                    e
                );
                false
            }
            Err(e) => {
                error!("{} on {} failed: {}", cmd.name, address, e);
                false
            }
        }
    }

    async fn hub_command(&self, cmd: &Command) -> bool {
        match cmd.name.as_str() {
            "DISCOVER" | "QUERY" => {
                self.connect().await;
                self.discover().await.iter().all(|r| r.is_ok())
            }
            _ => {
                warn!("Hue bridge node received unknown command {}", cmd.name);
                false
            }
        }
    }

    async fn dispatch(&self, bridge: &Bridge, address: &str, cmd: &Command) -> Result<bool> {
        let mut guard = bridge.lock().await;
        let state = &mut *guard;
        let session = state
            .session
            .clone()
            .ok_or_else(|| Error::NotConnected(bridge.address().to_string()))?;

        let mut ctx = CommandContext::new(session.as_ref(), self.host.as_ref(), &mut state.history)
            .ignore_duplicate_on(self.settings.ignore_duplicate_on);

        if let Some(device) = state.devices.get_mut(address) {
            return device.handle(&mut ctx, cmd).await;
        }
        if let Some(group) = state.groups.get_mut(address) {
            return group.handle(&mut ctx, cmd).await;
        }
        Err(Error::NodeNotFound(address.to_string()))
    }

    /// State of every bridge and node, with call history summaries.
    pub async fn diagnostics(&self) -> Value {
        let bridges = self.registry.bridges().await;
        let details = join_all(bridges.iter().map(|b| b.diagnostics())).await;
        json!({
            "settings": {
                "bridges": self.settings.bridges,
                "ignore_duplicate_on": self.settings.ignore_duplicate_on,
                "poll_interval_secs": self.settings.poll_interval.as_secs(),
            },
            "multi_bridge": self.registry.is_multi_bridge().await,
            "bridges": details,
        })
    }
}

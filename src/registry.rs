//! Configured bridges, their credentials and connection lifecycle.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::device::Device;
use crate::errors::Error;
use crate::group::{Group, SceneEntry};
use crate::history::MessageHistory;
use crate::host::Controller;
use crate::session::{BridgeSession, Connector};
use crate::status::Snapshot;
use crate::store::{CredentialStore, Credentials};

type Result<T> = std::result::Result<T, Error>;

/// Where a bridge stands in its connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStatus {
    Unconnected,
    Connected,
    /// Waiting for the user to press the link button.
    PendingRegistration,
    Failed,
}

/// Mutable state of one bridge. Held behind the bridge's lock.
pub struct BridgeState {
    pub(crate) credential: Option<String>,
    pub(crate) session: Option<Arc<dyn BridgeSession>>,
    pub(crate) snapshot: Snapshot,
    pub(crate) devices: BTreeMap<String, Device>,
    pub(crate) groups: BTreeMap<String, Group>,
    pub(crate) history: MessageHistory,
}

impl BridgeState {
    fn new() -> Self {
        BridgeState {
            credential: None,
            session: None,
            snapshot: Snapshot::default(),
            devices: BTreeMap::new(),
            groups: BTreeMap::new(),
            history: MessageHistory::new(),
        }
    }

    pub fn session(&self) -> Option<&Arc<dyn BridgeSession>> {
        self.session.as_ref()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn devices(&self) -> &BTreeMap<String, Device> {
        &self.devices
    }

    pub fn groups(&self) -> &BTreeMap<String, Group> {
        &self.groups
    }

    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    /// Every recallable scene on this bridge, ordered by group then ordinal.
    pub fn scene_index(&self) -> Vec<SceneEntry> {
        self.groups
            .values()
            .flat_map(|g| g.scenes().iter().cloned())
            .collect()
    }
}

/// One bridge, identified by its network address.
pub struct Bridge {
    address: String,
    status: std::sync::RwLock<BridgeStatus>,
    discovering: AtomicBool,
    group_suffix: OnceLock<Option<String>>,
    state: Mutex<BridgeState>,
}

/// Clears the bridge's discovery flag when dropped.
pub struct DiscoveryGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for DiscoveryGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Bridge {
    pub fn new(address: &str) -> Self {
        Bridge {
            address: address.to_string(),
            status: std::sync::RwLock::new(BridgeStatus::Unconnected),
            discovering: AtomicBool::new(false),
            group_suffix: OnceLock::new(),
            state: Mutex::new(BridgeState::new()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Address with everything but letters and digits removed, used to
    /// keep group nodes of different bridges apart.
    ///
    /// ```
    /// use hue_node_rs::Bridge;
    ///
    /// assert_eq!(Bridge::new("192.168.1.10").suffix(), "192168110");
    /// ```
    pub fn suffix(&self) -> String {
        self.address
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect()
    }

    /// Suffix carried by this bridge's group addresses.
    ///
    /// Decided on first call from `multi_bridge` and fixed for the life of
    /// the bridge record, so bridges added later leave existing group
    /// addresses alone.
    ///
    /// ```
    /// use hue_node_rs::Bridge;
    ///
    /// let bridge = Bridge::new("10.0.0.7");
    /// assert_eq!(bridge.group_suffix(false), None);
    /// assert_eq!(bridge.group_suffix(true), None);
    /// ```
    pub fn group_suffix(&self, multi_bridge: bool) -> Option<&str> {
        self.group_suffix
            .get_or_init(|| multi_bridge.then(|| self.suffix()))
            .as_deref()
    }

    pub fn status(&self) -> BridgeStatus {
        self.status
            .read()
            .map(|s| *s)
            .unwrap_or(BridgeStatus::Failed)
    }

    pub(crate) fn set_status(&self, status: BridgeStatus) {
        if let Ok(mut current) = self.status.write() {
            *current = status;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status() == BridgeStatus::Connected
    }

    pub fn is_discovering(&self) -> bool {
        self.discovering.load(Ordering::Acquire)
    }

    /// Claim the discovery slot; `None` when a discovery is already running.
    pub fn begin_discovery(&self) -> Option<DiscoveryGuard<'_>> {
        self.discovering
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DiscoveryGuard {
                flag: &self.discovering,
            })
    }

    /// Wait for exclusive access to the bridge's state.
    pub async fn lock(&self) -> MutexGuard<'_, BridgeState> {
        self.state.lock().await
    }

    pub async fn diagnostics(&self) -> Value {
        let state = self.lock().await;
        json!({
            "address": self.address,
            "status": self.status(),
            "registered": state.credential.is_some(),
            "lights": state.devices.values().map(Device::diagnostics).collect::<Vec<_>>(),
            "groups": state.groups.values().map(Group::diagnostics).collect::<Vec<_>>(),
            "scenes": state.scene_index().len(),
            "history": serde_json::to_value(state.history.summary()).unwrap_or(Value::Null),
        })
    }
}

fn registration_notice_key(address: &str) -> String {
    format!("register_{}", address)
}

/// Owns every bridge record and the credentials that open them.
pub struct BridgeRegistry {
    connector: Arc<dyn Connector>,
    store: Arc<dyn CredentialStore>,
    seed: Credentials,
    bridges: RwLock<Vec<Arc<Bridge>>>,
    /// Node address to owning bridge address, across all bridges.
    nodes: Mutex<HashMap<String, String>>,
}

impl BridgeRegistry {
    pub fn new(connector: Arc<dyn Connector>, store: Arc<dyn CredentialStore>) -> Self {
        BridgeRegistry {
            connector,
            store,
            seed: Credentials::new(),
            bridges: RwLock::new(Vec::new()),
            nodes: Mutex::new(HashMap::new()),
        }
    }

    /// Credentials to use when the store has none for an address.
    pub fn with_seed_credentials(mut self, seed: Credentials) -> Self {
        self.seed = seed;
        self
    }

    /// Connect every configured bridge, or one auto-discovered bridge when
    /// `configured` is `None`, and return the bridges that are live.
    ///
    /// One bridge failing never stops the others. Failed bridges are retried
    /// on the next call.
    pub async fn connect(
        &self,
        configured: Option<&[String]>,
        host: &dyn Controller,
    ) -> Vec<Arc<Bridge>> {
        let stored = match self.store.load() {
            Ok(credentials) => credentials,
            Err(e) => {
                error!("Cannot load stored bridge credentials: {}", e);
                Credentials::new()
            }
        };
        let mut credentials = stored.clone();

        let targets: Vec<String> = match configured {
            Some(list) => list.to_vec(),
            None => match self.connector.discover().await {
                Ok(address) => vec![address],
                Err(e) => {
                    error!("Cannot find a Hue bridge on the network: {}", e);
                    Vec::new()
                }
            },
        };

        for address in &targets {
            self.connect_one(address, &mut credentials, host).await;
        }

        if credentials != stored {
            if let Err(e) = self.store.save(&credentials) {
                error!("Cannot save bridge credentials: {}", e);
            }
        }

        self.live().await
    }

    /// Open and verify one bridge, updating `credentials` with what it ends
    /// up paired with.
    ///
    /// A key the bridge rejects is dropped and registration is tried once.
    async fn connect_one(&self, address: &str, credentials: &mut Credentials, host: &dyn Controller) {
        let mut credential = credentials
            .get(address)
            .or_else(|| self.seed.get(address))
            .cloned();

        loop {
            match self.connector.connect(Some(address), credential.as_deref()).await {
                Ok(session) => {
                    if credentials.get(address).map(String::as_str) != Some(session.credential()) {
                        info!("New credential for Hue bridge {}", address);
                        credentials.insert(address.to_string(), session.credential().to_string());
                    }
                    host.remove_notice(&registration_notice_key(address));
                    match self.verify(self.bridge_for(address).await, session).await {
                        Err(e) if e.is_unauthorized() && credential.is_some() => {
                            warn!("Hue bridge {} rejected its key, registering again", address);
                            credentials.remove(address);
                            credential = None;
                        }
                        _ => return,
                    }
                }
                Err(Error::RegistrationPending { .. }) => {
                    warn!("Hue bridge {} is waiting for its link button", address);
                    host.notice(
                        &registration_notice_key(address),
                        &format!("Press the link button on the Hue bridge at {}", address),
                    );
                    let bridge = self.bridge_for(address).await;
                    bridge.set_status(BridgeStatus::PendingRegistration);
                    bridge.lock().await.session = None;
                    return;
                }
                Err(e) => {
                    error!("Cannot connect to Hue bridge {}: {}", address, e);
                    let bridge = self.bridge_for(address).await;
                    bridge.set_status(BridgeStatus::Failed);
                    let mut state = bridge.lock().await;
                    state.session = None;
                    state.history.record_error(&e.to_string());
                    return;
                }
            }
        }
    }

    /// Liveness check: the bridge must answer a light listing.
    async fn verify(&self, bridge: Arc<Bridge>, session: Arc<dyn BridgeSession>) -> Result<()> {
        let mut state = bridge.lock().await;
        state.credential = Some(session.credential().to_string());
        match session.get_lights().await {
            Ok(lights) => {
                info!(
                    "Connection to Hue bridge {} OK, {} light(s)",
                    bridge.address(),
                    lights.len()
                );
                state.snapshot.lights = lights;
                state.session = Some(session);
                bridge.set_status(BridgeStatus::Connected);
                Ok(())
            }
            Err(e) => {
                error!(
                    "Connect: failed to read lights from Hue bridge {}: {}",
                    bridge.address(),
                    e
                );
                state.history.record_error(&e.to_string());
                state.session = None;
                bridge.set_status(BridgeStatus::Failed);
                Err(e)
            }
        }
    }

    async fn bridge_for(&self, address: &str) -> Arc<Bridge> {
        let mut bridges = self.bridges.write().await;
        if let Some(bridge) = bridges.iter().find(|b| b.address() == address) {
            return bridge.clone();
        }
        debug!("Tracking Hue bridge {}", address);
        let bridge = Arc::new(Bridge::new(address));
        bridges.push(bridge.clone());
        bridge
    }

    pub async fn bridges(&self) -> Vec<Arc<Bridge>> {
        self.bridges.read().await.clone()
    }

    /// Bridges with a verified session.
    pub async fn live(&self) -> Vec<Arc<Bridge>> {
        self.bridges
            .read()
            .await
            .iter()
            .filter(|b| b.is_connected())
            .cloned()
            .collect()
    }

    pub async fn get(&self, address: &str) -> Option<Arc<Bridge>> {
        self.bridges
            .read()
            .await
            .iter()
            .find(|b| b.address() == address)
            .cloned()
    }

    pub async fn is_multi_bridge(&self) -> bool {
        self.bridges.read().await.len() > 1
    }

    /// Record that `bridge` owns the node at `node_address`.
    ///
    /// Returns false when the node is already owned, by this or any other bridge.
    pub(crate) async fn claim_node(&self, node_address: &str, bridge: &str) -> bool {
        let mut nodes = self.nodes.lock().await;
        if nodes.contains_key(node_address) {
            return false;
        }
        nodes.insert(node_address.to_string(), bridge.to_string());
        true
    }

    pub(crate) async fn release_node(&self, node_address: &str) {
        self.nodes.lock().await.remove(node_address);
    }

    /// The bridge owning a node.
    pub async fn owner_of(&self, node_address: &str) -> Option<Arc<Bridge>> {
        let owner = self.nodes.lock().await.get(node_address).cloned()?;
        self.get(&owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConnector, RecordingHost, light};
    use crate::store::MemoryStore;

    fn addresses(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[tokio::test]
    async fn test_pending_registration_does_not_block_others() {
        let connector = Arc::new(MockConnector::default());
        connector.add_bridge("10.0.0.2");
        let b = connector.add_bridge("10.0.0.3");
        b.put_light("1", light("AA:BB-1", "Dimmable light", true, 10));
        connector.await_link_button("10.0.0.2", true);

        let store = Arc::new(MemoryStore::default());
        let registry = BridgeRegistry::new(connector.clone(), store.clone());
        let host = RecordingHost::default();

        let live = registry
            .connect(Some(&addresses(&["10.0.0.2", "10.0.0.3"])), &host)
            .await;

        assert_eq!(live.len(), 1);
        assert_eq!(live[0].address(), "10.0.0.3");
        assert_eq!(
            registry.get("10.0.0.2").await.unwrap().status(),
            BridgeStatus::PendingRegistration
        );
        assert!(host.notice("register_10.0.0.2").is_some());
        assert_eq!(
            store.load().unwrap().get("10.0.0.3").map(String::as_str),
            Some("key-10.0.0.3")
        );

        // Link button pressed; the next connect clears the notice.
        connector.await_link_button("10.0.0.2", false);
        let live = registry
            .connect(Some(&addresses(&["10.0.0.2", "10.0.0.3"])), &host)
            .await;
        assert_eq!(live.len(), 2);
        assert!(host.notice("register_10.0.0.2").is_none());
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_liveness_failure_marks_failed() {
        let connector = Arc::new(MockConnector::default());
        let session = connector.add_bridge("10.0.0.2");
        session.fail_with(Error::timeout("10.0.0.2"));

        let registry = BridgeRegistry::new(connector, Arc::new(MemoryStore::default()));
        let host = RecordingHost::default();

        let live = registry.connect(Some(&addresses(&["10.0.0.2"])), &host).await;
        assert!(live.is_empty());
        let bridge = registry.get("10.0.0.2").await.unwrap();
        assert_eq!(bridge.status(), BridgeStatus::Failed);
        assert!(bridge.lock().await.session().is_none());

        // Retried on the next connect.
        let live = registry.connect(Some(&addresses(&["10.0.0.2"])), &host).await;
        assert_eq!(live.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_light_list_is_live() {
        let connector = Arc::new(MockConnector::default());
        connector.add_bridge("10.0.0.2");
        let registry = BridgeRegistry::new(connector, Arc::new(MemoryStore::default()));

        let live = registry
            .connect(Some(&addresses(&["10.0.0.2"])), &RecordingHost::default())
            .await;
        assert_eq!(live.len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_bridge_fails() {
        let connector = Arc::new(MockConnector::default());
        let registry = BridgeRegistry::new(connector, Arc::new(MemoryStore::default()));

        let live = registry
            .connect(Some(&addresses(&["10.9.9.9"])), &RecordingHost::default())
            .await;
        assert!(live.is_empty());
        assert_eq!(
            registry.get("10.9.9.9").await.unwrap().status(),
            BridgeStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_credentials_merge_and_save_only_on_change() {
        let connector = Arc::new(MockConnector::default());
        connector.add_bridge("10.0.0.2");
        connector.add_bridge("10.0.0.3");
        let store = Arc::new(MemoryStore::new(Credentials::from([
            ("10.0.0.2".to_string(), "stored".to_string()),
            ("10.0.0.9".to_string(), "other".to_string()),
        ])));
        let registry = BridgeRegistry::new(connector.clone(), store.clone());
        let host = RecordingHost::default();

        registry
            .connect(Some(&addresses(&["10.0.0.2", "10.0.0.3"])), &host)
            .await;
        let saved = store.load().unwrap();
        assert_eq!(saved.get("10.0.0.2").map(String::as_str), Some("stored"));
        assert_eq!(saved.get("10.0.0.3").map(String::as_str), Some("key-10.0.0.3"));
        assert_eq!(saved.get("10.0.0.9").map(String::as_str), Some("other"));
        assert_eq!(store.save_count(), 1);
        assert!(connector.connects().contains(&(
            Some("10.0.0.2".to_string()),
            Some("stored".to_string())
        )));

        // Nothing new: no second save.
        registry
            .connect(Some(&addresses(&["10.0.0.2", "10.0.0.3"])), &host)
            .await;
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_seed_credential_used_and_persisted() {
        let connector = Arc::new(MockConnector::default());
        connector.add_bridge("10.0.0.2");
        let store = Arc::new(MemoryStore::default());
        let registry = BridgeRegistry::new(connector.clone(), store.clone())
            .with_seed_credentials(Credentials::from([(
                "10.0.0.2".to_string(),
                "legacy".to_string(),
            )]));

        registry
            .connect(Some(&addresses(&["10.0.0.2"])), &RecordingHost::default())
            .await;
        assert_eq!(
            connector.connects(),
            vec![(Some("10.0.0.2".to_string()), Some("legacy".to_string()))]
        );
        assert_eq!(
            store.load().unwrap().get("10.0.0.2").map(String::as_str),
            Some("legacy")
        );
    }

    #[tokio::test]
    async fn test_auto_discovery() {
        let connector = Arc::new(MockConnector::default());
        connector.add_bridge("10.0.0.7");
        connector.set_discoverable("10.0.0.7");
        let registry = BridgeRegistry::new(connector, Arc::new(MemoryStore::default()));

        let live = registry.connect(None, &RecordingHost::default()).await;
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].address(), "10.0.0.7");
        assert!(!registry.is_multi_bridge().await);
    }

    #[tokio::test]
    async fn test_auto_discovery_reuses_stored_key() {
        let connector = Arc::new(MockConnector::default());
        connector.add_bridge("10.0.0.7");
        connector.set_discoverable("10.0.0.7");
        let store = Arc::new(MemoryStore::default());

        let first = BridgeRegistry::new(connector.clone(), store.clone());
        first.connect(None, &RecordingHost::default()).await;
        assert_eq!(
            store.load().unwrap().get("10.0.0.7").map(String::as_str),
            Some("key-10.0.0.7")
        );

        // Restart without pressing the link button.
        connector.await_link_button("10.0.0.7", true);
        let restarted = BridgeRegistry::new(connector.clone(), store.clone());
        let live = restarted.connect(None, &RecordingHost::default()).await;

        assert_eq!(live.len(), 1);
        assert_eq!(
            connector.connects().last(),
            Some(&(Some("10.0.0.7".to_string()), Some("key-10.0.0.7".to_string())))
        );
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_no_bridge_found() {
        let connector = Arc::new(MockConnector::default());
        let registry = BridgeRegistry::new(connector.clone(), Arc::new(MemoryStore::default()));

        let live = registry.connect(None, &RecordingHost::default()).await;
        assert!(live.is_empty());
        assert!(registry.bridges().await.is_empty());
        assert!(connector.connects().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_key_registers_again() {
        let connector = Arc::new(MockConnector::default());
        let bridge_data = connector.add_bridge("10.0.0.2");
        bridge_data.reject_key("stale");
        connector.await_link_button("10.0.0.2", true);
        let store = Arc::new(MemoryStore::new(Credentials::from([(
            "10.0.0.2".to_string(),
            "stale".to_string(),
        )])));
        let registry = BridgeRegistry::new(connector.clone(), store.clone());
        let host = RecordingHost::default();

        let live = registry.connect(Some(&addresses(&["10.0.0.2"])), &host).await;
        assert!(live.is_empty());
        assert_eq!(
            connector.connects(),
            vec![
                (Some("10.0.0.2".to_string()), Some("stale".to_string())),
                (Some("10.0.0.2".to_string()), None),
            ]
        );
        assert_eq!(
            registry.get("10.0.0.2").await.unwrap().status(),
            BridgeStatus::PendingRegistration
        );
        assert!(host.notice("register_10.0.0.2").is_some());
        assert!(store.load().unwrap().is_empty());

        connector.await_link_button("10.0.0.2", false);
        let live = registry.connect(Some(&addresses(&["10.0.0.2"])), &host).await;
        assert_eq!(live.len(), 1);
        assert_eq!(
            store.load().unwrap().get("10.0.0.2").map(String::as_str),
            Some("key-10.0.0.2")
        );
    }

    #[test]
    fn test_group_suffix_is_fixed_once_decided() {
        let bridge = Bridge::new("10.0.0.7");
        assert_eq!(bridge.group_suffix(true), Some("10007"));
        assert_eq!(bridge.group_suffix(false), Some("10007"));
    }

    #[tokio::test]
    async fn test_discovery_guard() {
        let bridge = Bridge::new("10.0.0.2");
        let guard = bridge.begin_discovery();
        assert!(guard.is_some());
        assert!(bridge.is_discovering());
        assert!(bridge.begin_discovery().is_none());
        drop(guard);
        assert!(!bridge.is_discovering());
    }

    #[tokio::test]
    async fn test_node_claims_are_global() {
        let registry = BridgeRegistry::new(
            Arc::new(MockConnector::default()),
            Arc::new(MemoryStore::default()),
        );
        assert!(registry.claim_node("aabb1", "10.0.0.2").await);
        assert!(!registry.claim_node("aabb1", "10.0.0.3").await);
        registry.release_node("aabb1").await;
        assert!(registry.claim_node("aabb1", "10.0.0.3").await);
    }
}

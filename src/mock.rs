//! In-memory bridge, connector and host for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::errors::Error;
use crate::host::{Controller, Driver, NodeInfo};
use crate::payload::Payload;
use crate::response::{ApiError, FieldResult};
use crate::session::{BridgeSession, Connector};
use crate::status::{GroupData, GroupState, LightData, LightState, SceneData};
use crate::types::Brightness;

type Result<T> = std::result::Result<T, Error>;

pub(crate) fn light(uniqueid: &str, light_type: &str, on: bool, bri: u8) -> LightData {
    LightData {
        name: format!("{} {}", light_type, uniqueid),
        light_type: light_type.to_string(),
        uniqueid: uniqueid.to_string(),
        modelid: None,
        manufacturername: None,
        state: LightState {
            on,
            bri: Some(Brightness::clamped(i64::from(bri))),
            reachable: true,
            ..Default::default()
        },
    }
}

pub(crate) fn group(name: &str, lights: &[&str], any_on: bool) -> GroupData {
    GroupData {
        name: name.to_string(),
        lights: lights.iter().map(|l| l.to_string()).collect(),
        group_type: "Room".to_string(),
        state: GroupState {
            all_on: any_on,
            any_on,
        },
    }
}

pub(crate) fn scene(name: &str, group: &str) -> SceneData {
    SceneData {
        name: name.to_string(),
        group: Some(group.to_string()),
        lights: Vec::new(),
        scene_type: Some("GroupScene".to_string()),
    }
}

#[derive(Default)]
struct BridgeData {
    lights: HashMap<String, LightData>,
    groups: HashMap<String, GroupData>,
    scenes: HashMap<String, SceneData>,
    light_payloads: Vec<(String, Value)>,
    group_payloads: Vec<(String, Value)>,
    response: Option<Vec<FieldResult>>,
    next_error: Option<Error>,
    rejected_keys: HashSet<String>,
    offline: bool,
    scenes_broken: bool,
    light_reads: usize,
}

/// A bridge held in memory. Writes succeed field by field unless told otherwise.
pub(crate) struct MockSession {
    address: String,
    data: Mutex<BridgeData>,
}

impl MockSession {
    pub(crate) fn new(address: &str) -> Self {
        MockSession {
            address: address.to_string(),
            data: Mutex::new(BridgeData::default()),
        }
    }

    pub(crate) fn put_light(&self, id: &str, light: LightData) {
        self.data.lock().unwrap().lights.insert(id.to_string(), light);
    }

    pub(crate) fn remove_light(&self, id: &str) {
        self.data.lock().unwrap().lights.remove(id);
    }

    pub(crate) fn put_group(&self, id: &str, group: GroupData) {
        self.data.lock().unwrap().groups.insert(id.to_string(), group);
    }

    pub(crate) fn put_scene(&self, id: &str, scene: SceneData) {
        self.data.lock().unwrap().scenes.insert(id.to_string(), scene);
    }

    /// Answer every write with these results.
    pub(crate) fn respond_with(&self, results: Vec<FieldResult>) {
        self.data.lock().unwrap().response = Some(results);
    }

    /// Fail the next call of any kind.
    pub(crate) fn fail_with(&self, err: Error) {
        self.data.lock().unwrap().next_error = Some(err);
    }

    /// Answer calls made with `key` as the bridge does for an unknown user.
    pub(crate) fn reject_key(&self, key: &str) {
        self.data.lock().unwrap().rejected_keys.insert(key.to_string());
    }

    fn authorize(&self, key: &str) -> Result<()> {
        if self.data.lock().unwrap().rejected_keys.contains(key) {
            return Err(Error::Bridge {
                address: self.address.clone(),
                code: ApiError::UNAUTHORIZED_USER,
                description: "unauthorized user".to_string(),
            });
        }
        Ok(())
    }

    /// Fail every call with a connection error.
    pub(crate) fn set_offline(&self, offline: bool) {
        self.data.lock().unwrap().offline = offline;
    }

    pub(crate) fn break_scenes(&self) {
        self.data.lock().unwrap().scenes_broken = true;
    }

    pub(crate) fn last_light_payload(&self, id: &str) -> Option<Value> {
        let data = self.data.lock().unwrap();
        data.light_payloads
            .iter()
            .rev()
            .find(|(light_id, _)| light_id == id)
            .map(|(_, payload)| payload.clone())
    }

    pub(crate) fn last_group_payload(&self, id: &str) -> Option<Value> {
        let data = self.data.lock().unwrap();
        data.group_payloads
            .iter()
            .rev()
            .find(|(group_id, _)| group_id == id)
            .map(|(_, payload)| payload.clone())
    }

    pub(crate) fn light_calls(&self) -> usize {
        self.data.lock().unwrap().light_payloads.len()
    }

    pub(crate) fn light_reads(&self) -> usize {
        self.data.lock().unwrap().light_reads
    }

    fn check(&self) -> Result<()> {
        let mut data = self.data.lock().unwrap();
        if let Some(err) = data.next_error.take() {
            return Err(err);
        }
        if data.offline {
            return Err(Error::connection(&self.address, "offline"));
        }
        Ok(())
    }

    fn write(&self, resource: &str, id: &str, payload: &Payload, group: bool) -> Result<Vec<FieldResult>> {
        self.check()?;
        let body = serde_json::to_value(payload).map_err(Error::JsonDump)?;
        let mut data = self.data.lock().unwrap();
        if group {
            data.group_payloads.push((id.to_string(), body.clone()));
        } else {
            data.light_payloads.push((id.to_string(), body.clone()));
        }

        if let Some(results) = &data.response {
            return Ok(results.clone());
        }
        let fields = body.as_object().cloned().unwrap_or_default();
        Ok(fields
            .into_iter()
            .map(|(key, value)| {
                FieldResult::Success(json!({ format!("/{}/{}/{}", resource, id, key): value }))
            })
            .collect())
    }
}

#[async_trait]
impl BridgeSession for MockSession {
    fn address(&self) -> &str {
        &self.address
    }

    fn credential(&self) -> &str {
        "mock"
    }

    async fn get_lights(&self) -> Result<HashMap<String, LightData>> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        data.light_reads += 1;
        Ok(data.lights.clone())
    }

    async fn get_light(&self, id: &str) -> Result<LightData> {
        self.check()?;
        self.data
            .lock()
            .unwrap()
            .lights
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Bridge {
                address: self.address.clone(),
                code: 3,
                description: format!("resource, /lights/{}, not available", id),
            })
    }

    async fn set_light(&self, id: &str, payload: &Payload) -> Result<Vec<FieldResult>> {
        self.write("lights", id, payload, false)
    }

    async fn get_groups(&self) -> Result<HashMap<String, GroupData>> {
        self.check()?;
        Ok(self.data.lock().unwrap().groups.clone())
    }

    async fn set_group(&self, id: &str, payload: &Payload) -> Result<Vec<FieldResult>> {
        self.write("groups", id, payload, true)
    }

    async fn get_scenes(&self) -> Result<HashMap<String, SceneData>> {
        self.check()?;
        let data = self.data.lock().unwrap();
        if data.scenes_broken {
            return Err(Error::bad_response(&self.address, "truncated body"));
        }
        Ok(data.scenes.clone())
    }
}

/// A session handed out by [`MockConnector`], carrying the key it was opened with.
struct KeyedSession {
    inner: Arc<MockSession>,
    credential: String,
}

#[async_trait]
impl BridgeSession for KeyedSession {
    fn address(&self) -> &str {
        self.inner.address()
    }

    fn credential(&self) -> &str {
        &self.credential
    }

    async fn get_lights(&self) -> Result<HashMap<String, LightData>> {
        self.inner.authorize(&self.credential)?;
        self.inner.get_lights().await
    }

    async fn get_light(&self, id: &str) -> Result<LightData> {
        self.inner.authorize(&self.credential)?;
        self.inner.get_light(id).await
    }

    async fn set_light(&self, id: &str, payload: &Payload) -> Result<Vec<FieldResult>> {
        self.inner.authorize(&self.credential)?;
        self.inner.set_light(id, payload).await
    }

    async fn get_groups(&self) -> Result<HashMap<String, GroupData>> {
        self.inner.authorize(&self.credential)?;
        self.inner.get_groups().await
    }

    async fn set_group(&self, id: &str, payload: &Payload) -> Result<Vec<FieldResult>> {
        self.inner.authorize(&self.credential)?;
        self.inner.set_group(id, payload).await
    }

    async fn get_scenes(&self) -> Result<HashMap<String, SceneData>> {
        self.inner.authorize(&self.credential)?;
        self.inner.get_scenes().await
    }
}

/// Hands out [`MockSession`]s by address.
///
/// Unpaired connects issue the key `key-<address>` unless the address is
/// marked as waiting for its link button.
#[derive(Default)]
pub(crate) struct MockConnector {
    bridges: Mutex<HashMap<String, Arc<MockSession>>>,
    awaiting_link: Mutex<HashSet<String>>,
    discoverable: Mutex<Option<String>>,
    connects: Mutex<Vec<(Option<String>, Option<String>)>>,
}

impl MockConnector {
    pub(crate) fn add_bridge(&self, address: &str) -> Arc<MockSession> {
        let session = Arc::new(MockSession::new(address));
        self.bridges
            .lock()
            .unwrap()
            .insert(address.to_string(), session.clone());
        session
    }

    pub(crate) fn await_link_button(&self, address: &str, waiting: bool) {
        let mut awaiting = self.awaiting_link.lock().unwrap();
        if waiting {
            awaiting.insert(address.to_string());
        } else {
            awaiting.remove(address);
        }
    }

    /// Bridge found when no address is configured.
    pub(crate) fn set_discoverable(&self, address: &str) {
        *self.discoverable.lock().unwrap() = Some(address.to_string());
    }

    pub(crate) fn connects(&self) -> Vec<(Option<String>, Option<String>)> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn discover(&self) -> Result<String> {
        self.discoverable
            .lock()
            .unwrap()
            .clone()
            .ok_or(Error::NoBridgeFound)
    }

    async fn connect(
        &self,
        address: Option<&str>,
        credential: Option<&str>,
    ) -> Result<Arc<dyn BridgeSession>> {
        self.connects
            .lock()
            .unwrap()
            .push((address.map(String::from), credential.map(String::from)));

        let address = match address {
            Some(address) => address.to_string(),
            None => self.discover().await?,
        };

        let inner = self
            .bridges
            .lock()
            .unwrap()
            .get(&address)
            .cloned()
            .ok_or_else(|| Error::connection(&address, "no route to host"))?;

        let credential = match credential {
            Some(key) => key.to_string(),
            None if self.awaiting_link.lock().unwrap().contains(&address) => {
                return Err(Error::registration_pending(&address));
            }
            None => format!("key-{}", address),
        };

        Ok(Arc::new(KeyedSession { inner, credential }))
    }
}

/// A host that remembers everything it was told.
#[derive(Default)]
pub(crate) struct RecordingHost {
    nodes: Mutex<BTreeMap<String, NodeInfo>>,
    added: Mutex<Vec<String>>,
    removed: Mutex<Vec<String>>,
    drivers: Mutex<HashMap<(String, Driver), f64>>,
    notices: Mutex<BTreeMap<String, String>>,
}

impl RecordingHost {
    pub(crate) fn driver(&self, address: &str, driver: Driver) -> Option<f64> {
        self.drivers
            .lock()
            .unwrap()
            .get(&(address.to_string(), driver))
            .copied()
    }

    pub(crate) fn node(&self, address: &str) -> Option<NodeInfo> {
        self.nodes.lock().unwrap().get(address).cloned()
    }

    pub(crate) fn node_addresses(&self) -> Vec<String> {
        self.nodes.lock().unwrap().keys().cloned().collect()
    }

    /// Every `add_node` call, in order, duplicates included.
    pub(crate) fn added(&self) -> Vec<String> {
        self.added.lock().unwrap().clone()
    }

    pub(crate) fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    pub(crate) fn notice(&self, key: &str) -> Option<String> {
        self.notices.lock().unwrap().get(key).cloned()
    }
}

impl Controller for RecordingHost {
    fn add_node(&self, node: NodeInfo) {
        self.added.lock().unwrap().push(node.address.clone());
        self.nodes.lock().unwrap().insert(node.address.clone(), node);
    }

    fn remove_node(&self, address: &str) {
        self.removed.lock().unwrap().push(address.to_string());
        self.nodes.lock().unwrap().remove(address);
    }

    fn set_driver(&self, address: &str, driver: Driver, value: f64) {
        self.drivers
            .lock()
            .unwrap()
            .insert((address.to_string(), driver), value);
    }

    fn notice(&self, key: &str, text: &str) {
        self.notices
            .lock()
            .unwrap()
            .insert(key.to_string(), text.to_string());
    }

    fn remove_notice(&self, key: &str) {
        self.notices.lock().unwrap().remove(key);
    }
}

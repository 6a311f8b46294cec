//! Hue v1 REST transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::discovery;
use crate::errors::Error;
use crate::payload::Payload;
use crate::response::{ApiError, FieldResult};
use crate::session::{BridgeSession, Connector};
use crate::status::{GroupData, LightData, SceneData};

type Result<T> = std::result::Result<T, Error>;

/// Opens [`HttpSession`]s, registering with the bridge when no key is known.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use hue_node_rs::HttpConnector;
///
/// let connector = HttpConnector::new("hue-node-rs#kitchen")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(connector.timeout(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct HttpConnector {
    devicetype: String,
    timeout: Duration,
    discovery_timeout: Duration,
}

impl HttpConnector {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(3);

    /// `devicetype` is the application name shown in the bridge's whitelist.
    pub fn new(devicetype: &str) -> Self {
        HttpConnector {
            devicetype: devicetype.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            discovery_timeout: Self::DEFAULT_DISCOVERY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask the bridge for a new application key.
    ///
    /// Fails with [`Error::RegistrationPending`] until the link button has
    /// been pressed.
    pub async fn register(&self, address: &str) -> Result<String> {
        let client = self.client(address)?;
        let url = format!("{}/api", base_url(address));
        let response = client
            .post(&url)
            .json(&json!({ "devicetype": self.devicetype }))
            .send()
            .await
            .map_err(|e| transport_error(address, e))?;
        let body = read_json(address, response).await?;

        let results: Vec<Value> = serde_json::from_value(body)
            .map_err(|e| Error::bad_response(address, e))?;
        for result in results {
            if let Some(username) = result
                .pointer("/success/username")
                .and_then(Value::as_str)
            {
                info!("Registered with Hue bridge {}", address);
                return Ok(username.to_string());
            }
            if let Some(err) = result.get("error") {
                let err: ApiError = serde_json::from_value(err.clone())
                    .map_err(|e| Error::bad_response(address, e))?;
                if err.code == ApiError::LINK_BUTTON_NOT_PRESSED {
                    return Err(Error::registration_pending(address));
                }
                return Err(bridge_error(address, err));
            }
        }
        Err(Error::bad_response(address, "empty registration reply"))
    }

    fn client(&self, address: &str) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::connection(address, e))
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn discover(&self) -> Result<String> {
        let found = discovery::discover_one(self.discovery_timeout).await?;
        info!("Discovered Hue bridge at {}", found.ip);
        Ok(found.ip.to_string())
    }

    async fn connect(
        &self,
        address: Option<&str>,
        credential: Option<&str>,
    ) -> Result<Arc<dyn BridgeSession>> {
        let address = match address {
            Some(address) => address.to_string(),
            None => self.discover().await?,
        };

        let credential = match credential {
            Some(key) => key.to_string(),
            None => self.register(&address).await?,
        };

        Ok(Arc::new(HttpSession {
            client: self.client(&address)?,
            base_url: base_url(&address),
            address,
            credential,
        }))
    }
}

/// A session against one bridge's v1 REST API.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    base_url: String,
    address: String,
    credential: String,
}

impl HttpSession {
    fn url(&self, path: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, self.credential, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!("GET {} on {}", path, self.address);
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| transport_error(&self.address, e))?;
        let body = read_json(&self.address, response).await?;

        if let Some(err) = first_error(&body) {
            return Err(bridge_error(&self.address, err));
        }
        serde_json::from_value(body).map_err(|e| Error::bad_response(&self.address, e))
    }

    async fn put(&self, path: &str, payload: &Payload) -> Result<Vec<FieldResult>> {
        debug!("PUT {} on {}: {:?}", path, self.address, payload);
        let response = self
            .client
            .put(self.url(path))
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(&self.address, e))?;
        let body = read_json(&self.address, response).await?;
        serde_json::from_value(body).map_err(|e| Error::bad_response(&self.address, e))
    }
}

#[async_trait]
impl BridgeSession for HttpSession {
    fn address(&self) -> &str {
        &self.address
    }

    fn credential(&self) -> &str {
        &self.credential
    }

    async fn get_lights(&self) -> Result<HashMap<String, LightData>> {
        self.get("lights").await
    }

    async fn get_light(&self, id: &str) -> Result<LightData> {
        self.get(&format!("lights/{}", id)).await
    }

    async fn set_light(&self, id: &str, payload: &Payload) -> Result<Vec<FieldResult>> {
        self.put(&format!("lights/{}/state", id), payload).await
    }

    /// The bridge leaves group "0" out of the listing, so it is fetched on its own.
    async fn get_groups(&self) -> Result<HashMap<String, GroupData>> {
        let mut groups: HashMap<String, GroupData> = self.get("groups").await?;
        let all: GroupData = self.get("groups/0").await?;
        groups.insert("0".to_string(), all);
        Ok(groups)
    }

    async fn set_group(&self, id: &str, payload: &Payload) -> Result<Vec<FieldResult>> {
        self.put(&format!("groups/{}/action", id), payload).await
    }

    async fn get_scenes(&self) -> Result<HashMap<String, SceneData>> {
        self.get("scenes").await
    }
}

fn base_url(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", address)
    }
}

fn transport_error(address: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout(address)
    } else if e.is_decode() {
        Error::bad_response(address, e)
    } else {
        Error::connection(address, e)
    }
}

async fn read_json(address: &str, response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::bad_response(
            address,
            format!("HTTP {}", status.as_u16()),
        ));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| transport_error(address, e))
}

/// Reads answer errors as a one-element array of `{"error": {...}}`.
fn first_error(body: &Value) -> Option<ApiError> {
    body.as_array()?
        .iter()
        .find_map(|entry| entry.get("error"))
        .and_then(|err| serde_json::from_value(err.clone()).ok())
}

fn bridge_error(address: &str, err: ApiError) -> Error {
    Error::Bridge {
        address: address.to_string(),
        code: err.code,
        description: err.description,
    }
}

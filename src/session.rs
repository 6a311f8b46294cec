//! The bridge-facing seam: sessions and how they are established.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Error;
use crate::payload::Payload;
use crate::response::FieldResult;
use crate::status::{GroupData, LightData, SceneData};

type Result<T> = std::result::Result<T, Error>;

/// One authenticated connection to one bridge.
///
/// Implementations map transport failures onto [`Error::Timeout`],
/// [`Error::Connection`] and [`Error::BadResponse`], and an unpaired
/// application onto [`Error::RegistrationPending`].
#[async_trait]
pub trait BridgeSession: Send + Sync {
    /// Network address of the bridge.
    fn address(&self) -> &str;

    /// The application key this session authenticates with.
    fn credential(&self) -> &str;

    /// All lights, keyed by bridge-local light id.
    async fn get_lights(&self) -> Result<HashMap<String, LightData>>;

    async fn get_light(&self, id: &str) -> Result<LightData>;

    /// Apply a state change to one light; one result per field, in order.
    async fn set_light(&self, id: &str, payload: &Payload) -> Result<Vec<FieldResult>>;

    /// All groups, keyed by bridge-local group id. Includes group "0".
    async fn get_groups(&self) -> Result<HashMap<String, GroupData>>;

    async fn set_group(&self, id: &str, payload: &Payload) -> Result<Vec<FieldResult>>;

    async fn get_scenes(&self) -> Result<HashMap<String, SceneData>>;
}

/// Establishes [`BridgeSession`]s.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Find one bridge on the network and return its address.
    ///
    /// Fails with [`Error::NoBridgeFound`] when nothing answers.
    async fn discover(&self) -> Result<String>;

    /// Connect to the bridge at `address`, or to an auto-discovered bridge
    /// when no address is given.
    ///
    /// A missing `credential` starts registration, which fails with
    /// [`Error::RegistrationPending`] until the link button is pressed.
    async fn connect(
        &self,
        address: Option<&str>,
        credential: Option<&str>,
    ) -> Result<Arc<dyn BridgeSession>>;
}

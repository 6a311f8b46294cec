//! What a node needs while it handles a command.

use log::{debug, warn};
use serde_json::Value;

use crate::errors::Error;
use crate::history::{MessageHistory, MessageType};
use crate::host::Controller;
use crate::payload::Payload;
use crate::response::FieldResult;
use crate::session::BridgeSession;
use crate::status::{GroupData, LightData};

type Result<T> = std::result::Result<T, Error>;

/// Borrowed view of one bridge, handed to devices and groups.
///
/// Every bridge call made through it lands in the bridge's history.
pub struct CommandContext<'a> {
    pub(crate) session: &'a dyn BridgeSession,
    pub(crate) host: &'a dyn Controller,
    pub(crate) history: &'a mut MessageHistory,
    pub(crate) ignore_duplicate_on: bool,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        session: &'a dyn BridgeSession,
        host: &'a dyn Controller,
        history: &'a mut MessageHistory,
    ) -> Self {
        CommandContext {
            session,
            host,
            history,
            ignore_duplicate_on: false,
        }
    }

    pub fn ignore_duplicate_on(mut self, ignore: bool) -> Self {
        self.ignore_duplicate_on = ignore;
        self
    }

    pub fn host(&self) -> &dyn Controller {
        self.host
    }

    /// Send a light state change; true when the bridge accepted every field.
    pub async fn set_light(&mut self, id: &str, payload: &Payload) -> Result<bool> {
        let resource = format!("lights/{}/state", id);
        let result = self.session.set_light(id, payload).await;
        self.settle(&resource, payload, result)
    }

    /// Send a group action; true when the bridge accepted every field.
    pub async fn set_group(&mut self, id: &str, payload: &Payload) -> Result<bool> {
        let resource = format!("groups/{}/action", id);
        let result = self.session.set_group(id, payload).await;
        self.settle(&resource, payload, result)
    }

    pub async fn get_light(&mut self, id: &str) -> Result<LightData> {
        let resource = format!("lights/{}", id);
        let light = self
            .session
            .get_light(id)
            .await
            .inspect_err(|e| self.history.record_error(&e.to_string()))?;
        self.history.record(
            MessageType::Poll,
            &resource,
            serde_json::to_value(&light).unwrap_or(Value::Null),
        );
        Ok(light)
    }

    pub async fn get_group(&mut self, id: &str) -> Result<Option<GroupData>> {
        let mut groups = self
            .session
            .get_groups()
            .await
            .inspect_err(|e| self.history.record_error(&e.to_string()))?;
        let group = groups.remove(id);
        self.history.record(
            MessageType::Poll,
            &format!("groups/{}", id),
            serde_json::to_value(&group).unwrap_or(Value::Null),
        );
        Ok(group)
    }

    fn settle(
        &mut self,
        resource: &str,
        payload: &Payload,
        result: Result<Vec<FieldResult>>,
    ) -> Result<bool> {
        self.history.record(
            MessageType::Send,
            resource,
            serde_json::to_value(payload).map_err(Error::JsonDump)?,
        );

        let results = match result {
            Ok(results) => results,
            Err(e) => {
                self.history.record_error(&e.to_string());
                return Err(e);
            }
        };

        self.history.record(
            MessageType::Receive,
            resource,
            serde_json::to_value(&results).unwrap_or(Value::Null),
        );

        if FieldResult::all_success(&results) {
            debug!("{} {}: {:?}", self.session.address(), resource, payload);
            return Ok(true);
        }

        let failures = FieldResult::failures(&results);
        warn!(
            "Bridge {} rejected part of {}: {:?}",
            self.session.address(),
            resource,
            failures
        );
        if let Some(first) = failures.first() {
            self.history.record_error(&first.description);
        }
        Ok(false)
    }
}

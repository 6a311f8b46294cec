//! State-change payloads sent to the bridge.

use serde::{Deserialize, Serialize};

use crate::types::{Alert, Brightness, Effect, HueSaturation, Mired, TransitionTime, Xy};

/// A state change for one light (`PUT /lights/<id>/state`) or one group
/// (`PUT /groups/<id>/action`).
///
/// Only the attributes that are set end up on the wire.
///
/// # Creating Payloads
///
/// 1. **From a single attribute** using the [`From`] trait:
///    ```
///    use hue_node_rs::{Payload, Brightness};
///    let payload = Payload::from(&Brightness::clamped(200));
///    ```
///
/// 2. **Builder pattern** for combining multiple attributes:
///    ```
///    use hue_node_rs::{Payload, Brightness, HueSaturation};
///    let mut payload = Payload::new();
///    payload.brightness(&Brightness::clamped(150));
///    payload.hue_saturation(&HueSaturation::clamped(200, 100));
///    assert_eq!(
///        serde_json::to_value(&payload).unwrap(),
///        serde_json::json!({"bri": 150, "hue": 200, "sat": 100}),
///    );
///    ```
#[serde_with::skip_serializing_none]
#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Payload {
    pub(crate) on: Option<bool>,
    pub(crate) bri: Option<u8>,
    pub(crate) bri_inc: Option<i16>,
    pub(crate) hue: Option<u16>,
    pub(crate) sat: Option<u8>,
    pub(crate) xy: Option<[f64; 2]>,
    pub(crate) ct: Option<u16>,
    pub(crate) alert: Option<Alert>,
    pub(crate) effect: Option<Effect>,
    pub(crate) transitiontime: Option<u16>,
    /// Scene recall; only meaningful for group actions.
    pub(crate) scene: Option<String>,
}

impl Payload {
    /// Create a new empty payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_node_rs::Payload;
    ///
    /// let payload = Payload::new();
    /// assert!(payload.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether no attribute has been set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn on(&mut self, on: bool) {
        self.on = Some(on);
    }

    pub fn brightness(&mut self, brightness: &Brightness) {
        self.bri = Some(brightness.value);
    }

    /// Relative brightness change; the bridge clamps the result itself.
    pub fn brightness_step(&mut self, step: i16) {
        self.bri_inc = Some(step);
    }

    pub fn hue(&mut self, hue: u16) {
        self.hue = Some(hue);
    }

    pub fn saturation(&mut self, saturation: u8) {
        self.sat = Some(saturation);
    }

    pub fn hue_saturation(&mut self, hs: &HueSaturation) {
        self.hue(hs.hue());
        self.saturation(hs.saturation());
    }

    pub fn xy(&mut self, xy: &Xy) {
        self.xy = Some((*xy).into());
    }

    pub fn temperature(&mut self, mired: &Mired) {
        self.ct = Some(mired.value);
    }

    pub fn alert(&mut self, alert: Alert) {
        self.alert = Some(alert);
    }

    pub fn effect(&mut self, effect: Effect) {
        self.effect = Some(effect);
    }

    /// Set the transition, leaving it off the wire when it equals the
    /// bridge default.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_node_rs::{Payload, TransitionTime};
    ///
    /// let mut payload = Payload::new();
    /// payload.transition(&TransitionTime::DEFAULT);
    /// assert!(payload.is_empty());
    ///
    /// payload.transition(&TransitionTime::FADE);
    /// assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"transitiontime":40}"#);
    /// ```
    pub fn transition(&mut self, transition: &TransitionTime) {
        self.transitiontime = if transition.is_default() {
            None
        } else {
            Some(transition.deciseconds())
        };
    }

    pub fn scene(&mut self, scene_id: &str) {
        self.scene = Some(scene_id.to_string());
    }

    pub fn has_brightness(&self) -> bool {
        self.bri.is_some()
    }

    pub fn turns_on(&self) -> bool {
        self.on == Some(true)
    }
}

impl From<&Brightness> for Payload {
    fn from(brightness: &Brightness) -> Self {
        let mut p = Payload::new();
        p.brightness(brightness);
        p
    }
}

impl From<&Mired> for Payload {
    fn from(mired: &Mired) -> Self {
        let mut p = Payload::new();
        p.temperature(mired);
        p
    }
}

impl From<&Xy> for Payload {
    fn from(xy: &Xy) -> Self {
        let mut p = Payload::new();
        p.xy(xy);
        p
    }
}

impl From<&HueSaturation> for Payload {
    fn from(hs: &HueSaturation) -> Self {
        let mut p = Payload::new();
        p.hue_saturation(hs);
        p
    }
}

impl From<Alert> for Payload {
    fn from(alert: Alert) -> Self {
        let mut p = Payload::new();
        p.alert(alert);
        p
    }
}

impl From<Effect> for Payload {
    fn from(effect: Effect) -> Self {
        let mut p = Payload::new();
        p.effect(effect);
        p
    }
}

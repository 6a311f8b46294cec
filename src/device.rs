//! Bridge lights mirrored as host nodes.

use log::{debug, info};
use serde_json::{Value, json};

use crate::context::CommandContext;
use crate::errors::Error;
use crate::host::{Command, Controller, Driver, NodeInfo};
use crate::payload::Payload;
use crate::status::{LightData, Snapshot};
use crate::types::{
    Alert, Brightness, Color, Effect, HueSaturation, Kelvin, LightKind, Mired, TransitionTime, Xy,
    clamp_hue, clamp_saturation,
};

type Result<T> = std::result::Result<T, Error>;

/// Step used by `BRT` and `DIM`.
const BRIGHTNESS_STEP: i16 = 10;

/// Color temperature fields, present on white ambiance and extended color lights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureFields {
    pub mired: Mired,
}

/// Color fields, present on color and extended color lights.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorFields {
    pub hue_saturation: HueSaturation,
    pub xy: Xy,
    pub effect: Effect,
}

/// One light known to a bridge, tracked as a host node.
///
/// The node address comes from the light's hardware id and never changes;
/// the bridge-local light id is only a routing hint.
///
/// # Example
///
/// ```
/// use hue_node_rs::{Device, LightData, LightKind};
///
/// let data: LightData = serde_json::from_value(serde_json::json!({
///     "name": "Desk", "type": "Extended color light", "uniqueid": "AA:BB:CC:DD-1",
///     "state": {"on": true, "bri": 120, "hue": 0, "sat": 0, "xy": [0.3, 0.3],
///               "ct": 366, "reachable": true}
/// })).unwrap();
///
/// let device = Device::new(LightKind::ExtendedColor, "7", &data);
/// assert_eq!(device.address(), "aabbccdd1");
/// assert_eq!(device.node_info().node_def, "ECOLOR_LIGHT");
/// assert!(device.color().is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    kind: LightKind,
    address: String,
    light_id: String,
    name: String,
    on: bool,
    brightness: Brightness,
    reachable: bool,
    alert: Alert,
    transition: TransitionTime,
    /// Brightness to restore on the next turn-on after a transitioned off.
    saved_brightness: Option<Brightness>,
    temperature: Option<TemperatureFields>,
    color: Option<ColorFields>,
}

impl Device {
    pub fn new(kind: LightKind, light_id: &str, data: &LightData) -> Self {
        let mut device = Device {
            kind,
            address: data.address(),
            light_id: light_id.to_string(),
            name: data.name.clone(),
            on: false,
            brightness: Brightness::new(),
            reachable: false,
            alert: Alert::None,
            transition: TransitionTime::DEFAULT,
            saved_brightness: None,
            temperature: kind.has_temperature().then_some(TemperatureFields {
                mired: Mired::clamped(i64::from(Mired::MIN)),
            }),
            color: kind.has_color().then(ColorFields::default),
        };
        device.apply(data);
        device
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn light_id(&self) -> &str {
        &self.light_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn brightness(&self) -> Brightness {
        self.brightness
    }

    pub fn reachable(&self) -> bool {
        self.reachable
    }

    pub fn alert(&self) -> Alert {
        self.alert
    }

    pub fn transition(&self) -> TransitionTime {
        self.transition
    }

    pub fn saved_brightness(&self) -> Option<Brightness> {
        self.saved_brightness
    }

    pub fn temperature(&self) -> Option<&TemperatureFields> {
        self.temperature.as_ref()
    }

    pub fn color(&self) -> Option<&ColorFields> {
        self.color.as_ref()
    }

    /// Host status level; 0 exactly when the light is off.
    pub fn status(&self) -> f64 {
        if self.on { self.brightness.status() } else { 0.0 }
    }

    pub fn node_info(&self) -> NodeInfo {
        NodeInfo::new(&self.address, &self.name, self.kind.node_def())
    }

    /// Update from the bridge's last polled snapshot and report to the host.
    ///
    /// The light is looked up by hardware id, so a light the bridge renumbered
    /// keeps its node. Returns false when the snapshot no longer has it.
    pub fn refresh(&mut self, snapshot: &Snapshot, host: &dyn Controller) -> bool {
        let found = match snapshot.lights.get(&self.light_id) {
            Some(data) if data.address() == self.address => Some((self.light_id.clone(), data)),
            _ => snapshot
                .find_light(&self.address)
                .map(|(id, data)| (id.clone(), data)),
        };

        let Some((id, data)) = found else {
            debug!("{} ({}) missing from bridge snapshot", self.name, self.address);
            return false;
        };

        if id != self.light_id {
            info!(
                "{} ({}) moved from light id {} to {}",
                self.name, self.address, self.light_id, id
            );
            self.light_id = id;
        }
        self.apply(data);
        self.report(host);
        true
    }

    /// Re-read this light from the bridge and report it.
    pub async fn query(&mut self, ctx: &mut CommandContext<'_>) -> Result<bool> {
        let data = ctx.get_light(&self.light_id).await?;
        self.apply(&data);
        self.report(ctx.host());
        Ok(true)
    }

    /// Run one host command.
    ///
    /// `Ok(false)` means the bridge rejected at least one field; transport
    /// failures come back as `Err`.
    pub async fn handle(&mut self, ctx: &mut CommandContext<'_>, cmd: &Command) -> Result<bool> {
        match cmd.name.as_str() {
            "DON" => {
                let bri = cmd.value_f64()?.map(|v| Brightness::clamped(v.round() as i64));
                self.turn_on(ctx, bri, self.transition).await
            }
            "DFON" => self.turn_on(ctx, None, TransitionTime::INSTANT).await,
            "DOF" => self.turn_off(ctx, self.transition).await,
            "DFOF" => self.turn_off(ctx, TransitionTime::INSTANT).await,
            "BRT" => {
                let step = self.brightness.step(BRIGHTNESS_STEP);
                self.step_brightness(ctx, step, self.transition).await
            }
            "DIM" => {
                let step = self.brightness.step(-BRIGHTNESS_STEP);
                self.step_brightness(ctx, step, self.transition).await
            }
            "FDUP" => {
                let step = i16::from(Brightness::MAX) - i16::from(self.brightness.value());
                self.step_brightness(ctx, step, TransitionTime::FADE).await
            }
            "FDDOWN" => {
                let step = i16::from(Brightness::MIN) - i16::from(self.brightness.value());
                self.step_brightness(ctx, step, TransitionTime::FADE).await
            }
            "FDSTOP" => self.step_brightness(ctx, 0, self.transition).await,
            "SET_BRI" => {
                let bri = Brightness::clamped(cmd.require_value()?.round() as i64);
                self.set_brightness(ctx, bri).await
            }
            "SET_DUR" => {
                let millis = cmd.require_value()?.max(0.0).round() as u32;
                self.set_transition(ctx.host(), TransitionTime::from_millis(millis));
                Ok(true)
            }
            "SET_ALERT" => {
                let alert = indexed(cmd, Alert::from_index)?;
                self.set_alert(ctx, alert).await
            }
            "QUERY" => self.query(ctx).await,
            "SET_KEL" => {
                let kelvin = Kelvin::new(cmd.require_value()?.max(0.0).round() as u32);
                self.set_temperature(ctx, kelvin, None, cmd).await
            }
            "SET_CTBR" => {
                let kelvin = Kelvin::new(cmd.require_f64("K")?.max(0.0).round() as u32);
                let bri = Brightness::clamped(cmd.require_f64("BR")?.round() as i64);
                self.set_temperature(ctx, kelvin, Some(bri), cmd).await
            }
            "SET_HUE" => {
                let hue = clamp_hue(cmd.require_value()?.round() as i64);
                self.set_hue(ctx, hue, cmd).await
            }
            "SET_SAT" => {
                let sat = clamp_saturation(cmd.require_value()?.round() as i64);
                self.set_saturation(ctx, sat, cmd).await
            }
            "SET_HSB" => {
                let hs = HueSaturation::clamped(
                    cmd.require_f64("H")?.round() as i64,
                    cmd.require_f64("S")?.round() as i64,
                );
                let bri = Brightness::clamped(cmd.require_f64("BR")?.round() as i64);
                let transition = transition_override(cmd)?;
                self.set_hsb(ctx, hs, bri, transition, cmd).await
            }
            "SET_COLOR_XY" => {
                let xy = Xy::clamped(cmd.require_f64("X")?, cmd.require_f64("Y")?);
                let bri = Brightness::clamped(cmd.require_f64("BR")?.round() as i64);
                let transition = transition_override(cmd)?;
                self.set_xy(ctx, xy, Some(bri), transition, cmd).await
            }
            "SET_COLOR_RGB" => {
                let channel = |field: &str| -> Result<u8> {
                    Ok(cmd.require_f64(field)?.round().clamp(0.0, 255.0) as u8)
                };
                let color = Color::rgb(channel("R")?, channel("G")?, channel("B")?);
                let bri = Brightness::clamped(cmd.require_f64("BR")?.round() as i64);
                let transition = transition_override(cmd)?;
                self.set_xy(ctx, color.to_xy(), Some(bri), transition, cmd)
                    .await
            }
            "SET_COLOR" => {
                let xy = indexed(cmd, Xy::from_wheel)?;
                self.set_xy(ctx, xy, None, None, cmd).await
            }
            "SET_EFFECT" => {
                let effect = indexed(cmd, Effect::from_index)?;
                self.set_effect(ctx, effect, cmd).await
            }
            _ => Err(Error::unknown_command(&self.address, &cmd.name)),
        }
    }

    /// Turn on, optionally at a given brightness.
    pub async fn turn_on(
        &mut self,
        ctx: &mut CommandContext<'_>,
        brightness: Option<Brightness>,
        transition: TransitionTime,
    ) -> Result<bool> {
        if ctx.ignore_duplicate_on
            && brightness.is_none()
            && self.on
            && self.saved_brightness.is_none()
        {
            debug!("{} ({}) already on, ignoring", self.name, self.address);
            return Ok(true);
        }

        // Forces `on: true` into the payload.
        self.on = false;
        let mut payload = Payload::new();
        if let Some(bri) = brightness {
            self.brightness = bri;
            payload.brightness(&bri);
        }
        self.send(ctx, payload, transition, true).await
    }

    pub async fn turn_off(
        &mut self,
        ctx: &mut CommandContext<'_>,
        transition: TransitionTime,
    ) -> Result<bool> {
        self.on = false;
        let mut payload = Payload::new();
        payload.on(false);
        let accepted = self.send(ctx, payload, transition, false).await?;

        // A transitioned off leaves the bulb at an arbitrary brightness.
        if !transition.is_default() {
            self.saved_brightness = Some(self.brightness);
        }
        Ok(accepted)
    }

    /// Move brightness by a relative step the bridge applies itself.
    pub async fn step_brightness(
        &mut self,
        ctx: &mut CommandContext<'_>,
        step: i16,
        transition: TransitionTime,
    ) -> Result<bool> {
        self.brightness = Brightness::clamped(i64::from(self.brightness.value()) + i64::from(step));
        let mut payload = Payload::new();
        payload.brightness_step(step);
        self.send(ctx, payload, transition, true).await
    }

    pub async fn set_brightness(
        &mut self,
        ctx: &mut CommandContext<'_>,
        brightness: Brightness,
    ) -> Result<bool> {
        self.brightness = brightness;
        self.send(ctx, Payload::from(&brightness), self.transition, true)
            .await
    }

    /// Change the transition used by later commands. Never reaches the bridge.
    pub fn set_transition(&mut self, host: &dyn Controller, transition: TransitionTime) {
        self.transition = transition;
        host.set_driver(&self.address, Driver::Rr, f64::from(transition.millis()));
    }

    pub async fn set_alert(&mut self, ctx: &mut CommandContext<'_>, alert: Alert) -> Result<bool> {
        self.alert = alert;
        self.send(ctx, Payload::from(alert), self.transition, true)
            .await
    }

    pub async fn set_temperature(
        &mut self,
        ctx: &mut CommandContext<'_>,
        kelvin: Kelvin,
        brightness: Option<Brightness>,
        cmd: &Command,
    ) -> Result<bool> {
        let mired = kelvin.to_mired();
        self.temperature_mut(cmd)?.mired = mired;

        let mut payload = Payload::from(&mired);
        if let Some(bri) = brightness {
            self.brightness = bri;
            payload.brightness(&bri);
        }
        self.send(ctx, payload, self.transition, true).await
    }

    pub async fn set_hue(
        &mut self,
        ctx: &mut CommandContext<'_>,
        hue: u16,
        cmd: &Command,
    ) -> Result<bool> {
        let color = self.color_mut(cmd)?;
        color.hue_saturation = HueSaturation::clamped(
            i64::from(hue),
            i64::from(color.hue_saturation.saturation()),
        );
        let mut payload = Payload::new();
        payload.hue(hue);
        self.send(ctx, payload, self.transition, true).await
    }

    pub async fn set_saturation(
        &mut self,
        ctx: &mut CommandContext<'_>,
        saturation: u8,
        cmd: &Command,
    ) -> Result<bool> {
        let color = self.color_mut(cmd)?;
        color.hue_saturation = HueSaturation::clamped(
            i64::from(color.hue_saturation.hue()),
            i64::from(saturation),
        );
        let mut payload = Payload::new();
        payload.saturation(saturation);
        self.send(ctx, payload, self.transition, true).await
    }

    pub async fn set_hsb(
        &mut self,
        ctx: &mut CommandContext<'_>,
        hue_saturation: HueSaturation,
        brightness: Brightness,
        transition: Option<TransitionTime>,
        cmd: &Command,
    ) -> Result<bool> {
        self.color_mut(cmd)?.hue_saturation = hue_saturation;
        self.brightness = brightness;

        let mut payload = Payload::from(&hue_saturation);
        payload.brightness(&brightness);
        let transition = transition.unwrap_or(self.transition);
        self.send(ctx, payload, transition, true).await
    }

    pub async fn set_xy(
        &mut self,
        ctx: &mut CommandContext<'_>,
        xy: Xy,
        brightness: Option<Brightness>,
        transition: Option<TransitionTime>,
        cmd: &Command,
    ) -> Result<bool> {
        let xy = xy.rounded();
        self.color_mut(cmd)?.xy = xy;

        let mut payload = Payload::from(&xy);
        if let Some(bri) = brightness {
            self.brightness = bri;
            payload.brightness(&bri);
        }
        let transition = transition.unwrap_or(self.transition);
        self.send(ctx, payload, transition, true).await
    }

    pub async fn set_effect(
        &mut self,
        ctx: &mut CommandContext<'_>,
        effect: Effect,
        cmd: &Command,
    ) -> Result<bool> {
        self.color_mut(cmd)?.effect = effect;
        self.send(ctx, Payload::from(effect), self.transition, true)
            .await
    }

    pub fn diagnostics(&self) -> Value {
        json!({
            "address": self.address,
            "light_id": self.light_id,
            "name": self.name,
            "kind": self.kind.to_string(),
            "on": self.on,
            "brightness": self.brightness.value(),
            "reachable": self.reachable,
            "transition_ms": self.transition.millis(),
            "saved_brightness": self.saved_brightness.map(|b| b.value()),
            "ct": self.temperature.map(|t| t.mired.value()),
            "xy": self.color.map(|c| [c.xy.x(), c.xy.y()]),
        })
    }

    /// Finish a command: apply the turn-on rule, send, report.
    async fn send(
        &mut self,
        ctx: &mut CommandContext<'_>,
        mut payload: Payload,
        transition: TransitionTime,
        turns_on: bool,
    ) -> Result<bool> {
        payload.transition(&transition);
        if turns_on && !self.on {
            payload.on(true);
            self.on = true;
            if let Some(saved) = self.saved_brightness.take() {
                if !payload.has_brightness() {
                    self.brightness = saved;
                    payload.brightness(&saved);
                }
            }
        }

        let accepted = ctx.set_light(&self.light_id, &payload).await?;
        self.report(ctx.host());
        Ok(accepted)
    }

    fn apply(&mut self, data: &LightData) {
        let state = &data.state;
        self.name.clone_from(&data.name);
        self.on = state.on;
        if let Some(bri) = state.bri {
            self.brightness = bri;
        }
        self.reachable = state.reachable;
        self.alert = state.alert();

        if let (Some(temperature), Some(mired)) = (&mut self.temperature, state.mired()) {
            temperature.mired = mired;
        }

        if let Some(color) = &mut self.color {
            color.hue_saturation = HueSaturation::clamped(
                state.hue.map_or(i64::from(color.hue_saturation.hue()), i64::from),
                state
                    .sat
                    .map_or(i64::from(color.hue_saturation.saturation()), i64::from),
            );
            if let Some(xy) = state.xy {
                color.xy = xy.rounded();
            }
            color.effect = state.effect();
        }
    }

    fn report(&self, host: &dyn Controller) {
        let address = &self.address;
        host.set_driver(address, Driver::St, self.status());
        host.set_driver(address, Driver::Gv5, f64::from(self.brightness.value()));
        host.set_driver(address, Driver::Gv6, if self.reachable { 1.0 } else { 0.0 });
        host.set_driver(address, Driver::Rr, f64::from(self.transition.millis()));

        if let Some(temperature) = &self.temperature {
            host.set_driver(
                address,
                Driver::Clitemp,
                f64::from(temperature.mired.to_kelvin().kelvin()),
            );
        }

        if let Some(color) = &self.color {
            host.set_driver(address, Driver::Gv1, color.xy.x());
            host.set_driver(address, Driver::Gv2, color.xy.y());
            host.set_driver(address, Driver::Gv3, f64::from(color.hue_saturation.hue()));
            host.set_driver(address, Driver::Gv4, f64::from(color.hue_saturation.saturation()));
        }
    }

    fn temperature_mut(&mut self, cmd: &Command) -> Result<&mut TemperatureFields> {
        self.temperature
            .as_mut()
            .ok_or_else(|| Error::unknown_command(&self.address, &cmd.name))
    }

    fn color_mut(&mut self, cmd: &Command) -> Result<&mut ColorFields> {
        self.color
            .as_mut()
            .ok_or_else(|| Error::unknown_command(&self.address, &cmd.name))
    }
}

/// Resolve a 1-based list index sent as the command value.
fn indexed<T>(cmd: &Command, lookup: impl Fn(u32) -> Option<T>) -> Result<T> {
    let raw = cmd.require_value()?;
    let index = if raw >= 0.0 { raw.round() as u32 } else { 0 };
    lookup(index).ok_or_else(|| Error::invalid_parameter(&cmd.name, "value", &raw.to_string()))
}

/// Optional `D` field: a per-command transition in milliseconds.
fn transition_override(cmd: &Command) -> Result<Option<TransitionTime>> {
    Ok(cmd
        .param_f64("D")?
        .map(|ms| TransitionTime::from_millis(ms.max(0.0).round() as u32)))
}

//! Brightness as understood by the bridge.

use serde::{Deserialize, Serialize};

use crate::convert;

/// Bridge brightness level from 1 to 254.
///
/// Construction always clamps, so a `Brightness` is never out of range.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(from = "i64", into = "u8")]
pub struct Brightness {
    pub(crate) value: u8,
}

impl Default for Brightness {
    fn default() -> Self {
        Self::new()
    }
}

impl Brightness {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 254;

    /// Full brightness.
    pub fn new() -> Self {
        Brightness { value: Self::MAX }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Clamp any integer into the bridge range.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_node_rs::Brightness;
    ///
    /// assert_eq!(Brightness::clamped(0).value(), 1);
    /// assert_eq!(Brightness::clamped(-40).value(), 1);
    /// assert_eq!(Brightness::clamped(128).value(), 128);
    /// assert_eq!(Brightness::clamped(300).value(), 254);
    /// ```
    pub fn clamped(value: i64) -> Self {
        let value = value.clamp(i64::from(Self::MIN), i64::from(Self::MAX));
        Brightness { value: value as u8 }
    }

    /// Host status level for this brightness (percent scale).
    pub fn status(&self) -> f64 {
        convert::brightness_to_status(self.value)
    }

    /// Signed step that moves this brightness by `delta` without leaving the
    /// bridge range.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_node_rs::Brightness;
    ///
    /// assert_eq!(Brightness::clamped(250).step(10), 4);
    /// assert_eq!(Brightness::clamped(5).step(-10), -4);
    /// ```
    pub fn step(&self, delta: i16) -> i16 {
        let target = Self::clamped(i64::from(self.value) + i64::from(delta));
        i16::from(target.value) - i16::from(self.value)
    }
}

impl From<i64> for Brightness {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl From<Brightness> for u8 {
    fn from(brightness: Brightness) -> Self {
        brightness.value
    }
}

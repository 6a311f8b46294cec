//! Color temperature control.

use serde::{Deserialize, Serialize};

use crate::convert;

/// Color temperature in Kelvin, as the host expresses it.
///
/// Lower values produce warmer (more yellow/orange) light, while higher
/// values produce cooler (more blue) light. Typical values:
/// - 2700K: Warm white (incandescent-like)
/// - 4000K: Neutral white
/// - 6500K: Daylight
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Kelvin {
    pub(crate) kelvin: u32,
}

impl Kelvin {
    pub fn new(kelvin: u32) -> Self {
        Kelvin { kelvin }
    }

    /// Get the kelvin value.
    pub fn kelvin(&self) -> u32 {
        self.kelvin
    }

    /// Convert to the bridge's mired scale, clamped to what bulbs accept.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_node_rs::Kelvin;
    ///
    /// assert_eq!(Kelvin::new(2000).to_mired().value(), 500);
    /// assert_eq!(Kelvin::new(1000).to_mired().value(), 500);
    /// assert_eq!(Kelvin::new(9000).to_mired().value(), 153);
    /// assert_eq!(Kelvin::new(0).to_mired().value(), 153);
    /// ```
    pub fn to_mired(&self) -> Mired {
        let mired = convert::kelvin_to_mired(self.kelvin);
        if mired == 0 {
            return Mired { value: Mired::MIN };
        }
        Mired::clamped(i64::from(mired))
    }
}

/// Reciprocal color temperature (10^6 / Kelvin) from 153 to 500.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Mired {
    pub(crate) value: u16,
}

impl Mired {
    pub const MIN: u16 = 153;
    pub const MAX: u16 = 500;

    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn clamped(value: i64) -> Self {
        let value = value.clamp(i64::from(Self::MIN), i64::from(Self::MAX));
        Mired { value: value as u16 }
    }

    pub fn to_kelvin(&self) -> Kelvin {
        Kelvin::new(convert::mired_to_kelvin(u32::from(self.value)))
    }
}

//! Hue and Saturation as the bridge expresses them.

use serde::{Deserialize, Serialize};

/// Hue and Saturation color representation.
///
/// The bridge uses its own scales rather than degrees and percent:
/// - Hue: position on the color wheel, 0-65535 (both ends are red)
/// - Saturation: 0 (white) to 254 (fully colored)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueSaturation {
    hue: u16,
    saturation: u8,
}

impl HueSaturation {
    pub const MAX_SATURATION: u8 = 254;

    /// Create a new HueSaturation, clamping both values into the bridge range.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_node_rs::HueSaturation;
    ///
    /// let hs = HueSaturation::clamped(200, 100);
    /// assert_eq!((hs.hue(), hs.saturation()), (200, 100));
    ///
    /// let hs = HueSaturation::clamped(70_000, 300);
    /// assert_eq!((hs.hue(), hs.saturation()), (65535, 254));
    ///
    /// let hs = HueSaturation::clamped(-5, -5);
    /// assert_eq!((hs.hue(), hs.saturation()), (0, 0));
    /// ```
    pub fn clamped(hue: i64, saturation: i64) -> Self {
        HueSaturation {
            hue: clamp_hue(hue),
            saturation: clamp_saturation(saturation),
        }
    }

    /// Get the hue value.
    pub fn hue(&self) -> u16 {
        self.hue
    }

    /// Get the saturation value.
    pub fn saturation(&self) -> u8 {
        self.saturation
    }
}

pub(crate) fn clamp_hue(hue: i64) -> u16 {
    hue.clamp(0, i64::from(u16::MAX)) as u16
}

pub(crate) fn clamp_saturation(saturation: i64) -> u8 {
    saturation.clamp(0, i64::from(HueSaturation::MAX_SATURATION)) as u8
}

//! Alert and effect modes.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Temporary attention-getting flash.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString,
    Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Alert {
    #[default]
    None,
    /// One breathe cycle
    Select,
    /// Breathe cycles for 15 seconds
    LSelect,
}

impl Alert {
    /// Select by the host's 1-based index.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_node_rs::Alert;
    ///
    /// assert_eq!(Alert::from_index(1), Some(Alert::None));
    /// assert_eq!(Alert::from_index(3), Some(Alert::LSelect));
    /// assert_eq!(Alert::from_index(4), None);
    /// ```
    pub fn from_index(index: u32) -> Option<Self> {
        let slot = usize::try_from(index).ok()?.checked_sub(1)?;
        Alert::iter().nth(slot)
    }
}

/// Dynamic effect on color lights.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, EnumString,
    Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Effect {
    #[default]
    None,
    /// Cycle through all hues at the current brightness and saturation
    ColorLoop,
}

impl Effect {
    /// Select by the host's 1-based index.
    pub fn from_index(index: u32) -> Option<Self> {
        let slot = usize::try_from(index).ok()?.checked_sub(1)?;
        Effect::iter().nth(slot)
    }
}

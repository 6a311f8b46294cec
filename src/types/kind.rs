//! Light capability sets.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// The fixed capability set of a light, taken from the bridge's `type` string.
///
/// `ExtendedColor` has both the temperature and color axes; `WhiteAmbiance`
/// and `Color` each add one axis to `Dimmable`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum LightKind {
    #[strum(serialize = "Dimmable light")]
    Dimmable,
    #[strum(serialize = "Color temperature light")]
    WhiteAmbiance,
    #[strum(serialize = "Color light")]
    Color,
    #[strum(serialize = "Extended color light")]
    ExtendedColor,
}

impl LightKind {
    /// Whether lights of this kind accept `ct`.
    pub fn has_temperature(self) -> bool {
        matches!(self, LightKind::WhiteAmbiance | LightKind::ExtendedColor)
    }

    /// Whether lights of this kind accept `hue`, `sat`, `xy` and `effect`.
    pub fn has_color(self) -> bool {
        matches!(self, LightKind::Color | LightKind::ExtendedColor)
    }

    /// Host node definition id.
    pub fn node_def(self) -> &'static str {
        match self {
            LightKind::Dimmable => "DIMM_LIGHT",
            LightKind::WhiteAmbiance => "WHITE_LIGHT",
            LightKind::Color => "COLOR_LIGHT",
            LightKind::ExtendedColor => "ECOLOR_LIGHT",
        }
    }
}

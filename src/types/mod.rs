//! Value types for light control parameters.

mod alert;
mod brightness;
mod color;
mod hue_saturation;
mod kelvin;
mod kind;
mod transition;

pub use alert::{Alert, Effect};
pub use brightness::Brightness;
pub use color::{Color, Xy};
pub(crate) use hue_saturation::{clamp_hue, clamp_saturation};
pub use hue_saturation::HueSaturation;
pub use kelvin::{Kelvin, Mired};
pub use kind::LightKind;
pub use transition::TransitionTime;

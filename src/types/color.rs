//! RGB and CIE xy color representations.

use serde::{Deserialize, Serialize};

use crate::convert;

/// An RGB color with red, green, and blue components (0-255 each).
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Color {
    pub(crate) red: u8,
    pub(crate) green: u8,
    pub(crate) blue: u8,
}

impl Color {
    /// Create a color with the given RGB values.
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn red(&self) -> u8 {
        self.red
    }

    pub fn green(&self) -> u8 {
        self.green
    }

    pub fn blue(&self) -> u8 {
        self.blue
    }

    /// Chromaticity of this color; brightness is carried separately.
    pub fn to_xy(&self) -> Xy {
        let (x, y) = convert::rgb_to_xy(self.red, self.green, self.blue);
        Xy { x, y }
    }
}

/// CIE 1931 chromaticity coordinates, each within 0.0-1.0.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Xy {
    pub(crate) x: f64,
    pub(crate) y: f64,
}

impl Xy {
    /// Create a chromaticity, clamping both coordinates to 0.0-1.0.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_node_rs::Xy;
    ///
    /// let xy = Xy::clamped(1.4, -0.2);
    /// assert_eq!((xy.x(), xy.y()), (1.0, 0.0));
    /// ```
    pub fn clamped(x: f64, y: f64) -> Self {
        let fix = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Xy { x: fix(x), y: fix(y) }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// The same point rounded to four decimal places, as reported to the host.
    pub fn rounded(&self) -> Self {
        let round = |v: f64| (v * 10_000.0).round() / 10_000.0;
        Xy {
            x: round(self.x),
            y: round(self.y),
        }
    }

    /// Color wheel entry by 1-based index.
    pub fn from_wheel(index: u32) -> Option<Self> {
        convert::color_wheel_to_xy(index).map(|(x, y)| Xy { x, y })
    }

    /// Approximate full-brightness RGB for this chromaticity.
    pub fn to_color(&self) -> Color {
        let (r, g, b) = convert::xy_to_rgb(self.x, self.y);
        Color::rgb(r, g, b)
    }
}

impl From<[f64; 2]> for Xy {
    fn from([x, y]: [f64; 2]) -> Self {
        Xy::clamped(x, y)
    }
}

impl From<Xy> for [f64; 2] {
    fn from(xy: Xy) -> Self {
        [xy.x, xy.y]
    }
}

impl From<&Color> for Xy {
    fn from(color: &Color) -> Self {
        color.to_xy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_red_chromaticity() {
        let xy = Color::rgb(255, 0, 0).to_xy();
        assert!(xy.x() > xy.y());

        let back = xy.to_color();
        assert_eq!(back.red(), 255);
        assert!(back.green() < 40 && back.blue() < 40);
    }

    #[test]
    fn test_deserialize_clamps() {
        let xy: Xy = serde_json::from_str("[1.5, 0.3]").unwrap();
        assert_eq!(xy.x(), 1.0);
        assert_eq!(serde_json::to_string(&xy).unwrap(), "[1.0,0.3]");
    }
}

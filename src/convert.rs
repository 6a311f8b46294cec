//! Numeric conversions between host units and bridge units.
//!
//! Everything here is pure and deterministic.

/// Named colors selectable by 1-based index from the host's color wheel.
pub const PALETTE: [(&str, [u8; 3]); 24] = [
    ("aqua", [127, 255, 212]),
    ("azure", [0, 127, 255]),
    ("beige", [245, 245, 220]),
    ("blue", [0, 0, 255]),
    ("chartreuse", [127, 255, 0]),
    ("coral", [255, 127, 80]),
    ("crimson", [220, 20, 60]),
    ("forest green", [34, 139, 34]),
    ("fuchsia", [255, 119, 255]),
    ("golden", [255, 215, 0]),
    ("gray", [128, 128, 128]),
    ("green", [0, 255, 0]),
    ("hot pink", [252, 15, 192]),
    ("indigo", [75, 0, 130]),
    ("lavender", [181, 126, 220]),
    ("lime", [191, 255, 0]),
    ("maroon", [128, 0, 0]),
    ("navy blue", [0, 0, 128]),
    ("olive", [128, 128, 0]),
    ("red", [255, 0, 0]),
    ("royal blue", [8, 76, 158]),
    ("tan", [210, 180, 140]),
    ("teal", [0, 128, 128]),
    ("white", [255, 255, 255]),
];

/// Convert a bridge `uniqueid` (e.g. `00:17:88:01:00:bd:c7:b9-0b`) into a
/// host node address.
///
/// # Examples
///
/// ```
/// use hue_node_rs::convert::id_to_address;
///
/// assert_eq!(id_to_address("AA:BB:CC:DD-1"), "aabbccdd1");
/// assert_eq!(id_to_address("00:17:88:01:00:bd:c7:b9-0b"), "880100bdc7b90b");
/// ```
pub fn id_to_address(unique_id: &str) -> String {
    let cleaned: Vec<char> = unique_id
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let start = cleaned.len().saturating_sub(14);
    cleaned[start..].iter().collect()
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn gamma_expand(channel: u8) -> f64 {
    let c = f64::from(channel) / 255.0;
    if c > 0.04045 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

fn gamma_compress(linear: f64) -> f64 {
    let c = linear.max(0.0);
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Convert an sRGB color into CIE 1931 xy chromaticity (D65, 2° observer).
///
/// Black has no chromaticity and maps to `(0.0, 0.0)`.
///
/// # Examples
///
/// ```
/// use hue_node_rs::convert::rgb_to_xy;
///
/// let (x, y) = rgb_to_xy(255, 0, 0);
/// assert!(x > y);
/// assert_eq!(rgb_to_xy(0, 0, 0), (0.0, 0.0));
/// ```
pub fn rgb_to_xy(red: u8, green: u8, blue: u8) -> (f64, f64) {
    let r = gamma_expand(red);
    let g = gamma_expand(green);
    let b = gamma_expand(blue);

    let x = r * 0.4124 + g * 0.3576 + b * 0.1805;
    let y = r * 0.2126 + g * 0.7152 + b * 0.0722;
    let z = r * 0.0193 + g * 0.1192 + b * 0.9505;

    let sum = x + y + z;
    if sum <= f64::EPSILON {
        return (0.0, 0.0);
    }
    (round4(x / sum), round4(y / sum))
}

/// Approximate inverse of [`rgb_to_xy`] at full brightness.
///
/// The result is normalized so the strongest channel is 255.
pub fn xy_to_rgb(x: f64, y: f64) -> (u8, u8, u8) {
    if y <= f64::EPSILON {
        return (0, 0, 0);
    }

    let big_y = 1.0;
    let big_x = x / y * big_y;
    let big_z = (1.0 - x - y) / y * big_y;

    let r = gamma_compress(3.2406 * big_x - 1.5372 * big_y - 0.4986 * big_z);
    let g = gamma_compress(-0.9689 * big_x + 1.8758 * big_y + 0.0415 * big_z);
    let b = gamma_compress(0.0557 * big_x - 0.2040 * big_y + 1.0570 * big_z);

    let max = r.max(g).max(b);
    if max <= f64::EPSILON {
        return (0, 0, 0);
    }
    let scale = |c: f64| (c / max * 255.0).round().clamp(0.0, 255.0) as u8;
    (scale(r), scale(g), scale(b))
}

/// Look up a color wheel entry by its 1-based index.
///
/// Returns `None` for `0` or an index past the end of [`PALETTE`].
///
/// # Examples
///
/// ```
/// use hue_node_rs::convert::{color_wheel_to_xy, rgb_to_xy};
///
/// assert_eq!(color_wheel_to_xy(20), Some(rgb_to_xy(255, 0, 0)));
/// assert!(color_wheel_to_xy(0).is_none());
/// assert!(color_wheel_to_xy(25).is_none());
/// ```
pub fn color_wheel_to_xy(index: u32) -> Option<(f64, f64)> {
    let slot = usize::try_from(index).ok()?.checked_sub(1)?;
    PALETTE
        .get(slot)
        .map(|(_, [r, g, b])| rgb_to_xy(*r, *g, *b))
}

/// Rescale a bridge brightness (1-254) to the host's percent status scale.
pub fn brightness_to_status(bri: u8) -> f64 {
    round4(f64::from(bri) / 254.0 * 100.0)
}

/// Inverse of [`brightness_to_status`], clamped to the bridge range.
pub fn status_to_brightness(status: f64) -> u8 {
    (status / 100.0 * 254.0).round().clamp(1.0, 254.0) as u8
}

/// Convert a color temperature in Kelvin to mired. Zero maps to zero.
///
/// # Examples
///
/// ```
/// use hue_node_rs::convert::kelvin_to_mired;
///
/// assert_eq!(kelvin_to_mired(2000), 500);
/// assert_eq!(kelvin_to_mired(6500), 154);
/// assert_eq!(kelvin_to_mired(0), 0);
/// ```
pub fn kelvin_to_mired(kelvin: u32) -> u32 {
    reciprocal_mega(kelvin)
}

/// Convert mired to Kelvin. Zero maps to zero.
pub fn mired_to_kelvin(mired: u32) -> u32 {
    reciprocal_mega(mired)
}

fn reciprocal_mega(value: u32) -> u32 {
    if value == 0 {
        return 0;
    }
    (1_000_000.0 / f64::from(value)).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: (u8, u8, u8), expected: (u8, u8, u8)) {
        let diff = |a: u8, b: u8| (i16::from(a) - i16::from(b)).abs();
        assert!(
            diff(actual.0, expected.0) <= 3
                && diff(actual.1, expected.1) <= 3
                && diff(actual.2, expected.2) <= 3,
            "{actual:?} is not close to {expected:?}"
        );
    }

    #[test]
    fn test_primaries_round_trip() {
        for rgb in [(255, 0, 0), (0, 255, 0), (0, 0, 255), (255, 255, 255)] {
            let (x, y) = rgb_to_xy(rgb.0, rgb.1, rgb.2);
            assert_close(xy_to_rgb(x, y), rgb);
        }
    }

    #[test]
    fn test_red_lands_in_red_region() {
        let (x, y) = rgb_to_xy(255, 0, 0);
        assert!(x > y);
        assert!((0.6..0.72).contains(&x));
        assert!((0.28..0.36).contains(&y));
    }

    #[test]
    fn test_white_is_d65() {
        assert_eq!(rgb_to_xy(255, 255, 255), (0.3127, 0.329));
    }

    #[test]
    fn test_black_has_no_chromaticity() {
        assert_eq!(rgb_to_xy(0, 0, 0), (0.0, 0.0));
        assert_eq!(xy_to_rgb(0.3, 0.0), (0, 0, 0));
    }

    #[test]
    fn test_brightness_to_status_is_monotonic() {
        let mut previous = brightness_to_status(1);
        for bri in 2..=254u8 {
            let current = brightness_to_status(bri);
            assert!(current >= previous);
            previous = current;
        }
        assert_eq!(brightness_to_status(254), 100.0);
    }

    #[test]
    fn test_status_round_trip() {
        for bri in 1..=254u8 {
            assert_eq!(status_to_brightness(brightness_to_status(bri)), bri);
        }
    }

    #[test]
    fn test_mired_round_trip() {
        for mired in 153..=500u32 {
            assert_eq!(kelvin_to_mired(mired_to_kelvin(mired)), mired);
        }
    }

    #[test]
    fn test_palette_is_addressable() {
        for index in 1..=PALETTE.len() as u32 {
            assert!(color_wheel_to_xy(index).is_some());
        }
    }

    #[test]
    fn test_short_unique_id() {
        assert_eq!(id_to_address("ab-c"), "abc");
    }
}

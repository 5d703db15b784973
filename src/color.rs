//! Color types, color string parsing and perceptual distance
//!
//! Supports the following color string formats:
//! - Hex: `#RGB`, `#RRGGBB`
//! - Catalog index: `0x0F`, `$0F` (hexadecimal) or `15` (decimal)
//!
//! Distances are CIEDE2000 in CIELAB (D65), computed from sRGB.

use image::Rgba;
use thiserror::Error;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Invalid length (must be 3 or 6 hex chars after #)
    #[error("invalid color length {0}, expected 3 or 6")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
    /// Catalog index outside 0..=63
    #[error("catalog index {0} out of range, expected 0-63")]
    IndexOutOfRange(u32),
    /// Not a hex color and not a catalog index
    #[error("unrecognized color '{0}', expected '#RRGGBB' or a catalog index like '0x0F'")]
    Unrecognized(String),
}

/// An opaque 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value.
    pub const fn from_u32(rgb: u32) -> Self {
        Self { r: (rgb >> 16) as u8, g: (rgb >> 8) as u8, b: rgb as u8 }
    }

    /// Drops the alpha channel.
    pub fn from_rgba(rgba: Rgba<u8>) -> Self {
        Self { r: rgba[0], g: rgba[1], b: rgba[2] }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A color as written by the user: either an RGB value that still has to be
/// matched against the catalog, or a catalog index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpec {
    Rgb(Rgb),
    Index(u8),
}

/// Parse a color string into a [`ColorSpec`].
///
/// # Examples
///
/// ```
/// use nestile::color::{parse_color_spec, ColorSpec, Rgb};
///
/// assert_eq!(parse_color_spec("#F00").unwrap(), ColorSpec::Rgb(Rgb::new(255, 0, 0)));
/// assert_eq!(parse_color_spec("0x0F").unwrap(), ColorSpec::Index(0x0F));
/// assert_eq!(parse_color_spec("$30").unwrap(), ColorSpec::Index(0x30));
/// assert_eq!(parse_color_spec("13").unwrap(), ColorSpec::Index(13));
/// ```
///
/// # Errors
///
/// Returns `ColorError` if the input is invalid or unparseable.
pub fn parse_color_spec(s: &str) -> Result<ColorSpec, ColorError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ColorError::Empty);
    }

    if s.starts_with('#') {
        return parse_hex_color(s).map(ColorSpec::Rgb);
    }

    let index = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else if let Some(hex) = s.strip_prefix('$') {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse::<u32>()
    }
    .map_err(|_| ColorError::Unrecognized(s.to_string()))?;

    if index > 63 {
        return Err(ColorError::IndexOutOfRange(index));
    }
    Ok(ColorSpec::Index(index as u8))
}

/// Parse a hex color string (#RGB, #RRGGBB)
pub fn parse_hex_color(s: &str) -> Result<Rgb, ColorError> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    let len = hex.len();

    // Validate all characters are hex
    for c in hex.chars() {
        if !c.is_ascii_hexdigit() {
            return Err(ColorError::InvalidHex(c));
        }
    }

    let digits: Vec<u8> = hex.chars().map(parse_hex_digit).collect::<Result<_, _>>()?;
    match len {
        // #RGB -> #RRGGBB (doubled digits)
        3 => Ok(Rgb::new(digits[0] * 17, digits[1] * 17, digits[2] * 17)),
        6 => Ok(Rgb::new(
            digits[0] * 16 + digits[1],
            digits[2] * 16 + digits[3],
            digits[4] * 16 + digits[5],
        )),
        _ => Err(ColorError::InvalidLength(len)),
    }
}

/// Parse a single hex digit (0-9, A-F, a-f) to u8 (0-15)
fn parse_hex_digit(c: char) -> Result<u8, ColorError> {
    match c {
        '0'..='9' => Ok(c as u8 - b'0'),
        'a'..='f' => Ok(c as u8 - b'a' + 10),
        'A'..='F' => Ok(c as u8 - b'A' + 10),
        _ => Err(ColorError::InvalidHex(c)),
    }
}

/// LAB color representation for perceptual distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabColor {
    pub l: f64, // Lightness: 0-100
    pub a: f64, // Green-Red axis
    pub b: f64, // Blue-Yellow axis
}

impl LabColor {
    /// Convert RGB color to LAB color space.
    /// Uses D65 illuminant standard.
    pub fn from_rgb(rgb: Rgb) -> Self {
        // RGB to linear RGB (sRGB gamma correction)
        let r_lin = srgb_to_linear(rgb.r as f64 / 255.0);
        let g_lin = srgb_to_linear(rgb.g as f64 / 255.0);
        let b_lin = srgb_to_linear(rgb.b as f64 / 255.0);

        // Linear RGB to XYZ (sRGB to XYZ matrix, D65 illuminant)
        let x = r_lin * 0.4124564 + g_lin * 0.3575761 + b_lin * 0.1804375;
        let y = r_lin * 0.2126729 + g_lin * 0.7151522 + b_lin * 0.0721750;
        let z = r_lin * 0.0193339 + g_lin * 0.1191920 + b_lin * 0.9503041;

        // D65 reference white point
        let fx = lab_f(x / 0.95047);
        let fy = lab_f(y / 1.00000);
        let fz = lab_f(z / 1.08883);

        Self { l: 116.0 * fy - 16.0, a: 500.0 * (fx - fy), b: 200.0 * (fy - fz) }
    }

    /// CIEDE2000 color difference (kL = kC = kH = 1).
    pub fn delta_e2000(&self, other: &LabColor) -> f64 {
        const POW25_7: f64 = 6_103_515_625.0; // 25^7

        let c1 = self.a.hypot(self.b);
        let c2 = other.a.hypot(other.b);
        let c_bar7 = ((c1 + c2) / 2.0).powi(7);
        let g = 0.5 * (1.0 - (c_bar7 / (c_bar7 + POW25_7)).sqrt());

        let a1p = (1.0 + g) * self.a;
        let a2p = (1.0 + g) * other.a;
        let c1p = a1p.hypot(self.b);
        let c2p = a2p.hypot(other.b);
        let h1p = hue_degrees(self.b, a1p);
        let h2p = hue_degrees(other.b, a2p);

        let delta_l = other.l - self.l;
        let delta_c = c2p - c1p;

        let chroma_product = c1p * c2p;
        let delta_h_angle = if chroma_product == 0.0 {
            0.0
        } else {
            let diff = h2p - h1p;
            if diff.abs() <= 180.0 {
                diff
            } else if diff > 180.0 {
                diff - 360.0
            } else {
                diff + 360.0
            }
        };
        let delta_h = 2.0 * chroma_product.sqrt() * (delta_h_angle.to_radians() / 2.0).sin();

        let l_bar = (self.l + other.l) / 2.0;
        let c_bar_p = (c1p + c2p) / 2.0;
        let h_bar = if chroma_product == 0.0 {
            h1p + h2p
        } else if (h1p - h2p).abs() <= 180.0 {
            (h1p + h2p) / 2.0
        } else if h1p + h2p < 360.0 {
            (h1p + h2p + 360.0) / 2.0
        } else {
            (h1p + h2p - 360.0) / 2.0
        };

        let t = 1.0 - 0.17 * (h_bar - 30.0).to_radians().cos()
            + 0.24 * (2.0 * h_bar).to_radians().cos()
            + 0.32 * (3.0 * h_bar + 6.0).to_radians().cos()
            - 0.20 * (4.0 * h_bar - 63.0).to_radians().cos();

        let delta_theta = 30.0 * (-((h_bar - 275.0) / 25.0).powi(2)).exp();
        let c_bar_p7 = c_bar_p.powi(7);
        let r_c = 2.0 * (c_bar_p7 / (c_bar_p7 + POW25_7)).sqrt();
        let l_offset = (l_bar - 50.0).powi(2);
        let s_l = 1.0 + 0.015 * l_offset / (20.0 + l_offset).sqrt();
        let s_c = 1.0 + 0.045 * c_bar_p;
        let s_h = 1.0 + 0.015 * c_bar_p * t;
        let r_t = -(2.0 * delta_theta).to_radians().sin() * r_c;

        let dl = delta_l / s_l;
        let dc = delta_c / s_c;
        let dh = delta_h / s_h;
        (dl * dl + dc * dc + dh * dh + r_t * dc * dh).sqrt()
    }
}

/// Hue angle in degrees, 0..360; zero for achromatic input.
fn hue_degrees(b: f64, a_prime: f64) -> f64 {
    if b == 0.0 && a_prime == 0.0 {
        return 0.0;
    }
    let h = b.atan2(a_prime).to_degrees();
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

/// sRGB gamma expansion (inverse companding).
fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// LAB f function for XYZ to LAB conversion.
fn lab_f(t: f64) -> f64 {
    let delta: f64 = 6.0 / 29.0;
    if t > delta.powi(3) {
        t.cbrt()
    } else {
        t / (3.0 * delta * delta) + 4.0 / 29.0
    }
}

/// CIEDE2000 distance between two RGB colors.
pub fn color_distance(a: Rgb, b: Rgb) -> f64 {
    if a == b {
        return 0.0;
    }
    LabColor::from_rgb(a).delta_e2000(&LabColor::from_rgb(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lab(l: f64, a: f64, b: f64) -> LabColor {
        LabColor { l, a, b }
    }

    #[test]
    fn test_parse_hex_short_and_long() {
        assert_eq!(parse_hex_color("#F00"), Ok(Rgb::new(255, 0, 0)));
        assert_eq!(parse_hex_color("#1a2B3c"), Ok(Rgb::new(0x1A, 0x2B, 0x3C)));
    }

    #[test]
    fn test_parse_hex_errors() {
        assert_eq!(parse_hex_color("#12345"), Err(ColorError::InvalidLength(5)));
        assert_eq!(parse_hex_color("#GG0000"), Err(ColorError::InvalidHex('G')));
    }

    #[test]
    fn test_parse_color_spec_indices() {
        assert_eq!(parse_color_spec("0x3F"), Ok(ColorSpec::Index(0x3F)));
        assert_eq!(parse_color_spec(" $0d "), Ok(ColorSpec::Index(0x0D)));
        assert_eq!(parse_color_spec("0x40"), Err(ColorError::IndexOutOfRange(0x40)));
        assert_eq!(parse_color_spec(""), Err(ColorError::Empty));
        assert!(matches!(parse_color_spec("red"), Err(ColorError::Unrecognized(_))));
    }

    #[test]
    fn test_lab_white_and_black() {
        let white = LabColor::from_rgb(Rgb::new(255, 255, 255));
        assert!((white.l - 100.0).abs() < 0.01);
        assert!(white.a.abs() < 0.01 && white.b.abs() < 0.01);

        let black = LabColor::from_rgb(Rgb::new(0, 0, 0));
        assert!(black.l.abs() < 1e-9);
    }

    // Reference pairs from Sharma, Wu & Dalal, "The CIEDE2000 Color-Difference Formula"
    #[test]
    fn test_ciede2000_reference_pairs() {
        let cases = [
            (lab(50.0, 2.6772, -79.7751), lab(50.0, 0.0, -82.7485), 2.0425),
            (lab(50.0, 3.1571, -77.2803), lab(50.0, 0.0, -82.7485), 2.8615),
            (lab(50.0, 2.5, 0.0), lab(50.0, 0.0, -2.5), 4.3065),
            (lab(50.0, 2.5, 0.0), lab(73.0, 25.0, -18.0), 27.1492),
            (lab(50.0, -1.0, 2.0), lab(50.0, 0.0, 0.0), 2.3669),
            (lab(2.0776, 0.0795, -1.1350), lab(0.9033, -0.0636, -0.5514), 0.9082),
        ];
        for (a, b, expected) in cases {
            let d = a.delta_e2000(&b);
            assert!((d - expected).abs() < 1e-4, "expected {expected}, got {d}");
            let reversed = b.delta_e2000(&a);
            assert!((reversed - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_color_distance_identity() {
        let c = Rgb::new(12, 34, 56);
        assert_eq!(color_distance(c, c), 0.0);
        assert!(color_distance(c, Rgb::new(200, 34, 56)) > 10.0);
    }
}

//! CSS color strings ↔ [`Color`], backed by `palette`.
//!
//! This is the only place that knows about color spaces; the rest of the
//! crate passes CSS strings around (draw queues are keyed by them) and
//! resolves them to [`Color`] when flushing.

use std::str::FromStr;

use palette::rgb::Rgba;
use palette::{FromColor, Hsl, ShiftHue, Srgb};
use thiserror::Error;

use flame_chart_protocol::Color;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColorError {
    #[error("invalid hex color `{0}`")]
    Hex(String),
    #[error("invalid color function `{0}`")]
    Function(String),
    #[error("unknown color `{0}`")]
    Unknown(String),
}

/// Parse a CSS color: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()`,
/// `rgba()`, `hsl()`, `hsla()` or a CSS named color.
pub fn parse_color(input: &str) -> Result<Color, ColorError> {
    let s = input.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| ColorError::Hex(input.to_string()));
    }
    if let Some((name, args)) = split_function(s) {
        return parse_function(name, args).ok_or_else(|| ColorError::Function(input.to_string()));
    }
    if s.eq_ignore_ascii_case("transparent") {
        return Ok(Color::TRANSPARENT);
    }
    palette::named::from_str(&s.to_ascii_lowercase())
        .map(|c| Color::rgba8(c.red, c.green, c.blue, 255))
        .ok_or_else(|| ColorError::Unknown(input.to_string()))
}

/// `rgb(r, g, b)` for opaque colors, `rgba(r, g, b, a)` otherwise.
pub fn to_css_string(color: Color) -> String {
    let [r, g, b, _] = color.to_rgba8();
    if color.a >= 1.0 {
        format!("rgb({r}, {g}, {b})")
    } else {
        let a = (f64::from(color.a.max(0.0)) * 1000.0).round() / 1000.0;
        format!("rgba({r}, {g}, {b}, {a})")
    }
}

/// Rotate the hue by `degrees` in HSL space. Alpha is preserved.
pub fn rotate_hue(color: Color, degrees: f32) -> Color {
    let hsl: Hsl = Hsl::from_color(Srgb::new(color.r, color.g, color.b));
    let rgb: Srgb = Srgb::from_color(hsl.shift_hue(degrees));
    Color::rgba(
        rgb.red.clamp(0.0, 1.0),
        rgb.green.clamp(0.0, 1.0),
        rgb.blue.clamp(0.0, 1.0),
        color.a,
    )
}

/// Build a color from HSL components (`hue` in degrees, the rest `0..=1`).
pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Color {
    let hsl: Hsl = Hsl::new(hue, saturation, lightness);
    let rgb: Srgb = Srgb::from_color(hsl);
    Color::rgba(rgb.red, rgb.green, rgb.blue, 1.0)
}

fn parse_hex(hex: &str) -> Option<Color> {
    match hex.len() {
        3 | 6 => {
            let c = Srgb::<u8>::from_str(hex).ok()?;
            Some(Color::rgba8(c.red, c.green, c.blue, 255))
        }
        4 | 8 => {
            let c = Rgba::<palette::encoding::Srgb, u8>::from_str(hex).ok()?;
            Some(Color::rgba8(c.red, c.green, c.blue, c.alpha))
        }
        _ => None,
    }
}

fn split_function(s: &str) -> Option<(&str, &str)> {
    let open = s.find('(')?;
    let args = s[open + 1..].strip_suffix(')')?;
    Some((s[..open].trim(), args))
}

fn parse_function(name: &str, args: &str) -> Option<Color> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let alpha = match parts.get(3) {
        Some(a) => parse_unit(a)?,
        None => 1.0,
    };

    match name.to_ascii_lowercase().as_str() {
        "rgb" | "rgba" => {
            let channel = |p: &str| -> Option<f32> {
                match p.strip_suffix('%') {
                    Some(pct) => pct.parse::<f32>().ok().map(|v| v / 100.0),
                    None => p.parse::<f32>().ok().map(|v| v / 255.0),
                }
            };
            Some(Color::rgba(
                channel(parts[0])?.clamp(0.0, 1.0),
                channel(parts[1])?.clamp(0.0, 1.0),
                channel(parts[2])?.clamp(0.0, 1.0),
                alpha,
            ))
        }
        "hsl" | "hsla" => {
            let hue = parts[0].trim_end_matches("deg").parse::<f32>().ok()?;
            let sat = parts[1].strip_suffix('%')?.parse::<f32>().ok()? / 100.0;
            let light = parts[2].strip_suffix('%')?.parse::<f32>().ok()? / 100.0;
            Some(hsl(hue, sat.clamp(0.0, 1.0), light.clamp(0.0, 1.0)).with_alpha(alpha))
        }
        _ => None,
    }
}

/// `0.5` or `50%` → `0.5`.
fn parse_unit(p: &str) -> Option<f32> {
    let v = match p.strip_suffix('%') {
        Some(pct) => pct.parse::<f32>().ok()? / 100.0,
        None => p.parse::<f32>().ok()?,
    };
    Some(v.clamp(0.0, 1.0))
}

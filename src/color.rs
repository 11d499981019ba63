use crate::value::format_number;
use lightningcss::traits::Parse;
use lightningcss::values::color::{CssColor, SRGB};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f32,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self {
            r,
            g,
            b,
            alpha: if alpha.is_finite() {
                alpha.clamp(0.0, 1.0)
            } else {
                1.0
            },
        }
    }

    pub fn to_css(&self) -> String {
        format!(
            "rgb({} {} {} / {})",
            self.r,
            self.g,
            self.b,
            format_number(self.alpha)
        )
    }
}

/// Accepts named colors, hex notation and color functions.
pub fn parse_color(text: &str) -> Option<Rgb> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let color = CssColor::parse_string(text).ok()?;
    css_color_to_rgb(&color)
}

fn css_color_to_rgb(color: &CssColor) -> Option<Rgb> {
    if let CssColor::RGBA(rgba) = color {
        let alpha = rgba.alpha as f32 / 255.0;
        return Some(Rgb::new(rgba.red, rgba.green, rgba.blue, alpha));
    }
    let srgb = SRGB::try_from(color).ok()?;
    Some(Rgb::new(
        unit_to_channel(srgb.r),
        unit_to_channel(srgb.g),
        unit_to_channel(srgb.b),
        if srgb.alpha.is_nan() { 0.0 } else { srgb.alpha },
    ))
}

fn unit_to_channel(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

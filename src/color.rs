use std::collections::HashMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Categorical palette
// ---------------------------------------------------------------------------

/// `n` visually distinct colours with evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let rgb: Srgb = Hsl::new(hue, 0.70, 0.55).into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

/// Series label → colour, assigned in the order labels are first seen.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: HashMap<String, Color32>,
    order: Vec<String>,
}

impl ColorMap {
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut order: Vec<String> = Vec::new();
        for label in labels {
            if !order.iter().any(|l| l == label) {
                order.push(label.to_string());
            }
        }
        let mapping = order
            .iter()
            .cloned()
            .zip(generate_palette(order.len()))
            .collect();
        ColorMap { mapping, order }
    }

    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping.get(label).copied().unwrap_or(Color32::GRAY)
    }

    /// Legend entries in first-seen order.
    pub fn legend_entries(&self) -> Vec<(&str, Color32)> {
        self.order
            .iter()
            .map(|l| (l.as_str(), self.color_for(l)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Diverging scale for correlations
// ---------------------------------------------------------------------------

/// Blue (-1) → white (0) → red (+1). Missing values are grey.
pub fn diverging(value: Option<f64>) -> Color32 {
    let Some(v) = value.filter(|v| v.is_finite()) else {
        return Color32::from_gray(90);
    };
    let v = v.clamp(-1.0, 1.0) as f32;
    let white = LinSrgb::new(1.0, 1.0, 1.0);
    let end: LinSrgb = if v < 0.0 {
        Srgb::new(0.13, 0.40, 0.67).into_linear()
    } else {
        Srgb::new(0.70, 0.09, 0.17).into_linear()
    };
    to_color32(Srgb::from_linear(white.mix(end, v.abs())))
}

use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// `n` evenly spaced hues starting at `start_hue` degrees.
pub fn generate_palette(n: usize, start_hue: f32) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = start_hue + (i as f32 / n as f32) * 360.0;
            let rgb: Srgb = Hsl::new(hue, 0.65, 0.5).into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Side of the equality line
// ---------------------------------------------------------------------------

/// Where a scatter point sits relative to `y = x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Above,
    On,
    Below,
}

impl Side {
    pub const ALL: [Side; 3] = [Side::Above, Side::On, Side::Below];

    pub fn of(x: f64, y: f64) -> Side {
        if (y - x).abs() < f64::EPSILON {
            Side::On
        } else if y > x {
            Side::Above
        } else {
            Side::Below
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Above => "above y = x",
            Side::On => "on y = x",
            Side::Below => "below y = x",
        }
    }
}

/// Colours for the three sides of the equality line.
#[derive(Debug, Clone)]
pub struct SideColors {
    mapping: BTreeMap<Side, Color32>,
}

impl Default for SideColors {
    fn default() -> Self {
        let palette = generate_palette(Side::ALL.len(), 210.0);
        SideColors {
            mapping: Side::ALL.into_iter().zip(palette).collect(),
        }
    }
}

impl SideColors {
    pub fn color_for(&self, side: Side) -> Color32 {
        self.mapping.get(&side).copied().unwrap_or(Color32::GRAY)
    }
}

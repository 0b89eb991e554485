use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Plotly's default qualitative sequence.
const QUALITATIVE: [Color32; 10] = [
    Color32::from_rgb(0x63, 0x6e, 0xfa),
    Color32::from_rgb(0xef, 0x55, 0x3b),
    Color32::from_rgb(0x00, 0xcc, 0x96),
    Color32::from_rgb(0xab, 0x63, 0xfa),
    Color32::from_rgb(0xff, 0xa1, 0x5a),
    Color32::from_rgb(0x19, 0xd3, 0xf3),
    Color32::from_rgb(0xff, 0x66, 0x92),
    Color32::from_rgb(0xb6, 0xe8, 0x80),
    Color32::from_rgb(0xff, 0x97, 0xff),
    Color32::from_rgb(0xfe, 0xcb, 0x52),
];

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// The qualitative sequence first, then generated hues for the overflow.
pub fn series_palette(n: usize) -> Vec<Color32> {
    let mut colors: Vec<Color32> = QUALITATIVE.iter().copied().take(n).collect();
    if n > QUALITATIVE.len() {
        colors.extend(generate_palette(n - QUALITATIVE.len()));
    }
    colors
}

// ---------------------------------------------------------------------------
// Color mapping: series label → Color32
// ---------------------------------------------------------------------------

/// Maps the series labels of one chart to distinct colours, in order.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new<'a>(labels: impl ExactSizeIterator<Item = &'a str>) -> Self {
        let palette = series_palette(labels.len());
        let mapping = labels
            .zip(palette)
            .map(|(label, c)| (label.to_string(), c))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a series label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_palette_extends_past_sequence() {
        let colors = series_palette(13);
        assert_eq!(colors.len(), 13);
        assert_eq!(colors[0], QUALITATIVE[0]);
        assert_eq!(series_palette(3).len(), 3);
    }

    #[test]
    fn test_color_map_lookup() {
        let map = ColorMap::new(["Good", "Fair"].into_iter());
        assert_eq!(map.color_for("Good"), QUALITATIVE[0]);
        assert_eq!(map.color_for("Fair"), QUALITATIVE[1]);
        assert_eq!(map.color_for("unknown"), Color32::GRAY);
    }
}

use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::ChannelKind;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

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

// ---------------------------------------------------------------------------
// Annotation colours: description → Color32
// ---------------------------------------------------------------------------

/// Maps annotation descriptions to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the unique descriptions of a segment.
    ///
    /// Descriptions starting with `bad` (any case) are always red, matching
    /// the convention that such spans are excluded from analysis.
    pub fn new(descriptions: &BTreeSet<String>) -> Self {
        let (bad, regular): (Vec<&String>, Vec<&String>) = descriptions
            .iter()
            .partition(|d| d.to_ascii_lowercase().starts_with("bad"));

        let palette = generate_palette(regular.len());
        let mut mapping: BTreeMap<String, Color32> = regular
            .into_iter()
            .zip(palette)
            .map(|(d, c)| (d.clone(), c))
            .collect();
        for d in bad {
            mapping.insert(d.clone(), Color32::from_rgb(220, 60, 60));
        }

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given description.
    pub fn color_for(&self, description: &str) -> Color32 {
        self.mapping
            .get(description)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Translucent variant used to shade annotated spans.
    pub fn fill_for(&self, description: &str) -> Color32 {
        self.color_for(description).gamma_multiply(0.25)
    }
}

// ---------------------------------------------------------------------------
// Trace colours
// ---------------------------------------------------------------------------

/// Trace colour for a channel; bad channels are greyed out.
pub fn channel_color(kind: ChannelKind, bad: bool) -> Color32 {
    if bad {
        return Color32::from_gray(110);
    }
    match kind {
        ChannelKind::Eeg => Color32::from_rgb(200, 200, 210),
        ChannelKind::Eog => Color32::from_rgb(90, 150, 255),
        ChannelKind::Ecg => Color32::from_rgb(230, 120, 200),
        ChannelKind::Emg => Color32::from_rgb(120, 200, 200),
        ChannelKind::Meg => Color32::from_rgb(140, 200, 120),
        ChannelKind::Stim => Color32::from_rgb(240, 200, 90),
        ChannelKind::Resp => Color32::from_rgb(180, 140, 90),
        ChannelKind::Misc | ChannelKind::Other(_) => Color32::LIGHT_GRAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_distinct() {
        let p = generate_palette(5);
        assert_eq!(p.len(), 5);
        let unique: BTreeSet<[u8; 4]> = p.iter().map(|c| c.to_array()).collect();
        assert_eq!(unique.len(), 5);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn test_bad_descriptions_are_red() {
        let descriptions: BTreeSet<String> =
            ["blink", "BAD_segment", "saccade"].iter().map(|s| s.to_string()).collect();
        let map = ColorMap::new(&descriptions);
        assert_eq!(map.color_for("BAD_segment"), Color32::from_rgb(220, 60, 60));
        assert_ne!(map.color_for("blink"), map.color_for("saccade"));
        assert_eq!(map.color_for("unknown"), Color32::GRAY);
        assert_eq!(map.fill_for("blink"), map.color_for("blink").gamma_multiply(0.25));
    }

    #[test]
    fn test_bad_channels_grey() {
        assert_eq!(channel_color(ChannelKind::Eog, true), Color32::from_gray(110));
        assert_ne!(
            channel_color(ChannelKind::Eog, false),
            channel_color(ChannelKind::Eeg, false)
        );
    }
}

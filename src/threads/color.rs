//! HSL colors and the thread palette.

use serde::{Deserialize, Serialize};

use super::rng::SeededRng;

/// Color in HSL space. Hue in degrees `[0, 360)`, saturation and lightness in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub fn new(h: f32, s: f32, l: f32) -> Self {
        Self {
            h: h.rem_euclid(360.0),
            s: s.clamp(0.0, 1.0),
            l: l.clamp(0.0, 1.0),
        }
    }

    /// Convert to sRGB components in `[0, 1]`.
    pub fn to_rgb(&self) -> [f32; 3] {
        let c = (1.0 - (2.0 * self.l - 1.0).abs()) * self.s;
        let hp = self.h.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
        let (r, g, b) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = self.l - c / 2.0;
        [r + m, g + m, b + m]
    }

    /// Same color with lightness shifted by `delta` (clamped).
    pub fn lighten(&self, delta: f32) -> Self {
        Self::new(self.h, self.s, self.l + delta)
    }

    /// Same color with hue rotated by `degrees`.
    pub fn rotate(&self, degrees: f32) -> Self {
        Self::new(self.h + degrees, self.s, self.l)
    }
}

/// Palette anchor: base hue and its selection weight.
#[derive(Debug, Clone, Copy)]
pub struct PaletteEntry {
    pub hue: f32,
    pub weight: f32,
}

/// Weighted palette: mostly blues and violets, a little teal, rare magenta.
pub const THREAD_PALETTE: [PaletteEntry; 4] = [
    PaletteEntry { hue: 212.0, weight: 0.42 },
    PaletteEntry { hue: 262.0, weight: 0.30 },
    PaletteEntry { hue: 178.0, weight: 0.18 },
    PaletteEntry { hue: 322.0, weight: 0.10 },
];

const HUE_JITTER: f32 = 14.0;
const SATURATION_RANGE: (f32, f32) = (0.58, 0.86);
const LIGHTNESS_RANGE: (f32, f32) = (0.56, 0.72);

/// Draw a palette color. Consumes exactly four draws.
pub fn pick_thread_color(rng: &mut SeededRng) -> Hsl {
    let weights: Vec<f32> = THREAD_PALETTE.iter().map(|e| e.weight).collect();
    let entry = THREAD_PALETTE[rng.pick_weighted(&weights)];
    let hue = entry.hue + rng.range(-HUE_JITTER, HUE_JITTER);
    let s = rng.range(SATURATION_RANGE.0, SATURATION_RANGE.1);
    let l = rng.range(LIGHTNESS_RANGE.0, LIGHTNESS_RANGE.1);
    Hsl::new(hue, s, l)
}

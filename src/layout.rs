//! Card layout model.
//!
//! Regions on a card are defined in relative coordinates (0.0–1.0) so the
//! same layout works for any scan resolution. Conversion to absolute pixel
//! rectangles happens at crop time via [`Region::resolve`].

use serde::{Deserialize, Serialize};

/// A rectangle in relative coordinates (0.0 to 1.0).
///
/// Out-of-range values are tolerated (hand-edited layout tables drift);
/// they are clamped during [`Region::resolve`], never rejected.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// X position of top-left corner (0.0 = left edge, 1.0 = right edge)
    pub x: f32,
    /// Y position of top-left corner (0.0 = top edge, 1.0 = bottom edge)
    pub y: f32,
    /// Width as fraction of image width
    pub width: f32,
    /// Height as fraction of image height
    pub height: f32,
}

/// An absolute pixel rectangle within a concrete image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Resolves this region against concrete image dimensions.
    ///
    /// Percentages are clamped into [0, 1] first, then the resulting pixel
    /// rectangle is clipped so it always lies inside the image.
    pub fn resolve(&self, image_width: u32, image_height: u32) -> PixelRect {
        let x = self.x.clamp(0.0, 1.0);
        let y = self.y.clamp(0.0, 1.0);
        let w = self.width.clamp(0.0, 1.0 - x);
        let h = self.height.clamp(0.0, 1.0 - y);

        let px = ((x * image_width as f32) as u32).min(image_width);
        let py = ((y * image_height as f32) as u32).min(image_height);
        let pw = ((w * image_width as f32) as u32).min(image_width - px);
        let ph = ((h * image_height as f32) as u32).min(image_height - py);

        PixelRect { x: px, y: py, width: pw, height: ph }
    }
}

/// Width fractions of the four per-level columns inside an ability block.
///
/// These are NOT equal quarters: the printed level-1 column is wider (it
/// carries the ability header) and the level-4 column is narrower. Measured
/// from the physical cards; keep in sync with the print layout.
pub const LEVEL_COLUMN_FRACTIONS: [f32; 4] = [0.28, 0.25, 0.25, 0.22];

/// Named regions of a character card (front and back faces).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CardLayout {
    /// Character name banner (front, top).
    pub name: Region,
    /// Home location line under the name (front).
    pub location: Region,
    /// Motto, small italic print (front, bottom).
    pub motto: Region,
    /// Narrative flavor paragraph (back, top).
    pub narrative: Region,
    /// Full ability text block (back, lower half). Per-level sub-regions
    /// are derived from this via [`CardLayout::level_columns`].
    pub ability_block: Region,
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            name: Region::new(0.08, 0.04, 0.84, 0.08),
            location: Region::new(0.08, 0.13, 0.84, 0.05),
            motto: Region::new(0.10, 0.88, 0.80, 0.07),
            narrative: Region::new(0.07, 0.05, 0.86, 0.30),
            ability_block: Region::new(0.05, 0.38, 0.90, 0.55),
        }
    }
}

impl CardLayout {
    /// Splits the ability block into the four per-level columns.
    ///
    /// Column widths follow [`LEVEL_COLUMN_FRACTIONS`]; heights are shared.
    pub fn level_columns(&self) -> [Region; 4] {
        let block = self.ability_block;
        let mut columns = [block; 4];
        let mut offset = 0.0f32;
        for (i, frac) in LEVEL_COLUMN_FRACTIONS.iter().enumerate() {
            columns[i] = Region::new(
                block.x + block.width * offset,
                block.y,
                block.width * frac,
                block.height,
            );
            offset += frac;
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_basic() {
        let r = Region::new(0.1, 0.25, 0.5, 0.1);
        let rect = r.resolve(100, 200);
        assert_eq!(rect, PixelRect { x: 10, y: 50, width: 50, height: 20 });
    }

    #[test]
    fn test_resolve_stays_in_bounds() {
        // Sweep a grid of regions, including invalid ones, and check the
        // resolved rectangle always lies inside the image.
        for &(x, y, w, h) in &[
            (0.0, 0.0, 1.0, 1.0),
            (0.9, 0.9, 0.5, 0.5),
            (-0.3, 0.2, 0.8, 2.0),
            (1.5, -1.0, 1.0, 1.0),
            (0.33, 0.66, 0.34, 0.34),
        ] {
            let rect = Region::new(x, y, w, h).resolve(640, 480);
            assert!(rect.x + rect.width <= 640, "({x},{y},{w},{h}) overflows width");
            assert!(rect.y + rect.height <= 480, "({x},{y},{w},{h}) overflows height");
        }
    }

    #[test]
    fn test_resolve_clamps_negative() {
        let rect = Region::new(-0.5, -0.5, 0.25, 0.25).resolve(100, 100);
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 0);
    }

    #[test]
    fn test_level_column_fractions_cover_block() {
        let sum: f32 = LEVEL_COLUMN_FRACTIONS.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        // The partition is intentionally unequal.
        assert_ne!(LEVEL_COLUMN_FRACTIONS[0], LEVEL_COLUMN_FRACTIONS[3]);
    }

    #[test]
    fn test_level_columns_are_contiguous() {
        let layout = CardLayout::default();
        let cols = layout.level_columns();
        let block = layout.ability_block;

        assert!((cols[0].x - block.x).abs() < 1e-6);
        for i in 0..3 {
            let right = cols[i].x + cols[i].width;
            assert!((right - cols[i + 1].x).abs() < 1e-5, "gap between column {i} and {}", i + 1);
        }
        let last_right = cols[3].x + cols[3].width;
        assert!((last_right - (block.x + block.width)).abs() < 1e-5);
        for c in &cols {
            assert_eq!(c.y, block.y);
            assert_eq!(c.height, block.height);
        }
    }
}

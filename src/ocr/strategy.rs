//! OCR strategy catalog and selector.
//!
//! A strategy is a fixed preprocessing pipeline plus an engine page mode.
//! The catalog is enumerated once; which strategy runs for which kind of
//! card text is a configuration decision (`StrategyPreferences`), with a
//! fixed fallback order when the preferred strategy yields nothing.

use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};

use super::engine::PageMode;
use super::preprocess;

/// Identifier of a preprocessing+engine combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyId {
    /// Bright-pixel threshold; isolates light print on dark banners.
    BrightThreshold,
    /// Global Otsu binarization after histogram equalization.
    Otsu,
    /// Local adaptive threshold; tolerates uneven lighting.
    Adaptive,
    /// Plain grayscale with upscaling, no binarization.
    GrayUpscale,
}

/// Category of card text being extracted. Each category has its own
/// empirically best strategy and page segmentation mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Name,
    Location,
    Motto,
    Narrative,
    Ability,
}

impl ContentCategory {
    /// Single-line banners vs. multi-line blocks.
    pub fn page_mode(self) -> PageMode {
        match self {
            ContentCategory::Name | ContentCategory::Location | ContentCategory::Motto => {
                PageMode::SingleLine
            }
            ContentCategory::Narrative | ContentCategory::Ability => PageMode::Block,
        }
    }
}

/// Fallback order tried after the preferred strategy. The preferred entry is
/// skipped when it reappears here.
pub const FALLBACK_ORDER: [StrategyId; 4] = [
    StrategyId::Otsu,
    StrategyId::Adaptive,
    StrategyId::BrightThreshold,
    StrategyId::GrayUpscale,
];

/// Per-category strategy preferences, loaded from configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyPreferences {
    pub name: StrategyId,
    pub location: StrategyId,
    pub motto: StrategyId,
    pub narrative: StrategyId,
    pub ability: StrategyId,
}

impl Default for StrategyPreferences {
    fn default() -> Self {
        // Measured on the labeled card corpus: banners are light-on-dark,
        // body text is dark-on-light with shadows from the photograph.
        Self {
            name: StrategyId::BrightThreshold,
            location: StrategyId::BrightThreshold,
            motto: StrategyId::Otsu,
            narrative: StrategyId::Otsu,
            ability: StrategyId::Adaptive,
        }
    }
}

impl StrategyPreferences {
    /// Looks up the preferred strategy for a content category.
    pub fn select(&self, category: ContentCategory) -> StrategyId {
        match category {
            ContentCategory::Name => self.name,
            ContentCategory::Location => self.location,
            ContentCategory::Motto => self.motto,
            ContentCategory::Narrative => self.narrative,
            ContentCategory::Ability => self.ability,
        }
    }

    /// Full strategy chain for a category: the preferred strategy followed
    /// by the fixed fallback order (deduplicated).
    pub fn chain(&self, category: ContentCategory) -> Vec<StrategyId> {
        let preferred = self.select(category);
        let mut chain = vec![preferred];
        chain.extend(FALLBACK_ORDER.iter().copied().filter(|s| *s != preferred));
        chain
    }
}

/// Runs the preprocessing pipeline of one strategy over a crop.
///
/// `bright` is the bright-pixel cutoff used by `BrightThreshold` (the one
/// strategy with a tunable constant; see `OcrConfig::bright_threshold`).
pub fn preprocess_with(id: StrategyId, crop: &RgbaImage, bright: u8) -> GrayImage {
    match id {
        StrategyId::BrightThreshold => preprocess::bright_threshold(crop, bright),
        StrategyId::Otsu => preprocess::otsu_binarize(crop),
        StrategyId::Adaptive => preprocess::adaptive_binarize(crop),
        StrategyId::GrayUpscale => preprocess::gray_upscaled(crop),
    }
}

//! OCR orchestration: region crop → strategy chain → best candidate.
//!
//! Engine failures and empty output are "no signal", never errors: one
//! unreadable region must not abort the rest of the card.

pub mod engine;
pub mod preprocess;
pub mod strategy;

pub use engine::{OcrLine, OcrWord, PageMode};
pub use strategy::{ContentCategory, StrategyId, StrategyPreferences};

use image::RgbaImage;

use crate::extract::normalize::Normalizer;
use crate::layout::{PixelRect, Region};

/// Candidate score above which the strategy chain stops early. Tuned so a
/// clean read of even a short banner ("Marksman") clears it while a few
/// stray specks do not.
const ACCEPT_SCORE: i64 = 24;

/// Result of extracting one card region.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub category: ContentCategory,
    pub region: PixelRect,
    /// Strategy that produced the winning candidate.
    pub strategy: StrategyId,
    /// Raw OCR lines before any correction.
    pub raw_lines: Vec<String>,
    /// Normalized text (see `extract::normalize`).
    pub clean_text: String,
}

impl ExtractionResult {
    /// True when no strategy produced any text.
    pub fn is_empty(&self) -> bool {
        self.clean_text.is_empty()
    }
}

/// Extracts one region from a card image, trying strategies in preference
/// order and keeping the best-scoring candidate.
pub fn extract_region(
    img: &RgbaImage,
    region: Region,
    category: ContentCategory,
    prefs: &StrategyPreferences,
    normalizer: &Normalizer,
    bright: u8,
) -> ExtractionResult {
    let (w, h) = img.dimensions();
    let rect = region.resolve(w, h);
    let crop = preprocess::crop_rect(img, rect);

    let mut best: Option<(StrategyId, Vec<String>, i64)> = None;

    for id in prefs.chain(category) {
        let prepared = strategy::preprocess_with(id, &crop, bright);
        let lines = match engine::recognize(&prepared, category.page_mode()) {
            Ok(lines) => lines,
            Err(err) => {
                log::debug!("strategy {id:?} failed on {category:?}: {err:#}");
                continue;
            }
        };

        let texts: Vec<String> = lines.into_iter().map(|l| l.text).collect();
        let score = score_text(&texts.join(" "));
        if texts.iter().all(|t| t.trim().is_empty()) {
            continue;
        }

        let better = best.as_ref().map(|(_, _, s)| score > *s).unwrap_or(true);
        if better {
            best = Some((id, texts, score));
        }
        if score >= ACCEPT_SCORE {
            break;
        }
    }

    match best {
        Some((strategy, raw_lines, _)) => {
            let clean_text = normalizer.normalize(&raw_lines.join("\n"));
            ExtractionResult { category, region: rect, strategy, raw_lines, clean_text }
        }
        None => {
            log::debug!("no OCR signal for {category:?} region {rect:?}");
            ExtractionResult {
                category,
                region: rect,
                strategy: prefs.select(category),
                raw_lines: Vec::new(),
                clean_text: String::new(),
            }
        }
    }
}

/// Plausibility score for an OCR candidate: alphanumeric characters count
/// the most, punctuation a little, whitespace nothing.
fn score_text(text: &str) -> i64 {
    let mut score = 0i64;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            score += 3;
        } else if !ch.is_whitespace() {
            score += 1;
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_prefers_alphanumeric_text() {
        assert!(score_text("Gain 2 green dice") > score_text("|;~ ..,"));
        assert_eq!(score_text(""), 0);
        assert_eq!(score_text("   "), 0);
    }

    #[test]
    fn test_clean_name_clears_accept_score() {
        assert!(score_text("Marksman") >= ACCEPT_SCORE);
    }

    #[test]
    fn test_is_empty_tracks_clean_text() {
        let mut result = ExtractionResult {
            category: crate::ocr::strategy::ContentCategory::Name,
            region: crate::layout::PixelRect { x: 0, y: 0, width: 1, height: 1 },
            strategy: strategy::StrategyId::BrightThreshold,
            raw_lines: Vec::new(),
            clean_text: String::new(),
        };
        assert!(result.is_empty());
        result.clean_text = "Marksman".to_string();
        assert!(!result.is_empty());
    }
}

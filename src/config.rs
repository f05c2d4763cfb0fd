//! Pipeline configuration.
//!
//! All tunable reference data lives here: layout tables, strategy
//! preferences, correction tables, the ability-name vocabulary and the dice
//! face-probability constants. Loaded once at startup from a JSON file and
//! passed into the components that need it; nothing reads global state.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::extract::identity::MatcherConfig;
use crate::extract::normalize::CorrectionTables;
use crate::extract::segment::SegmenterConfig;
use crate::layout::CardLayout;
use crate::ocr::strategy::StrategyPreferences;
use crate::stats::dice::{DiceTable, DicePool, DieFaces};

/// Dice constants: face probabilities per color plus the base pool every
/// character rolls before ability effects.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DiceConfig {
    pub table: DiceTable,
    pub base_pool: DicePool,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            // Standard six-sided distribution of the observed components:
            // green 2 success / 1 elder / 1 tentacle faces, black trades
            // more success faces for more tentacles.
            table: DiceTable {
                green: DieFaces {
                    success: 2.0 / 6.0,
                    elder_sign: 1.0 / 6.0,
                    tentacle: 1.0 / 6.0,
                },
                black: DieFaces {
                    success: 3.0 / 6.0,
                    elder_sign: 1.0 / 6.0,
                    tentacle: 2.0 / 6.0,
                },
            },
            base_pool: DicePool { green: 3, black: 0 },
        }
    }
}

/// OCR runtime knobs not covered by the strategy catalog itself.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Bright-pixel cutoff for the `bright-threshold` strategy.
    /// Clean scans: 190. Phone photographs: 160.
    pub bright_threshold: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { bright_threshold: 190 }
    }
}

/// Batch-run knobs.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads for the character batch. OCR subprocesses dominate
    /// the cost, so this bounds external engine load.
    pub workers: usize,
    /// Soft per-character wall-clock budget; exceeding it is logged, not
    /// fatal, so one pathological image cannot stall a batch silently.
    pub character_budget_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { workers: 4, character_budget_ms: 60_000 }
    }
}

/// Complete pipeline configuration.
///
/// Everything defaults except `dice`: when an explicit config file is
/// supplied it must carry the dice constants, because silently defaulted
/// probabilities would corrupt every statistic without any visible error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub layout: CardLayout,
    #[serde(default)]
    pub strategies: StrategyPreferences,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub corrections: CorrectionTables,
    #[serde(default = "default_vocabulary")]
    pub vocabulary: Vec<String>,
    pub dice: DiceConfig,
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// The closed set of ability names printed on the observed cards.
fn default_vocabulary() -> Vec<String> {
    ["Marksman", "Brawler", "Scavenger", "Occultist", "Sprinter", "Ironclad"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            layout: CardLayout::default(),
            strategies: StrategyPreferences::default(),
            ocr: OcrConfig::default(),
            corrections: CorrectionTables::default(),
            vocabulary: default_vocabulary(),
            dice: DiceConfig::default(),
            matcher: MatcherConfig::default(),
            segmenter: SegmenterConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from a JSON file, or the built-in defaults when
    /// no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            None => Self::default(),
            Some(p) => {
                let content = fs::read_to_string(p)
                    .with_context(|| format!("read config {}", p.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("parse config {}", p.display()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that would corrupt downstream output.
    pub fn validate(&self) -> Result<()> {
        if self.vocabulary.is_empty() {
            bail!("config: ability vocabulary must not be empty");
        }
        let mut seen = std::collections::HashSet::new();
        for name in &self.vocabulary {
            if !seen.insert(name.to_lowercase()) {
                bail!("config: duplicate ability name {name:?}");
            }
        }
        if !self.dice.table.green.is_valid() {
            bail!("config: green die face probabilities are invalid");
        }
        if !self.dice.table.black.is_valid() {
            bail!("config: black die face probabilities are invalid");
        }
        if !(0.0..=1.0).contains(&self.matcher.similarity) {
            bail!("config: matcher similarity must be within [0, 1]");
        }
        if self.runtime.workers == 0 {
            bail!("config: worker count must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = PipelineConfig::load(None).unwrap();
        assert_eq!(config.vocabulary.len(), 6);
        assert_eq!(config.runtime.workers, 4);
    }

    #[test]
    fn test_file_must_carry_dice_constants() {
        // A config file without a dice table is a configuration defect and
        // must fail loudly, not be silently defaulted.
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "{{\"vocabulary\": [\"Marksman\"]}}").unwrap();

        let err = PipelineConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("parse config"));
    }

    #[test]
    fn test_partial_file_with_dice_loads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let dice = serde_json::to_string(&DiceConfig::default()).unwrap();
        std::fs::write(&path, format!("{{\"dice\": {dice}}}")).unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.vocabulary.len(), 6, "other sections fall back to defaults");
    }

    #[test]
    fn test_invalid_probabilities_rejected() {
        let mut config = PipelineConfig::default();
        config.dice.table.green.success = 0.9;
        config.dice.table.green.elder_sign = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_vocabulary_rejected() {
        let mut config = PipelineConfig::default();
        config.vocabulary.push("marksman".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = PipelineConfig::default();
        config.runtime.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();
        assert_eq!(back.vocabulary, config.vocabulary);
    }
}

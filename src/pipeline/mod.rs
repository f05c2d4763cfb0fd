//! Per-character pipeline orchestration.
//!
//! Within one character the stages are strictly ordered: layout → OCR →
//! normalize → identity match → segment → effects → statistics →
//! consistency. Across characters processing is embarrassingly parallel;
//! see `worker`.

pub mod queue;
pub mod worker;

pub use queue::{CharacterJob, create_work_queue};
pub use worker::run_batch;

use anyhow::{Context, Result};
use image::RgbaImage;
use std::time::Duration;

use crate::config::{DiceConfig, OcrConfig, PipelineConfig};
use crate::extract::identity::IdentityMatcher;
use crate::extract::normalize::Normalizer;
use crate::extract::segment::{LevelText, SegmenterConfig, segment_levels};
use crate::layout::CardLayout;
use crate::ocr::strategy::{ContentCategory, StrategyPreferences};
use crate::ocr::{ExtractionResult, extract_region};
use crate::record::{AbilityRecord, CharacterRecord, LevelEntry};

/// The assembled pipeline: immutable after construction and shared across
/// worker threads.
pub struct Pipeline {
    layout: CardLayout,
    strategies: StrategyPreferences,
    ocr: OcrConfig,
    normalizer: Normalizer,
    matcher: IdentityMatcher,
    segmenter: SegmenterConfig,
    vocabulary: Vec<String>,
    dice: DiceConfig,
    budget: Duration,
    workers: usize,
}

impl Pipeline {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            layout: config.layout.clone(),
            strategies: config.strategies.clone(),
            ocr: config.ocr,
            normalizer: Normalizer::new(&config.corrections)?,
            matcher: IdentityMatcher::new(config.matcher),
            segmenter: config.segmenter,
            vocabulary: config.vocabulary.clone(),
            dice: config.dice,
            budget: Duration::from_millis(config.runtime.character_budget_ms),
            workers: config.runtime.workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn character_budget(&self) -> Duration {
        self.budget
    }

    /// Runs the full extraction for one character.
    ///
    /// Only image loading can fail here; OCR trouble inside a region
    /// degrades to missing text instead of an error.
    pub fn process_character(&self, job: &CharacterJob) -> Result<CharacterRecord> {
        let front = image::open(&job.front_path)
            .with_context(|| format!("load front image {}", job.front_path.display()))?
            .to_rgba8();
        let back = image::open(&job.back_path)
            .with_context(|| format!("load back image {}", job.back_path.display()))?
            .to_rgba8();

        let name = self.read_region(&front, ContentCategory::Name, self.layout.name);
        let location = self.read_region(&front, ContentCategory::Location, self.layout.location);
        let motto = self.read_region(&front, ContentCategory::Motto, self.layout.motto);
        let narrative =
            self.read_region(&back, ContentCategory::Narrative, self.layout.narrative);

        for (label, result) in [
            ("name", &name),
            ("location", &location),
            ("motto", &motto),
            ("narrative", &narrative),
        ] {
            if result.is_empty() {
                log::warn!("{}: no {label} text recovered", job.id);
            }
        }

        let abilities = self.extract_abilities(&back);

        let mut record = CharacterRecord {
            id: job.id.clone(),
            season: job.season.clone(),
            name: name.clean_text,
            location: location.clean_text,
            motto: motto.clean_text,
            narrative: narrative.clean_text,
            abilities,
            findings: Vec::new(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        };
        record.collect_findings();
        Ok(record)
    }

    /// Placeholder record for a character whose images could not be
    /// processed at all; keeps the batch output complete.
    pub fn failure_record(&self, job: &CharacterJob, err: &anyhow::Error) -> CharacterRecord {
        let abilities = self
            .vocabulary
            .iter()
            .map(|name| self.empty_ability(name))
            .collect();
        CharacterRecord {
            id: job.id.clone(),
            season: job.season.clone(),
            name: String::new(),
            location: String::new(),
            motto: String::new(),
            narrative: String::new(),
            abilities,
            findings: vec![format!("extraction failed: {err:#}")],
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn read_region(
        &self,
        img: &RgbaImage,
        category: ContentCategory,
        region: crate::layout::Region,
    ) -> ExtractionResult {
        extract_region(
            img,
            region,
            category,
            &self.strategies,
            &self.normalizer,
            self.ocr.bright_threshold,
        )
    }

    /// Extracts all known abilities from the back face.
    ///
    /// The ability block is read as one text flow; headings split it into
    /// per-ability sections, the segmenter splits each section into four
    /// tiers. Tiers the text flow could not confirm get a second chance via
    /// their dedicated layout column.
    fn extract_abilities(&self, back: &RgbaImage) -> Vec<AbilityRecord> {
        let block =
            self.read_region(back, ContentCategory::Ability, self.layout.ability_block);
        let lines: Vec<String> = block.clean_text.lines().map(|l| l.to_string()).collect();

        let columns = self.layout.level_columns();

        self.vocabulary
            .iter()
            .map(|name| {
                let heading = lines
                    .iter()
                    .position(|line| self.matcher.is_ability_name_line(line, name));

                let Some(at) = heading else {
                    return self.empty_ability(name);
                };

                let mut tiers = segment_levels(
                    &lines[at + 1..],
                    name,
                    &self.vocabulary,
                    &self.matcher,
                    &self.segmenter,
                );

                // Second chance: OCR the per-level column for tiers the text
                // flow missed. A column spans every ability's section, so
                // only the slice under this ability's own heading is usable;
                // the tier stays missing when that slice cannot be isolated.
                for (i, tier) in tiers.iter_mut().enumerate() {
                    if !tier.is_missing() {
                        continue;
                    }
                    let column =
                        self.read_region(back, ContentCategory::Ability, columns[i]);
                    let column_lines: Vec<String> =
                        column.clean_text.lines().map(|l| l.to_string()).collect();
                    if let Some(text) = self.column_section(&column_lines, name) {
                        log::debug!("tier {} of {name} recovered from column OCR", i + 1);
                        *tier = LevelText::Found(text);
                    }
                }

                let levels = tiers
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| {
                        LevelEntry::derive(
                            (i + 1) as u8,
                            text,
                            &self.dice.table,
                            &self.dice.base_pool,
                        )
                    })
                    .collect();
                AbilityRecord { name: name.clone(), levels }
            })
            .collect()
    }

    /// Cuts one ability's section out of a column's OCR lines.
    ///
    /// Returns the text between this ability's heading and the next
    /// heading, or `None` when the heading is not present in the column.
    fn column_section(&self, lines: &[String], name: &str) -> Option<String> {
        let at = lines
            .iter()
            .position(|line| self.matcher.is_ability_name_line(line, name))?;
        let mut section = Vec::new();
        for line in &lines[at + 1..] {
            match self.matcher.detect_any(line, &self.vocabulary) {
                Some(other) if other != name => break,
                _ => section.push(line.trim()),
            }
        }
        let text = section.join(" ").trim().to_string();
        (!text.is_empty()).then_some(text)
    }

    fn empty_ability(&self, name: &str) -> AbilityRecord {
        let levels = (1..=4)
            .map(|l| {
                LevelEntry::derive(l, LevelText::Missing, &self.dice.table, &self.dice.base_pool)
            })
            .collect();
        AbilityRecord { name: name.to_string(), levels }
    }
}

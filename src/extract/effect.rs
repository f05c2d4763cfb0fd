//! Structured effect extraction from one tier's description text.
//!
//! Best-effort by design: a detector may miss an effect phrased in an
//! unknown way, but it must never invent a numeric value that is not
//! explicitly present in the text.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Elder-sign→success conversion granted by a tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum ElderSignConversion {
    #[default]
    None,
    /// Up to `count` elder signs count as successes.
    Count(u32),
    /// "Any number of elder signs" variant.
    Any,
}

/// A free-action grant ("may make a free attack").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeAction {
    pub category: String,
}

/// Quantified effects of one ability tier, always re-derived from its
/// description text (never edited independently).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRecord {
    pub green_dice_added: u32,
    pub black_dice_added: u32,
    pub elder_sign_successes: ElderSignConversion,
    pub free_action: Option<FreeAction>,
}

impl EffectRecord {
    /// True when the record grants nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern).case_insensitive(true).build().unwrap()
}

static DICE_ADD: LazyLock<Regex> = LazyLock::new(|| {
    ci(r"\b(?:gains?\s+)?(a|an|one|two|three|four|five|\d+)\s+(green|black)\s+(?:dice|die)\b")
});
static ELDER_ANY: LazyLock<Regex> =
    LazyLock::new(|| ci(r"\bany\s+number\s+of\s+elder\s+signs?\b"));
static ELDER_COUNT: LazyLock<Regex> =
    LazyLock::new(|| ci(r"\b(a|an|one|two|three|four|five|\d+)\s+elder\s+signs?\b"));
static SUCCESS_VOCAB: LazyLock<Regex> = LazyLock::new(|| ci(r"\b(?:success(?:es)?|counts?)\b"));
static FREE: LazyLock<Regex> = LazyLock::new(|| ci(r"\bfree\b"));
static ATTACK: LazyLock<Regex> = LazyLock::new(|| ci(r"\battacks?\b"));
static ACTION: LazyLock<Regex> = LazyLock::new(|| ci(r"\bactions?\b"));
static MOVE: LazyLock<Regex> = LazyLock::new(|| ci(r"\bmoves?\b"));

/// Scans a tier description for quantifiable effects.
pub fn extract_effects(level_text: &str) -> EffectRecord {
    let mut record = EffectRecord::default();

    // Only the first confident match per color counts: repeated mentions in
    // real card text are paraphrases of the same grant, not stacking.
    for caps in DICE_ADD.captures_iter(level_text) {
        let count = parse_quantity(&caps[1]);
        match caps[2].to_lowercase().as_str() {
            "green" if record.green_dice_added == 0 => record.green_dice_added = count,
            "black" if record.black_dice_added == 0 => record.black_dice_added = count,
            _ => {}
        }
    }

    if SUCCESS_VOCAB.is_match(level_text) {
        if ELDER_ANY.is_match(level_text) {
            record.elder_sign_successes = ElderSignConversion::Any;
        } else if let Some(caps) = ELDER_COUNT.captures(level_text) {
            record.elder_sign_successes = ElderSignConversion::Count(parse_quantity(&caps[1]));
        }
    }

    if FREE.is_match(level_text) {
        let category = if ATTACK.is_match(level_text) {
            Some("attack")
        } else if ACTION.is_match(level_text) {
            Some("action")
        } else if MOVE.is_match(level_text) {
            Some("move")
        } else {
            None
        };
        record.free_action = category.map(|c| FreeAction { category: c.to_string() });
    }

    record
}

/// Parses an explicit quantity word. Only words present in the detector
/// patterns reach this function.
fn parse_quantity(word: &str) -> u32 {
    match word.to_lowercase().as_str() {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        other => other.parse().unwrap_or(0),
    }
}

//! Level segmentation: splits the text following an ability heading into
//! exactly four ordered tiers.
//!
//! A small state machine walks the line sequence. Transitions are explicit
//! level markers ("2:", "Level 3."), a leading "Instead", or a section
//! boundary (another vocabulary name). Unconfirmed tiers become explicit
//! `Missing` placeholders; text is never fabricated.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::identity::IdentityMatcher;

/// Words that mark a line as plausibly belonging to ability text.
const ABILITY_KEYWORDS: [&str; 12] = [
    "gain", "dice", "elder", "sign", "success", "free", "attack", "action", "sanity",
    "reroll", "tentacle", "threshold",
];

/// Tier text, with an explicit variant for "extraction could not confirm
/// this tier" so downstream code can never forget to handle it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum LevelText {
    Found(String),
    Missing,
}

impl LevelText {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LevelText::Found(s) => Some(s),
            LevelText::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, LevelText::Missing)
    }
}

/// Tunable segmentation limits.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Maximum lines consumed after a confirmed heading.
    pub max_lookahead: usize,
    /// Lines without an ability keyword still count as continuations when
    /// they are at most this long.
    pub continuation_max_len: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self { max_lookahead: 40, continuation_max_len: 60 }
    }
}

// A dash separator must be followed by whitespace, otherwise numeric
// ranges like "1-2 green dice" would read as a level-1 marker.
static LEVEL_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^\s*(?:level\s*)?([1-4])\s*(?:[).:]|-\s)\s*(.*)$")
        .case_insensitive(true)
        .build()
        .unwrap()
});

// Splits sentences that start a new tier mid-line: "…attacking. Instead, …".
static INLINE_INSTEAD: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"([.!?])\s+(instead)\b")
        .case_insensitive(true)
        .build()
        .unwrap()
});

static SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]?").unwrap());

/// Segments the lines following a confirmed heading for `ability` into four
/// tier slots. Always returns exactly four entries.
pub fn segment_levels(
    lines: &[String],
    ability: &str,
    vocabulary: &[String],
    matcher: &IdentityMatcher,
    cfg: &SegmenterConfig,
) -> [LevelText; 4] {
    let mut buffers: [Vec<String>; 4] = Default::default();
    let mut current: Option<usize> = None;
    let mut cue_seen = false;

    'outer: for raw in flatten_transitions(lines).into_iter().take(cfg.max_lookahead) {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        // Section boundary: the next ability's heading ends this one.
        if let Some(other) = matcher.detect_any(line, vocabulary) {
            if !other.eq_ignore_ascii_case(ability) {
                break 'outer;
            }
            continue;
        }

        if let Some(caps) = LEVEL_MARKER.captures(line) {
            let n: usize = caps[1].parse().unwrap_or(1);
            current = Some(n - 1);
            cue_seen = true;
            let rest = caps[2].trim();
            if !rest.is_empty() {
                buffers[n - 1].push(rest.to_string());
            }
            continue;
        }

        if let Some(rest) = strip_instead(line) {
            let next = current.map(|c| c + 1).unwrap_or(0);
            if next > 3 {
                // A fifth tier cannot exist; the section is over.
                break 'outer;
            }
            current = Some(next);
            cue_seen = true;
            if !rest.is_empty() {
                buffers[next].push(rest.to_string());
            }
            continue;
        }

        if let Some(c) = current {
            if has_ability_keyword(line) || line.chars().count() <= cfg.continuation_max_len {
                buffers[c].push(line.to_string());
            }
            // Otherwise: a long keyword-free line belongs to some other
            // section of the card; skip it.
        } else if has_ability_keyword(line) {
            // Text before any cue: treat as tier 1.
            current = Some(0);
            buffers[0].push(line.to_string());
        }
    }

    if !cue_seen {
        sentence_fallback(&mut buffers);
    }

    buffers.map(|parts| {
        let text = parts.join(" ").trim().to_string();
        if text.is_empty() { LevelText::Missing } else { LevelText::Found(text) }
    })
}

/// Pre-splits lines so an "Instead" starting a sentence mid-line opens its
/// own line, matching how tiers are printed when OCR merges columns.
fn flatten_transitions(lines: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let split = INLINE_INSTEAD.replace_all(line, "$1\n$2");
        out.extend(split.split('\n').map(|s| s.to_string()));
    }
    out
}

/// If the line starts a new tier with "Instead" (after stripping leading
/// non-letters), returns the remainder with that token removed.
fn strip_instead(line: &str) -> Option<&str> {
    let stripped = line.trim_start_matches(|c: char| !c.is_alphabetic());
    let lower = stripped.to_lowercase();
    if !lower.starts_with("instead") {
        return None;
    }
    let rest = &stripped["instead".len()..];
    Some(rest.trim_start_matches([',', ':', ';']).trim_start())
}

fn has_ability_keyword(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| ABILITY_KEYWORDS.contains(&w))
}

/// Fallback when no transition cue fired: a single collected blob with
/// several sentences is split at sentence boundaries, one tier each.
fn sentence_fallback(buffers: &mut [Vec<String>; 4]) {
    if buffers[0].is_empty() || buffers[1..].iter().any(|b| !b.is_empty()) {
        return;
    }
    let blob = buffers[0].join(" ");
    let sentences: Vec<String> = SENTENCE
        .find_iter(&blob)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.len() < 2 {
        return;
    }

    *buffers = Default::default();
    for (i, sentence) in sentences.into_iter().enumerate() {
        buffers[i.min(3)].push(sentence);
    }
}

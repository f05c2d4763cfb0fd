//! Ability-name identification in noisy OCR text.
//!
//! Decides whether a line IS an ability-name heading versus description text
//! that merely mentions the name. The rejection policy is conservative: a
//! missed heading falls into the previous level's text and is recoverable,
//! while a false match corrupts level numbering for the rest of the card.

use serde::{Deserialize, Serialize};

/// Words typical of ability description text. A candidate heading containing
/// any of these (as a standalone word) is rejected.
const DESCRIPTION_MARKERS: [&str; 10] = [
    "gain", "when", "while", "instead", "each", "may", "during", "your", "roll", "dice",
];

/// Tunable matcher constants.
///
/// These are empirically tuned against the labeled card corpus; treat the
/// defaults as a starting point, not as optimal.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Candidate lines shorter than this are never headings.
    pub min_line_len: usize,
    /// A candidate longer than `name_len * max_len_ratio + 2` is a sentence
    /// that happens to contain the word, not a heading.
    pub max_len_ratio: f32,
    /// Jaro-Winkler similarity required to accept a heading despite OCR noise.
    pub similarity: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { min_line_len: 3, max_len_ratio: 2.0, similarity: 0.82 }
    }
}

/// Matches candidate lines against the closed ability-name vocabulary.
#[derive(Clone, Debug)]
pub struct IdentityMatcher {
    cfg: MatcherConfig,
}

impl IdentityMatcher {
    pub fn new(cfg: MatcherConfig) -> Self {
        Self { cfg }
    }

    /// True when `line` is an occurrence of `name` as a heading.
    pub fn is_ability_name_line(&self, line: &str, name: &str) -> bool {
        let candidate = trim_decoration(line);
        let len = candidate.chars().count();
        if len < self.cfg.min_line_len {
            return false;
        }

        let name_len = name.chars().count();
        let max_len = (name_len as f32 * self.cfg.max_len_ratio) as usize + 2;
        if len > max_len {
            return false;
        }

        let lower = candidate.to_lowercase();
        if lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|w| DESCRIPTION_MARKERS.contains(&w))
        {
            return false;
        }

        strsim::jaro_winkler(&lower, &name.to_lowercase()) >= self.cfg.similarity
    }

    /// Returns the first vocabulary name this line is a heading for, if any.
    pub fn detect_any<'a>(&self, line: &str, vocabulary: &'a [String]) -> Option<&'a str> {
        vocabulary
            .iter()
            .find(|name| self.is_ability_name_line(line, name))
            .map(String::as_str)
    }
}

/// Strips bullet glyphs, level digits and other decoration around a heading.
fn trim_decoration(line: &str) -> &str {
    line.trim_matches(|c: char| !c.is_alphabetic())
}

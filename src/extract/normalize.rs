//! Text normalization for raw OCR output.
//!
//! Corrections run as an ordered rule cascade, not branching conditionals,
//! so individual rules can be added and tested independently:
//!
//! 1. priority corrections (highest-confidence fixes, fixed order, first so
//!    later generic rules cannot mangle them),
//! 2. general corrections, longest pattern first,
//! 3. domain symbol reinterpretation (dice glyphs, threshold markers),
//! 4. whitespace collapse and inter-word spacing repair.
//!
//! The output is a pure function of the input and the static tables.

use anyhow::{Context, Result};
use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A literal substring correction. `find` is matched case-insensitively.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Correction {
    pub find: String,
    pub replace: String,
}

/// A symbol reinterpretation rule. `pattern` is a regex (case-insensitive);
/// `requires`, when set, is a context word that must appear somewhere in the
/// line for the rule to fire. This anchors bare glyph fixes ("gain 2 ©") to
/// lines that are actually about dice.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SymbolRule {
    pub pattern: String,
    pub replacement: String,
    #[serde(default)]
    pub requires: Option<String>,
}

/// Correction tables, loaded from configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionTables {
    pub priority: Vec<Correction>,
    pub general: Vec<Correction>,
    pub symbols: Vec<SymbolRule>,
}

impl Default for CorrectionTables {
    fn default() -> Self {
        fn c(find: &str, replace: &str) -> Correction {
            Correction { find: find.to_string(), replace: replace.to_string() }
        }

        Self {
            // Known systematic substitutions seen across the scanned corpus.
            // Priority entries are fixes that generic rules would otherwise
            // partially clobber.
            priority: vec![
                c("lnstead", "Instead"),
                c("1nstead", "Instead"),
                c("eider sign", "elder sign"),
                c("elcler sign", "elder sign"),
            ],
            general: vec![
                c("e1der", "elder"),
                c("dlce", "dice"),
                c("d1ce", "dice"),
                c("clice", "dice"),
                c("qain", "gain"),
                c("galn", "gain"),
                c("succes5", "success"),
                c("5uccess", "success"),
                c("tentac1e", "tentacle"),
                c("vvhen", "when"),
                c("wh1le", "while"),
                c("attacklng", "attacking"),
                c("0ne", "one"),
            ],
            symbols: vec![
                SymbolRule {
                    pattern: r"(\d+)\s*[©@◎](?:\s*(?:dice|die))?".to_string(),
                    replacement: "$1 green dice".to_string(),
                    requires: Some("gain".to_string()),
                },
                SymbolRule {
                    pattern: r"(\d+)\s*[●■□](?:\s*(?:dice|die))?".to_string(),
                    replacement: "$1 black dice".to_string(),
                    requires: Some("gain".to_string()),
                },
                SymbolRule {
                    pattern: r"[♥♦]|\{r\}".to_string(),
                    replacement: "red sanity marker".to_string(),
                    requires: None,
                },
                SymbolRule {
                    pattern: r"»|>>".to_string(),
                    replacement: "threshold".to_string(),
                    requires: None,
                },
            ],
        }
    }
}

struct CompiledCorrection {
    regex: Regex,
    replace: String,
}

struct CompiledSymbol {
    regex: Regex,
    replacement: String,
    requires: Option<String>,
}

/// The normalizer itself: compiled, immutable, shared across workers.
pub struct Normalizer {
    priority: Vec<CompiledCorrection>,
    general: Vec<CompiledCorrection>,
    symbols: Vec<CompiledSymbol>,
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid correction pattern: {pattern}"))
}

impl Normalizer {
    pub fn new(tables: &CorrectionTables) -> Result<Self> {
        let compile_literal = |c: &Correction| -> Result<CompiledCorrection> {
            Ok(CompiledCorrection {
                regex: case_insensitive(&regex::escape(&c.find))?,
                replace: c.replace.clone(),
            })
        };

        let priority = tables.priority.iter().map(compile_literal).collect::<Result<Vec<_>>>()?;

        // Longest pattern first so a short rule cannot clobber part of a
        // longer intended correction.
        let mut general_sorted: Vec<&Correction> = tables.general.iter().collect();
        general_sorted.sort_by(|a, b| b.find.len().cmp(&a.find.len()));
        let general = general_sorted
            .into_iter()
            .map(compile_literal)
            .collect::<Result<Vec<_>>>()?;

        let symbols = tables
            .symbols
            .iter()
            .map(|s| {
                Ok(CompiledSymbol {
                    regex: case_insensitive(&s.pattern)?,
                    replacement: s.replacement.clone(),
                    requires: s.requires.as_ref().map(|r| r.to_lowercase()),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { priority, general, symbols })
    }

    /// Normalizes a (possibly multi-line) raw OCR string. Line structure is
    /// preserved; the level segmenter relies on it.
    pub fn normalize(&self, raw: &str) -> String {
        raw.lines()
            .map(|line| self.normalize_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn normalize_line(&self, line: &str) -> String {
        let mut text = line.to_string();

        for c in &self.priority {
            text = c.regex.replace_all(&text, NoExpand(&c.replace)).into_owned();
        }
        for c in &self.general {
            text = c.regex.replace_all(&text, NoExpand(&c.replace)).into_owned();
        }

        let lower = text.to_lowercase();
        for s in &self.symbols {
            if let Some(req) = &s.requires {
                if !lower.contains(req) {
                    continue;
                }
            }
            text = s.regex.replace_all(&text, s.replacement.as_str()).into_owned();
        }

        repair_spacing(&text)
    }
}

static MISSING_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([,.;:!?])([A-Za-z])").unwrap());
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.;:!?])").unwrap());

/// Collapses runs of whitespace and repairs inter-word spacing around
/// punctuation ("dice.Gain" → "dice. Gain").
fn repair_spacing(text: &str) -> String {
    let text = MISSING_SPACE.replace_all(text, "$1 $2");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

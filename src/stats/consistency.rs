//! Cross-validation of tier text against its structured effect record.
//!
//! Every check is advisory: findings are collected for human review and
//! never mutate the effect record.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use crate::extract::effect::{EffectRecord, ElderSignConversion};

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern).case_insensitive(true).build().unwrap()
}

static GREEN_MENTION: LazyLock<Regex> = LazyLock::new(|| ci(r"\bgreen\s+(?:dice|die)\b"));
static BLACK_MENTION: LazyLock<Regex> = LazyLock::new(|| ci(r"\bblack\s+(?:dice|die)\b"));
static ELDER_AS_SUCCESS: LazyLock<Regex> = LazyLock::new(|| {
    ci(r"\belder\s+signs?\b[^.!?]*\b(?:count|counts|success(?:es)?)\b")
});
static FREE_GRANT: LazyLock<Regex> =
    LazyLock::new(|| ci(r"\bfree\b[^.!?]*\b(?:attacks?|actions?)\b"));

/// Compares a tier's description against its extracted effects and reports
/// any discrepancies.
pub fn check(level_text: &str, effect: &EffectRecord) -> Vec<String> {
    let mut issues = Vec::new();

    if GREEN_MENTION.is_match(level_text) && effect.green_dice_added == 0 {
        issues.push("text mentions green dice but no green dice were extracted".to_string());
    }
    if BLACK_MENTION.is_match(level_text) && effect.black_dice_added == 0 {
        issues.push("text mentions black dice but no black dice were extracted".to_string());
    }
    if ELDER_AS_SUCCESS.is_match(level_text)
        && effect.elder_sign_successes == ElderSignConversion::None
    {
        issues.push(
            "text mentions elder signs counting as successes but no conversion was extracted"
                .to_string(),
        );
    }
    if FREE_GRANT.is_match(level_text) && effect.free_action.is_none() {
        issues.push("text mentions a free attack/action but none was extracted".to_string());
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::effect::{FreeAction, extract_effects};

    #[test]
    fn test_flags_missing_green_dice() {
        let text = "gain 2 green dice while attacking";
        let effect = EffectRecord::default();
        let issues = check(text, &effect);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("green dice"));
    }

    #[test]
    fn test_consistent_record_not_flagged() {
        let text = "gain 2 green dice while attacking";
        let effect = EffectRecord { green_dice_added: 2, ..Default::default() };
        assert!(check(text, &effect).is_empty());
    }

    #[test]
    fn test_extractor_output_is_consistent() {
        // Whatever the extractor finds should pass its own cross-check.
        for text in [
            "Gain 2 green dice and 1 black dice.",
            "Any number of elder signs count as successes.",
            "You may make a free attack.",
        ] {
            let effect = extract_effects(text);
            assert!(check(text, &effect).is_empty(), "self-inconsistent for {text:?}");
        }
    }

    #[test]
    fn test_flags_missing_elder_conversion() {
        let text = "Each elder sign counts as a success.";
        let issues = check(text, &EffectRecord::default());
        assert!(issues.iter().any(|i| i.contains("elder")));
    }

    #[test]
    fn test_flags_missing_free_action() {
        let text = "Make a free attack after moving.";
        let issues = check(text, &EffectRecord::default());
        assert!(issues.iter().any(|i| i.contains("free")));
        let effect = EffectRecord {
            free_action: Some(FreeAction { category: "attack".to_string() }),
            ..Default::default()
        };
        assert!(check(text, &effect).is_empty());
    }

    #[test]
    fn test_no_issues_on_plain_text() {
        assert!(check("Reroll one die per round.", &EffectRecord::default()).is_empty());
    }
}

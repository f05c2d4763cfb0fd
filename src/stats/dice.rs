//! Closed-form dice statistics.
//!
//! No simulation anywhere: expected successes come from linear expectation,
//! the fixed-count elder-sign conversion from an exact Poisson-binomial
//! distribution, and tentacle risk from a product over per-die
//! complements. All outputs are rounded to [`ROUND_DECIMALS`] places so
//! serialized records round-trip exactly.

use serde::{Deserialize, Serialize};

use crate::extract::effect::{EffectRecord, ElderSignConversion};

/// Fixed rounding policy for all real-valued statistics.
pub const ROUND_DECIMALS: i32 = 3;

/// Face probabilities of one die color. The blank face is the remainder.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DieFaces {
    pub success: f64,
    pub elder_sign: f64,
    pub tentacle: f64,
}

impl DieFaces {
    /// Probabilities must be valid and must not sum past 1.
    pub fn is_valid(&self) -> bool {
        let in_range =
            |p: f64| (0.0..=1.0).contains(&p);
        in_range(self.success)
            && in_range(self.elder_sign)
            && in_range(self.tentacle)
            && self.success + self.elder_sign + self.tentacle <= 1.0 + 1e-9
    }
}

/// Face-probability constants per die color.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DiceTable {
    pub green: DieFaces,
    pub black: DieFaces,
}

/// A pool of dice by color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DicePool {
    pub green: u32,
    pub black: u32,
}

impl DicePool {
    pub fn size(&self) -> u32 {
        self.green + self.black
    }
}

/// Derived, read-only statistics for one tier's effect against a base pool.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiceStatistics {
    pub base_expected_successes: f64,
    pub enhanced_expected_successes: f64,
    pub expected_increase: f64,
    /// Percent increase over the base expectation; `None` when the base
    /// expectation is zero (undefined, serialized as null).
    pub percent_increase: Option<f64>,
    /// Upper bound on extra successes: one per added die.
    pub max_successes_increase: u32,
    pub base_tentacle_risk: f64,
    pub enhanced_tentacle_risk: f64,
}

/// Computes the full statistics block for an effect applied to a base pool.
pub fn compute(table: &DiceTable, base: &DicePool, effect: &EffectRecord) -> DiceStatistics {
    let enhanced = DicePool {
        green: base.green + effect.green_dice_added,
        black: base.black + effect.black_dice_added,
    };

    // The conversion is granted by the effect, so the base expectation is
    // always conversion-free.
    let base_expected = expected_successes(table, base, ElderSignConversion::None);
    let enhanced_expected = expected_successes(table, &enhanced, effect.elder_sign_successes);

    let increase = enhanced_expected - base_expected;
    let percent = if base_expected == 0.0 {
        None
    } else {
        Some(round(increase / base_expected * 100.0))
    };

    DiceStatistics {
        base_expected_successes: round(base_expected),
        enhanced_expected_successes: round(enhanced_expected),
        expected_increase: round(increase),
        percent_increase: percent,
        max_successes_increase: effect.green_dice_added + effect.black_dice_added,
        base_tentacle_risk: round(tentacle_risk(table, base)),
        enhanced_tentacle_risk: round(tentacle_risk(table, &enhanced)),
    }
}

/// Expected successes of a pool, including the elder-sign conversion term.
fn expected_successes(table: &DiceTable, pool: &DicePool, conversion: ElderSignConversion) -> f64 {
    let dice = pool_faces(table, pool);
    let base: f64 = dice.iter().map(|d| d.success).sum();

    let conversion_term = match conversion {
        ElderSignConversion::None => 0.0,
        // Linear expectation: every rolled elder sign becomes a success.
        ElderSignConversion::Any => dice.iter().map(|d| d.elder_sign).sum(),
        // Order statistic: E[min(k, X)] where X is the elder-sign count.
        ElderSignConversion::Count(k) => {
            let probs: Vec<f64> = dice.iter().map(|d| d.elder_sign).collect();
            expected_min_k(&probs, k)
        }
    };

    base + conversion_term
}

/// Probability of at least one tentacle face across the pool.
fn tentacle_risk(table: &DiceTable, pool: &DicePool) -> f64 {
    let miss: f64 = pool_faces(table, pool).iter().map(|d| 1.0 - d.tentacle).product();
    1.0 - miss
}

fn pool_faces(table: &DiceTable, pool: &DicePool) -> Vec<DieFaces> {
    let mut dice = Vec::with_capacity(pool.size() as usize);
    dice.extend(std::iter::repeat_n(table.green, pool.green as usize));
    dice.extend(std::iter::repeat_n(table.black, pool.black as usize));
    dice
}

/// `E[min(k, X)]` where `X` is Poisson-binomial with the given per-die
/// probabilities, via exact convolution of the count distribution.
fn expected_min_k(probs: &[f64], k: u32) -> f64 {
    let dist = poisson_binomial(probs);
    dist.iter()
        .enumerate()
        .map(|(j, p)| (j as u32).min(k) as f64 * p)
        .sum()
}

/// Exact distribution of the number of hits in independent Bernoulli trials.
fn poisson_binomial(probs: &[f64]) -> Vec<f64> {
    let mut dist = vec![1.0f64];
    for &p in probs {
        let mut next = vec![0.0f64; dist.len() + 1];
        for (j, &q) in dist.iter().enumerate() {
            next[j] += q * (1.0 - p);
            next[j + 1] += q * p;
        }
        dist = next;
    }
    dist
}

fn round(v: f64) -> f64 {
    let factor = 10f64.powi(ROUND_DECIMALS);
    (v * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::effect::EffectRecord;

    fn table() -> DiceTable {
        DiceTable {
            green: DieFaces { success: 1.0 / 3.0, elder_sign: 1.0 / 6.0, tentacle: 1.0 / 6.0 },
            black: DieFaces { success: 0.5, elder_sign: 1.0 / 6.0, tentacle: 1.0 / 3.0 },
        }
    }

    fn effect(green: u32, black: u32) -> EffectRecord {
        EffectRecord { green_dice_added: green, black_dice_added: black, ..Default::default() }
    }

    #[test]
    fn test_zero_effect_equals_base() {
        let base = DicePool { green: 3, black: 1 };
        let s = compute(&table(), &base, &EffectRecord::default());
        assert_eq!(s.base_expected_successes, s.enhanced_expected_successes);
        assert_eq!(s.expected_increase, 0.0);
        assert_eq!(s.percent_increase, Some(0.0));
        assert_eq!(s.max_successes_increase, 0);
        assert_eq!(s.base_tentacle_risk, s.enhanced_tentacle_risk);
    }

    #[test]
    fn test_linear_expectation() {
        // 3 green at 1/3 success each = 1.0 expected.
        let s = compute(&table(), &DicePool { green: 3, black: 0 }, &EffectRecord::default());
        assert_eq!(s.base_expected_successes, 1.0);
    }

    #[test]
    fn test_added_dice_raise_expectation() {
        let base = DicePool { green: 3, black: 0 };
        let s = compute(&table(), &base, &effect(2, 0));
        // +2 green at 1/3: 1.0 -> 1.667
        assert_eq!(s.enhanced_expected_successes, 1.667);
        assert_eq!(s.expected_increase, 0.667);
        assert_eq!(s.percent_increase, Some(66.667));
        assert_eq!(s.max_successes_increase, 2);
    }

    #[test]
    fn test_monotone_in_added_dice() {
        let base = DicePool { green: 2, black: 1 };
        let mut prev = 0.0;
        for added in 0..6 {
            let s = compute(&table(), &base, &effect(added, added / 2));
            assert!(
                s.enhanced_expected_successes >= prev,
                "expectation dropped at added={added}"
            );
            assert!(s.expected_increase >= 0.0);
            prev = s.enhanced_expected_successes;
        }
    }

    #[test]
    fn test_any_conversion_adds_elder_expectation() {
        let base = DicePool { green: 3, black: 0 };
        let e = EffectRecord {
            elder_sign_successes: ElderSignConversion::Any,
            ..Default::default()
        };
        let s = compute(&table(), &base, &e);
        // 1.0 successes + 3 * 1/6 elder signs = 1.5
        assert_eq!(s.enhanced_expected_successes, 1.5);
    }

    #[test]
    fn test_count_conversion_order_statistic() {
        // Two dice with elder p = 1/2 each, convert at most 1:
        // E[min(1, X)] = P(X >= 1) = 3/4.
        let probs = vec![0.5, 0.5];
        assert!((expected_min_k(&probs, 1) - 0.75).abs() < 1e-12);
        // Unlimited k degenerates to the plain expectation.
        assert!((expected_min_k(&probs, 10) - 1.0).abs() < 1e-12);
        assert_eq!(expected_min_k(&probs, 0), 0.0);
    }

    #[test]
    fn test_count_conversion_capped_below_any() {
        let base = DicePool { green: 4, black: 0 };
        let any = EffectRecord {
            elder_sign_successes: ElderSignConversion::Any,
            ..Default::default()
        };
        let one = EffectRecord {
            elder_sign_successes: ElderSignConversion::Count(1),
            ..Default::default()
        };
        let s_any = compute(&table(), &base, &any);
        let s_one = compute(&table(), &base, &one);
        assert!(s_one.enhanced_expected_successes < s_any.enhanced_expected_successes);
        assert!(s_one.enhanced_expected_successes > s_one.base_expected_successes);
    }

    #[test]
    fn test_tentacle_risk() {
        // One green die: risk = 1/6.
        let s = compute(&table(), &DicePool { green: 1, black: 0 }, &EffectRecord::default());
        assert_eq!(s.base_tentacle_risk, 0.167);
        // Two green dice: 1 - (5/6)^2 = 11/36 = 0.306.
        let s = compute(&table(), &DicePool { green: 2, black: 0 }, &EffectRecord::default());
        assert_eq!(s.base_tentacle_risk, 0.306);
    }

    #[test]
    fn test_empty_base_pool_percent_undefined() {
        let s = compute(&table(), &DicePool::default(), &effect(1, 0));
        assert_eq!(s.base_expected_successes, 0.0);
        assert_eq!(s.percent_increase, None);
        assert!(s.enhanced_expected_successes > 0.0);
    }

    #[test]
    fn test_poisson_binomial_sums_to_one() {
        let dist = poisson_binomial(&[0.1, 0.5, 0.9, 1.0 / 6.0]);
        let total: f64 = dist.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(dist.len(), 5);
    }

    #[test]
    fn test_faces_validation() {
        assert!(table().green.is_valid());
        assert!(!DieFaces { success: 0.9, elder_sign: 0.2, tentacle: 0.2 }.is_valid());
        assert!(!DieFaces { success: -0.1, elder_sign: 0.0, tentacle: 0.0 }.is_valid());
    }
}

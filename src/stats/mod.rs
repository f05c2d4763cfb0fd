//! Game-balance statistics: the closed-form dice engine and the advisory
//! consistency checker.

pub mod consistency;
pub mod dice;

pub use consistency::check;
pub use dice::{DiceStatistics, DiceTable, DicePool, DieFaces, compute};

//! Text extraction stages: normalization, identity matching, level
//! segmentation and effect extraction.

pub mod effect;
pub mod identity;
pub mod normalize;
pub mod segment;

pub use effect::{EffectRecord, ElderSignConversion, FreeAction, extract_effects};
pub use identity::{IdentityMatcher, MatcherConfig};
pub use normalize::{Correction, CorrectionTables, Normalizer, SymbolRule};
pub use segment::{LevelText, SegmenterConfig, segment_levels};

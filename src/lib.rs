//! cardscan — turns photographs of character cards into structured,
//! queryable game data.
//!
//! The pipeline: percentage-based card layout → multi-strategy OCR →
//! text normalization → ability-name identification → level segmentation →
//! effect extraction → closed-form dice statistics → consistency checks.

pub mod config;
pub mod extract;
pub mod layout;
pub mod ocr;
pub mod pipeline;
pub mod record;
pub mod stats;

pub use config::PipelineConfig;
pub use pipeline::{CharacterJob, Pipeline, run_batch};
pub use record::CharacterRecord;

//! Dataset curation for frame dumps: near-duplicates are dropped by
//! difference hash, and the survivors are sorted into `selects/` and
//! `rejects/blurry/` by a frequency-domain sharpness score.

pub mod config;
pub mod core;
pub mod error;

pub use config::CurationConfig;
pub use crate::core::pipeline::{CurationSummary, Curator};
pub use error::{CurateError, Result};

//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod classifier;
mod repository;
mod text_extractor;

pub use classifier::{Classification, ClassificationRequest, Classifier};
pub use repository::{ImportStore, InsertOutcome};
pub use text_extractor::TextExtractor;

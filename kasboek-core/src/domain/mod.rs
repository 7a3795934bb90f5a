//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod account;
pub mod category;
pub mod import;
pub mod result;
mod transaction;

pub use account::Account;
pub use category::{Category, CategoryIndex, CategoryLabel, CategoryType};
pub use import::{
    DocumentError, DocumentKind, FailureKind, ImportFailure, ImportOutcome, ImportRequest,
    ImportSummary, ParsedDocument, UploadedDocument,
};
pub use transaction::{
    compute_fingerprint, EnrichedTransaction, NewTransaction, RawTransaction, TransactionDraft,
};

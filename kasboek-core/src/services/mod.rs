//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod delimited;
pub mod enrichment;
pub mod import;
pub mod logging;
pub mod migration;
pub mod normalize;
pub mod positional;
pub mod signature;

pub use delimited::{parse_delimited, parse_delimited_with};
pub use enrichment::{EnrichmentOrchestrator, EnrichmentReport};
pub use import::ImportService;
pub use logging::{EntryPoint, ImportStats, LogEntry, LogEvent, LogQuery, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use normalize::{cents_to_euro, parse_date, parse_date_any, string_to_cents};
pub use positional::{parse_pdf, parse_statement_text};
pub use signature::validate_file_signature;

//! Kasboek Core - Bank export import for household budgeting
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (RawTransaction, Category, Account, import types)
//! - **ports**: Trait definitions for external dependencies (ImportStore, Classifier, TextExtractor)
//! - **services**: Parsing pipelines, enrichment and the import entry point
//! - **adapters**: Concrete implementations (DuckDB, OpenAI, pdftotext, bank formats)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::disabled::DisabledClassifier;
use adapters::duckdb::DuckDbRepository;
use adapters::openai::OpenAiClassifier;
use adapters::pdftotext::PdftotextExtractor;
use config::Config;
use ports::Classifier;
use services::{EntryPoint, ImportService, LoggingService};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    Account, Category, CategoryLabel, CategoryType, FailureKind, ImportFailure, ImportOutcome,
    ImportRequest, ImportSummary, RawTransaction, UploadedDocument,
};

/// Main context for Kasboek operations
///
/// Holds the database, configuration, logger and the import service wired
/// to the configured classifier.
pub struct KasboekContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub logger: Option<Arc<LoggingService>>,
    pub import_service: ImportService,
}

impl KasboekContext {
    /// Create a new context rooted at `kasboek_dir`
    pub fn new(kasboek_dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        std::fs::create_dir_all(kasboek_dir)?;
        if !kasboek_dir.join("settings.json").exists() {
            // First run leaves the defaults behind for editing
            Config::default().save(kasboek_dir)?;
        }
        let config = Config::load(kasboek_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&kasboek_dir.join("kasboek.duckdb"))?);
        repository.ensure_schema()?;

        // A broken log database must not block imports
        let logger = match LoggingService::new(kasboek_dir, entry_point, env!("CARGO_PKG_VERSION")) {
            Ok(service) => Some(Arc::new(service)),
            Err(e) => {
                eprintln!("[kasboek] Logging disabled: {}", e);
                None
            }
        };

        let classifier: Arc<dyn Classifier> = match &config.api_key {
            Some(key) => Arc::new(OpenAiClassifier::new(&config.classifier, key.as_str())?),
            None => Arc::new(DisabledClassifier),
        };

        let mut import_service = ImportService::new(
            Arc::clone(&repository) as Arc<dyn ports::ImportStore>,
            classifier,
            Arc::new(PdftotextExtractor::new()),
            config.import.clone(),
        );
        if let Some(logger) = &logger {
            import_service = import_service.with_logger(Arc::clone(logger));
        }

        Ok(Self {
            config,
            repository,
            logger,
            import_service,
        })
    }
}

//! Import service - the entry point for uploaded bank exports
//!
//! Validates the request, picks the parser pipeline for the document kind,
//! and hands the parsed records to the enrichment orchestrator. Every
//! problem comes back as a typed [`ImportFailure`]; nothing panics past
//! this boundary.

use std::sync::Arc;

use serde_json::json;

use crate::config::ImportSettings;
use crate::domain::{
    CategoryIndex, DocumentError, DocumentKind, FailureKind, ImportFailure, ImportOutcome,
    ImportRequest, ImportSummary, ParsedDocument, UploadedDocument,
};
use crate::ports::{Classifier, ImportStore, TextExtractor};
use crate::services::delimited::parse_delimited;
use crate::services::enrichment::EnrichmentOrchestrator;
use crate::services::logging::{LogEvent, LoggingService};
use crate::services::positional::parse_pdf;
use crate::services::signature::validate_file_signature;

pub struct ImportService {
    store: Arc<dyn ImportStore>,
    classifier: Arc<dyn Classifier>,
    extractor: Arc<dyn TextExtractor>,
    settings: ImportSettings,
    logger: Option<Arc<LoggingService>>,
}

impl ImportService {
    pub fn new(
        store: Arc<dyn ImportStore>,
        classifier: Arc<dyn Classifier>,
        extractor: Arc<dyn TextExtractor>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            store,
            classifier,
            extractor,
            settings,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Import one document for a household
    pub async fn import(&self, request: ImportRequest) -> ImportOutcome {
        let result = self.run(request).await;
        match &result {
            Ok(summary) => self.log(
                LogEvent::new("import_completed")
                    .with_source(summary.adapter.as_str())
                    .with_details(format!(
                        "imported={} duplicates={} uncategorized={} categories_created={} warnings={}",
                        summary.imported_count,
                        summary.duplicate_count,
                        summary.uncategorized_count,
                        summary.categories_created.len(),
                        summary.warnings.len()
                    )),
            ),
            Err(failure) => {
                let mut event = LogEvent::new("import_failed")
                    .with_details(format!("kind={}", failure.kind.as_str()))
                    .with_error(failure.message.as_str());
                if let Some(adapter) = failure
                    .details
                    .as_ref()
                    .and_then(|d| d.get("adapter"))
                    .and_then(|a| a.as_str())
                {
                    event = event.with_source(adapter);
                }
                self.log(event)
            }
        }
        result
    }

    async fn run(&self, request: ImportRequest) -> ImportOutcome {
        if request.user_id.as_deref().map_or(true, |u| u.trim().is_empty()) {
            return Err(ImportFailure::new(FailureKind::Unauthorized, "Unauthorized"));
        }

        let household_id = match request.household_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(ImportFailure::new(
                    FailureKind::MissingHousehold,
                    "Household ID required",
                ))
            }
        };

        let document = match request.document {
            Some(doc) if !doc.bytes.is_empty() => doc,
            _ => return Err(ImportFailure::new(FailureKind::NoFile, "No file selected")),
        };

        let kind = document.kind();
        validate_file_signature(kind, &document.bytes)
            .map_err(|e| ImportFailure::new(FailureKind::InvalidFile, e.to_string()))?;

        self.log(
            LogEvent::new("import_started")
                .with_details(format!("kind={:?} bytes={}", kind, document.bytes.len())),
        );

        let parsed = self.parse(kind, document).await?;
        if let Some(err) = &parsed.document_error {
            let failure_kind = match err {
                DocumentError::NoTransactions(_) => FailureKind::NoTransactions,
                _ => FailureKind::ParseError,
            };
            return Err(ImportFailure::new(failure_kind, err.to_string()).with_details(json!({
                "adapter": parsed.adapter_key(),
                "warnings": parsed.warnings,
            })));
        }
        if parsed.transactions.is_empty() {
            return Err(
                ImportFailure::new(FailureKind::NoTransactions, "No transactions found")
                    .with_details(json!({
                        "adapter": parsed.adapter_key(),
                        "warnings": parsed.warnings,
                    })),
            );
        }

        let adapter = parsed.adapter_key().to_string();
        let ParsedDocument {
            transactions,
            warnings: parse_warnings,
            ..
        } = parsed;

        let account = self
            .store
            .get_or_create_default_account(&household_id, &self.settings.default_account_name)
            .await
            .map_err(internal)?;
        let categories = self
            .store
            .get_categories(&household_id)
            .await
            .map_err(internal)?;
        let mut index = CategoryIndex::from_categories(&categories);

        let mut orchestrator = EnrichmentOrchestrator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.classifier),
            self.settings.clone(),
        );
        if let Some(logger) = &self.logger {
            orchestrator = orchestrator.with_logger(Arc::clone(logger));
        }

        let report = orchestrator
            .run(&household_id, account.id, &mut index, transactions)
            .await
            .map_err(internal)?;

        let mut warnings = parse_warnings;
        warnings.extend(report.warnings);

        Ok(ImportSummary {
            imported_count: report.inserted,
            duplicate_count: report.duplicates,
            uncategorized_count: report.uncategorized,
            categories_created: report.categories_created,
            adapter,
            warnings,
        })
    }

    async fn parse(
        &self,
        kind: DocumentKind,
        document: UploadedDocument,
    ) -> Result<ParsedDocument, ImportFailure> {
        match kind {
            DocumentKind::DelimitedText => Ok(parse_delimited(&document.bytes)),
            DocumentKind::Pdf => {
                // Extraction runs a subprocess
                let extractor = Arc::clone(&self.extractor);
                tokio::task::spawn_blocking(move || parse_pdf(extractor.as_ref(), &document.bytes))
                    .await
                    .map_err(|e| {
                        ImportFailure::new(
                            FailureKind::InternalError,
                            format!("PDF processing task failed: {}", e),
                        )
                    })
            }
        }
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            logger.log_quietly(event);
        }
    }
}

fn internal(e: crate::domain::result::Error) -> ImportFailure {
    ImportFailure::new(FailureKind::InternalError, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::result::{Error, Result};
    use crate::ports::{Classification, ClassificationRequest};
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl Classifier for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        async fn classify(&self, _: &ClassificationRequest) -> Result<Option<Classification>> {
            Ok(None)
        }
    }

    struct NoPdf;

    impl TextExtractor for NoPdf {
        fn name(&self) -> &str {
            "none"
        }

        fn extract_text(&self, _: &[u8]) -> Result<String> {
            Err(Error::Extraction("unavailable".to_string()))
        }
    }

    fn service() -> ImportService {
        let repo = DuckDbRepository::in_memory().unwrap();
        repo.ensure_schema().unwrap();
        ImportService::new(
            Arc::new(repo),
            Arc::new(Silent),
            Arc::new(NoPdf),
            ImportSettings::default(),
        )
    }

    fn request(document: Option<UploadedDocument>) -> ImportRequest {
        ImportRequest {
            user_id: Some("user-1".to_string()),
            household_id: Some("h1".to_string()),
            document,
        }
    }

    fn kind_of(outcome: ImportOutcome) -> FailureKind {
        outcome.unwrap_err().kind
    }

    #[tokio::test]
    async fn test_request_checks_run_in_order() {
        let service = service();

        let mut req = request(None);
        req.user_id = None;
        req.household_id = None;
        assert_eq!(kind_of(service.import(req).await), FailureKind::Unauthorized);

        let mut req = request(None);
        req.household_id = Some("  ".to_string());
        assert_eq!(kind_of(service.import(req).await), FailureKind::MissingHousehold);

        assert_eq!(kind_of(service.import(request(None)).await), FailureKind::NoFile);

        let empty = UploadedDocument::new("export.csv", "text/csv", vec![]);
        assert_eq!(
            kind_of(service.import(request(Some(empty))).await),
            FailureKind::NoFile
        );
    }

    #[tokio::test]
    async fn test_signature_gate() {
        let service = service();
        let fake_pdf = UploadedDocument::new("afschrift.pdf", "application/pdf", b"hello".to_vec());
        assert_eq!(
            kind_of(service.import(request(Some(fake_pdf))).await),
            FailureKind::InvalidFile
        );

        let binary = UploadedDocument::new("export.csv", "text/csv", b"Datum\0\x01".to_vec());
        assert_eq!(
            kind_of(service.import(request(Some(binary))).await),
            FailureKind::InvalidFile
        );
    }

    #[tokio::test]
    async fn test_unknown_headers_are_parse_error() {
        let service = service();
        let doc = UploadedDocument::new("export.csv", "text/csv", b"a,b,c\n1,2,3\n".to_vec());
        let failure = service.import(request(Some(doc))).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParseError);
        assert_eq!(failure.message, "No supported bank format recognized");
    }

    #[tokio::test]
    async fn test_extraction_failure_is_parse_error() {
        let service = service();
        let doc = UploadedDocument::new("afschrift.pdf", "application/pdf", b"%PDF-1.7".to_vec());
        let failure = service.import(request(Some(doc))).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::ParseError);
        assert!(failure.message.contains("PDF processing failed"));
    }

    #[tokio::test]
    async fn test_all_rows_rejected_is_no_transactions() {
        let service = service();
        let csv = "Datum,Naam / Omschrijving,Rekening,Tegenrekening,Af Bij,Bedrag (EUR)\n\
                   notadate,Jumbo,NL01,,Af,\"12,50\"\n";
        let doc = UploadedDocument::new("export.csv", "text/csv", csv.as_bytes().to_vec());
        let failure = service.import(request(Some(doc))).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoTransactions);
        let details = failure.details.unwrap();
        assert_eq!(details["adapter"], "ING_NL");
        assert_eq!(details["warnings"].as_array().unwrap().len(), 1);
    }
}

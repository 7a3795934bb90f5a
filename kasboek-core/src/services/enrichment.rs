//! Batch enrichment - classify, reconcile categories, persist
//!
//! Records are processed in sequential chunks. Within a chunk every record
//! is classified on its own task; a shared semaphore caps how many
//! classifier calls are in flight and each retry attempt takes a fresh
//! slot. Results are collected by position, so output order always equals
//! input order whatever order the calls finish in.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::ImportSettings;
use crate::domain::result::Result;
use crate::domain::{
    CategoryIndex, CategoryLabel, CategoryType, EnrichedTransaction, NewTransaction,
    RawTransaction,
};
use crate::ports::{Classification, ClassificationRequest, Classifier, ImportStore};
use crate::services::logging::{LogEvent, LoggingService};

/// What happened to one record's classification
#[derive(Debug)]
enum Verdict {
    Classified(Classification),
    /// The classifier chose not to answer
    NoAnswer,
    /// Every attempt failed
    Exhausted { attempts: u32, error: String },
}

/// Totals for one enrichment run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EnrichmentReport {
    pub inserted: usize,
    pub duplicates: usize,
    /// Records that went to storage without a category
    pub uncategorized: usize,
    /// Category names created during the run, in creation order
    pub categories_created: Vec<String>,
    pub warnings: Vec<String>,
}

/// Drives classification and persistence for one household's records
pub struct EnrichmentOrchestrator {
    store: Arc<dyn ImportStore>,
    classifier: Arc<dyn Classifier>,
    settings: ImportSettings,
    logger: Option<Arc<LoggingService>>,
}

impl EnrichmentOrchestrator {
    pub fn new(
        store: Arc<dyn ImportStore>,
        classifier: Arc<dyn Classifier>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            store,
            classifier,
            settings,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Classify and persist `records` in chunks
    ///
    /// `index` is extended with every category created, so later chunks
    /// reuse categories created by earlier ones. Classifier failures never
    /// fail the run; storage failures do.
    pub async fn run(
        &self,
        household_id: &str,
        account_id: Uuid,
        index: &mut CategoryIndex,
        records: Vec<RawTransaction>,
    ) -> Result<EnrichmentReport> {
        let mut report = EnrichmentReport::default();
        let slots = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let chunk_size = self.settings.chunk_size.max(1);

        let mut offset = 0;
        let mut records = records.into_iter().peekable();
        while records.peek().is_some() {
            let chunk: Vec<RawTransaction> = records.by_ref().take(chunk_size).collect();
            let chunk_len = chunk.len();

            let enriched = self
                .classify_chunk(chunk, offset, &slots, &mut report)
                .await;
            self.reconcile_categories(household_id, &enriched, index, &mut report)
                .await?;

            let rows: Vec<NewTransaction> = enriched
                .into_iter()
                .map(|e| to_row(household_id, account_id, index, e))
                .collect();
            report.uncategorized += rows.iter().filter(|r| r.category_id.is_none()).count();

            let outcome = self.store.insert_transactions(&rows).await?;
            report.inserted += outcome.inserted;
            report.duplicates += outcome.duplicates;

            offset += chunk_len;
        }

        Ok(report)
    }

    /// Classify one chunk concurrently, keeping input order
    async fn classify_chunk(
        &self,
        chunk: Vec<RawTransaction>,
        offset: usize,
        slots: &Arc<Semaphore>,
        report: &mut EnrichmentReport,
    ) -> Vec<EnrichedTransaction> {
        let mut handles = Vec::with_capacity(chunk.len());
        for record in &chunk {
            let request = ClassificationRequest {
                description: record.description.clone(),
                amount: record.amount(),
                counterparty: record.counterparty_name.clone(),
            };
            let classifier = Arc::clone(&self.classifier);
            let slots = Arc::clone(slots);
            let max_attempts = self.settings.max_attempts.max(1);
            let backoff = self.settings.retry_backoff();

            handles.push(tokio::spawn(async move {
                classify_with_retry(classifier, slots, request, max_attempts, backoff).await
            }));
        }

        let mut enriched = Vec::with_capacity(chunk.len());
        for (i, (record, handle)) in chunk.into_iter().zip(handles).enumerate() {
            let position = offset + i + 1;
            let verdict = match handle.await {
                Ok(verdict) => verdict,
                Err(e) => Verdict::Exhausted {
                    attempts: 0,
                    error: format!("classification task failed: {}", e),
                },
            };

            let (category, confidence) = match verdict {
                Verdict::Classified(c) => (Some(c.category), Some(c.confidence)),
                Verdict::NoAnswer => (None, None),
                Verdict::Exhausted { attempts, error } => {
                    report.warnings.push(format!(
                        "record {}: not categorized after {} attempt(s): {}",
                        position, attempts, error
                    ));
                    if let Some(logger) = &self.logger {
                        logger.log_quietly(
                            LogEvent::new("classifier_retry_exhausted")
                                .with_source(self.classifier.name())
                                .with_details(format!("attempts={}", attempts))
                                .with_error(error),
                        );
                    }
                    (None, None)
                }
            };

            enriched.push(EnrichedTransaction {
                transaction: record,
                category,
                confidence,
            });
        }

        enriched
    }

    /// Create one category per label not yet in the index
    ///
    /// The type follows the sign of the first record carrying the label.
    async fn reconcile_categories(
        &self,
        household_id: &str,
        enriched: &[EnrichedTransaction],
        index: &mut CategoryIndex,
        report: &mut EnrichmentReport,
    ) -> Result<()> {
        let mut missing: Vec<(CategoryLabel, i64)> = Vec::new();
        for item in enriched {
            let Some(label) = item.category else {
                continue;
            };
            if index.contains(label.as_str()) || missing.iter().any(|(l, _)| *l == label) {
                continue;
            }
            missing.push((label, item.transaction.amount_cents));
        }

        for (label, sample_cents) in missing {
            let category = self
                .store
                .create_category(
                    household_id,
                    label.as_str(),
                    CategoryType::from_amount(sample_cents),
                )
                .await?;
            index.insert(&category.name, category.id);
            report.categories_created.push(category.name);
        }

        Ok(())
    }
}

async fn classify_with_retry(
    classifier: Arc<dyn Classifier>,
    slots: Arc<Semaphore>,
    request: ClassificationRequest,
    max_attempts: u32,
    backoff: Duration,
) -> Verdict {
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        let outcome = {
            let _slot = match slots.acquire().await {
                Ok(slot) => slot,
                Err(e) => {
                    return Verdict::Exhausted {
                        attempts: attempt - 1,
                        error: e.to_string(),
                    }
                }
            };
            classifier.classify(&request).await
        };

        match outcome {
            Ok(Some(classification)) => return Verdict::Classified(classification),
            Ok(None) => return Verdict::NoAnswer,
            Err(e) => {
                last_error = e.to_string();
                if attempt < max_attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    Verdict::Exhausted {
        attempts: max_attempts,
        error: last_error,
    }
}

fn to_row(
    household_id: &str,
    account_id: Uuid,
    index: &CategoryIndex,
    enriched: EnrichedTransaction,
) -> NewTransaction {
    let category_id = enriched.category.and_then(|label| index.get(label.as_str()));
    let tx = enriched.transaction;
    NewTransaction {
        id: Uuid::new_v4(),
        household_id: household_id.to_string(),
        account_id,
        category_id,
        date: tx.date,
        amount_cents: tx.amount_cents,
        description: tx.description,
        counterparty_name: tx.counterparty_name,
        counterparty_iban: tx.counterparty_iban,
        import_hash: tx.import_hash,
    }
}

//! Classifier port - external transaction categorization

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::result::Result;
use crate::domain::CategoryLabel;

/// Input for one classification call
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub description: String,
    /// Decimal currency value, negative for expenses
    pub amount: Decimal,
    pub counterparty: Option<String>,
}

/// Classifier answer for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: CategoryLabel,
    /// 0.0 ..= 1.0
    pub confidence: f64,
    pub reasoning: String,
}

/// Transaction classifier
///
/// `Ok(None)` means the classifier chose not to answer. An `Err` is treated
/// as transient and may be retried by the caller.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classifier name (e.g., "openai", "disabled")
    fn name(&self) -> &str;

    async fn classify(&self, request: &ClassificationRequest) -> Result<Option<Classification>>;
}

//! Classifier used when no API key is configured

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::ports::{Classification, ClassificationRequest, Classifier};

/// Never answers; every record is stored without a category
pub struct DisabledClassifier;

#[async_trait]
impl Classifier for DisabledClassifier {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn classify(&self, _request: &ClassificationRequest) -> Result<Option<Classification>> {
        Ok(None)
    }
}

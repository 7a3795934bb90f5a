//! OpenAI classifier
//!
//! Calls the chat completions endpoint with a JSON-schema response format
//! restricted to the closed label set.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use url::Url;

use crate::config::ClassifierSettings;
use crate::domain::result::{Error, Result};
use crate::domain::CategoryLabel;
use crate::ports::{Classification, ClassificationRequest, Classifier};

const SYSTEM_PROMPT: &str = "You categorize Dutch bank transactions for a household budget.";

pub struct OpenAiClassifier {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct Msg {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct Req {
    model: String,
    messages: Vec<Msg>,
    temperature: f32,
    response_format: JsonValue,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MsgOut,
}

#[derive(Deserialize)]
struct MsgOut {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct Answer {
    category: String,
    confidence: f64,
    reasoning: String,
}

impl OpenAiClassifier {
    pub fn new(settings: &ClassifierSettings, api_key: impl Into<String>) -> Result<Self> {
        // Without a trailing slash `join` would replace the last segment
        let mut base = Url::parse(&settings.base_url)
            .map_err(|e| Error::Config(format!("Invalid classifier base URL: {}", e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("chat/completions")
            .map_err(|e| Error::Config(format!("Invalid classifier base URL: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            model: settings.model.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_body(&self, request: &ClassificationRequest) -> Req {
        Req {
            model: self.model.clone(),
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                Msg {
                    role: "user",
                    content: build_prompt(request),
                },
            ],
            temperature: 0.0,
            response_format: response_schema(),
        }
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    fn name(&self) -> &str {
        "openai"
    }

    async fn classify(&self, request: &ClassificationRequest) -> Result<Option<Classification>> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| Error::classifier(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(Error::classifier(format!("openai error: {} {}", status, txt)));
        }

        let out: Resp = resp
            .json()
            .await
            .map_err(|e| Error::classifier(format!("malformed response: {}", e)))?;

        let message = out
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| Error::classifier("response has no choices"))?;

        if message.refusal.is_some() {
            return Ok(None);
        }

        let content = message
            .content
            .ok_or_else(|| Error::classifier("response has no content"))?;
        parse_answer(&content).map(Some)
    }
}

fn build_prompt(request: &ClassificationRequest) -> String {
    format!(
        r#"Categorize the following bank transaction into one of the predefined categories.

Transaction details:
- Description: "{}"
- Amount: {} EUR
- Counterparty: "{}"

Context:
- Negative amounts are usually expenses.
- Positive amounts are usually income (Salaris, Toeslagen, Teruggave).
- "Albert Heijn", "Jumbo", "Lidl" are usually "Boodschappen".
- "Shell", "Esso", "NS" are usually "Vervoer".
- "Ziggo", "KPN" are usually "Internet/TV" or "Mobiel".

Provide the most likely category, a confidence score (0-1), and a brief reasoning."#,
        request.description,
        request.amount,
        request.counterparty.as_deref().unwrap_or("Unknown"),
    )
}

fn response_schema() -> JsonValue {
    let labels: Vec<&str> = CategoryLabel::ALL.iter().map(|l| l.as_str()).collect();
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "categorization",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "category": { "type": "string", "enum": labels },
                    "confidence": { "type": "number" },
                    "reasoning": { "type": "string" }
                },
                "required": ["category", "confidence", "reasoning"],
                "additionalProperties": false
            }
        }
    })
}

fn parse_answer(content: &str) -> Result<Classification> {
    let answer: Answer = serde_json::from_str(content)
        .map_err(|e| Error::classifier(format!("malformed answer: {}", e)))?;

    let category: CategoryLabel = answer.category.parse()?;
    if !(0.0..=1.0).contains(&answer.confidence) {
        return Err(Error::classifier(format!(
            "confidence {} out of range",
            answer.confidence
        )));
    }

    Ok(Classification {
        category,
        confidence: answer.confidence,
        reasoning: answer.reasoning,
    })
}

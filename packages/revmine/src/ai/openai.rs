//! OpenAI implementation of the DocumentAi trait.
//!
//! A reference implementation using OpenAI's chat completions API in JSON
//! mode. Model responses are untrusted input: numeric fields arrive as
//! strings often enough that parsing coerces them, warns, and falls back to
//! zero instead of failing the whole snippet.
//!
//! # Example
//!
//! ```rust,ignore
//! use revmine::ai::OpenAi;
//!
//! let ai = OpenAi::from_env()?.with_model("gpt-4o-mini");
//! let orchestrator = Orchestrator::new(ai, therapies);
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::RunContext;
use crate::error::{PipelineError, Result};
use crate::pipeline::prompts;
use crate::traits::{
    ClassifyResponse, DocumentAi, ExtractResponse, ExtractionFocus, StructureResponse,
    VerifyResponse,
};
use crate::types::{
    DocumentStructure, ExtractionResult, PageIndexedText, RevenueRecord, SectionKind,
    StructureSection, Therapy,
};

const SYSTEM_PROMPT: &str =
    "You are a financial document analyst. Answer only with the JSON object the prompt asks for.";

/// Character budget for the structure-analysis input. Long filings get
/// truncated; headings past this point are rare enough to live without.
const MAX_STRUCTURE_CHARS: usize = 48_000;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// OpenAI-based DocumentAi implementation.
#[derive(Clone)]
pub struct OpenAi {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAi {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| PipelineError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the current model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Make a JSON-mode chat completion request.
    ///
    /// Returns the raw response text plus the tokens the call consumed.
    async fn chat_json(&self, user: &str) -> std::result::Result<(String, u64), BoxedError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: Some(0.0),
            max_tokens: Some(4096),
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("OpenAI API error: {error_text}").into());
        }

        let chat_response: ChatResponse = response.json().await?;
        let tokens = chat_response
            .usage
            .as_ref()
            .map(|u| u.total_tokens)
            .unwrap_or(0);

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or("No response from OpenAI")?;

        Ok((content, tokens))
    }
}

#[async_trait]
impl DocumentAi for OpenAi {
    async fn classify(&self, ctx: &RunContext, sample: &str) -> Result<ClassifyResponse> {
        let prompt = prompts::format_classify_prompt(ctx, sample);
        let (response, tokens) = self
            .chat_json(&prompt)
            .await
            .map_err(PipelineError::Classification)?;

        let wire: ClassifyWire = parse_json(&response)
            .map_err(|e| PipelineError::Classification(Box::new(e)))?;

        Ok(ClassifyResponse {
            report_type: wire.report_type.unwrap_or_else(|| "other".to_string()),
            company_name: non_empty(wire.company_name),
            reporting_period: non_empty(wire.reporting_period),
            tokens_used: tokens,
        })
    }

    async fn analyze_structure(
        &self,
        ctx: &RunContext,
        text: &PageIndexedText,
    ) -> Result<StructureResponse> {
        let marked: String = text
            .iter()
            .map(|(page, body)| format!("=== PAGE {page} ===\n{body}\n"))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt =
            prompts::format_structure_prompt(ctx, truncate_utf8(&marked, MAX_STRUCTURE_CHARS));

        let (response, tokens) = self
            .chat_json(&prompt)
            .await
            .map_err(PipelineError::StructureAnalysis)?;

        let wire: StructureWire = parse_json(&response)
            .map_err(|e| PipelineError::StructureAnalysis(Box::new(e)))?;

        let sections = wire
            .sections
            .into_iter()
            .map(|s| StructureSection {
                title: s.title,
                page_start: s.page_start.max(1),
                page_end: coerce_page_end(s.page_end),
                kind: SectionKind::parse(&s.kind),
                confidence: coerce_confidence(s.confidence.unwrap_or(0.0)),
            })
            .collect();

        Ok(StructureResponse {
            structure: DocumentStructure {
                has_explicit_structure: wire.has_explicit_structure,
                sections,
            },
            tokens_used: tokens,
        })
    }

    async fn verify_revenue(
        &self,
        ctx: &RunContext,
        snippet: &str,
        therapy_name: &str,
    ) -> Result<VerifyResponse> {
        let prompt = prompts::format_verify_prompt(ctx, snippet, therapy_name);
        let (response, tokens) = self
            .chat_json(&prompt)
            .await
            .map_err(PipelineError::Verification)?;

        let wire: VerifyWire =
            parse_json(&response).map_err(|e| PipelineError::Verification(Box::new(e)))?;

        Ok(VerifyResponse {
            contains_revenue_data: wire.contains_revenue_data,
            confidence: coerce_confidence(wire.confidence.unwrap_or(0.0)),
            reasoning: wire.reasoning.unwrap_or_default(),
            tokens_used: tokens,
        })
    }

    async fn extract_revenue(
        &self,
        ctx: &RunContext,
        snippet: &str,
        therapies: &[Therapy],
        focus: ExtractionFocus,
    ) -> Result<ExtractResponse> {
        let template = match focus {
            ExtractionFocus::Revenue => prompts::EXTRACT_REVENUE_PROMPT,
            ExtractionFocus::BusinessInsight => prompts::EXTRACT_BUSINESS_PROMPT,
        };
        let prompt = prompts::format_extract_prompt(template, ctx, snippet, therapies);

        let (response, tokens) = self
            .chat_json(&prompt)
            .await
            .map_err(PipelineError::Extraction)?;

        let wire: ExtractWire =
            parse_json(&response).map_err(|e| PipelineError::Extraction(Box::new(e)))?;

        let records = wire
            .records
            .into_iter()
            .map(|r| RevenueRecord {
                therapy_name: r.therapy_name,
                period: r.period,
                region: r.region.unwrap_or_else(|| "Worldwide".to_string()),
                revenue_millions_usd: coerce_amount(&r.revenue_millions_usd),
                sources: r.sources,
            })
            .collect();

        Ok(ExtractResponse {
            result: ExtractionResult::new(
                records,
                coerce_confidence(wire.confidence.unwrap_or(0.0)),
            ),
            tokens_used: tokens,
        })
    }
}

/// Parse a JSON response, tolerating a markdown code fence around it.
fn parse_json<T: serde::de::DeserializeOwned>(
    response: &str,
) -> std::result::Result<T, serde_json::Error> {
    serde_json::from_str(response).or_else(|_| {
        let json_str = response
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        serde_json::from_str(json_str)
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Cut at a character boundary at or before `max_bytes`.
fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Models sometimes report an open-ended section as null or -1.
fn coerce_page_end(value: Option<i64>) -> Option<u32> {
    match value {
        Some(v) if v > 0 => Some(v as u32),
        _ => None,
    }
}

fn coerce_confidence(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Amounts come back as numbers or as strings like "1,234.5".
/// Anything unparseable or negative is reported as zero with a warning
/// rather than failing the snippet.
fn coerce_amount(value: &serde_json::Value) -> f64 {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };

    match parsed {
        Some(amount) if amount >= 0.0 && amount.is_finite() => amount,
        Some(amount) => {
            warn!(amount, "Discarding negative or non-finite revenue amount");
            0.0
        }
        None => {
            warn!(raw = %value, "Unparseable revenue amount, recording zero");
            0.0
        }
    }
}

// Request/Response types

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Deserialize)]
struct ClassifyWire {
    #[serde(default)]
    report_type: Option<String>,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    reporting_period: Option<String>,
}

#[derive(Deserialize)]
struct StructureWire {
    #[serde(default)]
    has_explicit_structure: bool,
    #[serde(default)]
    sections: Vec<SectionWire>,
}

#[derive(Deserialize)]
struct SectionWire {
    title: String,
    page_start: u32,
    #[serde(default)]
    page_end: Option<i64>,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Deserialize)]
struct VerifyWire {
    #[serde(default)]
    contains_revenue_data: bool,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Deserialize)]
struct ExtractWire {
    #[serde(default)]
    records: Vec<RecordWire>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Deserialize)]
struct RecordWire {
    therapy_name: String,
    period: String,
    #[serde(default)]
    region: Option<String>,
    revenue_millions_usd: serde_json::Value,
    #[serde(default)]
    sources: Vec<String>,
}

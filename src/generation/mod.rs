//! Event description generation.
//!
//! A request carries a title plus optional category and free-text details.
//! The title is validated, a prompt is assembled from fixed sentences, and the
//! prompt is handed to a [`DescriptionGenerator`] which makes exactly one
//! upstream call. Nothing is cached or retried.

mod gemini;

pub use gemini::{GeminiClient, GenerationConfig, GENERATION_CONFIG};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, TITLE_REQUIRED};

/// Returned when the upstream reply has no usable text
pub const FALLBACK_DESCRIPTION: &str = "Unable to generate description";

/// Closing instruction appended to every prompt
pub const CLOSING_INSTRUCTION: &str = " The description should be engaging, informative, and between 100-200 words. Focus on the value attendees will get from the event.";

/// Body of `POST /generate-description`
///
/// Fields are kept as raw JSON values: any truthy value is accepted and
/// rendered as text, so `{"title": 2024}` still produces a prompt.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub title: Option<Value>,
    /// Event category, e.g. "conference" or "workshop"
    pub kind: Option<Value>,
    pub details: Option<Value>,
}

/// Body of a successful generation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub description: String,
}

impl GenerationRequest {
    /// Read the request fields out of a parsed body.
    ///
    /// `null` cannot be destructured and is a failed request. Any other
    /// non-object body simply has no title.
    pub fn from_body(body: &Value) -> Result<Self, ApiError> {
        match body {
            Value::Null => Err(ApiError::UpstreamFailure("Request body is null".to_string())),
            Value::Object(fields) => Ok(Self {
                title: fields.get("title").cloned(),
                kind: fields.get("type").cloned(),
                details: fields.get("details").cloned(),
            }),
            _ => Ok(Self::default()),
        }
    }

    /// Validate the request and build the prompt for it
    pub fn prompt(&self) -> Result<String, ApiError> {
        let title =
            field_text(self.title.as_ref()).ok_or_else(|| ApiError::invalid(TITLE_REQUIRED))?;

        Ok(build_prompt(
            &title,
            field_text(self.kind.as_ref()).as_deref(),
            field_text(self.details.as_ref()).as_deref(),
        ))
    }
}

/// Text of a truthy field, `None` for absent, `null`, `false`, `0` and `""`
fn field_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Assemble the prompt. Empty `kind` or `details` are treated as absent.
pub fn build_prompt(title: &str, kind: Option<&str>, details: Option<&str>) -> String {
    let mut prompt = format!(
        "Write a compelling and professional event description for an event titled \"{}\".",
        title
    );

    if let Some(kind) = kind.filter(|k| !k.is_empty()) {
        prompt.push_str(&format!(" This is a {} event.", kind));
    }

    if let Some(details) = details.filter(|d| !d.is_empty()) {
        prompt.push_str(&format!(" Here are some key details to include: {}", details));
    }

    prompt.push_str(CLOSING_INSTRUCTION);
    prompt
}

/// Something that turns a prompt into a description
#[async_trait]
pub trait DescriptionGenerator: Send + Sync + 'static {
    /// Make a single generation attempt
    async fn generate(&self, prompt: &str) -> Result<String, ApiError>;
}

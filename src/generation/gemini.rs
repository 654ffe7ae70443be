use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use url::Url;

use super::{DescriptionGenerator, FALLBACK_DESCRIPTION};
use crate::config::Config;
use crate::error::{config_error, ApiError, AppResult};

/// Sampling settings sent with every generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Fixed generation settings
pub const GENERATION_CONFIG: GenerationConfig = GenerationConfig {
    temperature: 0.7,
    max_output_tokens: 500,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
}

impl GeminiClient {
    /// Build a client for the configured model
    pub fn new(config: &Config) -> AppResult<Self> {
        let endpoint = build_endpoint(
            &config.gemini_base_url,
            &config.gemini_model,
            &config.gemini_api_key,
        )?;
        info!("Using Gemini model: {}", config.gemini_model);

        Ok(Self {
            client: Client::new(),
            endpoint,
        })
    }
}

/// `{base}/models/{model}:generateContent?key={api_key}`
fn build_endpoint(base_url: &str, model: &str, api_key: &str) -> AppResult<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| config_error(&format!("Invalid GEMINI_BASE_URL: {}", e)))?;

    url.path_segments_mut()
        .map_err(|_| config_error("GEMINI_BASE_URL cannot be used as a base"))?
        .pop_if_empty()
        .push("models")
        .push(&format!("{}:generateContent", model));
    url.query_pairs_mut().append_pair("key", api_key);

    Ok(url)
}

/// First candidate's first text part, if present and non-empty
fn extract_text(body: &Value) -> Option<&str> {
    body.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .filter(|text| !text.is_empty())
}

#[async_trait]
impl DescriptionGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GENERATION_CONFIG,
        };

        let res = self
            .client
            .post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::UpstreamFailure(format!("Failed to reach Gemini: {}", e.without_url())))?;

        if !res.status().is_success() {
            let status = res.status();
            let error_body = res.text().await.unwrap_or_default();
            error!("Gemini API error: {}", error_body);
            return Err(ApiError::UpstreamFailure(format!(
                "Gemini returned error status {}",
                status
            )));
        }

        let data: Value = res.json().await.map_err(|e| {
            ApiError::UpstreamFailure(format!("Failed to parse Gemini response: {}", e.without_url()))
        })?;

        match extract_text(&data) {
            Some(text) => Ok(text.to_string()),
            None => {
                warn!("Gemini response had no candidate text, using fallback");
                Ok(FALLBACK_DESCRIPTION.to_string())
            }
        }
    }
}

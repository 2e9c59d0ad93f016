use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::config::AppConfig;
use crate::core::vision::{InlineImage, VisionClient};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

// --- Request ---

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

fn build_request<'a>(prompt: &'a str, image: &'a InlineImage) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![
                Part {
                    text: Some(prompt),
                    inline_data: None,
                },
                Part {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: image.mime_type,
                        data: &image.data,
                    }),
                },
            ],
        }],
    }
}

// --- Response ---

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Concatenate the text parts of the first candidate, if there is any text.
fn response_text(resp: GenerateResponse) -> Option<String> {
    let content = resp.candidates.into_iter().next()?.content?;
    let text: String = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Client for the Gemini `generateContent` REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from config. The `GEMINI_API_KEY` env var wins over `vision.api_key`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = resolve_api_key(std::env::var(API_KEY_ENV).ok(), config)?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.vision.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(
            http,
            config.vision.endpoint.clone(),
            config.vision.model.clone(),
            api_key,
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

fn resolve_api_key(env_value: Option<String>, config: &AppConfig) -> Result<String> {
    env_value
        .filter(|k| !k.is_empty())
        .or_else(|| config.vision.api_key.clone().filter(|k| !k.is_empty()))
        .with_context(|| {
            format!(
                "No Gemini API key: set {} or vision.api_key in {}",
                API_KEY_ENV,
                AppConfig::config_path().display()
            )
        })
}

#[async_trait]
impl VisionClient for GeminiClient {
    async fn generate(&self, prompt: &str, image: &InlineImage) -> Result<Option<String>> {
        tracing::debug!(model = %self.model, "sending generateContent request");

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(prompt, image))
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            anyhow::bail!("Gemini rejected the request (HTTP {}), check your API key", status.as_u16());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini HTTP {}: {}", status.as_u16(), body);
        }

        let data: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        Ok(response_text(data))
    }
}

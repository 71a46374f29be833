//! HTTP adapter for the Gemini interpretation gateway.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use quickcal_core::{InterpretRequest, Interpreter, RefineRequest};
use quickcal_domain::constants::{
    DEFAULT_MODEL, MAX_ATTACHED_IMAGES, MAX_IMAGE_SIZE_BYTES, MAX_TOTAL_IMAGE_BYTES,
};
use quickcal_domain::utils::datetime::format_local;
use quickcal_domain::{ImageInput, InterpretedDraft, QuickCalError, Result};
use regex::Regex;
use reqwest::{Method, StatusCode};
use tracing::{debug, info, warn};

use crate::http::HttpClient;

use super::prompt::{build_interpret_prompt, build_refine_prompt};
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const GEMINI_TEMPERATURE: f32 = 0.2;
const LOG_PREVIEW_CHARS: usize = 120;

// Fenced code block, with or without a "json" tag.
#[allow(clippy::unwrap_used)] // pattern is a compile-time constant
static FENCED_JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)```").unwrap());

/// Gemini client implementing the [`Interpreter`] port.
///
/// Requests pin the response to JSON via `generationConfig`, but the model
/// occasionally wraps the payload in a fenced block anyway, so the parser
/// accepts both.
pub struct GeminiClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, http: HttpClient) -> Self {
        Self { http, api_key: api_key.into(), base_url: GEMINI_API_BASE.to_string() }
    }

    /// Point the client at a custom endpoint (for testing).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        images: &[ImageInput],
    ) -> Result<InterpretedDraft> {
        validate_images(images)?;

        let mut model = model.to_string();
        let mut fallback_available = model != DEFAULT_MODEL;

        loop {
            let endpoint = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
            let payload = GenerateContentRequest {
                generation_config: GenerationConfig {
                    temperature: GEMINI_TEMPERATURE,
                    response_mime_type: "application/json".to_string(),
                },
                contents: vec![Content { role: "user".to_string(), parts: build_parts(prompt, images) }],
            };

            debug!(
                %model,
                image_count = images.len(),
                prompt_preview = %preview(prompt),
                "sending generateContent request"
            );

            let builder = self
                .http
                .request(Method::POST, &endpoint)
                .query(&[("key", self.api_key.as_str())])
                .json(&payload);
            let response = self.http.send(builder).await?;
            let status = response.status();

            if status.is_success() {
                let payload: GenerateContentResponse = response.json().await.map_err(|err| {
                    QuickCalError::Interpretation(format!("応答の解析に失敗しました: {err}"))
                })?;
                return parse_draft(&payload.text());
            }

            let body = response.text().await.unwrap_or_default();
            let lower = body.to_lowercase();
            let model_not_found = status == StatusCode::NOT_FOUND
                && (lower.contains("not found") || lower.contains("not_found"));

            // A single fallback hop to the default model, never chained.
            if model_not_found && fallback_available {
                warn!(requested = %model, fallback = DEFAULT_MODEL, "model not found, falling back");
                model = DEFAULT_MODEL.to_string();
                fallback_available = false;
                continue;
            }

            return Err(match status.as_u16() {
                401 | 403 => QuickCalError::Auth(format!(
                    "Gemini APIの認証に失敗しました（{}）。APIキーを確認してください。",
                    status.as_u16()
                )),
                _ => QuickCalError::Interpretation(format!(
                    "Gemini API error: {} {}",
                    status.as_u16(),
                    body
                )),
            });
        }
    }
}

#[async_trait]
impl Interpreter for GeminiClient {
    async fn interpret(&self, request: InterpretRequest) -> Result<InterpretedDraft> {
        info!(
            model = %request.settings.model,
            image_count = request.images.len(),
            input_preview = %preview(&request.text),
            "interpreting input"
        );

        let now_local = format_local(chrono::Local::now().naive_local());
        let prompt = build_interpret_prompt(&request, &now_local);
        let draft = self.generate(&request.settings.model, &prompt, &request.images).await?;

        info!(
            has_title = !draft.title.trim().is_empty(),
            has_start = !draft.start.trim().is_empty(),
            has_end = !draft.end.trim().is_empty(),
            needs_clarification = draft.needs_clarification,
            "interpretation done"
        );
        Ok(draft)
    }

    async fn refine(&self, request: RefineRequest) -> Result<InterpretedDraft> {
        info!(
            model = %request.settings.model,
            image_count = request.images.len(),
            question_preview = %preview(&request.question),
            answer_preview = %preview(&request.answer),
            "refining draft"
        );

        let now_local = format_local(chrono::Local::now().naive_local());
        let prompt = build_refine_prompt(&request, &now_local);
        self.generate(&request.settings.model, &prompt, &request.images).await
    }
}

fn preview(text: &str) -> String {
    text.chars().take(LOG_PREVIEW_CHARS).collect()
}

fn build_parts(prompt: &str, images: &[ImageInput]) -> Vec<Part> {
    let mut parts = vec![Part::text(prompt)];
    for image in images {
        parts.push(Part::inline_image(image.mime_type.clone(), image.data_base64.clone()));
    }
    parts
}

/// Enforce the attachment limits before anything goes on the wire.
fn validate_images(images: &[ImageInput]) -> Result<()> {
    if images.len() > MAX_ATTACHED_IMAGES {
        return Err(QuickCalError::InvalidInput(format!(
            "画像は最大{MAX_ATTACHED_IMAGES}件までです。"
        )));
    }

    let mut total_bytes = 0usize;
    for image in images {
        if !image.mime_type.starts_with("image/") {
            return Err(QuickCalError::InvalidInput(format!(
                "画像形式のみ対応しています: {}",
                image.name
            )));
        }
        if image.data_base64.is_empty() {
            return Err(QuickCalError::InvalidInput(format!("画像データが空です: {}", image.name)));
        }

        let size = image.resolved_size();
        if size > MAX_IMAGE_SIZE_BYTES {
            return Err(QuickCalError::InvalidInput(format!(
                "画像サイズが大きすぎます（最大{}MB）: {}",
                MAX_IMAGE_SIZE_BYTES / (1024 * 1024),
                image.name
            )));
        }

        total_bytes += size;
        if total_bytes > MAX_TOTAL_IMAGE_BYTES {
            return Err(QuickCalError::InvalidInput(format!(
                "添付画像の合計サイズが大きすぎます（最大{}MB）。",
                MAX_TOTAL_IMAGE_BYTES / (1024 * 1024)
            )));
        }
    }

    Ok(())
}

/// Pull the JSON object out of the model's text response.
fn extract_json_block(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(captures) = FENCED_JSON_RE.captures(text) {
        if let Some(inner) = captures.get(1) {
            return Some(inner.as_str().trim().to_string());
        }
    }

    if let (Some(first), Some(last)) = (text.find('{'), text.rfind('}')) {
        if last > first {
            return Some(text[first..=last].to_string());
        }
    }

    Some(trimmed.to_string())
}

fn parse_draft(text: &str) -> Result<InterpretedDraft> {
    let block = extract_json_block(text).ok_or_else(|| {
        QuickCalError::Interpretation("応答にJSONが含まれていませんでした。".to_string())
    })?;

    serde_json::from_str(&block).map_err(|err| {
        QuickCalError::Interpretation(format!("応答JSONの解析に失敗しました: {err}"))
    })
}

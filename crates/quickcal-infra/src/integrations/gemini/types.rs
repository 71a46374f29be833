//! Wire types for the Gemini `generateContent` endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub generation_config: GenerationConfig,
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub response_mime_type: String,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// A single content part: either text or an inline image.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    pub fn inline_image(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData { mime_type: mime_type.into(), data: data.into() }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Candidate {
    pub content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CandidateContent {
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CandidatePart {
    pub text: String,
}

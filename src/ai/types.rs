use serde::{Deserialize, Serialize};

use crate::session::Turn;

/// Error type for remote AI calls
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("Connection failed: {0}")]
    ConnectionError(String),
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Body of `POST /api/chat`. Every prior turn travels as context; the
/// server keeps no session state.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub messages: &'a [Turn],
}

/// Body of `POST /api/gemini-vision`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionRequest<'a> {
    pub base64_image: &'a str,
    pub user_goal: &'a str,
}

/// Response shape shared by both endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultResponse {
    #[serde(default)]
    pub result: Option<String>,
}

impl ResultResponse {
    /// The result text, if present and not blank.
    pub fn into_usable(self) -> Option<String> {
        self.result.filter(|r| !r.trim().is_empty())
    }
}

/// Decode a response body into its usable result.
pub fn parse_result(body: &str) -> Result<Option<String>, AiError> {
    serde_json::from_str::<ResultResponse>(body)
        .map(ResultResponse::into_usable)
        .map_err(|e| AiError::InvalidResponse(format!("bad JSON: {e}")))
}

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use super::{
    parse_result, AiError, Backend, ChatBackend, ChatRequest, VisionBackend, VisionRequest,
};
use crate::session::Turn;

pub const CHAT_PATH: &str = "api/chat";
pub const VISION_PATH: &str = "api/gemini-vision";

/// JSON-over-HTTP client for the chat and vision endpoints.
pub struct HttpBackend {
    base_url: Url,
    client: Client,
}

impl HttpBackend {
    /// `base_url` is the service root, e.g. `https://kharabgpt-backend.onrender.com`.
    pub fn new(base_url: &str) -> Result<Self, AiError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| AiError::InvalidEndpoint(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AiError::InvalidEndpoint(format!(
                "{base_url}: scheme must be http or https"
            )));
        }
        Ok(Self {
            base_url: parsed,
            client: Client::new(),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Option<String>, AiError> {
        let url = self.endpoint(path);
        log::debug!("HttpBackend: POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| AiError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".into());
            return Err(AiError::HttpError {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| AiError::ConnectionError(format!("read body: {e}")))?;
        parse_result(&text)
    }
}

impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http-json"
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn chat(&self, messages: &[Turn]) -> Result<Option<String>, AiError> {
        self.post_json(CHAT_PATH, &ChatRequest { messages }).await
    }
}

#[async_trait]
impl VisionBackend for HttpBackend {
    async fn analyze_image(
        &self,
        base64_image: &str,
        user_goal: &str,
    ) -> Result<Option<String>, AiError> {
        self.post_json(
            VISION_PATH,
            &VisionRequest {
                base64_image,
                user_goal,
            },
        )
        .await
    }
}

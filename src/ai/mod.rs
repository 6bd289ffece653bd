use async_trait::async_trait;

pub mod http;
pub mod types;
pub use http::HttpBackend;
pub use types::*;

use crate::session::Turn;

/// Common surface of remote AI services.
pub trait Backend: Send + Sync {
    /// Provider name for logging/display
    fn name(&self) -> &str;
}

/// Text-chat service.
#[async_trait]
pub trait ChatBackend: Backend {
    /// Send the full transcript and return the assistant's reply.
    /// `Ok(None)` means the call succeeded but carried no usable result.
    async fn chat(&self, messages: &[Turn]) -> Result<Option<String>, AiError>;
}

/// Image-analysis service.
#[async_trait]
pub trait VisionBackend: Backend {
    /// Analyze a bare base64 JPEG (no `data:` header) against the user's goal.
    /// `Ok(None)` means the call succeeded but carried no usable result.
    async fn analyze_image(
        &self,
        base64_image: &str,
        user_goal: &str,
    ) -> Result<Option<String>, AiError>;
}

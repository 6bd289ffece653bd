/// The `capture` module turns a live camera feed into transmittable JPEG
/// payloads. Camera access is a scoped resource: a [`CaptureSession`]
/// releases its stream when closed or dropped, whichever comes first.
pub mod encoder;
pub mod still;

use async_trait::async_trait;
use image::DynamicImage;

pub use encoder::{strip_data_header, EncodedImage, ImageEncoder};
pub use still::StillImageSource;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("No camera available: {0}")]
    Unavailable(String),
    #[error("Camera is not open")]
    NotOpen,
    #[error("Frame capture failed: {0}")]
    FrameFailed(String),
    #[error("Image encoding failed: {0}")]
    EncodeFailed(String),
}

/// Something that can hand out a live frame stream (a webcam, a test fixture).
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Acquire the feed. May be refused by the platform.
    async fn open(&self) -> Result<Box<dyn FrameStream>, CaptureError>;

    fn name(&self) -> &str;
}

/// An acquired feed.
pub trait FrameStream: Send {
    /// Snapshot the current frame at the feed's native resolution.
    fn capture_frame(&mut self) -> Result<DynamicImage, CaptureError>;

    /// Stop the feed's tracks. Called exactly once by [`CaptureSession`].
    fn release(&mut self);
}

/// Owns an open frame stream until closed or dropped.
pub struct CaptureSession {
    source_name: String,
    stream: Option<Box<dyn FrameStream>>,
}

impl CaptureSession {
    pub async fn start(source: &dyn FrameSource) -> Result<Self, CaptureError> {
        let stream = source.open().await?;
        log::info!("CaptureSession: {} opened", source.name());
        Ok(Self {
            source_name: source.name().to_string(),
            stream: Some(stream),
        })
    }

    pub fn capture_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        let frame = self
            .stream
            .as_mut()
            .ok_or(CaptureError::NotOpen)?
            .capture_frame()?;
        log::debug!(
            "CaptureSession: captured {}x{} frame",
            frame.width(),
            frame.height()
        );
        Ok(frame)
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Release the stream now rather than at drop.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            log::info!("CaptureSession: {} released", self.source_name);
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

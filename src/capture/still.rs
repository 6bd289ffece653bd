// still.rs: A frame source backed by an image file on disk.
//
// Stands in for a webcam on hosts without one: every capture returns the
// same decoded picture.

use async_trait::async_trait;
use image::DynamicImage;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::{CaptureError, FrameSource, FrameStream};

pub struct StillImageSource {
    path: PathBuf,
    name: String,
}

impl StillImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("still:{}", path.display());
        Self { path, name }
    }
}

#[async_trait]
impl FrameSource for StillImageSource {
    async fn open(&self) -> Result<Box<dyn FrameStream>, CaptureError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => {
                CaptureError::PermissionDenied(format!("{}: {e}", self.path.display()))
            }
            _ => CaptureError::Unavailable(format!("{}: {e}", self.path.display())),
        })?;
        let frame = image::load_from_memory(&bytes).map_err(|e| {
            CaptureError::Unavailable(format!("{} is not an image: {e}", self.path.display()))
        })?;
        Ok(Box::new(StillImageStream { frame: Some(frame) }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct StillImageStream {
    frame: Option<DynamicImage>,
}

impl FrameStream for StillImageStream {
    fn capture_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        self.frame.clone().ok_or(CaptureError::NotOpen)
    }

    fn release(&mut self) {
        self.frame = None;
    }
}

// scan.rs: Meal scans: capture a frame, file it in the gallery right away,
// then ask the vision service about it and attach the answer to that scan.

use image::DynamicImage;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use super::{PendingState, RequestGate, NO_RESULT_TEXT, VISION_FALLBACK_TEXT};
use crate::ai::VisionBackend;
use crate::capture::{CaptureError, CaptureSession, FrameSource, ImageEncoder};
use crate::format::{format_analysis, Block};
use crate::gallery::{GalleryError, ScanGallery, ScanRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStatus {
    Analyzed,
    NoResult,
    Failed,
}

/// A resolved scan, ready to display.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    pub scan_id: u64,
    pub display_ref: String,
    pub status: AnalysisStatus,
    /// Raw text; also stored on the scan's gallery record.
    pub analysis: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Another analysis is still pending; nothing was captured.
    Busy,
    Completed(ScanResult),
}

pub struct ScanController {
    gallery: Mutex<ScanGallery>,
    backend: Arc<dyn VisionBackend>,
    encoder: ImageEncoder,
    camera: Mutex<Option<CaptureSession>>,
    latest: Mutex<Option<ScanResult>>,
    gate: RequestGate,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScanController {
    pub fn new(
        gallery: ScanGallery,
        backend: Arc<dyn VisionBackend>,
        encoder: ImageEncoder,
        typing_interval: Duration,
    ) -> Self {
        log::info!(
            "ScanController: using {} ({} scans restored)",
            backend.name(),
            gallery.len()
        );
        Self {
            gallery: Mutex::new(gallery),
            backend,
            encoder,
            camera: Mutex::new(None),
            latest: Mutex::new(None),
            gate: RequestGate::new(typing_interval),
        }
    }

    // ── Camera ──────────────────────────────────────────────────────────

    /// Acquire `source`. Any previously open camera is released first.
    pub async fn open_camera(&self, source: &dyn FrameSource) -> Result<(), CaptureError> {
        self.close_camera();
        let session = CaptureSession::start(source).await?;
        // Another open may have raced in while we awaited; the replaced
        // session is released by its drop.
        let previous = lock(&self.camera).replace(session);
        drop(previous);
        Ok(())
    }

    /// Release the camera. Returns false if none was open.
    pub fn close_camera(&self) -> bool {
        let session = lock(&self.camera).take();
        match session {
            Some(session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    pub fn camera_open(&self) -> bool {
        lock(&self.camera).as_ref().is_some_and(CaptureSession::is_open)
    }

    // ── Analysis ────────────────────────────────────────────────────────

    /// Snapshot the open camera and analyze the frame.
    pub async fn capture_and_analyze(&self, user_goal: &str) -> Result<ScanOutcome, CaptureError> {
        if self.gate.is_busy() {
            return Ok(ScanOutcome::Busy);
        }
        let frame = {
            let mut camera = lock(&self.camera);
            camera
                .as_mut()
                .ok_or(CaptureError::NotOpen)?
                .capture_frame()?
        };
        self.analyze_frame(&frame, user_goal).await
    }

    /// Encode `frame`, file it at the front of the gallery, and ask the vision
    /// service about it.
    ///
    /// The scan is persisted before the remote call, so it survives a failed
    /// analysis. Only encoding errors are returned; remote failures resolve to
    /// [`VISION_FALLBACK_TEXT`].
    pub async fn analyze_frame(
        &self,
        frame: &DynamicImage,
        user_goal: &str,
    ) -> Result<ScanOutcome, CaptureError> {
        let Some(mut guard) = self.gate.try_reserve() else {
            log::warn!("ScanController: analyze rejected, a scan is still pending");
            return Ok(ScanOutcome::Busy);
        };

        let encoded = self.encoder.encode(frame)?;
        let record = ScanRecord::new(encoded.display_ref.clone());
        let scan_id = lock(&self.gallery).insert_front(record);
        log::info!(
            "ScanController: scan {} captured ({}x{})",
            scan_id,
            encoded.width,
            encoded.height
        );

        guard.begin(false);
        let (status, analysis) = match self
            .backend
            .analyze_image(&encoded.payload, user_goal)
            .await
        {
            Ok(Some(text)) => (AnalysisStatus::Analyzed, text),
            Ok(None) => {
                log::warn!("ScanController: vision reply had no usable result");
                (AnalysisStatus::NoResult, NO_RESULT_TEXT.to_string())
            }
            Err(e) => {
                log::error!("ScanController: vision request failed: {}", e);
                (AnalysisStatus::Failed, VISION_FALLBACK_TEXT.to_string())
            }
        };

        lock(&self.gallery).set_analysis(scan_id, analysis.clone());

        let result = ScanResult {
            scan_id,
            display_ref: encoded.display_ref,
            status,
            blocks: format_analysis(&analysis),
            analysis,
        };
        *lock(&self.latest) = Some(result.clone());
        drop(guard);
        Ok(ScanOutcome::Completed(result))
    }

    // ── State ───────────────────────────────────────────────────────────

    /// The most recent resolved scan, for the result panel.
    pub fn latest(&self) -> Option<ScanResult> {
        lock(&self.latest).clone()
    }

    pub fn scans(&self) -> Vec<ScanRecord> {
        lock(&self.gallery).records().to_vec()
    }

    pub fn delete_scan(&self, index: usize) -> Result<ScanRecord, GalleryError> {
        let removed = lock(&self.gallery).remove_at(index)?;
        let mut latest = lock(&self.latest);
        if latest.as_ref().is_some_and(|r| r.scan_id == removed.id) {
            *latest = None;
        }
        log::info!("ScanController: scan {} deleted", removed.id);
        Ok(removed)
    }

    pub fn pending(&self) -> PendingState {
        self.gate.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<PendingState> {
        self.gate.subscribe()
    }
}

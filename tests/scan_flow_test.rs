//! Integration tests for ScanController: camera lifecycle, gallery
//! persistence, and vision fallbacks, using mock sources and backends.
//!
//! Run: cargo test --test scan_flow_test

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bharatgpt_lib::ai::{AiError, Backend, VisionBackend};
use bharatgpt_lib::capture::{CaptureError, FrameSource, FrameStream, ImageEncoder};
use bharatgpt_lib::format::Span;
use bharatgpt_lib::gallery::ScanGallery;
use bharatgpt_lib::orchestrator::{
    AnalysisStatus, PendingState, ScanController, ScanOutcome, NO_RESULT_TEXT,
    VISION_FALLBACK_TEXT,
};
use bharatgpt_lib::store::{DurableStore, MemoryStore};
use image::DynamicImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const KEY: &str = "forkai-scans";

// ---------------------------------------------------------------------------
// Mock implementations
// ---------------------------------------------------------------------------

struct MockVision {
    reply: Mutex<Option<Result<Option<String>, AiError>>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockVision {
    fn new(reply: Result<Option<String>, AiError>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Some(reply)),
            calls: Mutex::new(Vec::new()),
        })
    }
}

impl Backend for MockVision {
    fn name(&self) -> &str {
        "mock-vision"
    }
}

#[async_trait]
impl VisionBackend for MockVision {
    async fn analyze_image(
        &self,
        base64_image: &str,
        user_goal: &str,
    ) -> Result<Option<String>, AiError> {
        self.calls
            .lock()
            .unwrap()
            .push((base64_image.to_string(), user_goal.to_string()));
        self.reply
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(AiError::ConnectionError("no reply scripted".into())))
    }
}

/// A camera that yields a solid frame and counts releases.
struct MockCamera {
    deny: bool,
    releases: Arc<AtomicUsize>,
}

struct MockStream {
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl FrameSource for MockCamera {
    async fn open(&self) -> Result<Box<dyn FrameStream>, CaptureError> {
        if self.deny {
            return Err(CaptureError::PermissionDenied("NotAllowedError".into()));
        }
        Ok(Box::new(MockStream {
            releases: Arc::clone(&self.releases),
        }))
    }

    fn name(&self) -> &str {
        "mock-camera"
    }
}

impl FrameStream for MockStream {
    fn capture_frame(&mut self) -> Result<DynamicImage, CaptureError> {
        Ok(DynamicImage::new_rgb8(64, 48))
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

fn camera() -> (MockCamera, Arc<AtomicUsize>) {
    let releases = Arc::new(AtomicUsize::new(0));
    (
        MockCamera {
            deny: false,
            releases: Arc::clone(&releases),
        },
        releases,
    )
}

fn controller(store: &Arc<dyn DurableStore>, backend: Arc<dyn VisionBackend>) -> ScanController {
    ScanController::new(
        ScanGallery::load(Arc::clone(store), KEY),
        backend,
        ImageEncoder::default(),
        Duration::from_millis(400),
    )
}

fn memory() -> Arc<dyn DurableStore> {
    Arc::new(MemoryStore::new())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Vision call fails: the scan is still saved, analysis is the fixed error.
#[tokio::test]
async fn failed_analysis_still_records_scan() {
    let store = memory();
    let backend = MockVision::new(Err(AiError::ConnectionError("offline".into())));
    let scans = controller(&store, backend);
    let (cam, _) = camera();
    scans.open_camera(&cam).await.unwrap();

    let outcome = scans.capture_and_analyze("weight loss").await.unwrap();

    let ScanOutcome::Completed(result) = outcome else {
        panic!("expected a completed scan");
    };
    assert_eq!(result.status, AnalysisStatus::Failed);
    assert_eq!(result.analysis, VISION_FALLBACK_TEXT);
    assert_eq!(scans.pending(), PendingState::IDLE);

    let reloaded = ScanGallery::load(Arc::clone(&store), KEY);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.records()[0].image, result.display_ref);
    assert_eq!(
        reloaded.records()[0].analysis.as_deref(),
        Some(VISION_FALLBACK_TEXT)
    );
}

/// Successful analysis is sent without the data header and stored on the scan.
#[tokio::test]
async fn successful_analysis_is_attached_to_scan() {
    let store = memory();
    let backend = MockVision::new(Ok(Some("**Poha**\n- 250 kcal".into())));
    let scans = controller(&store, backend.clone());
    let (cam, _) = camera();
    scans.open_camera(&cam).await.unwrap();

    let ScanOutcome::Completed(result) = scans.capture_and_analyze("muscle gain").await.unwrap()
    else {
        panic!("expected a completed scan");
    };

    let calls = backend.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let (payload, goal) = &calls[0];
    assert_eq!(goal, "muscle gain");
    assert!(!payload.starts_with("data:"));
    assert_eq!(result.display_ref, format!("data:image/jpeg;base64,{payload}"));
    let jpeg = BASE64.decode(payload).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

    assert_eq!(result.status, AnalysisStatus::Analyzed);
    assert_eq!(result.blocks.len(), 1);
    assert_eq!(result.blocks[0].lines[0].spans, vec![Span::Emphasis("Poha".into())]);
    assert!(result.blocks[0].lines[1].bullet);
    assert_eq!(scans.latest(), Some(result.clone()));

    let reloaded = ScanGallery::load(store, KEY);
    assert_eq!(
        reloaded.records()[0].analysis.as_deref(),
        Some("**Poha**\n- 250 kcal")
    );
}

/// A blank result is stored as the placeholder.
#[tokio::test]
async fn empty_result_uses_placeholder() {
    let store = memory();
    let scans = controller(&store, MockVision::new(Ok(None)));
    let frame = DynamicImage::new_rgb8(8, 8);

    let ScanOutcome::Completed(result) = scans.analyze_frame(&frame, "weight loss").await.unwrap()
    else {
        panic!("expected a completed scan");
    };
    assert_eq!(result.status, AnalysisStatus::NoResult);
    assert_eq!(result.analysis, NO_RESULT_TEXT);
}

/// New scans go to the front; deleting keeps the others in order.
#[tokio::test]
async fn gallery_order_and_delete() {
    let store = memory();
    let backend = MockVision::new(Ok(Some("first".into())));
    let scans = controller(&store, backend);
    let frame = DynamicImage::new_rgb8(8, 8);

    for _ in 0..3 {
        scans.analyze_frame(&frame, "g").await.unwrap();
    }
    let before = scans.scans();
    assert_eq!(before.len(), 3);
    assert_eq!(before[0].analysis.as_deref(), Some(VISION_FALLBACK_TEXT));
    assert_eq!(before[2].analysis.as_deref(), Some("first"));

    let removed = scans.delete_scan(1).unwrap();
    assert_eq!(removed, before[1]);
    let after = scans.scans();
    assert_eq!(after, vec![before[0].clone(), before[2].clone()]);
    assert_eq!(ScanGallery::load(store, KEY).records(), after.as_slice());

    assert!(scans.delete_scan(5).is_err());
}

/// Scanning with no camera open is a recoverable error, not a crash.
#[tokio::test]
async fn scan_without_camera_is_an_error() {
    let store = memory();
    let scans = controller(&store, MockVision::new(Ok(Some("x".into()))));
    assert!(matches!(
        scans.capture_and_analyze("g").await,
        Err(CaptureError::NotOpen)
    ));
    assert!(scans.scans().is_empty());
}

/// Permission denial surfaces as an error and leaves no camera open.
#[tokio::test]
async fn denied_camera_is_reported() {
    let store = memory();
    let scans = controller(&store, MockVision::new(Ok(None)));
    let denied = MockCamera {
        deny: true,
        releases: Arc::new(AtomicUsize::new(0)),
    };
    assert!(matches!(
        scans.open_camera(&denied).await,
        Err(CaptureError::PermissionDenied(_))
    ));
    assert!(!scans.camera_open());
}

/// The camera is released on close, on replacement, and on teardown.
#[tokio::test]
async fn camera_released_on_every_exit_path() {
    let store = memory();
    let scans = controller(&store, MockVision::new(Ok(None)));

    let (cam_a, releases_a) = camera();
    scans.open_camera(&cam_a).await.unwrap();
    assert!(scans.camera_open());
    assert!(scans.close_camera());
    assert_eq!(releases_a.load(Ordering::SeqCst), 1);
    assert!(!scans.close_camera());

    let (cam_b, releases_b) = camera();
    let (cam_c, releases_c) = camera();
    scans.open_camera(&cam_b).await.unwrap();
    scans.open_camera(&cam_c).await.unwrap();
    assert_eq!(releases_b.load(Ordering::SeqCst), 1, "replaced camera released");
    assert_eq!(releases_c.load(Ordering::SeqCst), 0);

    drop(scans);
    assert_eq!(releases_c.load(Ordering::SeqCst), 1, "released on teardown");
}

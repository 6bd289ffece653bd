//! End-to-end command handling through Shell, with in-memory storage and
//! mock backends.
//!
//! Run: cargo test --test shell_test

use async_trait::async_trait;
use bharatgpt_lib::ai::{AiError, Backend, ChatBackend, VisionBackend};
use bharatgpt_lib::capture::ImageEncoder;
use bharatgpt_lib::export::{parse_json_export, ExportFormat};
use bharatgpt_lib::gallery::ScanGallery;
use bharatgpt_lib::orchestrator::{ChatController, ScanController};
use bharatgpt_lib::session::{SessionModel, Turn};
use bharatgpt_lib::settings::Settings;
use bharatgpt_lib::shell::{parse_command, Command, Shell};
use bharatgpt_lib::store::{DurableStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;

/// Answers every request the same way.
struct EchoBackend;

impl Backend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }
}

#[async_trait]
impl ChatBackend for EchoBackend {
    async fn chat(&self, messages: &[Turn]) -> Result<Option<String>, AiError> {
        let last = messages.last().map(|t| t.text.as_str()).unwrap_or_default();
        Ok(Some(format!("you said {last}")))
    }
}

#[async_trait]
impl VisionBackend for EchoBackend {
    async fn analyze_image(&self, _image: &str, goal: &str) -> Result<Option<String>, AiError> {
        Ok(Some(format!("**Goal:** {goal}\n- 320 kcal")))
    }
}

fn shell(export_dir: &std::path::Path) -> Shell {
    let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
    let settings = Settings {
        export_dir: Some(export_dir.to_path_buf()),
        ..Settings::default()
    };
    let backend = Arc::new(EchoBackend);
    let chat = ChatController::new(
        SessionModel::load(Arc::clone(&store), settings.chat_key.as_str()),
        Arc::clone(&backend) as Arc<dyn ChatBackend>,
        Duration::from_millis(400),
    );
    let scans = ScanController::new(
        ScanGallery::load(store, settings.scan_key.as_str()),
        backend as Arc<dyn VisionBackend>,
        ImageEncoder::default(),
        Duration::from_millis(400),
    );
    Shell::new(settings, chat, scans)
}

async fn run(shell: &Shell, line: &str) -> Result<String, String> {
    shell.execute(parse_command(line)).await
}

#[tokio::test]
async fn chat_then_export_both_formats() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell(dir.path());

    assert_eq!(run(&shell, "namaste").await.unwrap(), "BharatGPT: you said namaste");
    assert_eq!(shell.chat().len(), 2);

    run(&shell, "/export txt").await.unwrap();
    let text = std::fs::read_to_string(dir.path().join("BharatGPT_Chat.txt")).unwrap();
    assert_eq!(text, "You: namaste\nBharatGPT: you said namaste");

    run(&shell, "/export json").await.unwrap();
    let json = std::fs::read_to_string(dir.path().join("BharatGPT_Chat.json")).unwrap();
    assert_eq!(parse_json_export(&json).unwrap(), shell.chat().turns());
}

#[tokio::test]
async fn scan_with_still_image_camera() {
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("thali.png");
    image::RgbImage::from_pixel(32, 24, image::Rgb([200, 120, 40]))
        .save(&photo)
        .unwrap();
    let shell = shell(dir.path());

    assert!(run(&shell, "/scan").await.is_err(), "no camera yet");

    run(&shell, &format!("/camera {}", photo.display())).await.unwrap();
    let out = run(&shell, "/scan muscle gain").await.unwrap();
    assert!(out.starts_with("🍽️ Nutrition Breakdown"));
    assert!(out.contains("muscle gain"));
    assert!(out.contains("• 320 kcal"));

    let listing = run(&shell, "/scans").await.unwrap();
    assert!(listing.starts_with("1. "));

    run(&shell, "/delete 1").await.unwrap();
    assert_eq!(run(&shell, "/scans").await.unwrap(), "No scans yet.");
    assert!(run(&shell, "/delete 1").await.is_err());

    assert_eq!(run(&shell, "/camera close").await.unwrap(), "Camera closed.");
    assert!(!shell.scans().camera_open());
}

#[tokio::test]
async fn missing_photo_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell(dir.path());
    let missing = dir.path().join("nope.jpg");

    assert!(run(&shell, &format!("/camera {}", missing.display())).await.is_err());
    assert!(!shell.scans().camera_open());
}

#[tokio::test]
async fn clear_mic_and_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell(dir.path());

    run(&shell, "hi").await.unwrap();
    assert_eq!(run(&shell, "/mic").await.unwrap(), "");
    assert_eq!(shell.chat().len(), 2);

    run(&shell, "/clear").await.unwrap();
    assert!(shell.chat().is_empty());

    let unknown = "doc".parse::<ExportFormat>().unwrap_err().to_string();
    assert_eq!(parse_command("/export doc"), Command::Invalid(unknown));
    assert!(run(&shell, "/dance").await.is_err());
}

#[tokio::test]
async fn replies_are_printed_without_control_characters() {
    let dir = tempfile::tempdir().unwrap();
    let shell = shell(dir.path());

    let out = run(&shell, "\x1b]0;title\x07\x1b[2Jhi").await.unwrap();
    assert_eq!(out, "BharatGPT: you said ]0;title[2Jhi");

    let stored = shell.chat().turns();
    assert_eq!(stored[0].text, "\x1b]0;title\x07\x1b[2Jhi", "stored verbatim");
}

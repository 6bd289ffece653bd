pub mod ai;
pub mod capture;
pub mod export;
pub mod format;
pub mod gallery;
pub mod orchestrator;
pub mod session;
pub mod settings;
pub mod shell;
pub mod store;
pub mod typing;

use std::sync::Arc;
use std::time::Duration;

use ai::HttpBackend;
use capture::ImageEncoder;
use gallery::ScanGallery;
use orchestrator::{ChatController, ScanController};
use session::SessionModel;
use settings::Settings;
use store::{DurableStore, FileStore};

/// Load settings, restore history, and hand the terminal to the shell.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let settings = Settings::load()?;
    let data_dir = settings.resolved_data_dir();
    log::info!("History stored in {}", data_dir.display());

    let store: Arc<dyn DurableStore> = Arc::new(FileStore::new(data_dir));
    let backend = Arc::new(HttpBackend::new(&settings.base_url)?);
    let typing_interval = Duration::from_millis(settings.typing_interval_ms);

    let chat = ChatController::new(
        SessionModel::load(Arc::clone(&store), settings.chat_key.as_str()),
        Arc::clone(&backend) as Arc<dyn ai::ChatBackend>,
        typing_interval,
    );
    let scans = ScanController::new(
        ScanGallery::load(Arc::clone(&store), settings.scan_key.as_str()),
        backend as Arc<dyn ai::VisionBackend>,
        ImageEncoder::new(settings.jpeg_quality),
        typing_interval,
    );

    let shell = shell::Shell::new(settings, chat, scans);
    shell::run(&shell).await
}

// shell.rs: Line-based front-end for the chat and scan controllers.
//
// A plain line is sent as a chat message; lines starting with `/` are
// commands. Everything the user sees is rendered from controller state.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::capture::StillImageSource;
use crate::export::{save_export, ExportFormat};
use crate::format::{render_text, sanitize_terminal};
use crate::orchestrator::{
    AnalysisStatus, ChatController, PendingState, ScanController, ScanOutcome, SendOutcome,
};
use crate::session::Speaker;
use crate::settings::Settings;
use crate::typing::ellipsis;

pub const HELP: &str = "\
Type a message and press Enter to chat.
  /export txt|json   save the conversation
  /camera <image>    open the camera (an image file stands in for it)
  /camera close      release the camera
  /scan [goal]       capture and analyze the current frame
  /scans             list saved scans
  /delete <n>        delete scan number n
  /clear             start a new conversation
  /quit              exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Export(ExportFormat),
    CameraOpen(PathBuf),
    CameraClose,
    Scan(Option<String>),
    Scans,
    /// Zero-based gallery index.
    Delete(usize),
    Clear,
    /// The microphone control; not wired to anything.
    Mic,
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "export" => match arg.parse::<ExportFormat>() {
            Ok(format) => Command::Export(format),
            Err(e) => Command::Invalid(e.to_string()),
        },
        "camera" => match arg {
            "" => Command::Invalid("usage: /camera <image> | /camera close".into()),
            "close" => Command::CameraClose,
            path => Command::CameraOpen(PathBuf::from(path)),
        },
        "scan" => Command::Scan((!arg.is_empty()).then(|| arg.to_string())),
        "scans" => Command::Scans,
        "delete" => match arg.parse::<usize>() {
            Ok(n) if n >= 1 => Command::Delete(n - 1),
            _ => Command::Invalid("usage: /delete <n> (n starts at 1)".into()),
        },
        "clear" => Command::Clear,
        "mic" => Command::Mic,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command /{other} (try /help)")),
    }
}

pub struct Shell {
    settings: Settings,
    chat: ChatController,
    scans: ScanController,
    ansi: bool,
}

impl Shell {
    pub fn new(settings: Settings, chat: ChatController, scans: ScanController) -> Self {
        Self {
            settings,
            chat,
            scans,
            ansi: std::io::stdout().is_terminal(),
        }
    }

    pub fn chat(&self) -> &ChatController {
        &self.chat
    }

    pub fn scans(&self) -> &ScanController {
        &self.scans
    }

    /// Run one command and return what to print. `Err` is a user-facing,
    /// non-fatal message.
    pub async fn execute(&self, command: Command) -> Result<String, String> {
        match command {
            Command::Send(text) => match self.chat.send(&text).await {
                SendOutcome::Ignored => Ok(String::new()),
                SendOutcome::Busy => Err("Still waiting for the previous reply.".into()),
                outcome => Ok(outcome
                    .turn()
                    .map(|t| {
                        format!("{}: {}", self.settings.app_name, sanitize_terminal(&t.text))
                    })
                    .unwrap_or_default()),
            },
            Command::Export(format) => {
                let path = save_export(
                    &self.settings.resolved_export_dir(),
                    &self.chat.turns(),
                    format,
                    &self.settings.app_name,
                )
                .map_err(|e| e.to_string())?;
                Ok(format!("Saved {}", path.display()))
            }
            Command::CameraOpen(path) => {
                let source = StillImageSource::new(path);
                self.scans
                    .open_camera(&source)
                    .await
                    .map_err(|e| e.to_string())?;
                Ok("Camera ready. Use /scan to capture & analyze.".into())
            }
            Command::CameraClose => Ok(if self.scans.close_camera() {
                "Camera closed.".into()
            } else {
                "Camera was not open.".into()
            }),
            Command::Scan(goal) => {
                let goal = goal.unwrap_or_else(|| self.settings.user_goal.clone());
                if self.scans.camera_open() {
                    println!("Analyzing with AI...");
                }
                match self
                    .scans
                    .capture_and_analyze(&goal)
                    .await
                    .map_err(|e| e.to_string())?
                {
                    ScanOutcome::Busy => Err("A scan is already being analyzed.".into()),
                    ScanOutcome::Completed(result) => {
                        let heading = match result.status {
                            AnalysisStatus::Analyzed => "🍽️ Nutrition Breakdown",
                            AnalysisStatus::NoResult | AnalysisStatus::Failed => "Scan saved",
                        };
                        Ok(format!(
                            "{}\n\n{}",
                            heading,
                            render_text(&result.blocks, self.ansi).trim_end()
                        ))
                    }
                }
            }
            Command::Scans => Ok(self.render_scans()),
            Command::Delete(index) => {
                self.scans.delete_scan(index).map_err(|e| e.to_string())?;
                Ok(format!("Deleted scan {}.", index + 1))
            }
            Command::Clear => {
                if self.chat.clear() {
                    Ok("Started a new conversation.".into())
                } else {
                    Err("Still waiting for the previous reply.".into())
                }
            }
            Command::Mic => Ok(String::new()),
            Command::Help => Ok(HELP.into()),
            Command::Quit => Ok(String::new()),
            Command::Invalid(message) => Err(message),
        }
    }

    fn render_scans(&self) -> String {
        let scans = self.scans.scans();
        if scans.is_empty() {
            return "No scans yet.".into();
        }
        scans
            .iter()
            .enumerate()
            .map(|(i, scan)| {
                let summary = scan
                    .analysis
                    .as_deref()
                    .and_then(|a| a.lines().find(|l| !l.trim().is_empty()))
                    .unwrap_or("(no analysis)");
                let when = if scan.captured_at.is_empty() {
                    "unknown time"
                } else {
                    scan.captured_at.as_str()
                };
                format!(
                    "{}. {} [{} KB] {}",
                    i + 1,
                    when,
                    scan.image.len() / 1024,
                    sanitize_terminal(summary)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Print the transcript restored from the previous run.
    fn render_history(&self) -> String {
        self.chat
            .turns()
            .iter()
            .map(|t| match t.speaker {
                Speaker::User => format!("> {}", sanitize_terminal(&t.text)),
                Speaker::Assistant => {
                    format!("{}: {}", self.settings.app_name, sanitize_terminal(&t.text))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Redraw "<App> soch raha hai..." while a chat reply is pending.
fn spawn_typing_line(app_name: String, mut rx: watch::Receiver<PendingState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut shown = false;
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            let mut out = std::io::stdout();
            if state.in_flight {
                let _ = write!(
                    out,
                    "\r{} soch raha hai{:<3}",
                    app_name,
                    ellipsis(state.indicator_phase)
                );
                shown = true;
            } else if shown {
                let _ = write!(out, "\r\x1b[2K");
                shown = false;
            }
            let _ = out.flush();
        }
    })
}

fn prompt() {
    let mut out = std::io::stdout();
    let _ = write!(out, "> ");
    let _ = out.flush();
}

/// Read commands from stdin until EOF or `/quit`.
pub async fn run(shell: &Shell) -> Result<(), Box<dyn std::error::Error>> {
    println!("{} (/help for commands)", shell.settings.app_name);
    let history = shell.render_history();
    if !history.is_empty() {
        println!("{history}");
    }

    let typing = spawn_typing_line(shell.settings.app_name.clone(), shell.chat.subscribe());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt();
    while let Some(line) = lines.next_line().await? {
        let command = parse_command(&line);
        if command == Command::Quit {
            break;
        }
        match shell.execute(command).await {
            Ok(out) if !out.is_empty() => println!("{out}"),
            Ok(_) => {}
            Err(message) => println!("! {message}"),
        }
        prompt();
    }

    typing.abort();
    shell.scans.close_camera();
    log::info!("Shell: exiting");
    Ok(())
}

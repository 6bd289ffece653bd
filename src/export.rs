// export.rs: Saves the chat transcript as `{AppName}_Chat.txt` or `.json`.
// Entirely local; nothing leaves the device.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::session::{Speaker, Turn};

/// Label used for the user's lines in text exports.
pub const USER_LABEL: &str = "You";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Unknown export format {0:?} (expected txt or json)")]
    UnknownFormat(String),
    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `{AppName}_Chat.{ext}`
pub fn export_file_name(app_name: &str, format: ExportFormat) -> String {
    format!("{}_Chat.{}", app_name, format.extension())
}

/// Write embedded line breaks as a literal `\n` so a turn stays on one line.
fn escape_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\\n")
        .replace('\n', "\\n")
        .replace('\r', "\\n")
}

/// Serialize `turns` in the requested format.
///
/// Text: one `Label: text` line per turn, with line breaks inside a turn
/// escaped. JSON: the storage encoding, pretty-printed; [`parse_json_export`]
/// reads it back unchanged.
pub fn export_session(
    turns: &[Turn],
    format: ExportFormat,
    app_name: &str,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Text => Ok(turns
            .iter()
            .map(|t| {
                let label = match t.speaker {
                    Speaker::User => USER_LABEL,
                    Speaker::Assistant => app_name,
                };
                format!("{}: {}", label, escape_line_breaks(&t.text))
            })
            .collect::<Vec<_>>()
            .join("\n")),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(turns)?),
    }
}

pub fn parse_json_export(data: &str) -> Result<Vec<Turn>, ExportError> {
    Ok(serde_json::from_str(data)?)
}

/// Write the export into `dir` and return the file's path.
pub fn save_export(
    dir: &Path,
    turns: &[Turn],
    format: ExportFormat,
    app_name: &str,
) -> Result<PathBuf, ExportError> {
    let data = export_session(turns, format, app_name)?;
    let path = dir.join(export_file_name(app_name, format));
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, data).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    log::info!("Exported {} turns to {}", turns.len(), path.display());
    Ok(path)
}

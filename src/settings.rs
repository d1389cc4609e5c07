//! Reading and patching the host's `settings.json`.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};

const BACKUP_MARKER: &str = "ccs-backup";
const STATUS_LINE_KEY: &str = "statusLine";
const STATUS_LINE_PADDING: u64 = 2;

/// Settings as a JSON object. A missing or unparseable file reads as `{}`.
pub fn read_settings(path: &Path) -> Map<String, Value> {
    let Ok(raw) = fs::read_to_string(path) else {
        return Map::new();
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::warn!("{} is not a JSON object, treating as empty", path.display());
            Map::new()
        }
    }
}

pub fn write_settings(path: &Path, settings: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let mut body = serde_json::to_string_pretty(settings).context("serialize settings")?;
    body.push('\n');
    fs::write(path, body).with_context(|| format!("write {}", path.display()))
}

/// Copy `path` to `<path>.ccs-backup.<unix millis>` if it exists.
pub fn backup(path: &Path) -> Result<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{BACKUP_MARKER}.{}", Utc::now().timestamp_millis()));
    let backup_path = PathBuf::from(name);
    fs::copy(path, &backup_path)
        .with_context(|| format!("back up {} to {}", path.display(), backup_path.display()))?;
    Ok(Some(backup_path))
}

/// The configured statusLine command, if any.
pub fn status_line_command(settings: &Map<String, Value>) -> Option<&str> {
    settings
        .get(STATUS_LINE_KEY)
        .and_then(|v| v.get("command"))
        .and_then(Value::as_str)
}

/// True when the statusLine command runs the binary named `binary_name`.
pub fn has_status_line(settings: &Map<String, Value>, binary_name: &str) -> bool {
    status_line_command(settings).is_some_and(|cmd| cmd.contains(binary_name))
}

pub fn set_status_line(settings: &mut Map<String, Value>, command: &str) {
    settings.insert(
        STATUS_LINE_KEY.to_string(),
        json!({
            "type": "command",
            "command": command,
            "padding": STATUS_LINE_PADDING,
        }),
    );
}

pub fn remove_status_line(settings: &mut Map<String, Value>) -> bool {
    settings.remove(STATUS_LINE_KEY).is_some()
}

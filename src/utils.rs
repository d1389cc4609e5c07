use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const MAX_SESSION_ID_LEN: usize = 128;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid regex"));

pub fn read_stdin() -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}

/// Last segment of a path written with either `/` or `\` separators.
/// Trailing separators are ignored; an empty or root-only path yields "".
pub fn leaf_name(path: &str) -> &str {
    path.trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
}

/// Session ids come from the host payload and end up in a file name, so anything
/// that could act as a path component is replaced.
pub fn sanitize_session_id(raw: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(raw, "_");
    let truncated: String = cleaned.chars().take(MAX_SESSION_ID_LEN).collect();
    if truncated.is_empty() {
        "default".to_string()
    } else {
        truncated
    }
}

/// `$CLAUDE_CONFIG_DIR` when set, else `~/.claude`.
pub fn claude_dir() -> Option<PathBuf> {
    if let Ok(dir) = env::var("CLAUDE_CONFIG_DIR") {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    directories::BaseDirs::new().map(|b| b.home_dir().join(".claude"))
}

/// Run a command and return its stdout, killing it once `timeout` elapses.
/// A non-zero exit status is an error.
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<String> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .context("spawn")?;

    // Drain stdout on a separate thread so a chatty child cannot block on a full pipe.
    let mut stdout = child.stdout.take().context("stdout not captured")?;
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            bail!("timed out after {timeout:?}");
        }
        thread::sleep(POLL_INTERVAL);
    };

    // A grandchild can keep the pipe open after the child exits.
    let out = rx
        .recv_timeout(deadline.saturating_duration_since(Instant::now()).max(POLL_INTERVAL))
        .map_err(|_| anyhow::anyhow!("stdout still open after {timeout:?}"))?;
    if !status.success() {
        bail!("exited with {status}");
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

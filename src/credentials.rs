//! OAuth token lookup for the usage endpoint.
//!
//! Sources are tried in order and the first non-empty token wins. Each source
//! swallows its own failures so a broken credentials file never hides a working
//! keychain entry.

use anyhow::Result;
use serde_json::Value;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const TOKEN_ENV_VAR: &str = "CLAUDE_CODE_OAUTH_TOKEN";
pub const CREDENTIALS_FILE_NAME: &str = ".credentials.json";
pub const SECRET_SERVICE_NAME: &str = "Claude Code-credentials";
const SECRET_STORE_TIMEOUT: Duration = Duration::from_secs(3);

pub trait TokenSource: Send + Sync {
    /// Short name for debug logs.
    fn name(&self) -> &'static str;

    fn token(&self) -> Result<Option<String>>;
}

/// Token taken verbatim from an environment variable.
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenSource for EnvToken {
    fn name(&self) -> &'static str {
        "env"
    }

    fn token(&self) -> Result<Option<String>> {
        Ok(env::var(&self.var).ok().and_then(non_empty))
    }
}

/// Claude's `.credentials.json`; the first candidate path holding a token wins.
pub struct CredentialsFile {
    candidates: Vec<PathBuf>,
}

impl CredentialsFile {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// `$CLAUDE_CONFIG_DIR/.credentials.json`, then `~/.claude/.credentials.json`.
    pub fn default_locations() -> Self {
        let mut candidates = Vec::new();
        if let Some(dir) = crate::utils::claude_dir() {
            candidates.push(dir.join(CREDENTIALS_FILE_NAME));
        }
        if let Some(base) = directories::BaseDirs::new() {
            let legacy = base.home_dir().join(".claude").join(CREDENTIALS_FILE_NAME);
            if !candidates.contains(&legacy) {
                candidates.push(legacy);
            }
        }
        Self { candidates }
    }
}

impl TokenSource for CredentialsFile {
    fn name(&self) -> &'static str {
        "credentials-file"
    }

    fn token(&self) -> Result<Option<String>> {
        for path in &self.candidates {
            if !path.is_file() {
                continue;
            }
            let raw = match fs::read_to_string(path) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::debug!("skipping unreadable {}: {err}", path.display());
                    continue;
                }
            };
            if let Some(token) = extract_access_token(&raw) {
                return Ok(Some(token));
            }
        }
        Ok(None)
    }
}

/// The platform keychain / secret service, queried through its CLI.
pub struct SecretStore {
    service: String,
    timeout: Duration,
}

impl SecretStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            timeout: SECRET_STORE_TIMEOUT,
        }
    }

    /// Service name Claude uses for the current config dir.
    pub fn for_current_config() -> Self {
        Self::new(service_name_for(env::var("CLAUDE_CONFIG_DIR").ok().as_deref()))
    }

    #[cfg(target_os = "macos")]
    fn query(&self) -> Result<Option<String>> {
        let mut cmd = std::process::Command::new("security");
        cmd.args(["find-generic-password", "-s", &self.service, "-w"]);
        if let Ok(user) = env::var("USER") {
            cmd.args(["-a", &user]);
        }
        crate::utils::run_with_timeout(&mut cmd, self.timeout).map(Some)
    }

    #[cfg(target_os = "linux")]
    fn query(&self) -> Result<Option<String>> {
        let mut cmd = std::process::Command::new("secret-tool");
        cmd.args(["lookup", "service", &self.service]);
        crate::utils::run_with_timeout(&mut cmd, self.timeout).map(Some)
    }

    #[cfg(target_os = "windows")]
    fn query(&self) -> Result<Option<String>> {
        let script = format!(
            "(Get-StoredCredential -Target '{}').Password",
            self.service.replace('\'', "''")
        );
        let mut cmd = std::process::Command::new("powershell");
        cmd.args(["-NoProfile", "-Command", &script]);
        crate::utils::run_with_timeout(&mut cmd, self.timeout).map(Some)
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    fn query(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

impl TokenSource for SecretStore {
    fn name(&self) -> &'static str {
        "secret-store"
    }

    fn token(&self) -> Result<Option<String>> {
        Ok(self.query()?.as_deref().and_then(extract_access_token))
    }
}

/// Ordered list of token sources.
pub struct TokenChain {
    sources: Vec<Box<dyn TokenSource>>,
}

impl TokenChain {
    pub fn new(sources: Vec<Box<dyn TokenSource>>) -> Self {
        Self { sources }
    }

    /// Environment variable, then credentials file, then the platform secret store.
    pub fn platform_default() -> Self {
        Self::new(vec![
            Box::new(EnvToken::new(TOKEN_ENV_VAR)),
            Box::new(CredentialsFile::default_locations()),
            Box::new(SecretStore::for_current_config()),
        ])
    }

    pub fn resolve(&self) -> Option<String> {
        for source in &self.sources {
            match source.token() {
                Ok(Some(token)) => {
                    tracing::debug!("oauth token found via {}", source.name());
                    return Some(token);
                }
                Ok(None) => {}
                Err(err) => tracing::debug!("token source {} failed: {err:#}", source.name()),
            }
        }
        tracing::debug!("no oauth token available");
        None
    }
}

/// `claudeAiOauth.accessToken`, falling back to a top-level `accessToken`.
pub fn extract_access_token(raw: &str) -> Option<String> {
    let json: Value = serde_json::from_str(raw.trim()).ok()?;
    json.get("claudeAiOauth")
        .and_then(|v| v.get("accessToken"))
        .or_else(|| json.get("accessToken"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .and_then(non_empty)
}

/// A custom config dir gets its own keychain entry suffixed with 8 hex chars of
/// the dir's SHA-256.
pub fn service_name_for(config_dir: Option<&str>) -> String {
    use sha2::{Digest, Sha256};

    let mut service_name = SECRET_SERVICE_NAME.to_string();
    if cfg!(target_os = "macos") {
        if let Some(dir) = config_dir.filter(|d| !d.trim().is_empty()) {
            let hash = Sha256::digest(dir.as_bytes());
            let suffix: String = format!("{hash:x}").chars().take(8).collect();
            service_name.push('-');
            service_name.push_str(&suffix);
        }
    }
    service_name
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

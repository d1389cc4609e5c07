//! The render pipeline: stdin payload in, two lines out.

use chrono::Utc;
use std::thread;
use std::time::Duration;

use crate::cache::UsageCache;
use crate::cli::Args;
use crate::credentials::TokenChain;
use crate::display::{Palette, render};
use crate::models::StatusInput;
use crate::usage_api::{UsageClient, get_usage_snapshot};

/// Everything the pipeline needs, resolved once up front.
pub struct StatuslineConfig {
    pub palette: Palette,
    pub cache: UsageCache,
    /// `None` disables network fetches.
    pub client: Option<UsageClient>,
    pub tokens: TokenChain,
    /// `None` skips git inspection entirely.
    pub git_timeout: Option<Duration>,
}

impl StatuslineConfig {
    pub fn from_args(args: &Args) -> Self {
        let cache_dir = args
            .cache_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let client = (!args.no_fetch).then(|| UsageClient {
            endpoint: args
                .usage_endpoint
                .clone()
                .unwrap_or_else(|| crate::usage_api::USAGE_ENDPOINT.to_string()),
            ..UsageClient::default()
        });

        Self {
            palette: if args.colors_enabled() {
                Palette::ansi()
            } else {
                Palette::plain()
            },
            cache: UsageCache::new(cache_dir, Duration::from_secs(args.cache_ttl)),
            client,
            tokens: TokenChain::platform_default(),
            git_timeout: cfg!(feature = "git").then(|| Duration::from_millis(args.git_timeout_ms)),
        }
    }
}

#[cfg(feature = "git")]
fn inspect_git(dir: &str, timeout: Option<Duration>) -> Option<crate::models::GitInfo> {
    crate::git::read_git_info(std::path::Path::new(dir), timeout?)
}

#[cfg(not(feature = "git"))]
fn inspect_git(_dir: &str, _timeout: Option<Duration>) -> Option<crate::models::GitInfo> {
    None
}

/// Parse the payload, gather git and usage data concurrently, render.
/// Never fails: every collaborator degrades to an omitted segment.
pub fn render_statusline(stdin: &[u8], config: &StatuslineConfig) -> String {
    let input = StatusInput::from_slice(stdin);

    // Both lookups finish (or give up) before the scope ends, so rendering
    // never sees half-gathered data.
    let (git, usage) = thread::scope(|s| {
        let git = s.spawn(|| inspect_git(&input.current_dir, config.git_timeout));
        let usage = s.spawn(|| {
            get_usage_snapshot(
                &input.session_id,
                &config.cache,
                &config.tokens,
                config.client.as_ref(),
            )
        });
        (git.join().ok().flatten(), usage.join().ok().flatten())
    });

    render(
        &input,
        git.as_ref(),
        usage.as_ref(),
        &config.palette,
        Utc::now(),
    )
}

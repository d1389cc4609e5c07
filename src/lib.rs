//! # Claude Usage Statusline
//!
//! Renders a two-line status summary for Claude Code's `statusLine` hook:
//!
//! ```text
//! [Opus] 📁 project | ●main | $0.4210
//! ▓▓▓▓▓▓▓▓░░░░░░░░░░░░ ctx 42% | sess: ▓▓▓▓▓░░░░░ 45% 1h30m | week: ▓▓▓▓▓▓░░░░░░░░░░░░░░ 30% 3d2h
//! ```
//!
//! The first line carries the model, folder, git branch and session cost; the
//! second the context window and, when an OAuth token is available, the five
//! hour and seven day rate-limit windows from the usage API.
//!
//! Every external lookup (git, keychain, network) is best-effort and bounded by
//! a timeout, so the output always has exactly two lines.
//!
//! ## Features
//!
//! - `git` (default): branch and dirty detection via gix

/// On-disk usage response cache, one file per session
pub mod cache;

/// Command-line arguments and subcommands
pub mod cli;

/// OAuth token sources (env, credentials file, platform secret store)
pub mod credentials;

/// Two-line text rendering
pub mod display;

/// Git repository inspection (feature-gated)
#[cfg(feature = "git")]
pub mod git;

/// Installer subcommands
pub mod install;

/// Data models for the stdin payload, git info and usage windows
pub mod models;

/// host settings.json helpers
pub mod settings;

/// The render pipeline tying the collaborators together
pub mod statusline;

/// Online usage limits retrieved from the Claude OAuth API
pub mod usage_api;

/// Utility functions for paths, stdin and subprocesses
pub mod utils;

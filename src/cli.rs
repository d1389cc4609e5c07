use clap::error::ErrorKind;
use clap::{CommandFactory, FromArgMatches};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::cache::CACHE_TTL_SECONDS;

#[derive(clap::Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Copy this binary into the Claude config dir and register it as the statusLine
    Install,
    /// Remove the installed binary and the statusLine entry
    Uninstall,
    /// Report whether the statusline is installed and configured
    Status,
}

/// Usage stats in Claude Code's status line.
///
/// With no subcommand, reads the statusLine JSON payload from stdin and prints
/// the two-line summary.
#[derive(clap::Parser, Debug)]
#[command(name = "ccus", version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Disable ANSI colors (also honored when NO_COLOR is set)
    #[arg(long)]
    pub no_color: bool,

    /// Never call the usage API; a fresh cache file is still used
    #[arg(
        long,
        env = "CLAUDE_STATUSLINE_NO_FETCH",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_fetch: bool,

    /// Seconds a cached usage response stays fresh
    #[arg(long, env = "CLAUDE_STATUSLINE_CACHE_TTL", default_value_t = CACHE_TTL_SECONDS)]
    pub cache_ttl: u64,

    /// Upper bound for git inspection, in milliseconds
    #[arg(long, env = "CLAUDE_STATUSLINE_GIT_TIMEOUT_MS", default_value_t = 3000)]
    pub git_timeout_ms: u64,

    /// Usage endpoint override
    #[arg(long, env = "CLAUDE_STATUSLINE_USAGE_ENDPOINT")]
    pub usage_endpoint: Option<String>,

    /// Directory holding the per-session usage cache (defaults to the system temp dir)
    #[arg(long, env = "CLAUDE_STATUSLINE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(
        long,
        env = "CLAUDE_STATUSLINE_DEBUG",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub debug: bool,
}

impl Args {
    /// Parse the process arguments, exiting on help, version or usage errors.
    /// The second value is a rejected environment setting that was ignored.
    pub fn parse() -> (Self, Option<clap::Error>) {
        match Self::parse_from_lenient(std::env::args_os()) {
            Ok(parsed) => parsed,
            Err(err) => err.exit(),
        }
    }

    /// Like `try_parse_from`, but an unusable value (typically from a
    /// `CLAUDE_STATUSLINE_*` variable) falls back to parsing argv alone so the
    /// status line still renders. Unknown subcommands and flags stay errors.
    pub fn parse_from_lenient<I, T>(argv: I) -> Result<(Self, Option<clap::Error>), clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        match <Self as clap::Parser>::try_parse_from(&argv) {
            Ok(args) => Ok((args, None)),
            Err(err) if matches!(err.kind(), ErrorKind::InvalidValue | ErrorKind::ValueValidation) => {
                let matches = Self::command()
                    .mut_args(|arg| arg.env(None::<&str>))
                    .try_get_matches_from(&argv)?;
                Ok((Self::from_arg_matches(&matches)?, Some(err)))
            }
            Err(err) => Err(err),
        }
    }

    pub fn colors_enabled(&self) -> bool {
        !self.no_color && std::env::var_os("NO_COLOR").is_none()
    }
}

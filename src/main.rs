use anyhow::{Context, Result};
use std::io::Write;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use claude_usage_statusline::cli::{Args, Command};
use claude_usage_statusline::install::{self, InstallPaths};
use claude_usage_statusline::statusline::{StatuslineConfig, render_statusline};
use claude_usage_statusline::utils::read_stdin;

fn main() -> Result<()> {
    let (args, rejected) = Args::parse();
    setup_logging(args.debug);
    if let Some(err) = rejected {
        let reason = err.to_string();
        tracing::warn!(
            "ignoring unusable setting: {}",
            reason.lines().next().unwrap_or_default()
        );
    }

    match args.command {
        None => {
            // A failed stdin read renders the defaults rather than breaking the prompt.
            let stdin = read_stdin().unwrap_or_else(|err| {
                tracing::debug!("stdin read failed: {err}");
                Vec::new()
            });
            let config = StatuslineConfig::from_args(&args);
            let out = render_statusline(&stdin, &config);
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(out.as_bytes())?;
            stdout.flush()?;
        }
        Some(Command::Install) => {
            let exe = std::env::current_exe().context("locate running binary")?;
            install::install(&InstallPaths::resolve()?, &exe)?;
        }
        Some(Command::Uninstall) => install::uninstall(&InstallPaths::resolve()?)?,
        Some(Command::Status) => install::status(&InstallPaths::resolve()?),
    }
    Ok(())
}

/// Logs go to stderr; stdout carries nothing but the rendered lines.
fn setup_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("claude_usage_statusline=debug")
        } else {
            EnvFilter::new("claude_usage_statusline=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

//! Two-line statusline rendering.
//!
//! Everything here is pure: the caller hands in the input snapshot, whatever
//! git/usage data could be gathered, a palette and the current instant.

use chrono::{DateTime, Utc};
use owo_colors::Style;
use std::borrow::Cow;
use std::fmt::Write as _;

use crate::models::{GitInfo, StatusInput, UsageSnapshot, UsageWindow};

pub const WIDE_BAR: usize = 20;
pub const NARROW_BAR: usize = 10;
pub const BAR_FILLED: char = '▓';
pub const BAR_EMPTY: char = '░';
pub const FOLDER_ICON: &str = "📁";
pub const DIRTY_MARK: &str = "●";

const DANGER_PCT: f64 = 90.0;
const WARNING_PCT: f64 = 70.0;

/// Terminal styles used by the renderer. `Palette::plain()` emits no escapes.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
    pub safe: Style,
    pub warning: Style,
    pub danger: Style,
    pub model: Style,
    pub cost: Style,
    pub dirty: Style,
    pub dim: Style,
}

impl Palette {
    pub fn ansi() -> Self {
        Self {
            enabled: true,
            safe: Style::new().green(),
            warning: Style::new().yellow(),
            danger: Style::new().red(),
            model: Style::new().cyan(),
            cost: Style::new().yellow(),
            dirty: Style::new().red(),
            dim: Style::new().dimmed(),
        }
    }

    pub fn plain() -> Self {
        Self {
            enabled: false,
            ..Self::ansi()
        }
    }

    pub fn paint(&self, style: Style, text: &str) -> String {
        if self.enabled {
            style.style(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Three tiers with inclusive lower bounds: >=90 danger, >=70 warning.
    pub fn for_percent(&self, pct: f64) -> Style {
        if pct >= DANGER_PCT {
            self.danger
        } else if pct >= WARNING_PCT {
            self.warning
        } else {
            self.safe
        }
    }
}

/// Bar of `width` cells; filled = round(clamp(pct, 0, 100) * width / 100).
pub fn progress_bar(pct: f64, width: usize, color: Option<(&Palette, Style)>) -> String {
    let pct = if pct.is_nan() { 0.0 } else { pct.clamp(0.0, 100.0) };
    let filled = ((pct * width as f64) / 100.0).round() as usize;
    let filled = filled.min(width);
    let mut bar = String::with_capacity(width * 3);
    bar.extend(std::iter::repeat_n(BAR_FILLED, filled));
    bar.extend(std::iter::repeat_n(BAR_EMPTY, width - filled));
    match color {
        Some((palette, style)) => palette.paint(style, &bar),
        None => bar,
    }
}

/// Compact countdown to `reset`: the two largest of days/hours/minutes.
/// Missing, "null" or unparseable timestamps give "?", past instants "0m".
pub fn time_remaining(reset: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(raw) = reset.filter(|s| !s.is_empty() && *s != "null") else {
        return "?".to_string();
    };
    let Ok(reset) = DateTime::parse_from_rfc3339(raw) else {
        return "?".to_string();
    };
    let secs = (reset.with_timezone(&Utc) - now).num_seconds();
    if secs <= 0 {
        return "0m".to_string();
    }
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let mins = (secs % 3_600) / 60;
    if days > 0 {
        format!("{days}d{hours}h")
    } else if hours > 0 {
        format!("{hours}h{mins}m")
    } else {
        format!("{mins}m")
    }
}

/// Whole percent shown next to a bar; the bar is drawn from the same value.
fn whole_percent(pct: f64) -> i64 {
    if pct.is_finite() { pct.floor() as i64 } else { 0 }
}

/// Control characters in payload or repository text would add lines or smuggle
/// escape sequences into the terminal; each one becomes `?`.
pub fn printable(text: &str) -> Cow<'_, str> {
    if text.chars().any(char::is_control) {
        Cow::Owned(
            text.chars()
                .map(|c| if c.is_control() { '?' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(text)
    }
}

pub fn render_line1(input: &StatusInput, git: Option<&GitInfo>, palette: &Palette) -> String {
    let model = printable(&input.model_display_name);
    let mut line = palette.paint(palette.model, &format!("[{model}]"));

    let folder = input.folder_name();
    if !folder.is_empty() {
        let _ = write!(line, " {FOLDER_ICON} {}", printable(folder));
    }

    if let Some(git) = git {
        line.push_str(" | ");
        if git.dirty {
            line.push_str(&palette.paint(palette.dirty, DIRTY_MARK));
        }
        line.push_str(&printable(&git.label));
    }

    line.push_str(" | ");
    line.push_str(&palette.paint(palette.cost, &format!("${:.4}", input.total_cost_usd)));
    line
}

fn usage_segment(
    label: &str,
    window: &UsageWindow,
    width: usize,
    palette: &Palette,
    now: DateTime<Utc>,
) -> String {
    let pct = whole_percent(window.utilization);
    format!(
        " | {label}: {} {pct}% {}",
        progress_bar(pct as f64, width, Some((palette, palette.for_percent(pct as f64)))),
        palette.paint(palette.dim, &time_remaining(window.resets_at.as_deref(), now)),
    )
}

pub fn render_line2(
    input: &StatusInput,
    usage: Option<&UsageSnapshot>,
    palette: &Palette,
    now: DateTime<Utc>,
) -> String {
    let ctx = whole_percent(input.context_used_percentage);
    let mut line = format!(
        "{} ctx {ctx}%",
        progress_bar(ctx as f64, WIDE_BAR, Some((palette, palette.for_percent(ctx as f64))))
    );

    if let Some(usage) = usage {
        line.push_str(&usage_segment("sess", &usage.five_hour, NARROW_BAR, palette, now));
        line.push_str(&usage_segment("week", &usage.seven_day, WIDE_BAR, palette, now));
    }
    line
}

/// Both lines, each newline-terminated, ready for a single stdout write.
pub fn render(
    input: &StatusInput,
    git: Option<&GitInfo>,
    usage: Option<&UsageSnapshot>,
    palette: &Palette,
    now: DateTime<Utc>,
) -> String {
    format!(
        "{}\n{}\n",
        render_line1(input, git, palette),
        render_line2(input, usage, palette, now)
    )
}

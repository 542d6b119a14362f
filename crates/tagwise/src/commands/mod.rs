//! Command implementations

pub mod bump;

pub mod graph;

pub mod info;

pub mod tags;

use std::time::Duration;

use anyhow::Context;
use camino::Utf8Path;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tagwise_core::git::SystemGit;

/// How a command should print its results.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    /// Print JSON to stdout instead of text.
    pub json: bool,
    /// Suppress progress indicators.
    pub quiet: bool,
}

impl Output {
    /// Pretty-print `value` as JSON on stdout.
    pub fn print_json<T: Serialize>(self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// A stderr spinner for slow work, hidden for JSON or quiet output.
    pub fn spinner(self, message: &str) -> ProgressBar {
        if self.json || self.quiet {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
            spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }
}

/// Open the git repository containing `cwd`.
pub fn open_repository(cwd: &Utf8Path) -> anyhow::Result<SystemGit> {
    SystemGit::discover(cwd).with_context(|| format!("{cwd} is not inside a git repository"))
}

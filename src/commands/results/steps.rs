use anyhow::{Context, Result};
use regex::Regex;

/// Splits stored implementation-step text into a step sequence.
///
/// Steps are stored newline-joined; older catalog rows carry their own
/// list markers (`1.`, `2)`, `-`, `*`, `•`), which are dropped here. A marker
/// only counts when whitespace follows it, so `3.5%` or a bare `2)` is text.
pub(crate) struct StepSplitter {
    marker: Regex,
}

impl StepSplitter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            marker: Regex::new(r"^(?:\d+[.)]|[-*\x{2022}])\s+")
                .context("failed to compile step marker regex")?,
        })
    }

    pub fn split(&self, stored: &str) -> Vec<String> {
        stored
            .lines()
            .map(str::trim)
            .map(|line| self.marker.replace(line, "").trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Joins steps for storage, dropping blank entries.
pub(crate) fn join_steps(steps: &[String]) -> String {
    steps
        .iter()
        .map(|step| step.trim())
        .filter(|step| !step.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

//! Text summary builder for CLI output.
//!
//! Formats a finished [`SortReport`] as human-readable lines for text mode.

use crate::model::{SortOutcome, SortReport};

/// How many leading values are echoed, matching the dashboard.
pub(crate) const PREVIEW_LEN: usize = 10;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Render `values[..PREVIEW_LEN]` as a comma-separated list.
pub(crate) fn preview(values: &[i64]) -> String {
    values
        .iter()
        .take(PREVIEW_LEN)
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build a text summary from a finished report.
pub(crate) fn build_text_summary(report: &SortReport) -> TextSummary {
    let mut lines = vec![
        format!("Computation: {}", report.computation),
        format!("Input: {} numbers", report.input_len),
        format!("Elapsed: {}", humantime::format_duration(report.elapsed)),
    ];

    match &report.outcome {
        SortOutcome::Completed { values, stats } => {
            lines.push(format!("First {PREVIEW_LEN} Numbers: {}", preview(values)));
            match stats {
                Some(s) => lines.push(format!(
                    "Result: {} numbers, min {} max {} median {}",
                    s.count, s.min, s.max, s.median
                )),
                None => lines.push("Result: no even numbers".to_string()),
            }
        }
        SortOutcome::Failed { error } => {
            lines.push(format!("Failed: {error}"));
        }
    }

    TextSummary { lines }
}

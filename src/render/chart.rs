use crate::models::{PipelineHistoryEntry, PipelineStatus};

/// Number of history runs shown when the caller does not say otherwise.
pub const DEFAULT_HISTORY_CAP: usize = 10;

/// Width in cells of the longest bar.
pub const BAR_WIDTH: u64 = 20;

/// Rendered in place of a chart when there is no history.
pub const EMPTY_CHART: &str = "No data available";

const STATUS_WIDTH: usize = 10;

/// Charts the total test count of the first `cap` runs.
pub fn render_history_chart(entries: &[PipelineHistoryEntry], cap: usize) -> String {
    render_chart(entries, cap, |entry| entry.test_counts.total)
}

/// Renders a horizontal bar chart, one line per run, for at most `cap` runs.
///
/// Each line reads `<glyph> <status> |<bar>| <value>`. Bars are scaled so the
/// largest value spans [`BAR_WIDTH`] cells.
pub fn render_chart<F>(entries: &[PipelineHistoryEntry], cap: usize, value: F) -> String
where
    F: Fn(&PipelineHistoryEntry) -> u64,
{
    let window = &entries[..entries.len().min(cap)];
    if window.is_empty() {
        return EMPTY_CHART.to_string();
    }

    // All-zero charts still render, with empty bars.
    let max = window.iter().map(&value).max().unwrap_or(0).max(1);

    window
        .iter()
        .map(|entry| {
            let current = value(entry);
            format!(
                "{} {:<width$.width$} |{}| {current}",
                status_glyph(entry.status),
                entry.status.as_str(),
                "█".repeat(bar_length(current, max)),
                width = STATUS_WIDTH,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Length of the bar for `value`, truncated towards zero.
pub fn bar_length(value: u64, max: u64) -> usize {
    let scaled = u128::from(value) * u128::from(BAR_WIDTH) / u128::from(max.max(1));
    usize::try_from(scaled).unwrap_or(usize::MAX)
}

fn status_glyph(status: PipelineStatus) -> char {
    match status {
        PipelineStatus::Success => '✓',
        PipelineStatus::Failed => '✗',
        _ => '○',
    }
}

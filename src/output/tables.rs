use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::models::PipelineStatus;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn status_cell(status: PipelineStatus) -> Cell {
    let cell = Cell::new(status);
    match status {
        PipelineStatus::Success => cell.fg(TableColor::Green),
        PipelineStatus::Failed => cell.fg(TableColor::Red),
        PipelineStatus::Running | PipelineStatus::Pending => cell.fg(TableColor::Yellow),
        _ => cell.fg(TableColor::DarkGrey),
    }
}

/// A count that is only worrying when non-zero.
pub fn problem_count_cell(count: u64) -> Cell {
    let cell = Cell::new(count);
    if count > 0 {
        cell.fg(TableColor::Red)
    } else {
        cell.fg(TableColor::Green)
    }
}

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Definition queue status: enabled, paused or disabled.
pub fn queue_status_cell(status: &str) -> Cell {
    match status {
        "Enabled" => Cell::new(status).fg(TableColor::Green),
        "Paused" => Cell::new(status).fg(TableColor::Yellow),
        _ => Cell::new(status).fg(TableColor::Red),
    }
}

/// Build result as reported by the service (`succeeded`, `failed`, ...).
pub fn build_result_cell(result: &str) -> Cell {
    match result {
        "succeeded" => Cell::new(result).fg(TableColor::Green),
        "partiallySucceeded" | "canceled" => Cell::new(result).fg(TableColor::Yellow),
        "" => Cell::new("-"),
        _ => Cell::new(result).fg(TableColor::Red),
    }
}

pub fn check_cell(flag: bool) -> Cell {
    if flag {
        Cell::new("✓").fg(TableColor::Green)
    } else {
        Cell::new("")
    }
}

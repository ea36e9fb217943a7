//! Plain-text table rendering of the report view model.

use client_core::{FetchStatus, ReportViewModel};

const COLUMN_GAP: &str = "  ";

pub fn render_table(view: &ReportViewModel) -> String {
    let widths: Vec<usize> = view
        .columns
        .iter()
        .map(|column| {
            view.rows
                .iter()
                .map(|row| row.get(&column.accessor).unwrap_or_default().chars().count())
                .chain(std::iter::once(column.header.chars().count()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let mut out = String::new();
    let header: Vec<&str> = view.columns.iter().map(|c| c.header.as_str()).collect();
    push_line(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(
        &mut out,
        &rule.iter().map(String::as_str).collect::<Vec<_>>(),
        &widths,
    );

    if view.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }

    for row in &view.rows {
        let cells: Vec<&str> = view
            .columns
            .iter()
            .map(|column| row.get(&column.accessor).unwrap_or_default())
            .collect();
        push_line(&mut out, &cells, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[&str], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Lists the actions the current state allows.
pub fn render_footer(view: Option<&ReportViewModel>, status: &FetchStatus) -> String {
    let mut actions = Vec::new();
    if view.is_some_and(ReportViewModel::has_previous_page) {
        actions.push("[p]revious");
    }
    if view.is_some_and(ReportViewModel::has_next_page) {
        actions.push("[n]ext");
    }
    if matches!(status, FetchStatus::Failed(_)) {
        actions.push("[r]etry");
    }
    actions.push("[q]uit");

    let mut footer = String::new();
    if let FetchStatus::Failed(err) = status {
        footer.push_str(&format!("error: {err}\n"));
    }
    footer.push_str(&actions.join(" "));
    footer
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;

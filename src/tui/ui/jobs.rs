//! Jobs table rendering

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use crate::engine::Snapshot;
use crate::formatting::{format_bytes_mb, format_elapsed, truncate_string};
use crate::models::{JobRecord, JobState};
use crate::tui::app::App;
use crate::tui::theme::Theme;

use super::widgets::{scroll_offset, table_header};

const COLUMNS: [&str; 10] = [
    "", "JobID", "Name", "Part", "State", "Time", "CPUs", "Mem", "GPUs", "Nodes/Reason",
];

pub fn render_jobs_view(
    app: &App,
    snapshot: &Snapshot,
    frame: &mut Frame,
    area: Rect,
    theme: &Theme,
) {
    let view = &snapshot.view;
    let selected = snapshot.selection.selected_ids().len();
    let title = if selected > 0 {
        format!(" Jobs ({}, {} selected) ", view.len(), selected)
    } else {
        format!(" Jobs ({}) ", view.len())
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused))
        .title(title);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if view.is_empty() {
        let msg = if view.refreshed_at.is_none() {
            if view.stale.is_some() {
                "Could not load jobs yet"
            } else {
                "Loading jobs..."
            }
        } else {
            "No jobs"
        };
        let para = Paragraph::new(msg)
            .style(Style::default().fg(theme.border))
            .alignment(Alignment::Center);
        frame.render_widget(para, inner);
        return;
    }

    let visible_rows = inner.height.saturating_sub(1) as usize; // -1 for header
    let cursor = snapshot.selection.cursor_index(view);
    let offset = scroll_offset(cursor.unwrap_or(0), visible_rows, view.len());
    let name_width = app.config.display.name_max_length;

    let rows: Vec<Row> = view
        .jobs
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_rows)
        .map(|(index, job)| {
            let marked = snapshot.selection.is_selected(&job.id);
            job_row(job, marked, cursor == Some(index), name_width, theme)
        })
        .collect();

    let widths = [
        Constraint::Length(1),  // Selection mark
        Constraint::Length(14), // ID (array tasks are wider)
        Constraint::Min(12),    // Name
        Constraint::Length(9),  // Partition
        Constraint::Length(10), // State
        Constraint::Length(11), // Time
        Constraint::Length(4),  // CPUs
        Constraint::Length(7),  // Memory
        Constraint::Length(4),  // GPUs
        Constraint::Min(12),    // Nodes or pending reason
    ];

    let table = Table::new(rows, widths).header(table_header(&COLUMNS, theme));
    frame.render_widget(table, inner);
}

fn job_row<'a>(
    job: &'a JobRecord,
    marked: bool,
    under_cursor: bool,
    name_width: usize,
    theme: &Theme,
) -> Row<'a> {
    let state_style = Style::default().fg(theme.job_state_color(job.state));
    let time = if job.state == JobState::Pending {
        "-".to_string()
    } else {
        format_elapsed(job.elapsed_secs)
    };
    let gpus = if job.resources.gpus > 0 {
        job.resources.gpus.to_string()
    } else {
        "-".to_string()
    };

    let mut state_cell = job.state.as_str().to_string();
    if let Some(code) = job.exit_code
        && code != 0
    {
        state_cell = format!("{} ({})", state_cell, code);
    }

    let cells = vec![
        Cell::from(if marked { "*" } else { " " }).style(Style::default().fg(theme.marked).bold()),
        Cell::from(job.id.as_str()),
        Cell::from(truncate_string(&job.name, name_width)),
        Cell::from(job.partition.as_str()),
        Cell::from(state_cell).style(state_style),
        Cell::from(time),
        Cell::from(job.resources.cpus.to_string()),
        Cell::from(format_bytes_mb(job.resources.memory_mb)),
        Cell::from(gpus),
        Cell::from(job.location()),
    ];

    let mut style = Style::default();
    if marked {
        style = style.fg(theme.marked);
    }
    if under_cursor {
        style = style.bg(theme.cursor_bg).add_modifier(Modifier::BOLD);
    }
    Row::new(cells).style(style)
}

//! Overlay and popup rendering
//!
//! Help, the kill confirmation dialog, the inspect/log output viewer and the
//! error toast.

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::engine::{ActionOutput, ViewModel};
use crate::formatting::truncate_string;
use crate::models::JobId;
use crate::tui::app::{App, OUTPUT_POPUP_PERCENT};
use crate::tui::theme::Theme;

use super::widgets::{centered_rect, detail_row};

pub fn render_help_overlay(frame: &mut Frame, area: Rect, theme: &Theme) {
    let popup_area = centered_rect(60, 75, area);
    frame.render_widget(Clear, popup_area);

    let heading = |text: &'static str| {
        Line::from(Span::styled(text, Style::default().fg(theme.highlight).bold()))
    };

    let help_text = vec![
        Line::from(Span::styled("sktop - Keyboard Shortcuts", Style::default().bold())),
        Line::from(""),
        heading("Navigation"),
        Line::from("  j / Down       Move cursor down"),
        Line::from("  k / Up         Move cursor up"),
        Line::from("  g / Home       Jump to top"),
        Line::from("  G / End        Jump to bottom"),
        Line::from("  PgDn / Ctrl+d  Page down"),
        Line::from("  PgUp / Ctrl+u  Page up"),
        Line::from(""),
        heading("Job Actions"),
        Line::from("  Space          Select / deselect job"),
        Line::from("  x              Kill selected jobs (or the cursor job)"),
        Line::from("  i / Enter      Inspect job details"),
        Line::from("  u              View stdout log"),
        Line::from("  U              View stderr log"),
        Line::from("  r              Refresh now"),
        Line::from(""),
        heading("General"),
        Line::from("  y / Enter      Confirm prompt"),
        Line::from("  n / Esc        Decline, close overlay, clear selection"),
        Line::from("  ? / F1         Show this help"),
        Line::from("  q / Ctrl+c     Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press ? or Esc to close this help",
            Style::default().fg(theme.border),
        )),
    ];

    let help_para = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border_focused))
                .title(" Help "),
        )
        .style(Style::default().fg(theme.fg));

    frame.render_widget(help_para, popup_area);
}

/// Prompt for the pending kill
pub fn render_confirm_dialog(
    targets: &[JobId],
    view: &ViewModel,
    frame: &mut Frame,
    area: Rect,
    theme: &Theme,
) {
    let popup_area = centered_rect(50, 30, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.warn))
        .title(" Confirm Kill ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let question = match targets {
        [single] => match view.get(single) {
            Some(job) if !job.name.is_empty() => {
                format!("Cancel job {} ({})?", single, truncate_string(&job.name, 30))
            }
            _ => format!("Cancel job {}?", single),
        },
        many => format!("Cancel {} jobs?", many.len()),
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![Span::raw("  "), Span::styled(question, Style::default().bold())]),
    ];

    if targets.len() > 1 {
        let listed: Vec<&str> = targets.iter().take(8).map(JobId::as_str).collect();
        let mut ids = listed.join(", ");
        if targets.len() > listed.len() {
            ids.push_str(&format!(", ... (+{})", targets.len() - listed.len()));
        }
        lines.push(Line::from(Span::styled(
            format!("  {}", ids),
            Style::default().fg(theme.border),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("  Press "),
        Span::styled("[y/Enter]", Style::default().fg(theme.warn).bold()),
        Span::raw(" to confirm, "),
        Span::styled("[n/Esc]", Style::default().fg(theme.border).bold()),
        Span::raw(" to cancel"),
    ]));

    let para = Paragraph::new(lines)
        .style(Style::default().fg(theme.fg))
        .alignment(Alignment::Left);
    frame.render_widget(para, inner);
}

/// Scrollable viewer for inspect details and log tails
pub fn render_output_overlay(
    app: &App,
    output: &ActionOutput,
    frame: &mut Frame,
    area: Rect,
    theme: &Theme,
) {
    let percent = OUTPUT_POPUP_PERCENT as u16;
    let popup_area = centered_rect(percent, percent, area);
    frame.render_widget(Clear, popup_area);

    let (title, lines): (String, Vec<Line>) = match output {
        ActionOutput::Details { id, details } => {
            let width = details.fields.iter().map(|(k, _)| k.len() + 1).max().unwrap_or(0);
            let lines = details
                .fields
                .iter()
                .map(|(key, value)| detail_row(key, value, width))
                .collect();
            (format!(" Job {} ", id), lines)
        }
        ActionOutput::Log { id, stream, text } => {
            let lines = if text.is_empty() {
                vec![Line::from(Span::styled(
                    "(log is empty)",
                    Style::default().fg(theme.border),
                ))]
            } else {
                text.lines().map(Line::raw).collect()
            };
            (format!(" Job {} {} ", id, stream), lines)
        }
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused))
        .title(title);
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [body, footer] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);

    let visible: Vec<Line> = lines
        .into_iter()
        .skip(app.output_scroll.offset)
        .take(body.height as usize)
        .collect();
    frame.render_widget(Paragraph::new(visible).style(Style::default().fg(theme.fg)), body);

    let hint = Line::from(vec![
        Span::styled(" [j/k PgUp/PgDn g/G]", Style::default().fg(theme.border).bold()),
        Span::styled(" Scroll   ", Style::default().fg(theme.border)),
        Span::styled("[Esc]", Style::default().fg(theme.border).bold()),
        Span::styled(" Close", Style::default().fg(theme.border)),
    ]);
    frame.render_widget(Paragraph::new(hint), footer);
}

/// Single-line error toast at the bottom right
pub fn render_error_toast(message: &str, frame: &mut Frame, area: Rect, theme: &Theme) {
    let text = truncate_string(message, 60);
    let toast_width = (text.chars().count() + 4).min(area.width as usize) as u16;
    let toast_area = Rect {
        x: area.width.saturating_sub(toast_width + 2),
        y: area.height.saturating_sub(5),
        width: toast_width,
        height: 3,
    };

    frame.render_widget(Clear, toast_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.failed));

    let para = Paragraph::new(format!(" {} ", text))
        .block(block)
        .style(Style::default().fg(theme.fg))
        .alignment(Alignment::Center);

    frame.render_widget(para, toast_area);
}

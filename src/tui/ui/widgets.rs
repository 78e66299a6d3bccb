//! Shared rendering helpers

use ratatui::prelude::*;
use ratatui::widgets::{Cell, Row};

use crate::tui::theme::Theme;

/// Styled table header row from column names
pub fn table_header<'a>(columns: &[&'a str], theme: &Theme) -> Row<'a> {
    let cells = columns
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(theme.header_fg).bold()));
    Row::new(cells)
        .style(Style::default().bg(theme.header_bg))
        .height(1)
}

/// First visible row so the cursor stays on screen, centred where possible
pub fn scroll_offset(cursor: usize, visible_height: usize, total: usize) -> usize {
    if visible_height == 0 || total <= visible_height {
        return 0;
    }

    if cursor < visible_height / 2 {
        0
    } else if cursor > total.saturating_sub(visible_height / 2) {
        total.saturating_sub(visible_height)
    } else {
        (cursor - visible_height / 2).min(total - visible_height)
    }
}

pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(area);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}

/// `  Key:       value` line for detail listings
pub fn detail_row<'a>(key: &'a str, value: &'a str, width: usize) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("  {:<width$} ", format!("{}:", key)), Style::default().bold()),
        Span::raw(value),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_offset_short_list() {
        assert_eq!(scroll_offset(3, 10, 5), 0);
        assert_eq!(scroll_offset(0, 0, 5), 0);
    }

    #[test]
    fn test_scroll_offset_keeps_cursor_visible() {
        let (visible, total) = (10, 100);
        for cursor in 0..total {
            let offset = scroll_offset(cursor, visible, total);
            assert!(offset <= cursor && cursor < offset + visible, "cursor {}", cursor);
            assert!(offset + visible <= total);
        }
    }

    #[test]
    fn test_centered_rect_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let popup = centered_rect(50, 40, area);
        assert_eq!(popup.width, 50);
        assert_eq!(popup.height, 20);
        assert_eq!(popup.x, 25);
    }
}

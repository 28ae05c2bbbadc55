use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, BorderType, Clear, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use eventdesk::table::{Popover, Size};

use crate::widgets::theme::Theme;

const MAX_WIDTH: usize = 48;

/// Panel size for `text`: wrapped at a fixed width, plus borders.
pub fn content_size(text: &str) -> Size {
    let widest = text.lines().map(UnicodeWidthStr::width).max().unwrap_or(0);
    let inner_width = widest.clamp(8, MAX_WIDTH);
    let rows: usize = text
        .lines()
        .map(|line| line.width().div_ceil(inner_width).max(1))
        .sum();
    Size::new(inner_width as i32 + 4, rows.max(1) as i32 + 2)
}

/// Draw the open popover, with the arrow on the row above its top edge.
pub fn render(popover: &Popover, frame: &mut Frame, viewport: Rect, theme: &Theme) {
    let (Some(geometry), Some(bounds)) = (popover.geometry(), popover.content_bounds()) else {
        return;
    };
    let area = Rect::new(
        viewport.x + bounds.x.max(0) as u16,
        viewport.y + bounds.y.max(0) as u16,
        bounds.width.max(0) as u16,
        bounds.height.max(0) as u16,
    )
    .intersection(viewport);
    if area.is_empty() {
        return;
    }
    frame.render_widget(Clear, area);
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title(Line::styled(
            " Observação ",
            Style::default()
                .fg(theme.accent())
                .add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(theme.accent()))
        .style(Style::default().bg(theme.panel_bg()).fg(theme.text()));
    let body = Paragraph::new(popover.text())
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(body, area);

    let arrow_x = area.x as i32 + geometry.arrow_offset;
    if area.y > viewport.y && arrow_x >= area.x as i32 && arrow_x < area.right() as i32 {
        let buf = frame.buffer_mut();
        buf[(arrow_x as u16, area.y - 1)]
            .set_symbol("▲")
            .set_fg(theme.accent());
    }
}

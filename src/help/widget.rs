use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Margin, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Padding, Row, Table},
};

use crate::{
    help::Entry,
    util::{fill_bg, pad},
    widgets::{Popup, PopupOutcome, centered, theme::Theme},
};

/// Full key reference, two bindings per row.
pub struct HelpPopup {
    entries: Vec<Entry<'static>>,
}

impl HelpPopup {
    pub fn new(entries: &[Entry<'_>]) -> Self {
        Self {
            entries: entries.iter().map(Entry::to_owned_entry).collect(),
        }
    }
}

impl Popup for HelpPopup {
    fn rect(&self, area: Rect) -> Rect {
        let rows = self.entries.len().div_ceil(2) as u16;
        centered(area, (area.width * 3 / 4).max(40), rows + 4)
    }

    fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let buf = frame.buffer_mut();
        fill_bg(buf, area, theme.panel_bg());
        let title = Line::styled(
            pad("Ajuda", 2),
            Style::default()
                .fg(theme.accent())
                .add_modifier(Modifier::BOLD),
        )
        .centered();
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(title)
            .border_style(Style::default().fg(theme.border()))
            .style(Style::default().bg(theme.panel_bg()).fg(theme.text()))
            .padding(Padding::new(2, 2, 1, 1));
        frame.render_widget(block, area);

        let inner = area.inner(Margin::new(2, 2));
        let rows: Vec<_> = self
            .entries
            .chunks(2)
            .map(|chunk| {
                let cells = chunk.iter().flat_map(|entry| {
                    [
                        Line::from(display_key(entry, theme)),
                        Line::from(Span::styled(
                            entry.long.to_string(),
                            Style::default().fg(theme.text()),
                        )),
                    ]
                });
                Row::new(cells.collect::<Vec<_>>())
            })
            .collect();
        let widths = [
            Constraint::Length(12),
            Constraint::Fill(1),
            Constraint::Length(12),
            Constraint::Fill(1),
        ];
        let table = Table::new(rows, widths).style(Style::default().fg(theme.text()));
        frame.render_widget(table, inner);
    }

    fn handle_key(&mut self, key: &KeyEvent) -> PopupOutcome {
        match key.code {
            KeyCode::Char('?') | KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
                PopupOutcome::Dismiss
            }
            _ => PopupOutcome::Keep,
        }
    }
}

fn display_key(entry: &Entry<'_>, theme: &Theme) -> Span<'static> {
    Span::styled(
        format!("[{}]", entry.keys),
        Style::default().bold().fg(theme.accent_alt()),
    )
}

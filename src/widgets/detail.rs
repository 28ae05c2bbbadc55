use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Paragraph, Wrap},
};

use eventdesk::{api::value_text, format::MISSING, table::EditRequest};

use crate::{
    help,
    util::{fill_bg, pad},
    widgets::{Popup, PopupOutcome, centered, theme::Theme},
};

static HELP: [help::Entry<'static>; 2] = [
    help::Entry::new("↑/↓", "rolar", "Rolar os campos"),
    help::Entry::new("esc", "fechar", "Fechar o detalhe"),
];

/// Read-only view of a record, shown in answer to an edit request.
pub struct DetailPopup {
    title: String,
    fields: Vec<(String, String)>,
    scroll: u16,
}

impl DetailPopup {
    pub fn new(request: &EditRequest) -> Self {
        let definition = request.dataset.definition();
        let record = &request.record;
        let mut fields: Vec<(String, String)> = definition
            .columns
            .iter()
            .filter(|column| !column.annotation)
            .map(|column| {
                (
                    column.label.to_string(),
                    column.render_cell(record).text,
                )
            })
            .collect();
        if let Some(column) = definition.annotation_column() {
            let text = record
                .get(column.key)
                .and_then(value_text)
                .unwrap_or_else(|| MISSING.to_string());
            fields.push(("Observação".to_string(), text));
        }
        let id = record.id().unwrap_or_else(|| MISSING.to_string());
        Self {
            title: format!("{} · registro {id}", definition.label),
            fields,
            scroll: 0,
        }
    }

    fn max_scroll(&self) -> u16 {
        self.fields.len().saturating_sub(1) as u16
    }
}

impl Popup for DetailPopup {
    fn help(&self) -> &[help::Entry<'static>] {
        &HELP
    }

    fn rect(&self, area: Rect) -> Rect {
        centered(area, 72, self.fields.len() as u16 + 4)
    }

    fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        fill_bg(frame.buffer_mut(), area, theme.panel_bg());
        let title = Line::styled(
            pad(self.title.as_str(), 1),
            Style::default()
                .fg(theme.accent())
                .add_modifier(Modifier::BOLD),
        )
        .centered();
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(title)
            .border_style(Style::default().fg(theme.border()))
            .style(Style::default().bg(theme.panel_bg()).fg(theme.text()));
        frame.render_widget(block.clone(), area);

        let label_width = self
            .fields
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);
        let lines: Vec<Line> = self
            .fields
            .iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(
                        format!("{label:<label_width$}  "),
                        Style::default()
                            .fg(theme.text_muted())
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(value.clone(), Style::default().fg(theme.text())),
                ])
            })
            .collect();
        let body = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0));
        frame.render_widget(body, block.inner(area).inner(Margin::new(1, 0)));
    }

    fn handle_key(&mut self, key: &KeyEvent) -> PopupOutcome {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                PopupOutcome::Keep
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = (self.scroll + 1).min(self.max_scroll());
                PopupOutcome::Keep
            }
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('e') => {
                PopupOutcome::Dismiss
            }
            _ => PopupOutcome::Keep,
        }
    }
}

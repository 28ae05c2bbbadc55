use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Paragraph, Wrap},
};

use crate::{
    help,
    util::{fill_bg, pad},
    widgets::{Popup, PopupOutcome, theme::Theme},
};

static HELP: [help::Entry<'static>; 4] = [
    help::Entry::new("tab/←/→", "mover", "Alternar entre as ações"),
    help::Entry::new("⏎", "selecionar", "Executar a ação selecionada"),
    help::Entry::new("^d", "remover", "Confirmar a remoção"),
    help::Entry::new("esc", "cancelar", "Cancelar"),
];

/// Asks before a destructive action. `on_confirm` runs at most once.
pub struct ConfirmPopup {
    title: String,
    message: String,
    confirm_label: String,
    cancel_label: String,
    on_confirm: Option<Box<dyn FnOnce() + Send>>,
    selection: Selection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Selection {
    Confirm,
    Cancel,
}

impl ConfirmPopup {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        confirm_label: impl Into<String>,
        cancel_label: impl Into<String>,
        on_confirm: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            confirm_label: confirm_label.into(),
            cancel_label: cancel_label.into(),
            on_confirm: Some(Box::new(on_confirm)),
            selection: Selection::Cancel,
        }
    }

    fn confirm(&mut self) {
        if let Some(on_confirm) = self.on_confirm.take() {
            on_confirm();
        }
    }
}

impl Popup for ConfirmPopup {
    fn help(&self) -> &[help::Entry<'static>] {
        &HELP
    }

    fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        fill_bg(frame.buffer_mut(), area, theme.panel_bg());
        let title = Line::styled(
            pad(self.title.as_str(), 1),
            Style::default()
                .fg(theme.error())
                .add_modifier(Modifier::BOLD),
        )
        .centered();
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(title)
            .border_style(Style::default().fg(theme.error()))
            .style(Style::default().bg(theme.panel_bg()).fg(theme.text()));

        frame.render_widget(block.clone(), area);
        let inner = block.inner(area).inner(Margin::new(1, 1));
        let layout = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(inner);

        let mut lines = Vec::new();
        for line in self.message.lines() {
            if let Some((key, value)) = line.split_once('=') {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{key}="),
                        Style::default()
                            .fg(theme.text_muted())
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(value.to_string(), Style::default().fg(theme.text())),
                ]));
            } else {
                lines.push(Line::from(Span::styled(
                    line,
                    Style::default().fg(theme.text()),
                )));
            }
        }
        if lines.is_empty() {
            lines.push(Line::from(""));
        }
        let body = Paragraph::new(Text::from(lines))
            .style(Style::default().fg(theme.text()))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(body, layout[0]);

        let confirm_style = if self.selection == Selection::Confirm {
            Style::default()
                .bg(theme.error())
                .fg(theme.selection_fg())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(theme.error())
                .add_modifier(Modifier::BOLD)
        };
        let cancel_style = if self.selection == Selection::Cancel {
            Style::default()
                .bg(theme.selection_bg())
                .fg(theme.selection_fg())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.text())
        };
        let buttons = Line::from(vec![
            Span::styled(format!("[ {} ]", self.confirm_label), confirm_style),
            Span::raw("  "),
            Span::styled(format!("[ {} ]", self.cancel_label), cancel_style),
        ]);
        let footer = Paragraph::new(Text::from(buttons)).alignment(Alignment::Center);
        frame.render_widget(footer, layout[1]);
    }

    fn handle_key(&mut self, key: &KeyEvent) -> PopupOutcome {
        if key.code == KeyCode::Char('d') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.confirm();
            return PopupOutcome::Dismiss;
        }

        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
                self.selection = match self.selection {
                    Selection::Confirm => Selection::Cancel,
                    Selection::Cancel => Selection::Confirm,
                };
                PopupOutcome::Keep
            }
            KeyCode::Enter => {
                if self.selection == Selection::Confirm {
                    self.confirm();
                }
                PopupOutcome::Dismiss
            }
            KeyCode::Esc => PopupOutcome::Dismiss,
            _ => PopupOutcome::Keep,
        }
    }

    fn rect(&self, area: Rect) -> Rect {
        let width = (area.width as f32 * 0.4) as u16;
        let height = (self.message.lines().count() as u16 + 6).max(7);
        let width = width.max(34).min(area.width.saturating_sub(4));
        let height = height.min(area.height.saturating_sub(4));
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn popup(count: &Arc<AtomicUsize>) -> ConfirmPopup {
        let count = Arc::clone(count);
        ConfirmPopup::new("Remover", "id=1", "Remover", "Cancelar", move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn enter_on_default_selection_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut popup = popup(&count);
        assert_eq!(popup.handle_key(&key(KeyCode::Enter)), PopupOutcome::Dismiss);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn confirm_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut popup = popup(&count);
        assert_eq!(popup.handle_key(&key(KeyCode::Tab)), PopupOutcome::Keep);
        assert_eq!(popup.handle_key(&key(KeyCode::Enter)), PopupOutcome::Dismiss);
        popup.handle_key(&KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

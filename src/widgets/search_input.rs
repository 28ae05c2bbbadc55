use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Position, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use crate::widgets::theme::Theme;

/// Single-line search box. The cursor is a char index, not a byte offset.
#[derive(Default)]
pub struct SearchInput {
    input: String,
    cursor: usize,
    is_active: bool,
}

impl SearchInput {
    pub fn value(&self) -> &str {
        &self.input
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
        if active {
            self.cursor = self.char_len();
        }
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    fn char_len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme, committed: &str) {
        let border = if self.is_active() {
            theme.accent()
        } else {
            theme.border()
        };
        let mut title = vec![Span::raw("Buscar")];
        if committed != self.input.trim() {
            title.push(Span::styled(" (aguardando…)", Style::default().fg(theme.text_muted())));
        }
        let block = Block::bordered()
            .title(Line::from(title))
            .style(Style::default().bg(theme.panel_bg_alt()).fg(theme.text()))
            .border_style(Style::default().fg(border));
        let placeholder = self.input.is_empty() && !self.is_active();
        let content = if placeholder {
            Span::styled(
                "matrícula, nome, setor… (/)",
                Style::default().fg(theme.text_muted()),
            )
        } else {
            Span::styled(self.input.as_str(), Style::default().fg(theme.text()))
        };
        frame.render_widget(Paragraph::new(Line::from(content)).block(block), area);

        if self.is_active() {
            let before: String = self.input.chars().take(self.cursor).collect();
            frame.set_cursor_position(Position::new(
                area.x + before.width() as u16 + 1,
                area.y + 1,
            ));
        }
    }

    /// Returns true when the text changed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if !self.is_active() {
            return false;
        }
        match key.code {
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cursor = 0;
                false
            }
            KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cursor = self.char_len();
                false
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let changed = !self.input.is_empty();
                self.clear();
                changed
            }
            KeyCode::Char(c) => {
                let idx = self.byte_index();
                self.input.insert(idx, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace => {
                if self.cursor == 0 {
                    return false;
                }
                self.cursor -= 1;
                let idx = self.byte_index();
                self.input.remove(idx);
                true
            }
            KeyCode::Delete => {
                if self.cursor >= self.char_len() {
                    return false;
                }
                let idx = self.byte_index();
                self.input.remove(idx);
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_len());
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = self.char_len();
                false
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut SearchInput, code: KeyCode) -> bool {
        input.handle_key(&KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn edits_multibyte_text() {
        let mut input = SearchInput::default();
        input.set_active(true);
        for c in "joão".chars() {
            assert!(press(&mut input, KeyCode::Char(c)));
        }
        assert_eq!(input.value(), "joão");
        press(&mut input, KeyCode::Left);
        assert!(press(&mut input, KeyCode::Backspace));
        assert_eq!(input.value(), "joo");
        press(&mut input, KeyCode::Home);
        assert!(press(&mut input, KeyCode::Delete));
        assert_eq!(input.value(), "oo");
    }

    #[test]
    fn inactive_input_ignores_keys() {
        let mut input = SearchInput::default();
        assert!(!press(&mut input, KeyCode::Char('x')));
        assert_eq!(input.value(), "");
    }
}

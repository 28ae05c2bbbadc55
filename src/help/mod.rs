use std::borrow::Cow;

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

mod widget;

pub use widget::HelpPopup;

use crate::widgets::theme::Theme;

/// One key binding shown in the footer (`short`) and the help popup (`long`).
#[derive(Clone)]
pub struct Entry<'a> {
    pub keys: Cow<'a, str>,
    pub short: Cow<'a, str>,
    pub long: Cow<'a, str>,
}

impl Entry<'static> {
    pub const fn new(keys: &'static str, short: &'static str, long: &'static str) -> Self {
        Self {
            keys: Cow::Borrowed(keys),
            short: Cow::Borrowed(short),
            long: Cow::Borrowed(long),
        }
    }
}

impl Entry<'_> {
    pub fn to_owned_entry(&self) -> Entry<'static> {
        Entry {
            keys: Cow::Owned(self.keys.as_ref().to_owned()),
            short: Cow::Owned(self.short.as_ref().to_owned()),
            long: Cow::Owned(self.long.as_ref().to_owned()),
        }
    }
}

fn make_spans<'a>(entries: &'a [Entry<'a>], theme: &Theme) -> Vec<Span<'a>> {
    let mut spans: Vec<_> = entries
        .iter()
        .filter(|entry| !entry.keys.is_empty())
        .flat_map(|entry| {
            [
                Span::styled(
                    format!("[{}]", entry.keys),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
                Span::raw(entry.short.as_ref()),
                Span::styled(" • ", Style::default().fg(theme.neutral())),
            ]
        })
        .collect();
    // Remove the last separator
    if !spans.is_empty() {
        spans.pop();
    }
    spans
}

/// Rows the footer needs to show every entry at `area`'s width.
pub fn height(entries: &[Entry<'_>], area: Rect) -> u16 {
    let theme = Theme::default();
    let total_width: usize = make_spans(entries, &theme)
        .iter()
        .map(|s| s.content.width())
        .sum();
    let available_width = usize::from(area.width.max(1));
    total_width.div_ceil(available_width).max(1) as u16
}

pub fn render(entries: &[Entry<'_>], frame: &mut Frame, area: Rect, theme: &Theme) {
    let spans = make_spans(entries, theme);
    let footer = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(theme.text_muted()))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    static ENTRIES: [Entry<'static>; 2] = [
        Entry::new("/", "buscar", "Editar o termo de busca"),
        Entry::new("x", "exportar", "Exportar registros filtrados"),
    ];

    #[test]
    fn footer_wraps_when_narrow() {
        let wide = Rect::new(0, 0, 200, 1);
        let narrow = Rect::new(0, 0, 12, 1);
        assert_eq!(height(&ENTRIES, wide), 1);
        assert!(height(&ENTRIES, narrow) > 1);
    }

    #[test]
    fn spans_drop_trailing_separator() {
        let theme = Theme::dark();
        let spans = make_spans(&ENTRIES, &theme);
        assert_eq!(spans.len(), 7);
        assert_eq!(spans.last().map(|s| s.content.as_ref()), Some("exportar"));
    }
}

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use eventdesk::table::{Banner, BannerAction, BannerKind};

use crate::{
    util::{fill_bg, pad},
    widgets::theme::Theme,
};

/// One-line feedback strip above the footer.
pub fn render(banner: &Banner, frame: &mut Frame, area: Rect, theme: &Theme) {
    let (label, color) = match banner.kind {
        BannerKind::Success => ("OK", theme.success()),
        BannerKind::Error => ("ERRO", theme.error()),
        BannerKind::Info => ("INFO", theme.accent()),
    };
    fill_bg(frame.buffer_mut(), area, theme.panel_bg());
    let mut spans = vec![
        Span::styled(
            pad(label, 1),
            Style::default()
                .bg(color)
                .fg(theme.bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(banner.message.as_str(), Style::default().fg(color)),
    ];
    if let Some(action) = banner.action.as_ref() {
        spans.push(Span::styled(
            format!("  [{}] {}", action.key(), action_label(action)),
            Style::default().fg(theme.text_muted()),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn action_label(action: &BannerAction) -> &'static str {
    match action {
        BannerAction::CopyPath { .. } => "copiar caminho",
    }
}

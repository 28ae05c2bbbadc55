use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};

use crate::help;
use theme::Theme;

mod annotation;
mod banner;
mod confirm;
mod detail;
mod search_input;
mod table_view;
pub mod theme;

pub use confirm::ConfirmPopup;
pub use detail::DetailPopup;
pub use table_view::{TableView, ViewAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupOutcome {
    Keep,
    Dismiss,
}

/// A modal drawn over the table. While one is shown it receives every key.
pub trait Popup: Send {
    fn rect(&self, area: Rect) -> Rect;

    fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme);

    fn handle_key(&mut self, key: &KeyEvent) -> PopupOutcome;

    /// Bindings shown in the footer while the popup is open.
    fn help(&self) -> &[help::Entry<'static>] {
        &[]
    }
}

/// `width` x `height` centred in `area`, shrunk to leave a two-cell border.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4)).max(1);
    let height = height.min(area.height.saturating_sub(4)).max(1);
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_stays_inside_area() {
        let area = Rect::new(0, 0, 80, 24);
        let rect = centered(area, 200, 10);
        assert_eq!(rect.width, 76);
        assert_eq!(rect.x, 2);
        assert_eq!(rect.y, 7);
        assert!(rect.right() <= area.right());
    }
}

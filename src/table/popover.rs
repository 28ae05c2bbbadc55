//! Placement and lifecycle of the floating annotation panel.
//!
//! Geometry is a pure function of the anchor, the content size and the
//! viewport. [`Popover`] wraps it with the open/close rules and keeps a
//! viewport subscription only while it is open.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Visible area plus how far the scrollable content has moved under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
    pub scroll_x: i32,
    pub scroll_y: i32,
}

impl Viewport {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            scroll_x: 0,
            scroll_y: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopoverMetrics {
    pub margin: i32,
    pub gap: i32,
    pub arrow_inset: i32,
}

impl PopoverMetrics {
    /// Terminal cells instead of pixels.
    pub fn cells() -> Self {
        Self {
            margin: 1,
            gap: 1,
            arrow_inset: 2,
        }
    }
}

impl Default for PopoverMetrics {
    fn default() -> Self {
        Self {
            margin: 12,
            gap: 8,
            arrow_inset: 18,
        }
    }
}

/// Viewport coordinates of the panel and the arrow offset from its left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopoverGeometry {
    pub top: i32,
    pub left: i32,
    pub arrow_offset: i32,
}

/// Right-align the panel under the anchor, then clamp it inside the viewport.
/// When the panel is larger than the viewport the `margin` bound wins.
pub fn compute_geometry(
    anchor: Rect,
    content: Size,
    viewport: Size,
    metrics: &PopoverMetrics,
) -> PopoverGeometry {
    let left = clamp_low_wins(
        anchor.right() - content.width,
        metrics.margin,
        viewport.width - metrics.margin - content.width,
    );
    let top = clamp_low_wins(
        anchor.bottom() + metrics.gap,
        metrics.margin,
        viewport.height - metrics.margin - content.height,
    );
    let anchor_center = anchor.x + anchor.width / 2;
    let arrow_offset = if content.width < metrics.arrow_inset * 2 {
        content.width / 2
    } else {
        (anchor_center - left).clamp(metrics.arrow_inset, content.width - metrics.arrow_inset)
    };
    PopoverGeometry {
        top,
        left,
        arrow_offset,
    }
}

fn clamp_low_wins(value: i32, low: i32, high: i32) -> i32 {
    value.min(high).max(low)
}

/// Broadcasts viewport resizes and scrolls to whichever popovers are open.
#[derive(Clone)]
pub struct ViewportHub {
    tx: Arc<watch::Sender<Viewport>>,
}

impl ViewportHub {
    pub fn new(initial: Viewport) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Viewport {
        *self.tx.borrow()
    }

    pub fn resize(&self, width: i32, height: i32) {
        self.tx.send_if_modified(|viewport| {
            let changed = viewport.width != width || viewport.height != height;
            viewport.width = width;
            viewport.height = height;
            changed
        });
    }

    pub fn scroll_to(&self, scroll_x: i32, scroll_y: i32) {
        self.tx.send_if_modified(|viewport| {
            let changed = viewport.scroll_x != scroll_x || viewport.scroll_y != scroll_y;
            viewport.scroll_x = scroll_x;
            viewport.scroll_y = scroll_y;
            changed
        });
    }

    /// Open popovers currently listening.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn subscribe(&self) -> watch::Receiver<Viewport> {
        self.tx.subscribe()
    }
}

/// A single annotation panel. Anchors are given in content coordinates so a
/// scroll moves the panel with its cell.
pub struct Popover {
    text: String,
    metrics: PopoverMetrics,
    hub: ViewportHub,
    anchor: Option<Rect>,
    content: Size,
    listener: Option<watch::Receiver<Viewport>>,
    geometry: Option<PopoverGeometry>,
}

impl Popover {
    pub fn new(hub: ViewportHub, metrics: PopoverMetrics) -> Self {
        Self {
            text: String::new(),
            metrics,
            hub,
            anchor: None,
            content: Size::default(),
            listener: None,
            geometry: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_open(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn geometry(&self) -> Option<PopoverGeometry> {
        self.geometry
    }

    /// Panel rectangle in viewport coordinates while open.
    pub fn content_bounds(&self) -> Option<Rect> {
        self.geometry.map(|geometry| {
            Rect::new(
                geometry.left,
                geometry.top,
                self.content.width,
                self.content.height,
            )
        })
    }

    /// Replace the source text. Blank text closes an open panel.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        if self.text.trim().is_empty() {
            self.close();
        }
    }

    /// Open anchored at `anchor`. Does nothing when there is no text.
    pub fn open(&mut self, anchor: Rect, content: Size) -> bool {
        if self.text.trim().is_empty() {
            return false;
        }
        self.anchor = Some(anchor);
        self.content = content;
        let mut listener = self.listener.take().unwrap_or_else(|| self.hub.subscribe());
        let viewport = *listener.borrow_and_update();
        self.listener = Some(listener);
        self.recompute(viewport);
        true
    }

    pub fn close(&mut self) {
        self.listener = None;
        self.geometry = None;
        self.anchor = None;
    }

    pub fn toggle(&mut self, anchor: Rect, content: Size) -> bool {
        if self.is_open() {
            self.close();
            false
        } else {
            self.open(anchor, content)
        }
    }

    /// Follow the anchor when the layout under it moves.
    pub fn set_anchor(&mut self, anchor: Rect) -> bool {
        if !self.is_open() || self.anchor == Some(anchor) {
            return false;
        }
        self.anchor = Some(anchor);
        let viewport = self
            .listener
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or_else(|| self.hub.current());
        self.recompute(viewport);
        true
    }

    /// Pick up viewport changes. Returns whether the geometry moved.
    pub fn sync(&mut self) -> bool {
        let Some(listener) = self.listener.as_mut() else {
            return false;
        };
        match listener.has_changed() {
            Ok(true) => {
                let viewport = *listener.borrow_and_update();
                let before = self.geometry;
                self.recompute(viewport);
                before != self.geometry
            }
            Ok(false) => false,
            Err(_) => {
                self.close();
                true
            }
        }
    }

    /// Pointer pressed at viewport coordinates. Closes when it lands outside
    /// both the panel and its anchor.
    pub fn on_pointer_down(&mut self, x: i32, y: i32) -> bool {
        let Some(bounds) = self.content_bounds() else {
            return false;
        };
        if bounds.contains(x, y) || self.anchor_in_viewport().is_some_and(|a| a.contains(x, y)) {
            return false;
        }
        self.close();
        true
    }

    pub fn on_escape(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.close();
        true
    }

    fn anchor_in_viewport(&self) -> Option<Rect> {
        let viewport = self.listener.as_ref().map(|rx| *rx.borrow())?;
        self.anchor
            .map(|anchor| anchor.offset(-viewport.scroll_x, -viewport.scroll_y))
    }

    fn recompute(&mut self, viewport: Viewport) {
        let Some(anchor) = self.anchor else {
            self.geometry = None;
            return;
        };
        let anchor = anchor.offset(-viewport.scroll_x, -viewport.scroll_y);
        self.geometry = Some(compute_geometry(
            anchor,
            self.content,
            Size::new(viewport.width, viewport.height),
            &self.metrics,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Size = Size {
        width: 1280,
        height: 800,
    };

    #[test]
    fn right_aligns_below_anchor() {
        let geometry = compute_geometry(
            Rect::new(600, 200, 40, 24),
            Size::new(300, 120),
            VIEWPORT,
            &PopoverMetrics::default(),
        );
        assert_eq!(geometry.left, 340);
        assert_eq!(geometry.top, 232);
        assert_eq!(geometry.arrow_offset, 280);
    }

    #[test]
    fn clamps_inside_viewport_for_any_anchor() {
        let metrics = PopoverMetrics::default();
        let content = Size::new(320, 180);
        for x in (-200..1500).step_by(37) {
            for y in (-200..1000).step_by(41) {
                let geometry = compute_geometry(Rect::new(x, y, 32, 20), content, VIEWPORT, &metrics);
                assert!(geometry.left >= metrics.margin, "left {geometry:?} at {x},{y}");
                assert!(geometry.left <= VIEWPORT.width - metrics.margin - content.width);
                assert!(geometry.top >= metrics.margin, "top {geometry:?} at {x},{y}");
                assert!(geometry.top <= VIEWPORT.height - metrics.margin - content.height);
                assert!(geometry.arrow_offset >= metrics.arrow_inset);
                assert!(geometry.arrow_offset <= content.width - metrics.arrow_inset);
            }
        }
    }

    #[test]
    fn arrow_keeps_inset_near_edges() {
        let metrics = PopoverMetrics::default();
        let content = Size::new(300, 100);
        let left_edge = compute_geometry(Rect::new(0, 10, 10, 10), content, VIEWPORT, &metrics);
        assert_eq!(left_edge.left, 12);
        assert_eq!(left_edge.arrow_offset, 18);
        let right_edge = compute_geometry(Rect::new(1275, 10, 10, 10), content, VIEWPORT, &metrics);
        assert_eq!(right_edge.left, 1280 - 12 - 300);
        assert_eq!(right_edge.arrow_offset, 300 - 18);
    }

    #[test]
    fn oversized_content_pins_to_margin() {
        let metrics = PopoverMetrics::default();
        let geometry = compute_geometry(
            Rect::new(400, 400, 10, 10),
            Size::new(2000, 1000),
            VIEWPORT,
            &metrics,
        );
        assert_eq!(geometry.left, metrics.margin);
        assert_eq!(geometry.top, metrics.margin);
    }

    #[test]
    fn narrow_content_centres_arrow() {
        let geometry = compute_geometry(
            Rect::new(400, 400, 10, 10),
            Size::new(30, 20),
            VIEWPORT,
            &PopoverMetrics::default(),
        );
        assert_eq!(geometry.arrow_offset, 15);
    }

    fn popover(hub: &ViewportHub) -> Popover {
        Popover::new(hub.clone(), PopoverMetrics::default())
    }

    #[test]
    fn blank_text_never_opens() {
        let hub = ViewportHub::new(Viewport::new(1280, 800));
        let mut popover = popover(&hub);
        popover.set_text("   ");
        assert!(!popover.open(Rect::new(10, 10, 10, 10), Size::new(100, 50)));
        assert!(popover.geometry().is_none());
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn listeners_are_released_on_every_close() {
        let hub = ViewportHub::new(Viewport::new(1280, 800));
        let mut popover = popover(&hub);
        popover.set_text("Colaborador afastado");
        for _ in 0..50 {
            assert!(popover.open(Rect::new(100, 100, 20, 20), Size::new(200, 80)));
            assert_eq!(hub.listener_count(), 1);
            assert!(popover.on_escape());
            assert_eq!(hub.listener_count(), 0);
        }
        popover.open(Rect::new(100, 100, 20, 20), Size::new(200, 80));
        popover.set_text("");
        assert!(!popover.is_open());
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn reopening_reuses_listener() {
        let hub = ViewportHub::new(Viewport::new(1280, 800));
        let mut popover = popover(&hub);
        popover.set_text("nota");
        popover.open(Rect::new(100, 100, 20, 20), Size::new(200, 80));
        popover.open(Rect::new(300, 100, 20, 20), Size::new(200, 80));
        assert_eq!(hub.listener_count(), 1);
    }

    #[test]
    fn recomputes_on_resize_and_scroll() {
        let hub = ViewportHub::new(Viewport::new(1280, 800));
        let mut popover = popover(&hub);
        popover.set_text("nota");
        popover.open(Rect::new(1000, 300, 20, 20), Size::new(200, 80));
        let before = popover.geometry().expect("open");
        assert!(!popover.sync());

        hub.scroll_to(0, 100);
        assert!(popover.sync());
        let scrolled = popover.geometry().expect("open");
        assert_eq!(scrolled.top, before.top - 100);

        hub.resize(700, 800);
        assert!(popover.sync());
        let resized = popover.geometry().expect("open");
        assert_eq!(resized.left, 700 - 12 - 200);
    }

    #[test]
    fn anchor_moves_follow_the_cell() {
        let hub = ViewportHub::new(Viewport::new(1280, 800));
        let mut popover = popover(&hub);
        popover.set_text("nota");
        assert!(!popover.set_anchor(Rect::new(0, 0, 10, 10)));
        popover.open(Rect::new(600, 100, 20, 20), Size::new(200, 80));
        assert!(popover.set_anchor(Rect::new(600, 300, 20, 20)));
        assert_eq!(popover.geometry().map(|g| g.top), Some(328));
        assert!(!popover.set_anchor(Rect::new(600, 300, 20, 20)));
    }

    #[test]
    fn closed_popover_ignores_viewport_changes() {
        let hub = ViewportHub::new(Viewport::new(1280, 800));
        let mut popover = popover(&hub);
        popover.set_text("nota");
        popover.open(Rect::new(100, 100, 20, 20), Size::new(200, 80));
        popover.close();
        hub.resize(640, 480);
        assert!(!popover.sync());
        assert!(popover.geometry().is_none());
    }

    #[test]
    fn pointer_down_outside_dismisses() {
        let hub = ViewportHub::new(Viewport::new(1280, 800));
        let mut popover = popover(&hub);
        popover.set_text("nota");
        popover.open(Rect::new(500, 100, 20, 20), Size::new(200, 80));
        let bounds = popover.content_bounds().expect("open");
        assert!(!popover.on_pointer_down(bounds.x + 1, bounds.y + 1));
        assert!(!popover.on_pointer_down(505, 105));
        assert!(popover.is_open());
        assert!(popover.on_pointer_down(5, 5));
        assert!(!popover.is_open());
        assert_eq!(hub.listener_count(), 0);
    }
}

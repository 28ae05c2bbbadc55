use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Cell, HighlightSpacing, Paragraph, Row, Table, TableState, Tabs},
};

use eventdesk::{
    api::{Record, SortDirection, value_text},
    dataset::{ColumnDescriptor, Dataset},
    table::{
        BannerAction, BannerKind, Popover, PopoverMetrics, SortState, TableBody, TableController,
        TableEvent, Viewport, ViewportHub, popover,
    },
};

use crate::{
    help,
    util::{pad, truncate},
    widgets::{ConfirmPopup, Popup, annotation, banner, search_input::SearchInput, theme::Theme},
};

const HIGHLIGHT_SYMBOL: &str = "▶ ";
const SKELETON_CELL: &str = "░░░░░░";

static HELP: [help::Entry<'static>; 14] = [
    help::Entry::new("↑/↓", "linha", "Selecionar linha"),
    help::Entry::new("←/→", "página", "Página anterior / próxima"),
    help::Entry::new("/", "buscar", "Editar o termo de busca"),
    help::Entry::new("tab", "conjunto", "Alternar entre integrações e ocorrências"),
    help::Entry::new("</>", "coluna", "Mover o cursor de coluna"),
    help::Entry::new("s", "ordenar", "Ordenar pela coluna (asc, desc, padrão)"),
    help::Entry::new("o", "obs.", "Abrir a observação da linha"),
    help::Entry::new("e", "detalhe", "Ver o registro"),
    help::Entry::new("d", "remover", "Remover o registro"),
    help::Entry::new("x", "exportar", "Exportar todos os registros filtrados"),
    help::Entry::new("r", "recarregar", "Recarregar a página atual"),
    help::Entry::new("c", "copiar", "Copiar o caminho do arquivo exportado"),
    help::Entry::new("?", "ajuda", "Mostrar todos os atalhos"),
    help::Entry::new("q", "sair", "Sair"),
];

static SEARCH_HELP: [help::Entry<'static>; 2] = [
    help::Entry::new("⏎/esc", "concluir", "Sair da busca"),
    help::Entry::new("^u", "limpar", "Apagar o termo"),
];

/// What the app should do after the view handled an input event.
pub enum ViewAction {
    None,
    Quit,
    ShowPopup(Box<dyn Popup>),
    ShowHelp,
    CopyToClipboard(String),
}

/// Screen regions from the last frame, for mouse hit-testing.
#[derive(Default)]
struct HitMap {
    header: Vec<(Rect, &'static str)>,
    annotations: Vec<(Rect, usize)>,
}

/// The table screen: search box, dataset tabs, the grid, banners and the
/// annotation popover, all driven by one [`TableController`].
pub struct TableView {
    controller: TableController,
    table_state: TableState,
    search: SearchInput,
    column_cursor: usize,
    hub: ViewportHub,
    popover: Popover,
    popover_record: Option<String>,
    hits: HitMap,
}

impl TableView {
    pub fn new(controller: TableController, viewport: Viewport) -> Self {
        let hub = ViewportHub::new(viewport);
        let popover = Popover::new(hub.clone(), PopoverMetrics::cells());
        Self {
            controller,
            table_state: TableState::default(),
            search: SearchInput::default(),
            column_cursor: 0,
            hub,
            popover,
            popover_record: None,
            hits: HitMap::default(),
        }
    }

    pub fn start(&mut self) {
        self.controller.start();
    }

    pub fn shutdown(&mut self) {
        self.popover.close();
        self.controller.shutdown();
    }

    pub async fn next_event(&mut self) -> TableEvent {
        self.controller.next_event().await
    }

    pub fn handle_table_event(&mut self, event: TableEvent) {
        let page_loaded = matches!(event, TableEvent::PageLoaded { .. });
        if self.controller.handle_event(event) && page_loaded {
            self.clamp_selection();
        }
    }

    pub fn notify(&mut self, kind: BannerKind, message: impl Into<String>) {
        self.controller.notify(kind, message);
    }

    /// Periodic housekeeping between frames.
    pub fn tick(&mut self) {
        self.controller.prune_banner(tokio::time::Instant::now());
        self.popover.sync();
    }

    pub fn help(&self) -> &[help::Entry<'static>] {
        if self.search.is_active() {
            &SEARCH_HELP
        } else {
            &HELP
        }
    }

    pub fn help_all(&self) -> &[help::Entry<'static>] {
        &HELP
    }

    fn selected_record(&self) -> Option<&Record> {
        let index = self.table_state.selected()?;
        self.controller.display().items.get(index)
    }

    fn clamp_selection(&mut self) {
        let len = self.controller.display().items.len();
        match (len, self.table_state.selected()) {
            (0, _) => self.table_state.select(None),
            (_, None) => self.table_state.select(Some(0)),
            (len, Some(index)) if index >= len => self.table_state.select(Some(len - 1)),
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.controller.display().items.len();
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1) as usize;
        self.table_state.select(Some(next));
    }

    fn columns(&self) -> &'static [ColumnDescriptor] {
        &self.controller.definition().columns
    }

    fn switch_dataset(&mut self, dataset: Dataset) {
        if self.controller.switch_dataset(dataset) {
            self.search.clear();
            self.search.set_active(false);
            self.close_popover();
            self.column_cursor = 0;
            self.table_state = TableState::default();
        }
    }

    fn close_popover(&mut self) {
        self.popover.close();
        self.popover_record = None;
    }

    fn annotation_text(&self, record: &Record) -> String {
        self.controller
            .definition()
            .annotation_column()
            .and_then(|column| record.get(column.key))
            .and_then(value_text)
            .unwrap_or_default()
    }

    /// Open or close the annotation popover for row `index`.
    fn toggle_annotation(&mut self, index: usize) {
        let Some(record) = self.controller.display().items.get(index) else {
            return;
        };
        let record_id = record.id();
        if self.popover.is_open() && self.popover_record == record_id {
            self.close_popover();
            return;
        }
        let text = self.annotation_text(record);
        let Some(anchor) = self.annotation_anchor(index) else {
            return;
        };
        self.popover.set_text(text.clone());
        if self.popover.open(anchor, annotation::content_size(&text)) {
            self.popover_record = record_id;
        } else {
            self.popover_record = None;
            self.controller
                .notify(BannerKind::Info, "Este registro não tem observação.");
        }
    }

    fn annotation_anchor(&self, index: usize) -> Option<popover::Rect> {
        self.hits
            .annotations
            .iter()
            .find(|(_, row)| *row == index)
            .map(|(rect, _)| to_anchor(*rect))
    }

    pub fn handle_event(&mut self, event: &Event) -> ViewAction {
        match event {
            Event::Resize(width, height) => {
                self.hub.resize(i32::from(*width), i32::from(*height));
                ViewAction::None
            }
            Event::Mouse(mouse) => {
                match mouse.kind {
                    MouseEventKind::Down(MouseButton::Left) => {
                        self.handle_click(mouse.column, mouse.row)
                    }
                    MouseEventKind::ScrollDown => self.move_selection(1),
                    MouseEventKind::ScrollUp => self.move_selection(-1),
                    _ => {}
                }
                ViewAction::None
            }
            Event::Key(key) if key.is_press() => self.handle_key(key),
            _ => ViewAction::None,
        }
    }

    fn handle_click(&mut self, column: u16, row: u16) {
        let (x, y) = (i32::from(column), i32::from(row));
        if self.popover.on_pointer_down(x, y) {
            self.popover_record = None;
        }
        if let Some((_, key)) = self
            .hits
            .header
            .iter()
            .find(|(rect, _)| rect.contains((column, row).into()))
        {
            let key = *key;
            if let Some(index) = self.columns().iter().position(|c| c.key == key) {
                self.column_cursor = index;
            }
            self.controller.toggle_sort(key);
            return;
        }
        if let Some((_, index)) = self
            .hits
            .annotations
            .iter()
            .find(|(rect, _)| rect.contains((column, row).into()))
        {
            let index = *index;
            self.table_state.select(Some(index));
            self.toggle_annotation(index);
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> ViewAction {
        if self.search.is_active() {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => self.search.set_active(false),
                _ => {
                    if self.search.handle_key(key) {
                        self.controller.input_search(self.search.value().to_string());
                    }
                }
            }
            return ViewAction::None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return ViewAction::Quit;
        }

        match key.code {
            KeyCode::Char('q') => return ViewAction::Quit,
            KeyCode::Char('?') => return ViewAction::ShowHelp,
            KeyCode::Esc => {
                if !self.popover.on_escape() {
                    self.controller.dismiss_banner();
                } else {
                    self.popover_record = None;
                }
            }
            KeyCode::Char('/') => self.search.set_active(true),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Right | KeyCode::PageDown | KeyCode::Char('l') => {
                if self.controller.next_page() {
                    self.close_popover();
                }
            }
            KeyCode::Left | KeyCode::PageUp | KeyCode::Char('h') => {
                if self.controller.previous_page() {
                    self.close_popover();
                }
            }
            KeyCode::Tab | KeyCode::BackTab => {
                let next = self.controller.dataset().next();
                self.switch_dataset(next);
            }
            KeyCode::Char('>') => {
                self.column_cursor = (self.column_cursor + 1) % self.columns().len().max(1);
            }
            KeyCode::Char('<') => {
                let len = self.columns().len().max(1);
                self.column_cursor = (self.column_cursor + len - 1) % len;
            }
            KeyCode::Char('s') => {
                if let Some(column) = self.columns().get(self.column_cursor) {
                    self.controller.toggle_sort(column.key);
                }
            }
            KeyCode::Char('r') => self.controller.refresh(),
            KeyCode::Char('o') => {
                if let Some(index) = self.table_state.selected() {
                    self.toggle_annotation(index);
                }
            }
            KeyCode::Char('e') => {
                if let Some(record) = self.selected_record() {
                    self.controller.edit(record);
                }
            }
            KeyCode::Char('d') => return self.request_delete(),
            KeyCode::Char('x') => {
                if !self.controller.export() {
                    tracing::debug!("export already running");
                }
            }
            KeyCode::Char('c') => {
                if let Some(BannerAction::CopyPath { path, .. }) =
                    self.controller.banner().and_then(|b| b.action.as_ref())
                {
                    return ViewAction::CopyToClipboard(path.display().to_string());
                }
            }
            _ => {}
        }
        ViewAction::None
    }

    fn request_delete(&mut self) -> ViewAction {
        let Some(record) = self.selected_record() else {
            return ViewAction::None;
        };
        let Some(confirmation) = self.controller.request_delete(record) else {
            return ViewAction::None;
        };
        let tx = self.controller.sender();
        let message = confirmation.summary.clone();
        let popup = ConfirmPopup::new(
            "Remover registro",
            message,
            "Remover",
            "Cancelar",
            move || {
                let _ = tx.send(TableEvent::DeleteConfirmed(confirmation));
            },
        );
        ViewAction::ShowPopup(Box::new(popup))
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let banner_height = u16::from(self.controller.banner().is_some());
        let layout = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Fill(1),
            Constraint::Length(banner_height),
        ]);
        let [tabs_area, search_area, table_area, banner_area] = area.layout(&layout);

        self.render_tabs(frame, tabs_area, theme);
        self.search
            .render(frame, search_area, theme, self.controller.committed_search());
        self.render_table(frame, table_area, theme);
        if let Some(current) = self.controller.banner() {
            banner::render(current, frame, banner_area, theme);
        }
        self.follow_popover_anchor();
        annotation::render(&self.popover, frame, frame.area(), theme);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let titles = Dataset::ALL.iter().map(|dataset| pad(dataset.label(), 1));
        let selected = Dataset::ALL
            .iter()
            .position(|dataset| *dataset == self.controller.dataset());
        let mut tabs = Tabs::new(titles)
            .style(Style::default().fg(theme.text_muted()))
            .highlight_style(
                Style::default()
                    .fg(theme.accent())
                    .add_modifier(Modifier::BOLD),
            )
            .divider("|");
        if let Some(selected) = selected {
            tabs = tabs.select(selected);
        }
        frame.render_widget(tabs, area);

        if self.controller.is_exporting() {
            let label = Paragraph::new(Span::styled(
                "exportando… ",
                Style::default().fg(theme.warning()),
            ))
            .alignment(Alignment::Right);
            frame.render_widget(label, area);
        }
    }

    fn header_label(&self, column: &ColumnDescriptor, index: usize, theme: &Theme) -> Cell<'static> {
        let default_sort = &self.controller.definition().default_sort;
        let marker = match (self.controller.sort(), column.sort_field()) {
            (SortState::Ascending(field), Some(key)) if field == key => " ▲",
            (SortState::Descending(field), Some(key)) if field == key => " ▼",
            (SortState::Unsorted, Some(key)) if key == default_sort.field => {
                match default_sort.direction {
                    SortDirection::Asc => " △",
                    SortDirection::Desc => " ▽",
                }
            }
            _ => "",
        };
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if index == self.column_cursor {
            style = style.add_modifier(Modifier::UNDERLINED).fg(theme.accent());
        }
        if column.sort_field().is_none() {
            style = style.fg(theme.text_muted());
        }
        Cell::from(format!("{}{marker}", column.label)).style(style)
    }

    fn render_table(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let definition = self.controller.definition();
        let columns = &definition.columns;
        let display = self.controller.display();
        let filtering = self.controller.is_filtering();

        let (title, title_style) = if display.loading {
            (
                format!("{} · carregando…", definition.label),
                Style::default().fg(theme.warning()),
            )
        } else if display.error.is_some() {
            (
                format!("{} · erro", definition.label),
                Style::default().fg(theme.error()),
            )
        } else {
            (definition.label.to_string(), Style::default().fg(theme.text()))
        };
        let footer = pad(
            format!(
                "{} · {}",
                display.status_label(),
                display.metrics_label(filtering)
            ),
            1,
        );
        let border = if display.error.is_some() {
            theme.error()
        } else {
            theme.border()
        };
        let block = Block::bordered()
            .title_top(Line::styled(pad(title, 1), title_style))
            .title_bottom(Line::styled(footer, Style::default().fg(theme.text_muted())))
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(theme.panel_bg_alt()).fg(theme.text()));
        let inner = block.inner(area);

        let widths: Vec<Constraint> = columns
            .iter()
            .map(|column| Constraint::Min(column.width))
            .collect();
        let header = Row::new(
            columns
                .iter()
                .enumerate()
                .map(|(index, column)| self.header_label(column, index, theme)),
        );

        let body = display.body(definition.empty_message);
        let rows: Vec<Row> = match &body {
            TableBody::Skeleton(count) => (0..*count)
                .map(|_| {
                    Row::new(columns.iter().map(|column| {
                        Cell::from(truncate(SKELETON_CELL, usize::from(column.width)))
                    }))
                    .style(Style::default().fg(theme.skeleton()))
                })
                .collect(),
            TableBody::Message(_) => Vec::new(),
            TableBody::Rows(records) => records
                .iter()
                .map(|record| {
                    let busy = self.controller.is_busy(record);
                    let cells = columns.iter().map(|column| {
                        let content = column.render_cell(record);
                        let mut style = Style::default().fg(theme.tone(content.tone));
                        if busy {
                            style = style.fg(theme.text_muted()).add_modifier(Modifier::DIM);
                        }
                        Cell::from(content.text).style(style)
                    });
                    Row::new(cells.collect::<Vec<_>>())
                })
                .collect(),
        };
        let row_count = rows.len();

        let table = Table::new(rows, widths.clone())
            .block(block)
            .header(header)
            .flex(Flex::Start)
            .column_spacing(1)
            .highlight_spacing(HighlightSpacing::Always)
            .highlight_symbol(HIGHLIGHT_SYMBOL)
            .row_highlight_style(
                Style::default()
                    .bg(theme.selection_bg())
                    .fg(theme.selection_fg()),
            );
        if row_count == 0 || matches!(body, TableBody::Skeleton(_)) {
            let mut state = TableState::default();
            frame.render_stateful_widget(table, area, &mut state);
        } else {
            frame.render_stateful_widget(table, area, &mut self.table_state);
        }

        if let TableBody::Message(message) = &body {
            let color = if display.error.is_some() {
                theme.error()
            } else {
                theme.text_muted()
            };
            let message_area = Rect {
                y: inner.y.saturating_add(2),
                height: inner.height.saturating_sub(2),
                ..inner
            };
            frame.render_widget(
                Paragraph::new(message.as_str())
                    .style(Style::default().fg(color))
                    .alignment(Alignment::Center),
                message_area,
            );
        }

        self.hits = hit_map(columns, &widths, inner, row_count, self.table_state.offset(), &body);
    }

    /// Keep an open popover on its record's cell; close it when the row is gone.
    fn follow_popover_anchor(&mut self) {
        if !self.popover.is_open() {
            return;
        }
        let position = self.popover_record.as_ref().and_then(|id| {
            self.controller
                .display()
                .items
                .iter()
                .position(|record| record.id().as_ref() == Some(id))
        });
        let Some(index) = position else {
            self.close_popover();
            return;
        };
        let text = self
            .controller
            .display()
            .items
            .get(index)
            .map(|record| self.annotation_text(record))
            .unwrap_or_default();
        if text != self.popover.text() {
            self.popover.set_text(text);
        }
        match self.annotation_anchor(index) {
            Some(anchor) => {
                self.popover.set_anchor(anchor);
            }
            None => self.close_popover(),
        }
    }
}

fn to_anchor(rect: Rect) -> popover::Rect {
    popover::Rect::new(
        i32::from(rect.x),
        i32::from(rect.y),
        i32::from(rect.width),
        i32::from(rect.height),
    )
}

/// Lay the columns out the way the table widget does, so clicks map back to
/// header cells and annotation cells.
fn hit_map(
    columns: &'static [ColumnDescriptor],
    widths: &[Constraint],
    inner: Rect,
    row_count: usize,
    offset: usize,
    body: &TableBody<'_>,
) -> HitMap {
    let symbol_width = HIGHLIGHT_SYMBOL.chars().count() as u16;
    let columns_area = Rect {
        x: inner.x + symbol_width,
        width: inner.width.saturating_sub(symbol_width),
        ..inner
    };
    let cells = Layout::horizontal(widths.iter().copied())
        .flex(Flex::Start)
        .spacing(1)
        .split(columns_area);

    let mut hits = HitMap::default();
    for (column, rect) in columns.iter().zip(cells.iter()) {
        hits.header
            .push((Rect { height: 1, ..*rect }, column.key));
    }
    if !matches!(body, TableBody::Rows(_)) {
        return hits;
    }
    let Some(annotation_index) = columns.iter().position(|column| column.annotation) else {
        return hits;
    };
    let Some(cell) = cells.get(annotation_index) else {
        return hits;
    };
    let visible_rows = usize::from(inner.height.saturating_sub(1));
    for index in offset..row_count.min(offset + visible_rows) {
        let y = inner.y + 1 + (index - offset) as u16;
        hits.annotations.push((
            Rect {
                x: cell.x,
                y,
                width: cell.width,
                height: 1,
            },
            index,
        ));
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_map_places_annotation_cells_below_header() {
        let columns = &Dataset::Integration.definition().columns;
        let widths: Vec<Constraint> = columns.iter().map(|c| Constraint::Min(c.width)).collect();
        let inner = Rect::new(1, 5, 200, 12);
        let records = Vec::new();
        let hits = hit_map(columns, &widths, inner, 3, 0, &TableBody::Rows(&records));

        assert_eq!(hits.header.len(), columns.len());
        assert!(hits.header.iter().all(|(rect, _)| rect.y == 5));
        assert_eq!(hits.header[0].0.x, 3);
        assert_eq!(
            hits.annotations.iter().map(|(rect, _)| rect.y).collect::<Vec<_>>(),
            vec![6, 7, 8]
        );
    }

    #[test]
    fn skeleton_has_no_annotation_targets() {
        let columns = &Dataset::Occurrence.definition().columns;
        let widths: Vec<Constraint> = columns.iter().map(|c| Constraint::Min(c.width)).collect();
        let hits = hit_map(
            columns,
            &widths,
            Rect::new(0, 0, 120, 10),
            0,
            0,
            &TableBody::Skeleton(6),
        );
        assert!(hits.annotations.is_empty());
        assert_eq!(hits.header.len(), columns.len());
    }
}

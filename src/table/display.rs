use crate::api::{Page, Record};

pub const SKELETON_ROWS: usize = 6;

/// What the table currently shows. Replaced wholesale by every accepted fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    pub items: Vec<Record>,
    pub total_items: u64,
    pub total_pages: u32,
    pub page: u32,
    pub page_size: u32,
    pub loading: bool,
    pub error: Option<String>,
}

/// Body of the table for one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum TableBody<'a> {
    Skeleton(usize),
    Message(String),
    Rows(&'a [Record]),
}

impl DisplayState {
    pub fn new(page_size: u32) -> Self {
        let page = Page::empty(page_size);
        Self {
            items: page.items,
            total_items: page.total_items,
            total_pages: page.total_pages,
            page: page.page,
            page_size: page.page_size,
            loading: false,
            error: None,
        }
    }

    pub fn apply_page(&mut self, page: Page) {
        self.items = page.items;
        self.total_items = page.total_items;
        self.total_pages = page.total_pages;
        self.page = page.page;
        self.page_size = page.page_size;
        self.loading = false;
        self.error = None;
    }

    /// Keeps pagination metadata, drops the rows.
    pub fn apply_error(&mut self, message: String) {
        self.items.clear();
        self.loading = false;
        self.error = Some(message);
    }

    pub fn body<'a>(&'a self, empty_message: &str) -> TableBody<'a> {
        if self.loading {
            TableBody::Skeleton(SKELETON_ROWS)
        } else if let Some(error) = self.error.as_ref() {
            TableBody::Message(error.clone())
        } else if self.items.is_empty() {
            TableBody::Message(empty_message.to_string())
        } else {
            TableBody::Rows(&self.items)
        }
    }

    /// 1-based inclusive range of the rows on this page; `(0, 0)` when empty.
    pub fn range(&self) -> (u64, u64) {
        if self.total_items == 0 {
            return (0, 0);
        }
        let size = u64::from(self.page_size);
        let page = u64::from(self.page);
        let start = (page - 1) * size + 1;
        let end = (page * size).min(self.total_items);
        (start, end)
    }

    pub fn can_previous(&self) -> bool {
        !self.loading && self.page > 1
    }

    pub fn can_next(&self) -> bool {
        !self.loading && self.page < self.total_pages
    }

    pub fn status_label(&self) -> String {
        format!("Página {} de {}", self.page, self.total_pages)
    }

    pub fn metrics_label(&self, filtering: bool) -> String {
        if self.total_items > 0 {
            let (start, end) = self.range();
            let suffix = if filtering { " filtrados" } else { "" };
            format!(
                "Exibindo {start}-{end} de {} registros{suffix}",
                self.total_items
            )
        } else if filtering {
            "Nenhum registro encontrado para o filtro aplicado".to_string()
        } else {
            "Nenhum registro disponível".to_string()
        }
    }
}

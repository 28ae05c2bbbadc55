use std::{fmt, str::FromStr};

use lazy_static::lazy_static;
use serde_json::Value;

use crate::{
    api::{Record, SortDirection, SortSpec, value_text},
    format::{self, MISSING, Tone},
};

/// The two record categories the backend serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Integration,
    Occurrence,
}

impl Dataset {
    pub const ALL: [Dataset; 2] = [Dataset::Integration, Dataset::Occurrence];

    pub fn id(&self) -> &'static str {
        match self {
            Dataset::Integration => "integration",
            Dataset::Occurrence => "occurrence",
        }
    }

    pub fn definition(&self) -> &'static DatasetDefinition {
        match self {
            Dataset::Integration => &INTEGRATION,
            Dataset::Occurrence => &OCCURRENCE,
        }
    }

    pub fn label(&self) -> &'static str {
        self.definition().label
    }

    pub fn next(&self) -> Dataset {
        match self {
            Dataset::Integration => Dataset::Occurrence,
            Dataset::Occurrence => Dataset::Integration,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integration" | "integracao" | "integracoes" => Ok(Dataset::Integration),
            "occurrence" | "ocorrencia" | "ocorrencias" => Ok(Dataset::Occurrence),
            other => Err(format!(
                "unknown dataset '{other}' (expected integration or occurrence)"
            )),
        }
    }
}

pub struct DatasetDefinition {
    pub dataset: Dataset,
    pub label: &'static str,
    pub api_base: &'static str,
    pub empty_message: &'static str,
    pub default_sort: SortSpec,
    pub columns: Vec<ColumnDescriptor>,
}

impl DatasetDefinition {
    pub fn records_path(&self) -> String {
        format!("{}/records", self.api_base)
    }

    pub fn record_path(&self, record_id: &str) -> String {
        format!("{}/records/{}", self.api_base, urlencoding::encode(record_id))
    }

    pub fn export_path(&self) -> String {
        format!("{}/export", self.api_base)
    }

    pub fn column(&self, key: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.key == key)
    }

    pub fn annotation_column(&self) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|column| column.annotation)
    }
}

pub type CellRenderer = fn(Option<&Value>, &Record) -> CellContent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnStyle {
    Plain,
    Identifier,
    Strong,
    Uppercase,
    Truncate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellContent {
    pub text: String,
    pub tone: Tone,
}

impl CellContent {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    fn missing() -> Self {
        Self::new(MISSING, Tone::Muted)
    }
}

#[derive(Clone)]
pub struct ColumnDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub width: u16,
    pub sortable: bool,
    /// Raw field to sort by when the column displays a derived value.
    pub sort_key: Option<&'static str>,
    pub style: ColumnStyle,
    pub render: Option<CellRenderer>,
    /// Cell text is a long note shown in a popover instead of inline.
    pub annotation: bool,
}

impl fmt::Debug for ColumnDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("sortable", &self.sortable)
            .field("sort_key", &self.sort_key)
            .finish_non_exhaustive()
    }
}

impl ColumnDescriptor {
    fn new(key: &'static str, label: &'static str, width: u16) -> Self {
        Self {
            key,
            label,
            width,
            sortable: true,
            sort_key: None,
            style: ColumnStyle::Plain,
            render: None,
            annotation: false,
        }
    }

    fn style(mut self, style: ColumnStyle) -> Self {
        self.style = style;
        self
    }

    fn sort_by(mut self, key: &'static str) -> Self {
        self.sort_key = Some(key);
        self
    }

    fn render_with(mut self, render: CellRenderer) -> Self {
        self.render = Some(render);
        self
    }

    fn annotation(mut self) -> Self {
        self.annotation = true;
        self.sortable = false;
        self.render = Some(render_annotation_marker);
        self
    }

    /// Field sent as `sort_by`, or `None` for columns that cannot sort.
    pub fn sort_field(&self) -> Option<&'static str> {
        if !self.sortable {
            return None;
        }
        Some(self.sort_key.unwrap_or(self.key))
    }

    pub fn render_cell(&self, record: &Record) -> CellContent {
        let value = record.get(self.key);
        if let Some(render) = self.render {
            return render(value, record);
        }
        match value.and_then(value_text) {
            Some(text) if self.style == ColumnStyle::Uppercase => {
                CellContent::new(text.to_uppercase(), Tone::Plain)
            }
            Some(text) => CellContent::new(text, Tone::Plain),
            None => CellContent::missing(),
        }
    }
}

fn render_status(value: Option<&Value>, _record: &Record) -> CellContent {
    match value.and_then(value_text) {
        Some(text) => {
            let tone = format::status_tone(Some(&text));
            CellContent::new(text, tone)
        }
        None => CellContent::new(MISSING, format::status_tone(None)),
    }
}

fn render_severity(value: Option<&Value>, record: &Record) -> CellContent {
    let Some(label) = value.and_then(value_text) else {
        return CellContent::missing();
    };
    let grade = format::numeric(record.get("grau"));
    let tone = format::severity_tone(grade);
    match record.text("grau") {
        Some(raw) => CellContent::new(format!("{label} ({raw})"), tone),
        None => CellContent::new(label, tone),
    }
}

fn render_date(value: Option<&Value>, _record: &Record) -> CellContent {
    tone_for_missing(format::format_date(value))
}

fn render_datetime(value: Option<&Value>, _record: &Record) -> CellContent {
    tone_for_missing(format::format_datetime(value))
}

fn render_integer(value: Option<&Value>, _record: &Record) -> CellContent {
    tone_for_missing(format::format_integer(value))
}

fn render_annotation_marker(value: Option<&Value>, _record: &Record) -> CellContent {
    match value.and_then(value_text).filter(|text| !text.trim().is_empty()) {
        Some(_) => CellContent::new("●", Tone::Plain),
        None => CellContent::new("", Tone::Muted),
    }
}

fn tone_for_missing(text: String) -> CellContent {
    let tone = if text == MISSING {
        Tone::Muted
    } else {
        Tone::Plain
    };
    CellContent::new(text, tone)
}

fn shared_leading_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", "ID", 6),
        ColumnDescriptor::new("matricula", "Matrícula", 10).style(ColumnStyle::Identifier),
        ColumnDescriptor::new("nome", "Colaborador", 22).style(ColumnStyle::Strong),
        ColumnDescriptor::new("setor", "Setor", 14),
        ColumnDescriptor::new("cargo", "Cargo", 16).style(ColumnStyle::Truncate),
        ColumnDescriptor::new("turno", "Turno", 10),
    ]
}

lazy_static! {
    static ref INTEGRATION: DatasetDefinition = {
        let mut columns = shared_leading_columns();
        columns.extend([
            ColumnDescriptor::new("integracao", "Status", 12).render_with(render_status),
            ColumnDescriptor::new("supervisor", "Supervisor", 16).style(ColumnStyle::Uppercase),
            ColumnDescriptor::new("data", "Data integração", 12).render_with(render_date),
            ColumnDescriptor::new("submitted_at", "Registrado em", 16).render_with(render_datetime),
            ColumnDescriptor::new("observacao", "Obs.", 4).annotation(),
        ]);
        DatasetDefinition {
            dataset: Dataset::Integration,
            label: "Integrações",
            api_base: "/api/integration",
            empty_message: "Nenhum registro de integração encontrado.",
            default_sort: SortSpec::new("submitted_at", SortDirection::Desc),
            columns,
        }
    };
    static ref OCCURRENCE: DatasetDefinition = {
        let mut columns = shared_leading_columns();
        columns.extend([
            ColumnDescriptor::new("grau_label", "Grau", 18)
                .sort_by("grau")
                .render_with(render_severity),
            ColumnDescriptor::new("volumes", "Volumes", 8).render_with(render_integer),
            ColumnDescriptor::new("supervisor", "Supervisor", 16).style(ColumnStyle::Uppercase),
            ColumnDescriptor::new("created_at", "Registrado em", 16).render_with(render_datetime),
            ColumnDescriptor::new("observacao", "Obs.", 4).annotation(),
        ]);
        DatasetDefinition {
            dataset: Dataset::Occurrence,
            label: "Ocorrências",
            api_base: "/api/occurrence",
            empty_message: "Nenhum registro de ocorrência encontrado.",
            default_sort: SortSpec::new("created_at", SortDirection::Desc),
            columns,
        }
    };
}

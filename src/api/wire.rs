use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Error;

/// One backend row. Field values are kept as the server sent them; the UI
/// never edits a record in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::Number(number) => Some(number.to_string()),
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Present, non-null, non-empty value rendered as plain text.
    pub fn text(&self, key: &str) -> Option<String> {
        value_text(self.0.get(key)?)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Record(fields)),
            other => Err(other),
        }
    }
}

pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => Some(other.to_string()),
    }
}

/// One server page. `page` and `page_size` are whatever the server settled on,
/// which may differ from what was asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    pub total_items: u64,
    pub total_pages: u32,
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    pub fn empty(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            total_items: 0,
            total_pages: 1,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Normalise a list response body. Missing or zero pagination fields fall
    /// back to the requested values; `items` that is not an array is empty.
    pub fn from_body(body: &Value, requested_page: u32, requested_size: u32) -> Result<Self, Error> {
        let Some(object) = body.as_object() else {
            return Err(Error::Decode("expected a JSON object".to_string()));
        };
        let items = object
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| Record::try_from(item.clone()).ok())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let empty = Map::new();
        let pagination = object
            .get("pagination")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let page = positive(pagination.get("page"))
            .unwrap_or(u64::from(requested_page))
            .max(1);
        let page_size = positive(pagination.get("page_size"))
            .unwrap_or(u64::from(requested_size))
            .max(1);
        let total_items = positive(pagination.get("total_items")).unwrap_or(0);
        let total_pages = positive(pagination.get("total_pages"))
            .unwrap_or_else(|| total_items.div_ceil(page_size))
            .max(1);

        Ok(Self {
            items,
            total_items,
            total_pages: saturate(total_pages),
            page: saturate(page),
            page_size: saturate(page_size),
        })
    }
}

fn positive(value: Option<&Value>) -> Option<u64> {
    let number = match value? {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| *v > 0.0).map(|v| v.floor() as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    (number > 0).then_some(number)
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// `error` string from a failure body, if the server sent one.
pub fn error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub timestamp: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn page_adopts_server_pagination() {
        let body = json!({
            "items": [{"id": 41, "nome": "Ana"}, {"id": 42, "nome": "Bruno"}],
            "pagination": {"page": 3, "page_size": 10, "total_items": 22, "total_pages": 3}
        });
        let page = Page::from_body(&body, 5, 10).expect("valid body");
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_items, 22);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].id().as_deref(), Some("42"));
    }

    #[test]
    fn page_falls_back_when_pagination_is_missing() {
        let body = json!({"items": "oops"});
        let page = Page::from_body(&body, 4, 10).expect("valid body");
        assert_eq!(page.page, 4);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.total_items, 0);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn total_pages_is_derived_from_total_items() {
        let body = json!({
            "items": [],
            "pagination": {"page": "2", "page_size": 10, "total_items": 21}
        });
        let page = Page::from_body(&body, 1, 10).expect("valid body");
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn non_object_body_is_a_decode_error() {
        let err = Page::from_body(&json!([1, 2, 3]), 1, 10).expect_err("array body");
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn record_text_skips_null_and_empty() {
        let record = Record::try_from(json!({
            "id": "7",
            "matricula": null,
            "setor": "",
            "volumes": 12
        }))
        .expect("object");
        assert_eq!(record.id().as_deref(), Some("7"));
        assert_eq!(record.text("matricula"), None);
        assert_eq!(record.text("setor"), None);
        assert_eq!(record.text("volumes").as_deref(), Some("12"));
    }

    #[test]
    fn error_message_ignores_blank_text() {
        assert_eq!(
            error_message(&json!({"error": "Falhou"})).as_deref(),
            Some("Falhou")
        );
        assert_eq!(error_message(&json!({"error": " "})), None);
        assert_eq!(error_message(&json!({"status": "deleted"})), None);
    }
}

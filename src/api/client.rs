use async_trait::async_trait;
use reqwest::{Response, StatusCode, header::CONTENT_DISPOSITION};
use serde_json::Value;

use super::{
    ExportQuery, HealthStatus, Page, QueryDescriptor, disposition::filename_from_disposition,
    send_request, wire::error_message,
};
use crate::{Error, dataset::Dataset};

const USER_AGENT: &str = concat!("eventdesk/", env!("CARGO_PKG_VERSION"));
const HEALTH_PATH: &str = "/api/health";

/// Binary export body plus the name the server suggested for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
}

/// The operations the table controller needs from the records backend.
#[async_trait]
pub trait RecordsBackend: Send + Sync {
    async fn list(&self, dataset: Dataset, query: &QueryDescriptor) -> Result<Page, Error>;
    async fn delete(&self, dataset: Dataset, record_id: &str) -> Result<(), Error>;
    async fn export(&self, dataset: Dataset, query: &ExportQuery) -> Result<ExportPayload, Error>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(Error::Transport)?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn list_records(&self, path: &str, query: &QueryDescriptor) -> Result<Page, Error> {
        let url = self.url(path);
        let span = tracing::trace_span!(
            "ListRecords",
            url = %url,
            page = query.page,
            page_size = query.page_size,
            search = %query.search
        );
        send_request(span, || async {
            let response = self
                .http
                .get(&url)
                .query(&query.params())
                .send()
                .await
                .map_err(Error::Transport)?;
            let body = read_json(response).await?;
            let body = body.ok_or_else(|| Error::Decode("response body is not JSON".to_string()))?;
            Page::from_body(&body, query.page, query.page_size)
        })
        .await
    }

    pub async fn delete_record(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path);
        let span = tracing::trace_span!("DeleteRecord", url = %url);
        send_request(span, || async {
            let response = self
                .http
                .delete(&url)
                .send()
                .await
                .map_err(Error::Transport)?;
            // A success body is optional and carries nothing we use.
            read_json(response).await.map(|_| ())
        })
        .await
    }

    pub async fn export_records(
        &self,
        path: &str,
        query: &ExportQuery,
    ) -> Result<ExportPayload, Error> {
        let url = self.url(path);
        let span = tracing::trace_span!("ExportRecords", url = %url, search = %query.search);
        send_request(span, || async {
            let response = self
                .http
                .get(&url)
                .query(&query.params())
                .send()
                .await
                .map_err(Error::Transport)?;
            let status = response.status();
            if !status.is_success() {
                return Err(status_error(status, response).await);
            }
            let filename = response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok())
                .and_then(filename_from_disposition);
            let bytes = response.bytes().await.map_err(Error::Transport)?;
            if bytes.is_empty() {
                return Err(Error::EmptyPayload);
            }
            tracing::debug!(bytes = bytes.len(), filename = ?filename, "export_payload");
            Ok(ExportPayload {
                bytes: bytes.to_vec(),
                filename,
            })
        })
        .await
    }

    pub async fn health(&self) -> Result<HealthStatus, Error> {
        let url = self.url(HEALTH_PATH);
        let span = tracing::trace_span!("Health", url = %url);
        send_request(span, || async {
            let response = self.http.get(&url).send().await.map_err(Error::Transport)?;
            let body = read_json(response)
                .await?
                .ok_or_else(|| Error::Decode("response body is not JSON".to_string()))?;
            serde_json::from_value(body).map_err(|err| Error::Decode(err.to_string()))
        })
        .await
    }
}

#[async_trait]
impl RecordsBackend for ApiClient {
    async fn list(&self, dataset: Dataset, query: &QueryDescriptor) -> Result<Page, Error> {
        self.list_records(&dataset.definition().records_path(), query)
            .await
    }

    async fn delete(&self, dataset: Dataset, record_id: &str) -> Result<(), Error> {
        self.delete_record(&dataset.definition().record_path(record_id))
            .await
    }

    async fn export(&self, dataset: Dataset, query: &ExportQuery) -> Result<ExportPayload, Error> {
        self.export_records(&dataset.definition().export_path(), query)
            .await
    }
}

/// Body as JSON when it parses. Non-2xx responses become [`Error::Status`].
async fn read_json(response: Response) -> Result<Option<Value>, Error> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(Error::Transport)?;
    let body = serde_json::from_slice::<Value>(&bytes).ok();
    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            message: body.as_ref().and_then(error_message),
        });
    }
    Ok(body)
}

async fn status_error(status: StatusCode, response: Response) -> Error {
    let message = match response.bytes().await {
        Ok(bytes) => serde_json::from_slice::<Value>(&bytes)
            .ok()
            .as_ref()
            .and_then(error_message),
        Err(_) => None,
    };
    Error::Status {
        status: status.as_u16(),
        message,
    }
}

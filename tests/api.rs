use eventdesk::{
    Error,
    api::{ApiClient, ExportQuery, QueryDescriptor, RecordsBackend, SortDirection, SortSpec},
    dataset::Dataset,
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param, query_param_is_missing},
};

fn query(page: u32, search: &str) -> QueryDescriptor {
    QueryDescriptor {
        page,
        page_size: 10,
        sort: Some(SortSpec::new("nome", SortDirection::Asc)),
        search: search.to_string(),
    }
}

#[tokio::test]
async fn list_sends_query_and_adopts_server_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/integration/records"))
        .and(query_param("page", "5"))
        .and(query_param("page_size", "10"))
        .and(query_param("sort_by", "nome"))
        .and(query_param("sort_order", "asc"))
        .and(query_param("search", "maria"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": 21, "nome": "Maria"}],
            "pagination": {"page": 3, "page_size": 10, "total_items": 21, "total_pages": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let page = client
        .list(Dataset::Integration, &query(5, "  maria "))
        .await
        .unwrap();

    assert_eq!(page.page, 3);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.total_items, 21);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id().as_deref(), Some("21"));
}

#[tokio::test]
async fn blank_search_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/occurrence/records"))
        .and(query_param_is_missing("search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let page = client
        .list(Dataset::Occurrence, &query(1, "   "))
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn server_error_message_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/integration/records/42"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"error": "Registro em uso"})),
        )
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let err = client
        .delete(Dataset::Integration, "42")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Status { status: 409, .. }));
    assert_eq!(err.server_message(), Some("Registro em uso"));
}

#[tokio::test]
async fn delete_accepts_empty_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/occurrence/records/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    client.delete(Dataset::Occurrence, "7").await.unwrap();
}

#[tokio::test]
async fn non_json_list_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/integration/records"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let err = client
        .list(Dataset::Integration, &query(1, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn export_has_no_pagination_and_reads_filename() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/integration/export"))
        .and(query_param_is_missing("page"))
        .and(query_param_is_missing("page_size"))
        .and(query_param("search", "ana"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "content-disposition",
                    r#"attachment; filename="integracoes.xlsx""#,
                )
                .set_body_bytes(b"PK\x03\x04".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri()).unwrap();
    let payload = client
        .export(
            Dataset::Integration,
            &ExportQuery {
                sort: None,
                search: "ana".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(payload.filename.as_deref(), Some("integracoes.xlsx"));
    assert_eq!(payload.bytes, b"PK\x03\x04".to_vec());
}

#[tokio::test]
async fn health_reports_service_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "service": "eventos",
            "timestamp": "2024-03-07T09:05:01"
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(&format!("{}/", server.uri())).unwrap();
    let status = client.health().await.unwrap();
    assert!(status.is_ok());
    assert_eq!(status.service, "eventos");
}

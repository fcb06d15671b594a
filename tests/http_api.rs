use doc_ingest::app::open_service;
use doc_ingest::config::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use doc_ingest::server;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;
use tempfile::TempDir;

struct TestServer {
    base: String,
    client: reqwest::Client,
    _tmp: TempDir,
}

async fn start_server() -> TestServer {
    start_server_with_limit(DEFAULT_MAX_UPLOAD_BYTES).await
}

async fn start_server_with_limit(max_upload_bytes: usize) -> TestServer {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::from_env();
    config.db.path = tmp.path().join("docingest.sqlite");
    config.storage.documents_dir = tmp.path().join("documents");
    config.chunking.chunk_size = 100;
    config.chunking.overlap = 10;
    config.server.max_upload_bytes = max_upload_bytes;

    let service = open_service(&config).await.unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        server::serve(listener, service, max_upload_bytes)
            .await
            .unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        client: reqwest::Client::new(),
        _tmp: tmp,
    }
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn upload(&self, filename: &str, body: &[u8], metadata: Option<&str>) -> reqwest::Response {
        let mut form = Form::new().part(
            "file",
            Part::bytes(body.to_vec()).file_name(filename.to_string()),
        );
        if let Some(meta) = metadata {
            form = form.text("metadata", meta.to_string());
        }
        self.client
            .post(self.url("/documents"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    async fn upload_ok(&self, filename: &str, body: &[u8]) -> String {
        let resp = self.upload(filename, body, None).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let doc: Value = resp.json().await.unwrap();
        doc["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_status() {
    let srv = start_server().await;
    let resp = srv.client.get(srv.url("/status")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    let ts = body["timestamp"].as_str().unwrap();
    assert_eq!(ts.len(), "2025-01-01T00:00:00Z".len());
    assert!(ts.ends_with('Z'));
}

#[tokio::test]
async fn test_upload_with_metadata() {
    let srv = start_server().await;
    let resp = srv
        .upload(
            "report.txt",
            b"quarterly numbers",
            Some(r#"{"title":"Q3","tags":["finance"]}"#),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let doc: Value = resp.json().await.unwrap();
    assert!(doc["id"].as_str().unwrap().starts_with("doc_"));
    assert_eq!(doc["filename"], "report.txt");
    assert_eq!(doc["status"], "pending");
    assert_eq!(doc["chunk_count"], 0);
    assert_eq!(doc["metadata"]["title"], "Q3");
    assert_eq!(doc["metadata"]["tags"][0], "finance");
    assert_eq!(doc["created_at"], doc["updated_at"]);

    let fetched: Value = srv
        .client
        .get(srv.url(&format!("/documents/{}", doc["id"].as_str().unwrap())))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["created_at"], doc["created_at"]);
    assert_eq!(fetched["updated_at"], doc["updated_at"]);
}

#[tokio::test]
async fn test_upload_larger_than_two_mib() {
    let srv = start_server().await;
    let body = vec![b'a'; 3 * 1024 * 1024];
    let id = srv.upload_ok("big.txt", &body).await;

    let doc: Value = srv
        .client
        .get(srv.url(&format!("/documents/{}", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(doc["filename"], "big.txt");
}

#[tokio::test]
async fn test_upload_over_limit_is_413() {
    let srv = start_server_with_limit(1024).await;
    let resp = srv.upload("big.txt", &vec![b'a'; 8 * 1024], None).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "payload_too_large");

    // small uploads still pass and nothing was recorded for the rejected one
    srv.upload_ok("small.txt", b"tiny").await;
    let list: Value = srv
        .client
        .get(srv.url("/documents"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 1);
}

#[tokio::test]
async fn test_upload_rejects_bad_input() {
    let srv = start_server().await;

    let resp = srv.upload("a.txt", b"x", Some("{not json")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let form = Form::new().text("metadata", "{}");
    let resp = srv
        .client
        .post(srv.url("/documents"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"]["message"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn test_list_paging_and_validation() {
    let srv = start_server().await;
    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(srv.upload_ok(&format!("f{}.txt", i), b"x").await);
    }

    let body: Value = srv
        .client
        .get(srv.url("/documents"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["limit"], 20);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["documents"][0]["id"], ids[2].as_str());

    let body: Value = srv
        .client
        .get(srv.url("/documents?limit=1&offset=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);
    assert_eq!(body["documents"][0]["id"], ids[0].as_str());
    assert_eq!(body["total"], 3);

    for query in [
        "limit=0",
        "limit=101",
        "offset=-1",
        "limit=abc",
        "offset=xyz",
        "offset=99999999999",
    ] {
        let resp = srv
            .client
            .get(srv.url(&format!("/documents?{}", query)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", query);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request", "{}", query);
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("must be an integer between"),
            "{}",
            query
        );
    }
}

#[tokio::test]
async fn test_process_and_chunks() {
    let srv = start_server().await;
    let id = srv.upload_ok("a.txt", "A".repeat(250).as_bytes()).await;

    let resp = srv
        .client
        .post(srv.url(&format!("/documents/{}/process", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "processing");
    assert!(body["message"].is_string());

    let body: Value = srv
        .client
        .get(srv.url(&format!("/documents/{}/chunks", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["chunks"][2]["position"], 2);
    assert_eq!(body["chunks"][2]["content"].as_str().unwrap().len(), 70);

    let doc: Value = srv
        .client
        .get(srv.url(&format!("/documents/{}", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(doc["status"], "completed");
    assert_eq!(doc["chunk_count"], 3);
}

#[tokio::test]
async fn test_delete_and_not_found() {
    let srv = start_server().await;
    let id = srv.upload_ok("a.txt", b"hello world").await;

    let resp = srv
        .client
        .delete(srv.url(&format!("/documents/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = srv
        .client
        .delete(srv.url(&format!("/documents/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = srv
        .client
        .get(srv.url(&format!("/documents/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    for path in [
        format!("/documents/{}/chunks", id),
        "/documents/doc_unknown/chunks".to_string(),
    ] {
        let resp = srv.client.get(srv.url(&path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", path);
    }

    let resp = srv
        .client
        .post(srv.url("/documents/doc_unknown/process"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

//! End-to-end tests for the document API over `SQLite` and local storage.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, Database};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use clubdocs_api::{AppState, create_router};
use clubdocs_core::storage::{StorageConfig, StorageProvider, StorageService};
use clubdocs_db::migration::{Migrator, MigratorTrait};
use clubdocs_shared::JwtService;
use clubdocs_shared::config::{DocumentSettings, JwtConfig};

const BOUNDARY: &str = "clubdocs-test-boundary";

struct TestApp {
    router: Router,
    jwt: Arc<JwtService>,
    _dir: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("api.db").display());
        let mut options = ConnectOptions::new(url);
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options)
            .await
            .expect("Failed to connect to database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let storage = StorageService::from_config(StorageConfig::new(StorageProvider::local_fs(
            dir.path().join("blobs"),
        )))
        .expect("Failed to create storage");
        let jwt = JwtService::new(&JwtConfig {
            secret: "test-secret-key-that-is-long-enough".to_string(),
            access_token_expiry_secs: 900,
        });

        let state = AppState::new(
            db,
            jwt,
            storage,
            DocumentSettings::default(),
            50 * 1024 * 1024,
        );
        let jwt = Arc::clone(&state.jwt_service);

        Self {
            router: create_router(state),
            jwt,
            _dir: dir,
        }
    }

    fn token(&self, user_id: i32, role: &str, athlete_id: Option<i32>) -> String {
        self.jwt
            .generate_access_token(user_id, role, athlete_id)
            .expect("token")
    }

    fn admin(&self) -> String {
        self.token(1, "admin", None)
    }

    fn athlete(&self, user_id: i32, athlete_id: i32) -> String {
        self.token(user_id, "athlete", Some(athlete_id))
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes()
            .to_vec();
        (status, body)
    }

    async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(request).await;
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).expect("json body")
        };
        (status, value)
    }

    async fn upload(
        &self,
        token: &str,
        fields: &[(&str, &str)],
        file: Part<'_>,
    ) -> (StatusCode, Value) {
        self.json(multipart_request("/api/v1/documents", token, fields, &[file]))
            .await
    }
}

struct Part<'a> {
    field: &'a str,
    file_name: &'a str,
    content_type: &'a str,
    data: &'a [u8],
}

fn pdf<'a>(field: &'a str, file_name: &'a str) -> Part<'a> {
    Part {
        field,
        file_name,
        content_type: "application/pdf",
        data: b"%PDF-1.4 test",
    }
}

fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    files: &[Part<'_>],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for part in files {
        let disposition = format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
            part.field, part.file_name
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n{disposition}\r\nContent-Type: {}\r\n\r\n",
                part.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .expect("request");

    let (status, body) = app.json(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "up");
}

#[tokio::test]
async fn test_documents_require_token() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/v1/documents/mine")
        .body(Body::empty())
        .expect("request");

    let (status, body) = app.json(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");
}

#[tokio::test]
async fn test_upload_review_lifecycle() {
    let app = TestApp::new().await;
    let athlete = app.athlete(20, 10);
    let admin = app.admin();

    let (status, doc) = app
        .upload(
            &athlete,
            &[("document_type", "medical_certificate"), ("expiry_date", "2026-12-31")],
            pdf("file", "cert.pdf"),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(doc["athlete_id"], 10);
    assert_eq!(doc["validation_status"], "pending");
    assert_eq!(doc["expiry_date"], "2026-12-31");
    let id = doc["id"].as_i64().expect("id");

    let (status, pending) = app.json(get("/api/v1/documents/pending", &admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().map(Vec::len), Some(1));

    let (status, approved) = app
        .json(post_json(
            &format!("/api/v1/documents/{id}/validate"),
            &admin,
            &json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["validation_status"], "approved");
    assert_eq!(approved["validated_by"], 1);

    let (status, err) = app
        .json(post_json(
            &format!("/api/v1/documents/{id}/reject"),
            &admin,
            &json!({ "reason": "changed my mind" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "INVALID_TRANSITION");

    let (status, mine) = app.json(get("/api/v1/documents/mine", &athlete)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine[0]["validation_status"], "approved");
}

#[tokio::test]
async fn test_upload_exposes_file_url_string() {
    let app = TestApp::new().await;
    let athlete = app.athlete(20, 10);

    let (status, doc) = app.upload(&athlete, &[], pdf("file", "cert.pdf")).await;

    assert_eq!(status, StatusCode::CREATED);
    let file_url = doc["file_url"].as_str().expect("file_url is a string");
    assert!(file_url.starts_with("documents/athlete_10/"));
    assert!(file_url.ends_with("_cert.pdf"));
    assert!(doc.get("file_location").is_none());
}

#[tokio::test]
async fn test_upload_with_unknown_category_reports_constraint() {
    let app = TestApp::new().await;
    let admin = app.admin();

    let (status, body) = app
        .upload(
            &admin,
            &[("athlete_id", "10"), ("category_id", "999")],
            pdf("file", "cert.pdf"),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    let message = body["message"].as_str().expect("message");
    assert!(message.contains("FOREIGN KEY"), "got: {message}");

    let (_, listed) = app.json(get("/api/v1/athletes/10/documents", &admin)).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_duplicate_tag_name_is_conflict() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let body = json!({ "name": "urgent" });

    let (status, _) = app
        .json(post_json("/api/v1/document-tags", &admin, &body))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = app
        .json(post_json("/api/v1/document-tags", &admin, &body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"], "CONFLICT");
}

#[tokio::test]
async fn test_athlete_cannot_upload_for_someone_else() {
    let app = TestApp::new().await;
    let athlete = app.athlete(20, 10);

    let (status, body) = app
        .upload(&athlete, &[("athlete_id", "11")], pdf("file", "cert.pdf"))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_upload_rejects_disallowed_mime_type() {
    let app = TestApp::new().await;
    let athlete = app.athlete(20, 10);
    let part = Part {
        field: "file",
        file_name: "page.html",
        content_type: "text/html",
        data: b"<html></html>",
    };

    let (status, body) = app.upload(&athlete, &[], part).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_review_requires_admin_and_existing_document() {
    let app = TestApp::new().await;
    let athlete = app.athlete(20, 10);
    let admin = app.admin();

    let (status, _) = app
        .json(post_json("/api/v1/documents/99/validate", &athlete, &json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(post_json("/api/v1/documents/99/validate", &admin, &json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_bulk_upload_isolates_missing_file() {
    let app = TestApp::new().await;
    let admin = app.admin();

    let request = multipart_request(
        "/api/v1/documents/bulk",
        &admin,
        &[("athlete_ids", "10, 11,12"), ("document_type", "insurance")],
        &[pdf("file_10", "a.pdf"), pdf("file_12", "c.pdf")],
    );
    let (status, body) = app.json(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 1);
    let results = body["results"].as_array().expect("results");
    let order: Vec<_> = results.iter().map(|r| r["athlete_id"].clone()).collect();
    assert_eq!(order, vec![json!(10), json!(11), json!(12)]);
    assert!(results[1]["error"].as_str().is_some_and(|e| e.contains("11")));
    assert_eq!(results[2]["document"]["document_type"], "insurance");
}

#[tokio::test]
async fn test_bulk_upload_repeated_athlete_reuses_file() {
    let app = TestApp::new().await;
    let admin = app.admin();

    let request = multipart_request(
        "/api/v1/documents/bulk",
        &admin,
        &[("athlete_ids", "10,10")],
        &[pdf("file_10", "a.pdf")],
    );
    let (status, body) = app.json(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 0);
    let results = body["results"].as_array().expect("results");
    assert_eq!(results[0]["document"]["file_name"], "a.pdf");
    assert_eq!(results[1]["document"]["file_name"], "a.pdf");
    assert_ne!(results[0]["document"]["id"], results[1]["document"]["id"]);
}

#[tokio::test]
async fn test_bulk_upload_requires_athlete_ids() {
    let app = TestApp::new().await;
    let admin = app.admin();

    let request = multipart_request("/api/v1/documents/bulk", &admin, &[], &[]);
    let (status, _) = app.json(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_streams_local_file() {
    let app = TestApp::new().await;
    let athlete = app.athlete(20, 10);
    let (_, doc) = app.upload(&athlete, &[], pdf("file", "cert.pdf")).await;
    let id = doc["id"].as_i64().expect("id");

    let (status, body) = app
        .send(get(&format!("/api/v1/documents/{id}/download"), &athlete))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"%PDF-1.4 test");
}

#[tokio::test]
async fn test_preview_serves_file_inline() {
    let app = TestApp::new().await;
    let athlete = app.athlete(20, 10);
    let (_, doc) = app.upload(&athlete, &[], pdf("file", "cert.pdf")).await;
    let id = doc["id"].as_i64().expect("id");

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/api/v1/documents/{id}/preview"), &athlete))
        .await
        .expect("request failed");

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "inline; filename=\"cert.pdf\""
    );
    let body = response.into_body().collect().await.expect("body").to_bytes();
    assert_eq!(&body[..], b"%PDF-1.4 test");
}

#[tokio::test]
async fn test_download_is_an_attachment() {
    let app = TestApp::new().await;
    let athlete = app.athlete(20, 10);
    let (_, doc) = app.upload(&athlete, &[], pdf("file", "cert.pdf")).await;
    let id = doc["id"].as_i64().expect("id");

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/api/v1/documents/{id}/download"), &athlete))
        .await
        .expect("request failed");

    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"cert.pdf\""
    );
}

#[tokio::test]
async fn test_other_athlete_needs_a_share() {
    let app = TestApp::new().await;
    let owner = app.athlete(20, 10);
    let other = app.athlete(55, 11);
    let (_, doc) = app.upload(&owner, &[], pdf("file", "cert.pdf")).await;
    let id = doc["id"].as_i64().expect("id");

    let (status, _) = app
        .json(get(&format!("/api/v1/documents/{id}"), &other))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, share) = app
        .json(post_json(
            &format!("/api/v1/documents/{id}/shares"),
            &owner,
            &json!({ "shared_with": 55, "permission_level": "view" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(share["permission_level"], "view");

    let (status, _) = app
        .json(get(&format!("/api/v1/documents/{id}"), &other))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, shared) = app.json(get("/api/v1/documents/shared", &other)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shared[0]["document"]["id"], id);
}

#[tokio::test]
async fn test_search_rejects_unknown_status() {
    let app = TestApp::new().await;
    let admin = app.admin();

    let (status, body) = app
        .json(get("/api/v1/documents/search?status=archived", &admin))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_search_confines_athletes_to_own_documents() {
    let app = TestApp::new().await;
    let first = app.athlete(20, 10);
    let second = app.athlete(21, 11);
    app.upload(&first, &[], pdf("file", "mine.pdf")).await;
    app.upload(&second, &[], pdf("file", "theirs.pdf")).await;

    let (status, body) = app
        .json(get("/api/v1/documents/search?athlete_id=11", &first))
        .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body
        .as_array()
        .expect("array")
        .iter()
        .map(|d| d["file_name"].clone())
        .collect();
    assert_eq!(names, vec![json!("mine.pdf")]);
}

#[tokio::test]
async fn test_catalog_admin_creates_everyone_reads() {
    let app = TestApp::new().await;
    let admin = app.admin();
    let athlete = app.athlete(20, 10);

    let (status, _) = app
        .json(post_json(
            "/api/v1/document-categories",
            &athlete,
            &json!({ "name": "Medical" }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app
        .json(post_json(
            "/api/v1/document-categories",
            &admin,
            &json!({ "name": "Medical", "color": "#ef4444" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Medical");

    let (status, listed) = app
        .json(get("/api/v1/document-categories", &athlete))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["color"], "#ef4444");
}

//! Integration tests for the catalog service API

use async_trait::async_trait;
use awire_common::Result;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use catalog_service::media::UploadFile;
use catalog_service::{
    create_router, ActivityOutbox, AppState, Catalog, DocumentStore, MediaService, MediaUploader,
    MemoryStore,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

const TOKEN: &str = "test-admin-token";

#[derive(Default)]
struct StubUploader {
    calls: AtomicUsize,
}

#[async_trait]
impl MediaUploader for StubUploader {
    async fn upload(&self, file: &UploadFile, folder: &str, _tags: &[String]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://res.cloudinary.com/awire/{}/{}", folder, file.file_name))
    }
}

struct TestApp {
    router: Router,
    uploader: Arc<StubUploader>,
}

/// Helper to create test app over an in-memory store
fn create_test_app() -> TestApp {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let (outbox, worker) = ActivityOutbox::channel(store.clone());
    tokio::spawn(worker.run());

    let uploader = Arc::new(StubUploader::default());
    let state = AppState {
        catalog: Catalog::new(store, outbox),
        media: MediaService::new(uploader.clone()),
        admin_token: Some(TOKEN.to_string()),
        page_size: 12,
        max_page_size: 100,
        activity_limit: 10,
    };

    TestApp {
        router: create_router(state),
        uploader,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, body) = self
            .send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN));

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let (status, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    async fn create(&self, uri: &str, body: Value) -> String {
        let (status, json) = self.admin("POST", uri, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", json);
        json["id"].as_str().unwrap().to_string()
    }

    async fn create_artisan(&self, name: &str) -> String {
        self.create(
            "/api/admin/artisans",
            json!({ "nome": name, "aldeia": "Canoanã", "whatsapp": "(63) 99999-0000" }),
        )
        .await
    }

    async fn create_craft_item(&self, name: &str, artisan_id: &str) -> String {
        self.create(
            "/api/admin/craft-items",
            json!({
                "nome": name,
                "descricao": "Feito com penas de arara",
                "imageUrls": ["https://res.cloudinary.com/awire/cocar.jpg"],
                "artesaoId": artisan_id,
                "categoria": "Adornos",
                "aldeia": "Canoanã"
            }),
        )
        .await
    }
}

fn multipart_upload(profile: &str, file_name: &str, content_type: &str, size: usize) -> Request<Body> {
    let boundary = "awire-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"profile\"\r\n\r\n{p}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: {c}\r\n\r\n",
            b = boundary,
            p = profile,
            f = file_name,
            c = content_type
        )
        .as_bytes(),
    );
    body.extend(std::iter::repeat(b'x').take(size));
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/admin/uploads")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app();
    let (status, json) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "catalog-service");
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = create_test_app();

    let (status, _) = app.get("/api/admin/statistics").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/admin/statistics")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app.admin("GET", "/api/admin/statistics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totals"]["craftItems"], 0);
}

#[tokio::test]
async fn test_catalog_lifecycle_keeps_orphaned_items() {
    let app = create_test_app();

    app.create("/api/admin/categories", json!({ "nome": "Adornos" })).await;
    app.create("/api/admin/villages", json!({ "nome": "Canoanã" })).await;
    let juma = app.create_artisan("Juma").await;
    let cocar = app.create_craft_item("Cocar", &juma).await;

    let (_, categories) = app.get("/api/categories").await;
    assert_eq!(categories[0]["nome"], "Adornos");

    let (status, json) = app.get(&format!("/api/artisans/{}/craft-items", juma)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["craftItems"][0]["id"], cocar.as_str());
    assert_eq!(json["craftItems"][0]["artesaoNome"], "Juma");

    let (status, json) = app.admin("DELETE", &format!("/api/admin/artisans/{}", juma), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let (status, json) = app.get(&format!("/api/craft-items/{}", cocar)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["craftItem"]["artesaoNome"], "Juma");
    assert!(json["contactLink"]
        .as_str()
        .unwrap()
        .starts_with("https://wa.me/"));

    let (status, _) = app.get(&format!("/api/artisans/{}", juma)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_artisan_rename_reaches_craft_items() {
    let app = create_test_app();
    let juma = app.create_artisan("Juma").await;
    let other = app.create_artisan("Txuiri").await;
    for name in ["Cocar", "Colar", "Pulseira"] {
        app.create_craft_item(name, &juma).await;
    }
    app.create_craft_item("Cesto", &other).await;

    let (status, json) = app
        .admin(
            "PUT",
            &format!("/api/admin/artisans/{}", juma),
            Some(json!({ "nome": "Juma Karajá" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", json);

    let (_, json) = app.get(&format!("/api/artisans/{}/craft-items", juma)).await;
    let names: Vec<&str> = json["craftItems"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["artesaoNome"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Juma Karajá"; 3]);

    let (_, json) = app.get(&format!("/api/artisans/{}/craft-items", other)).await;
    assert_eq!(json["craftItems"][0]["artesaoNome"], "Txuiri");
}

#[tokio::test]
async fn test_inactive_artisan_hidden_from_public_list() {
    let app = create_test_app();
    let juma = app.create_artisan("Juma").await;
    app.create_artisan("Txuiri").await;
    let cocar = app.create_craft_item("Cocar", &juma).await;

    let (status, _) = app
        .admin(
            "PUT",
            &format!("/api/admin/artisans/{}", juma),
            Some(json!({ "ativo": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app.get("/api/artisans").await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["artisans"][0]["nome"], "Txuiri");

    let (status, json) = app.get(&format!("/api/artisans/{}", juma)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["artisan"]["ativo"], false);

    let (status, _) = app.get(&format!("/api/craft-items/{}", cocar)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app.admin("GET", "/api/admin/artisans", None).await;
    assert_eq!(json["total"], 2);
}

#[tokio::test]
async fn test_paging_walks_whole_catalog() {
    let app = create_test_app();
    let juma = app.create_artisan("Juma").await;
    for n in 0..5 {
        app.create_craft_item(&format!("Peça {}", n), &juma).await;
    }

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    let mut fetches = 0;
    loop {
        let uri = match &cursor {
            Some(c) => format!("/api/craft-items?limit=2&cursor={}", c),
            None => "/api/craft-items?limit=2".to_string(),
        };
        let (status, json) = app.get(&uri).await;
        assert_eq!(status, StatusCode::OK);
        fetches += 1;

        for item in json["items"].as_array().unwrap() {
            seen.push(item["nome"].as_str().unwrap().to_string());
        }
        if json["hasMore"] == false {
            break;
        }
        cursor = json["nextCursor"].as_str().map(str::to_string);
    }

    assert_eq!(fetches, 3);
    assert_eq!(seen, vec!["Peça 4", "Peça 3", "Peça 2", "Peça 1", "Peça 0"]);
}

#[tokio::test]
async fn test_bad_page_requests_rejected() {
    let app = create_test_app();

    let (status, _) = app.get("/api/craft-items?cursor=not-a-cursor").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/craft-items?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/craft-items?limit=500").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_payload_never_reaches_store() {
    let app = create_test_app();
    let juma = app.create_artisan("Juma").await;

    let (status, json) = app
        .admin(
            "POST",
            "/api/admin/craft-items",
            Some(json!({
                "nome": "Cocar",
                "imageUrls": [],
                "artesaoId": juma,
                "categoria": "Adornos",
                "aldeia": "Canoanã"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (_, json) = app.admin("GET", "/api/admin/craft-items", None).await;
    assert_eq!(json["total"], 0);

    let (status, _) = app
        .admin("POST", "/api/admin/categories", Some(json!({ "nome": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_craft_item_artisan_name_comes_from_artisan() {
    let app = create_test_app();
    let juma = app.create_artisan("Juma").await;
    let txuiri = app.create_artisan("Txuiri").await;

    let payload = |artisan_id: &str| {
        json!({
            "nome": "Cocar",
            "imageUrls": ["https://res.cloudinary.com/awire/cocar.jpg"],
            "artesaoId": artisan_id,
            "artesaoNome": "Impostor",
            "categoria": "Adornos",
            "aldeia": "Canoanã"
        })
    };

    let cocar = app.create("/api/admin/craft-items", payload(&juma)).await;
    let (_, json) = app.get(&format!("/api/craft-items/{}", cocar)).await;
    assert_eq!(json["craftItem"]["artesaoNome"], "Juma");

    let (status, json) = app
        .admin("POST", "/api/admin/craft-items", Some(payload("no-such-artisan")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    // A stray name without an owner change is ignored
    let (status, _) = app
        .admin(
            "PUT",
            &format!("/api/admin/craft-items/{}", cocar),
            Some(json!({ "artesaoNome": "Impostor" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = app.get(&format!("/api/craft-items/{}", cocar)).await;
    assert_eq!(json["craftItem"]["artesaoNome"], "Juma");

    let (status, _) = app
        .admin(
            "PUT",
            &format!("/api/admin/craft-items/{}", cocar),
            Some(json!({ "artesaoId": txuiri, "artesaoNome": "Impostor" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = app.get(&format!("/api/craft-items/{}", cocar)).await;
    assert_eq!(json["craftItem"]["artesaoId"], txuiri.as_str());
    assert_eq!(json["craftItem"]["artesaoNome"], "Txuiri");

    let (status, _) = app
        .admin(
            "PUT",
            &format!("/api/admin/craft-items/{}", cocar),
            Some(json!({ "artesaoId": "no-such-artisan" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = app.admin("GET", "/api/admin/craft-items", None).await;
    assert_eq!(json["total"], 1);
}

#[tokio::test]
async fn test_csv_export_quotes_commas() {
    let app = create_test_app();
    let juma = app.create_artisan("Juma").await;
    app.create_craft_item("A, B", &juma).await;

    let request = Request::builder()
        .uri("/api/admin/exports/craft-items")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(body.to_vec()).unwrap();

    assert!(csv.starts_with('\u{FEFF}'));
    let row = csv.lines().nth(1).unwrap();
    assert!(row.starts_with("\"A, B\";"), "{}", row);
}

#[tokio::test]
async fn test_report_and_database_exports() {
    let app = create_test_app();
    let juma = app.create_artisan("Juma").await;
    app.create_craft_item("Cocar", &juma).await;

    let request = Request::builder()
        .uri("/api/admin/exports/artisans?format=report")
        .header(header::AUTHORIZATION, format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    let report = String::from_utf8(body).unwrap();
    assert!(report.contains("RELATÓRIO DE ARTESÃOS CADASTRADOS"));
    assert!(report.contains("Página 1 de 1"));

    let (status, json) = app.admin("GET", "/api/admin/exports/database", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["version"], "1.0");
    assert_eq!(json["totals"]["artesanatos"], 1);
    assert_eq!(json["totals"]["artesaos"], 1);
    assert!(json["data"]["artesanatos"][0]["createdAt"].is_string());

    let (status, _) = app.admin("GET", "/api/admin/exports/fotos", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_document_rejected_before_upload() {
    let app = create_test_app();

    let (status, body) = app
        .send(multipart_upload("document", "rg.pdf", "application/pdf", 15 * 1024 * 1024))
        .await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(app.uploader.calls.load(Ordering::SeqCst), 0);

    let (status, body) = app
        .send(multipart_upload("document", "rg.pdf", "application/pdf", 5 * 1024 * 1024))
        .await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["url"], "https://res.cloudinary.com/awire/awire/rg.pdf");
    assert_eq!(app.uploader.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_site_config_and_activity_feed() {
    let app = create_test_app();

    let (_, json) = app.get("/api/site-config").await;
    assert_eq!(json["textoComoFunciona"], "");

    let (status, _) = app
        .admin(
            "PUT",
            "/api/admin/site-config",
            Some(json!({ "textoComoFunciona": "Fale com o artesão", "textoSobreProjeto": "IFTO" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = app.get("/api/site-config").await;
    assert_eq!(json["textoSobreProjeto"], "IFTO");

    app.create_artisan("Juma").await;

    // The activity worker writes in the background
    let mut entries = Value::Null;
    for _ in 0..50 {
        let (_, json) = app.admin("GET", "/api/admin/activity", None).await;
        if json.as_array().is_some_and(|list| !list.is_empty()) {
            entries = json;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(entries[0]["acao"], "Artesão adicionado");
    assert_eq!(entries[0]["descricao"], "Juma foi adicionado");
}

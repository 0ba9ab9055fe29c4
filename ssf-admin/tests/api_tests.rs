//! Integration tests for the ssf-admin HTTP API
//!
//! Every test runs against a fresh in-memory database through the full router
//! (role middleware included).

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use ssf_admin::{build_router, AppState};
use ssf_common::db::init_memory_database;
use tower::util::ServiceExt; // for `oneshot` method

const ADMIN_COOKIE: &str = "ssf_role=super-admin";
const BOUNDARY: &str = "ssf-test-boundary";

async fn setup_app() -> Router {
    let db = init_memory_database().await.expect("in-memory database");
    build_router(AppState::new(db, "ssf_role"))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn admin_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, ADMIN_COOKIE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::COOKIE, ADMIN_COOKIE)
        .body(Body::empty())
        .unwrap()
}

fn multipart_upload(uri: &str, csv: &str, mode: Option<&str>) -> Request<Body> {
    let mut body = String::new();
    if let Some(mode) = mode {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"mode\"\r\n\r\n{mode}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload.csv\"\r\nContent-Type: text/csv\r\n\r\n{csv}\r\n--{BOUNDARY}--\r\n"
    ));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, ADMIN_COOKIE)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Should parse JSON")
}

/// Send a request and return status plus JSON body
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

/// Pillar P1 → theme P1.T1 → sub-theme P1.T1.1 → one standard
async fn seed_branch(app: &Router) -> (i64, i64, i64, i64) {
    let (_, pillar) = send(
        app,
        admin_json("POST", "/api/pillars", json!({"code": "P1", "name": "Shelter", "sort_order": 1})),
    )
    .await;
    let pillar_id = pillar["id"].as_i64().unwrap();

    let (_, theme) = send(
        app,
        admin_json(
            "POST",
            "/api/themes",
            json!({"pillar_id": pillar_id, "code": "P1.T1", "name": "Structure", "sort_order": 1}),
        ),
    )
    .await;
    let theme_id = theme["id"].as_i64().unwrap();

    let (_, subtheme) = send(
        app,
        admin_json(
            "POST",
            "/api/subthemes",
            json!({"theme_id": theme_id, "code": "P1.T1.1", "name": "Roof", "sort_order": 1}),
        ),
    )
    .await;
    let subtheme_id = subtheme["id"].as_i64().unwrap();

    let (_, standard) = send(
        app,
        admin_json(
            "POST",
            "/api/standards",
            json!({"subtheme_id": subtheme_id, "code": "S1", "description": "Roof keeps rain out", "sort_order": 1}),
        ),
    )
    .await;
    let standard_id = standard["id"].as_i64().unwrap();

    (pillar_id, theme_id, subtheme_id, standard_id)
}

// =============================================================================
// Health / build info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app().await;
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "ssf-admin");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let app = setup_app().await;
    let (status, body) = send(&app, get("/api/buildinfo")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["git_hash"].is_string());
}

// =============================================================================
// Entity CRUD
// =============================================================================

#[tokio::test]
async fn test_create_and_list_pillars() {
    let app = setup_app().await;

    let (status, created) = send(
        &app,
        admin_json("POST", "/api/pillars", json!({"code": "P2", "name": "Services", "sort_order": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["code"], "P2");
    assert_eq!(created["description"], Value::Null);

    send(
        &app,
        admin_json("POST", "/api/pillars", json!({"code": "P1", "name": "Shelter", "sort_order": 1})),
    )
    .await;

    let (status, list) = send(&app, get("/api/pillars")).await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["P1", "P2"]);
}

#[tokio::test]
async fn test_create_rejects_blank_name() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        admin_json("POST", "/api/pillars", json!({"code": "P1", "name": "  "})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_duplicate_code_is_conflict() {
    let app = setup_app().await;
    seed_branch(&app).await;

    let (status, body) = send(
        &app,
        admin_json("POST", "/api/pillars", json!({"code": "P1", "name": "Again"})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_theme_with_unknown_pillar_is_rejected() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        admin_json(
            "POST",
            "/api/themes",
            json!({"pillar_id": 999, "code": "P9.T1", "name": "Orphan"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "CONSTRAINT_VIOLATION");
}

#[tokio::test]
async fn test_partial_update_keeps_other_fields() {
    let app = setup_app().await;
    let (pillar_id, ..) = seed_branch(&app).await;

    let (status, updated) = send(
        &app,
        admin_json(
            "PUT",
            &format!("/api/pillars/{}", pillar_id),
            json!({"description": "Physical shelter conditions"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["code"], "P1");
    assert_eq!(updated["name"], "Shelter");
    assert_eq!(updated["description"], "Physical shelter conditions");
}

#[tokio::test]
async fn test_update_with_null_clears_notes() {
    let app = setup_app().await;
    let (.., standard_id) = seed_branch(&app).await;
    let uri = format!("/api/standards/{}", standard_id);

    let (_, with_notes) = send(&app, admin_json("PUT", &uri, json!({"notes": "See annex"}))).await;
    assert_eq!(with_notes["notes"], "See annex");

    let (status, cleared) = send(&app, admin_json("PUT", &uri, json!({"notes": null}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["notes"], Value::Null);
    assert_eq!(cleared["description"], "Roof keeps rain out");
}

#[tokio::test]
async fn test_get_missing_entity_is_not_found() {
    let app = setup_app().await;

    let (status, body) = send(&app, get("/api/themes/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    let (status, _) = send(&app, admin_delete("/api/themes/42")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_children_filtered_by_parent() {
    let app = setup_app().await;
    let (pillar_id, ..) = seed_branch(&app).await;

    let (_, other) = send(
        &app,
        admin_json("POST", "/api/pillars", json!({"code": "P2", "name": "Services"})),
    )
    .await;
    send(
        &app,
        admin_json(
            "POST",
            "/api/themes",
            json!({"pillar_id": other["id"], "code": "P2.T1", "name": "Water"}),
        ),
    )
    .await;

    let (_, all) = send(&app, get("/api/themes")).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, filtered) = send(&app, get(&format!("/api/themes?pillar_id={}", pillar_id))).await;
    let filtered = filtered.as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["code"], "P1.T1");
}

#[tokio::test]
async fn test_indicator_needs_exactly_one_parent() {
    let app = setup_app().await;
    let (pillar_id, theme_id, _, standard_id) = seed_branch(&app).await;

    let (status, _) = send(
        &app,
        admin_json(
            "POST",
            "/api/indicators",
            json!({"name": "Both", "pillar_id": pillar_id, "theme_id": theme_id}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = send(
        &app,
        admin_json(
            "POST",
            "/api/indicators",
            json!({"name": "Leaks", "standard_id": standard_id, "is_default": true}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["standard_id"], standard_id);
    assert_eq!(created["is_default"], true);

    let (_, listed) = send(
        &app,
        get(&format!("/api/indicators?standard_id={}", standard_id)),
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_pillar_cascades() {
    let app = setup_app().await;
    let (pillar_id, _, _, standard_id) = seed_branch(&app).await;
    send(
        &app,
        admin_json(
            "POST",
            "/api/indicators",
            json!({"name": "Leaks", "standard_id": standard_id}),
        ),
    )
    .await;

    let (status, body) = send(&app, admin_delete(&format!("/api/pillars/{}", pillar_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["deleted"], pillar_id);

    for uri in [
        "/api/themes",
        "/api/subthemes",
        "/api/standards",
        "/api/indicators",
    ] {
        let (_, list) = send(&app, get(uri)).await;
        assert!(list.as_array().unwrap().is_empty(), "{} not emptied", uri);
    }
}

// =============================================================================
// Import
// =============================================================================

#[tokio::test]
async fn test_import_themes_by_pillar_code() {
    let app = setup_app().await;
    seed_branch(&app).await;

    let csv = "code,name,pillar_code\nP1.T2,Space,P1\nP1.T3,Privacy,P1\n";
    let (status, body) = send(&app, multipart_upload("/api/import/themes", csv, None)).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["ok"], true);
    assert_eq!(body["table"], "themes");
    assert_eq!(body["mode"], "upsert");
    assert_eq!(body["rows"], 2);
    assert_eq!(body["inserted"], 2);

    let (_, themes) = send(&app, get("/api/themes")).await;
    assert_eq!(themes.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_import_unresolved_code_reports_row() {
    let app = setup_app().await;
    seed_branch(&app).await;

    let csv = "code,name,pillar_code\nP1.T2,Space,P1\nP9.T1,Orphan,P9\n";
    let (status, body) = send(&app, multipart_upload("/api/import/themes", csv, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "INVALID_ROW");
    assert_eq!(body["row"], 3);

    // Nothing from the batch is stored
    let (_, themes) = send(&app, get("/api/themes")).await;
    assert_eq!(themes.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_import_replace_mode() {
    let app = setup_app().await;
    seed_branch(&app).await;

    let csv = "code,name\nP1,Shelter\nP2,Services\n";
    let (status, body) = send(
        &app,
        multipart_upload("/api/import/pillars", csv, Some("replace")),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["mode"], "replace");
    assert_eq!(body["deleted"], 1);
    assert_eq!(body["inserted"], 2);

    // Old pillar's subtree went with it
    let (_, themes) = send(&app, get("/api/themes")).await;
    assert!(themes.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_import_unknown_table() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        multipart_upload("/api/import/widgets", "code,name\n", None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn test_framework_export_csv() {
    let app = setup_app().await;
    seed_branch(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/export/framework.csv"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("ssf-framework-"));

    let bytes = body_bytes(response.into_body()).await;
    assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    assert!(text.starts_with("\"Pillar Code\",\"Pillar\""));
    assert!(text.contains("\"Roof keeps rain out\""));
}

#[tokio::test]
async fn test_combined_export_csv() {
    let app = setup_app().await;
    seed_branch(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/export/combined.csv"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = body_bytes(response.into_body()).await;
    let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("\"level\",\"code\",\"parent_code\",\"name\",\"description\",\"sort_order\"")
    );
    assert!(text.contains("\"theme\",\"P1.T1\",\"P1\""));
}

// =============================================================================
// Framework tree
// =============================================================================

#[tokio::test]
async fn test_recalculate_previews_codes() {
    let app = setup_app().await;

    let tree = json!({
        "pillars": [
            {"code": "P7", "name": "Shelter", "themes": [
                {"code": "X", "name": "Structure", "subthemes": [
                    {"code": "", "name": "Roof"}
                ]}
            ]}
        ]
    });
    let request = Request::builder()
        .method("POST")
        .uri("/api/framework/recalculate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "tree": tree }).to_string()))
        .unwrap();

    // Open to the public role: no cookie
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let pillar = &body["tree"]["pillars"][0];
    assert_eq!(pillar["code"], "P1");
    assert_eq!(pillar["themes"][0]["code"], "P1.T1");
    assert_eq!(pillar["themes"][0]["subthemes"][0]["code"], "P1.T1.1");
    assert_eq!(body["dirty"], 3);
    assert_eq!(body["nodes"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_recalculate_applies_move_edit() {
    let app = setup_app().await;

    let tree = json!({
        "pillars": [
            {"code": "P1", "name": "Shelter", "themes": [
                {"code": "P1.T1", "name": "Structure"},
                {"code": "P1.T2", "name": "Space"}
            ]}
        ]
    });
    let edits = json!([{"op": "move", "from": [0, 1], "to_parent": [0], "position": 0}]);
    let request = Request::builder()
        .method("POST")
        .uri("/api/framework/recalculate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "tree": tree, "edits": edits }).to_string()))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let themes = &body["tree"]["pillars"][0]["themes"];
    assert_eq!(themes[0]["name"], "Space");
    assert_eq!(themes[0]["code"], "P1.T1");
    assert_eq!(themes[1]["name"], "Structure");
    assert_eq!(themes[1]["code"], "P1.T2");
    assert_eq!(body["dirty"], 2);
}

#[tokio::test]
async fn test_put_tree_renumbers_and_persists() {
    let app = setup_app().await;
    let (pillar_id, theme_id, subtheme_id, _) = seed_branch(&app).await;

    let tree = json!({
        "pillars": [
            {"id": pillar_id, "code": "P1", "name": "Shelter", "themes": [
                {"name": "Space", "subthemes": []},
                {"id": theme_id, "code": "P1.T1", "name": "Structure", "subthemes": [
                    {"id": subtheme_id, "code": "P1.T1.1", "name": "Roof"}
                ]}
            ]}
        ]
    });
    let (status, saved) = send(&app, admin_json("PUT", "/api/framework/tree", tree)).await;
    assert_eq!(status, StatusCode::OK, "{}", saved);

    let themes = &saved["pillars"][0]["themes"];
    assert_eq!(themes[0]["name"], "Space");
    assert_eq!(themes[0]["code"], "P1.T1");
    assert_eq!(themes[1]["id"], theme_id);
    assert_eq!(themes[1]["code"], "P1.T2");
    assert_eq!(themes[1]["subthemes"][0]["code"], "P1.T2.1");

    // Standards stay attached to the renumbered sub-theme
    let (_, standards) = send(
        &app,
        get(&format!("/api/standards?subtheme_id={}", subtheme_id)),
    )
    .await;
    assert_eq!(standards.as_array().unwrap().len(), 1);

    let (_, reloaded) = send(&app, get("/api/framework/tree")).await;
    assert_eq!(reloaded, saved);
}

#[tokio::test]
async fn test_grouped_standards() {
    let app = setup_app().await;
    seed_branch(&app).await;

    let (status, body) = send(&app, get("/api/framework/standards")).await;
    assert_eq!(status, StatusCode::OK);
    let groups = body.as_array().unwrap();
    assert_eq!(groups.len(), 1);
}

#[tokio::test]
async fn test_on_disk_database_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ssf.db");

    let db = ssf_common::db::init_database(&db_path).await.unwrap();
    let app = build_router(AppState::new(db.clone(), "ssf_role"));
    let (status, _) = send(
        &app,
        admin_json("POST", "/api/pillars", json!({"code": "P1", "name": "Shelter"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    db.close().await;

    let reopened = ssf_common::db::init_database(&db_path).await.unwrap();
    let app = build_router(AppState::new(reopened, "ssf_role"));
    let (_, list) = send(&app, get("/api/pillars")).await;
    assert_eq!(list[0]["name"], "Shelter");
}

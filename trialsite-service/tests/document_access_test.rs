mod common;

use axum::http::StatusCode;
use common::{ids, TestApp, ADMIN, AUDITOR, DOCTOR, PROJECT, ROOT_FOLDER, STUDY_USER, SUB_FOLDER};
use serde_json::json;
use trialsite_service::models::{Document, DocumentType};

/// Ten project documents: 1..=3 in the subfolder, 4..=10 loose.
fn seed_ten(app: &TestApp) {
    for id in 1..=10 {
        let folder = if id <= 3 { Some(SUB_FOLDER) } else { None };
        app.add_document(id, folder);
    }
}

#[tokio::test]
async fn project_listing_returns_only_granted_documents_in_order() {
    let app = TestApp::spawn();
    seed_ten(&app);
    app.grant(
        ADMIN,
        json!({ "permissionType": "READ", "folderId": SUB_FOLDER, "role": "USER" }),
    )
    .await;
    app.grant(
        ADMIN,
        json!({ "permissionType": "READ", "documentId": 8, "userId": STUDY_USER }),
    )
    .await;

    let (status, body) = app
        .get(&format!("/documents/project/{}", PROJECT), STUDY_USER)
        .await;

    assert_eq!(status, StatusCode::OK);
    // Listings are newest first.
    assert_eq!(ids(&body), vec![8, 3, 2, 1]);
}

#[tokio::test]
async fn privileged_roles_see_every_document() {
    let app = TestApp::spawn();
    seed_ten(&app);

    for actor in [ADMIN, DOCTOR] {
        let (_, body) = app
            .get(&format!("/documents/project/{}", PROJECT), actor)
            .await;
        assert_eq!(ids(&body).len(), 10);
    }

    let (_, body) = app
        .get(&format!("/documents/project/{}", PROJECT), AUDITOR)
        .await;
    assert!(ids(&body).is_empty());
}

#[tokio::test]
async fn folder_grant_covers_folder_but_not_loose_documents() {
    let app = TestApp::spawn();
    app.add_document(1, Some(ROOT_FOLDER));
    app.add_document(2, None);
    app.grant(
        ADMIN,
        json!({ "permissionType": "READ", "folderId": ROOT_FOLDER, "role": "USER" }),
    )
    .await;

    let (_, body) = app
        .get(&format!("/documents/project/{}", PROJECT), STUDY_USER)
        .await;
    assert_eq!(ids(&body), vec![1]);

    let (status, body) = app
        .get(&format!("/documents/folder/{}", ROOT_FOLDER), STUDY_USER)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![1]);
}

#[tokio::test]
async fn document_without_project_is_skipped_in_listing_and_missing_directly() {
    let app = TestApp::spawn();
    seed_ten(&app);
    let mut orphan = Document::new(11, PROJECT, Some(SUB_FOLDER), "orphan.pdf", "admin");
    orphan.project_id = None;
    app.store.insert_document(orphan).unwrap();

    let (status, body) = app
        .get(&format!("/documents/folder/{}", SUB_FOLDER), ADMIN)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![3, 2, 1]);

    let (status, _) = app.get("/documents/11", ADMIN).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn single_document_read_is_checked() {
    let app = TestApp::spawn();
    app.add_document(5, None);

    let (status, _) = app.get("/documents/5", STUDY_USER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.grant(
        DOCTOR,
        json!({ "permissionType": "WRITE", "documentId": 5, "userId": STUDY_USER }),
    )
    .await;

    let (status, body) = app.get("/documents/5", STUDY_USER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["originalFileName"], "doc-5.pdf");

    let (status, _) = app.get("/documents/404", ADMIN).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn access_probe_reports_level_containment() {
    let app = TestApp::spawn();
    app.add_document(5, Some(SUB_FOLDER));
    app.grant(
        ADMIN,
        json!({ "permissionType": "WRITE", "folderId": SUB_FOLDER, "userId": STUDY_USER }),
    )
    .await;

    let cases = [("READ", true), ("WRITE", true), ("DELETE", false)];
    for (level, expected) in cases {
        let (status, body) = app
            .get(&format!("/documents/5/access?level={}", level), STUDY_USER)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allowed"], expected, "level {}", level);
    }

    let (_, body) = app.get("/documents/5/access", AUDITOR).await;
    assert_eq!(body["level"], "READ");
    assert_eq!(body["allowed"], false);
}

#[tokio::test]
async fn stats_cover_visible_documents() {
    let app = TestApp::spawn();
    let mut contract = Document::new(1, PROJECT, None, "contract.pdf", "admin");
    contract.document_type = DocumentType::Contract;
    contract.file_size = 2048;
    app.store.insert_document(contract).unwrap();
    app.add_document(2, None);

    let (status, body) = app
        .get(&format!("/documents/stats/project/{}", PROJECT), ADMIN)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["totalSize"], 2048);
    assert_eq!(body["byType"]["CONTRACT"], 1);
    assert_eq!(body["byType"]["OTHER"], 1);

    let (_, body) = app
        .get(&format!("/documents/stats/project/{}", PROJECT), STUDY_USER)
        .await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn missing_folder_listing_is_not_found() {
    let app = TestApp::spawn();

    let (status, body) = app.get("/documents/folder/999", ADMIN).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Folder 999 not found");
}

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, ADMIN, AUDITOR, DOCTOR, STUDY_USER, SUB_FOLDER};
use serde_json::json;

#[tokio::test]
async fn admin_can_grant_and_list_document_permission() {
    let app = TestApp::spawn();
    app.add_document(5, None);

    let (status, body) = app
        .grant(
            ADMIN,
            json!({ "permissionType": "READ", "documentId": 5, "userId": STUDY_USER }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documentId"], 5);
    assert_eq!(body["userId"], STUDY_USER);
    assert_eq!(body["grantedBy"], "admin");

    let (status, body) = app.get("/permissions/document/5", STUDY_USER).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn regranting_same_pair_updates_level_in_place() {
    let app = TestApp::spawn();
    app.add_document(5, None);

    let (_, first) = app
        .grant(
            ADMIN,
            json!({ "permissionType": "READ", "documentId": 5, "userId": STUDY_USER }),
        )
        .await;
    let (status, second) = app
        .grant(
            DOCTOR,
            json!({ "permissionType": "DELETE", "documentId": 5, "userId": STUDY_USER }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["permissionType"], "DELETE");
    assert_eq!(second["grantedBy"], first["grantedBy"]);
    assert_eq!(app.store.grant_count().unwrap(), 1);
}

#[tokio::test]
async fn non_privileged_roles_cannot_grant() {
    let app = TestApp::spawn();
    app.add_document(5, None);

    for actor in [STUDY_USER, AUDITOR] {
        let (status, _) = app
            .grant(
                actor,
                json!({ "permissionType": "READ", "documentId": 5, "role": "AUDITOR" }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
    assert_eq!(app.store.grant_count().unwrap(), 0);
}

#[tokio::test]
async fn ambiguous_grant_request_is_rejected() {
    let app = TestApp::spawn();
    app.add_document(5, Some(SUB_FOLDER));

    let (status, body) = app
        .grant(
            ADMIN,
            json!({
                "permissionType": "READ",
                "documentId": 5,
                "folderId": SUB_FOLDER,
                "userId": STUDY_USER
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not both"));

    let (status, _) = app
        .grant(ADMIN, json!({ "permissionType": "READ", "documentId": 5 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_ids_fail_validation() {
    let app = TestApp::spawn();

    let (status, body) = app
        .grant(
            ADMIN,
            json!({ "permissionType": "READ", "documentId": 0, "userId": STUDY_USER }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Validation error");
}

#[tokio::test]
async fn grant_for_missing_document_is_not_found() {
    let app = TestApp::spawn();

    let (status, body) = app
        .grant(
            ADMIN,
            json!({ "permissionType": "READ", "documentId": 404, "role": "USER" }),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Document 404 not found");
}

#[tokio::test]
async fn role_listing_parses_role_names() {
    let app = TestApp::spawn();
    app.grant(
        ADMIN,
        json!({ "permissionType": "READ", "folderId": SUB_FOLDER, "role": "AUDITOR" }),
    )
    .await;

    let (status, body) = app.get("/permissions/role/auditor", AUDITOR).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["folderId"], SUB_FOLDER);
    assert_eq!(body[0]["role"], "AUDITOR");

    let (status, _) = app.get("/permissions/role/SUPERUSER", AUDITOR).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn revoke_removes_grant_once() {
    let app = TestApp::spawn();
    let (_, grant) = app
        .grant(
            ADMIN,
            json!({ "permissionType": "WRITE", "folderId": SUB_FOLDER, "userId": STUDY_USER }),
        )
        .await;
    let uri = format!("/permissions/{}", grant["id"]);

    let (status, _) = app.delete(&uri, STUDY_USER).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, DOCTOR).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.delete(&uri, DOCTOR).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn caller_identity_is_required() {
    let app = TestApp::spawn();

    let (status, _) = app
        .request(Method::GET, "/permissions/folder/10", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/permissions/folder/10", 999).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::spawn();

    let (status, body) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "trialsite-service");
}

#[tokio::test]
async fn grantor_is_always_the_caller() {
    let app = TestApp::spawn();
    app.add_document(5, None);

    let (status, body) = app
        .grant(
            ADMIN,
            json!({
                "permissionType": "READ",
                "documentId": 5,
                "userId": STUDY_USER,
                "grantedBy": "someone-else"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["grantedBy"], "admin");

    let (_, listed) = app.get("/permissions/document/5", ADMIN).await;
    assert_eq!(listed[0]["grantedBy"], "admin");
}

#[tokio::test]
async fn role_grant_payload_opens_document_to_role() {
    let app = TestApp::spawn();
    app.add_document(5, None);

    let (status, body) = app
        .grant(
            ADMIN,
            json!({ "permissionType": "READ", "documentId": 5, "role": "USER" }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "USER");

    let (status, _) = app.get("/documents/5", STUDY_USER).await;
    assert_eq!(status, StatusCode::OK);
}

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn non_staff_see_only_themselves() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    app.register("bob").await;
    let token = alice["tokens"]["access"].as_str().unwrap();

    let (status, body) = app.get("/users/", token).await;
    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "alice");
}

#[tokio::test]
async fn staff_see_everyone() {
    let app = TestApp::new();
    let admin = app.register("admin").await;
    app.register("bob").await;
    app.db.set_staff(admin["user"]["id"].as_i64().unwrap());
    let token = admin["tokens"]["access"].as_str().unwrap();

    let (status, body) = app.get("/users/", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn another_users_identity_is_forbidden() {
    let app = TestApp::new();
    let alice = app.access_token("alice").await;
    let bob = app.register("bob").await;
    let uri = format!("/users/{}/", bob["user"]["id"]);

    let (status, body) = app.get(&uri, &alice).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({ "detail": "You don't have permission to access this user" })
    );

    let (status, _) = app.delete(&uri, &alice).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn email_updates_must_stay_unique() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    app.register("bob").await;
    let token = alice["tokens"]["access"].as_str().unwrap();
    let uri = format!("/users/{}/", alice["user"]["id"]);

    let (status, body) = app
        .patch(&uri, token, json!({ "email": "BOB@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("email").is_some());

    let (status, body) = app.patch(&uri, token, json!({ "first_name": "Alicia" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Alicia");
    assert_eq!(body["email"], "alice@example.com");
}

#[tokio::test]
async fn deleting_yourself_revokes_access() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let token = alice["tokens"]["access"].as_str().unwrap();
    let uri = format!("/users/{}/", alice["user"]["id"]);

    let (status, _) = app.delete(&uri, token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/users/", token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

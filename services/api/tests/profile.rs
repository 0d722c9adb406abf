mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn profile_round_trip_for_the_owner() {
    let app = TestApp::new();
    let token = app.user_with_profile("alice").await;

    let (status, body) = app.get("/profile/", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["age"], 30);
    assert_eq!(body["risk_tolerance"], "medium");

    let uri = format!("/profile/{}/", body["id"]);
    let (status, body) = app.patch(&uri, &token, json!({ "risk_tolerance": "high" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["risk_tolerance"], "high");
    assert_eq!(body["monthly_salary"], 50000);
}

#[tokio::test]
async fn a_second_profile_is_refused() {
    let app = TestApp::new();
    let token = app.user_with_profile("alice").await;

    let (status, body) = app
        .post(
            "/profile/create/",
            &token,
            json!({ "age": 40, "monthly_salary": 1000, "risk_tolerance": "low" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "detail": "Financial profile already exists for this user." })
    );
}

#[tokio::test]
async fn profile_fields_are_validated() {
    let app = TestApp::new();
    let token = app.access_token("alice").await;

    let (status, body) = app
        .post(
            "/profile/create/",
            &token,
            json!({ "age": 17, "monthly_salary": 100, "risk_tolerance": "reckless" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["age"], json!(["Age must be between 18 and 100."]));
    assert!(body.get("risk_tolerance").is_some());

    let (status, _) = app.get("/profile/", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn another_users_profile_looks_missing() {
    let app = TestApp::new();
    let alice = app.user_with_profile("alice").await;
    let bob = app.access_token("bob").await;

    let (_, profile) = app.get("/profile/", &alice).await;
    let uri = format!("/profile/{}/", profile["id"]);

    let (status, _) = app.get(&uri, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&uri, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&uri, &alice).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

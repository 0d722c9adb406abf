mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestApp;
use serde_json::json;

fn salary(amount: &str) -> serde_json::Value {
    json!({ "source": "Salary", "amount": amount, "date_received": "2025-01-15" })
}

#[tokio::test]
async fn a_new_user_has_empty_ledgers() {
    let app = TestApp::new();
    let token = app.access_token("alice").await;

    for collection in ["/income/", "/expense/", "/investment/"] {
        let (status, body) = app.get(collection, &token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}

#[tokio::test]
async fn single_create_answers_with_an_object() {
    let app = TestApp::new();
    let token = app.access_token("alice").await;

    let (status, body) = app.post("/income/", &token, salary("5000")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["source"], "Salary");
    assert_eq!(body["amount"], "5000.00");
    assert_eq!(body["date_received"], "2025-01-15");

    let (_, listed) = app.get("/income/", &token).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn batch_create_is_all_or_nothing() {
    let app = TestApp::new();
    let token = app.access_token("alice").await;

    let (status, body) = app
        .post("/income/", &token, json!([salary("5000.00"), salary("-1")]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let reports = body.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0], json!({}));
    assert!(reports[1].get("amount").is_some());
    assert_eq!(app.db.income_count(), 0);

    let (status, body) = app
        .post("/income/", &token, json!([salary("5000.00"), salary("250.50")]))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn an_empty_batch_is_rejected() {
    let app = TestApp::new();
    let token = app.access_token("alice").await;

    let (status, _) = app.post("/expense/", &token, json!([])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn future_dates_are_rejected() {
    let app = TestApp::new();
    let token = app.access_token("alice").await;
    let tomorrow = (Utc::now().date_naive() + Duration::days(1)).to_string();

    let (status, body) = app
        .post(
            "/expense/",
            &token,
            json!({ "category": "Rent", "amount": "100.00", "date_spent": tomorrow }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("date_spent").is_some());

    let (status, body) = app
        .post(
            "/investment/",
            &token,
            json!({
                "name": "Gold ETF",
                "investment_type": "gold",
                "amount_invested": "4000.00",
                "current_value": "4500.00",
                "date_invested": tomorrow
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["date_invested"],
        json!(["Investment date cannot be in the future."])
    );
}

#[tokio::test]
async fn updates_cannot_move_a_date_into_the_future() {
    let app = TestApp::new();
    let token = app.access_token("alice").await;
    let tomorrow = (Utc::now().date_naive() + Duration::days(1)).to_string();

    let (_, created) = app.post("/income/", &token, salary("5000.00")).await;
    let uri = format!("/income/{}/", created["id"]);

    let (status, body) = app
        .put(
            &uri,
            &token,
            json!({ "source": "Salary", "amount": "5000.00", "date_received": tomorrow }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "date_received": ["Date received cannot be in the future."] })
    );

    let (status, body) = app
        .patch(&uri, &token, json!({ "date_received": tomorrow }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("date_received").is_some());

    let (_, stored) = app.get(&uri, &token).await;
    assert_eq!(stored["date_received"], "2025-01-15");
}

#[tokio::test]
async fn records_of_other_users_look_missing() {
    let app = TestApp::new();
    let alice = app.access_token("alice").await;
    let bob = app.access_token("bob").await;

    let (_, created) = app.post("/income/", &alice, salary("5000.00")).await;
    let uri = format!("/income/{}/", created["id"]);

    let (status, body) = app.get(&uri, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not found." }));

    let (status, _) = app.delete(&uri, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app.get("/income/", &bob).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn sip_needs_a_rate_and_a_term() {
    let app = TestApp::new();
    let token = app.access_token("alice").await;

    let (status, body) = app
        .post(
            "/investment/",
            &token,
            json!({
                "name": "Nifty SIP",
                "investment_type": "sip",
                "amount_invested": "12000.00",
                "current_value": "12500.00",
                "date_invested": "2024-06-01",
                "interest_rate": "8.5"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("years").is_some());
    assert!(body.get("interest_rate").is_none());

    let (status, body) = app
        .post(
            "/investment/",
            &token,
            json!({
                "name": "Nifty SIP",
                "investment_type": "sip",
                "amount_invested": "12000.00",
                "current_value": "12500.00",
                "date_invested": "2024-06-01",
                "interest_rate": "8.5",
                "years": 5
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["interest_rate"], "8.50");
    assert_eq!(body["years"], 5);
}

#[tokio::test]
async fn patch_merges_then_validates_the_whole_record() {
    let app = TestApp::new();
    let token = app.access_token("alice").await;

    let (_, created) = app
        .post(
            "/expense/",
            &token,
            json!({ "category": "Groceries", "amount": "250.50", "date_spent": "2025-02-01" }),
        )
        .await;
    let uri = format!("/expense/{}/", created["id"]);

    let (status, body) = app.patch(&uri, &token, json!({ "amount": "300" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], "300.00");
    assert_eq!(body["category"], "Groceries");

    let (status, body) = app.patch(&uri, &token, json!({ "amount": "0" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("amount").is_some());

    // PUT needs every field.
    let (status, body) = app.put(&uri, &token, json!({ "amount": "10.00" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("category").is_some());
}

#[tokio::test]
async fn delete_removes_the_entry() {
    let app = TestApp::new();
    let token = app.access_token("alice").await;

    let (_, created) = app.post("/income/", &token, salary("5000.00")).await;
    let uri = format!("/income/{}/", created["id"]);

    let (status, body) = app.delete(&uri, &token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = app.get(&uri, &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_collects_every_ledger() {
    let app = TestApp::new();
    let token = app.user_with_profile("alice").await;
    app.post("/income/", &token, salary("5000.00")).await;

    let (status, body) = app.get("/dashboard/", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["financial_profile"]["monthly_salary"], 50000);
    assert_eq!(body["incomes"].as_array().unwrap().len(), 1);
    assert_eq!(body["expenses"], json!([]));
    assert_eq!(body["investments"], json!([]));
}

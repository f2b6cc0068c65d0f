//! User, account, and PIX key integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use pix_store::Store;
use serde_json::json;

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn register_user_starts_with_a_full_bucket() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/user")
        .json(&json!({ "name": "Ana Souza", "email": "ana@example.com" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["name"], "Ana Souza");
    assert_eq!(body["token_limit"], 10);
    assert_eq!(body["tokens_remaining"], 10);
}

#[tokio::test]
async fn register_user_rejects_blank_fields() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/user")
        .json(&json!({ "name": "  ", "email": "ana@example.com" }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn me_reports_the_live_token_projection() {
    let harness = TestHarness::new();
    // Three tokens stored, two accrued since.
    let user = harness.seed_user(3, 2);

    let response = harness
        .server
        .get("/user/me")
        .add_header("authorization", TestHarness::auth(user.id))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["tokens_remaining"], 5);
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn account_creation_is_once_per_user() {
    let harness = TestHarness::new();
    let user = harness.seed_user(10, 0);

    let first = harness
        .server
        .post("/account")
        .add_header("authorization", TestHarness::auth(user.id))
        .json(&json!({ "balance": 5000 }))
        .await;
    first.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = first.json();
    assert_eq!(body["balance"], 5000);
    assert_eq!(body["account_number"].as_str().unwrap().len(), 6);

    let second = harness
        .server
        .post("/account")
        .add_header("authorization", TestHarness::auth(user.id))
        .json(&json!({ "balance": 1 }))
        .await;
    second.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn negative_opening_balance_is_rejected() {
    let harness = TestHarness::new();
    let user = harness.seed_user(10, 0);

    let response = harness
        .server
        .post("/account")
        .add_header("authorization", TestHarness::auth(user.id))
        .json(&json!({ "balance": -1 }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn only_the_owner_may_delete_an_account() {
    let harness = TestHarness::new();
    let (_, account) = harness.seed_party("ana@pix", 1000);
    let intruder = harness.seed_user(10, 0);

    let denied = harness
        .server
        .delete(&format!("/account/{}", account.id))
        .add_header("authorization", TestHarness::auth(intruder.id))
        .await;
    denied.assert_status_forbidden();

    let owner = harness.store.get_account(&account.id).unwrap().unwrap();
    assert!(owner.is_active());
}

#[tokio::test]
async fn deleting_an_account_hides_it_from_key_resolution() {
    let harness = TestHarness::new();
    let (user, account) = harness.seed_party("ana@pix", 1000);

    harness
        .server
        .delete(&format!("/account/{}", account.id))
        .add_header("authorization", TestHarness::auth(user.id))
        .await
        .assert_status_ok();

    // The key record survives, but it no longer resolves to a recipient.
    let resolved = harness
        .server
        .get("/account-key/ana@pix")
        .add_header("authorization", TestHarness::auth(user.id))
        .await;
    resolved.assert_status_not_found();
}

#[tokio::test]
async fn listing_transactions_paginates_newest_first() {
    let harness = TestHarness::new();
    let (user, account) = harness.seed_party("ana@pix", 0);
    let (_, other) = harness.seed_party("rui@pix", 0);

    for amount in [100, 200, 300] {
        let tx = pix_core::Transaction::pending(other.id, account.id, amount);
        harness.store.put_transaction(&tx).unwrap();
        // Ordering is by id, and ULIDs only sort across milliseconds.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let response = harness
        .server
        .get(&format!("/account/{}/transactions?limit=2", account.id))
        .add_header("authorization", TestHarness::auth(user.id))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let page = body.as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0]["amount"], 300);
    assert_eq!(page[1]["amount"], 200);
}

// ============================================================================
// PIX keys
// ============================================================================

#[tokio::test]
async fn key_registration_and_resolution_round_trip() {
    let harness = TestHarness::new();
    let user = harness.seed_user(10, 0);
    let account = harness.seed_account(user.id, 0);

    let created = harness
        .server
        .post("/account-key")
        .add_header("authorization", TestHarness::auth(user.id))
        .json(&json!({ "key": "ana@pix" }))
        .await;
    created.assert_status(StatusCode::CREATED);

    let resolved = harness
        .server
        .get("/account-key/ana@pix")
        .add_header("authorization", TestHarness::auth(user.id))
        .await;
    resolved.assert_status_ok();
    let body: serde_json::Value = resolved.json();
    assert_eq!(body["account_id"], account.id.to_string());
    assert_eq!(body["recipient_name"], "Ana Souza");

    let listed = harness
        .server
        .get("/account-key")
        .add_header("authorization", TestHarness::auth(user.id))
        .await;
    listed.assert_status_ok();
    let keys: serde_json::Value = listed.json();
    assert_eq!(keys.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_key_registration_is_a_conflict() {
    let harness = TestHarness::new();
    let (user_a, _) = harness.seed_party("ana@pix", 0);
    let user_b = harness.seed_user(10, 0);
    harness.seed_account(user_b.id, 0);

    // Same alias for the first owner again.
    let again = harness
        .server
        .post("/account-key")
        .add_header("authorization", TestHarness::auth(user_a.id))
        .json(&json!({ "key": "ana@pix" }))
        .await;
    again.assert_status(StatusCode::CONFLICT);

    // And for a different owner.
    let stolen = harness
        .server
        .post("/account-key")
        .add_header("authorization", TestHarness::auth(user_b.id))
        .json(&json!({ "key": "ana@pix" }))
        .await;
    stolen.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn key_without_an_account_is_not_found() {
    let harness = TestHarness::new();
    let user = harness.seed_user(10, 0);

    let response = harness
        .server
        .post("/account-key")
        .add_header("authorization", TestHarness::auth(user.id))
        .json(&json!({ "key": "ana@pix" }))
        .await;

    response.assert_status_not_found();
}

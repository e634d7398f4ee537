//! Integration tests for cycle administration and payment settings.

use async_trait::async_trait;
use axum::Router;
use clubdues::checkout::{CheckoutClient, CheckoutSession, CreateDuesCheckoutRequest};
use clubdues::members::memory::InMemoryMemberDirectory;
use clubdues::routes::{router, DuesContext};
use clubdues::storage::memory::InMemoryDuesStore;
use clubdues::testing;
use clubdues::{Actor, ClubRole, DuesError};
use serde_json::json;

#[derive(Clone, Default)]
struct StubCheckoutClient;

#[async_trait]
impl CheckoutClient for StubCheckoutClient {
    async fn create_checkout_session(
        &self,
        _request: CreateDuesCheckoutRequest,
    ) -> Result<CheckoutSession, DuesError> {
        Ok(CheckoutSession {
            id: "cs_stub".to_string(),
            url: "https://checkout.example.com/pay/cs_stub".to_string(),
        })
    }
}

fn build_app() -> Router {
    let ctx: DuesContext<_, StubCheckoutClient, _> =
        DuesContext::new(InMemoryDuesStore::new(), InMemoryMemberDirectory::new());
    router(ctx)
}

fn treasurer() -> Actor {
    Actor::new("treasurer_1", ClubRole::Treasurer)
}

fn president() -> Actor {
    Actor::new("president_1", ClubRole::President)
}

fn cycle_body(name: &str, is_active: bool) -> serde_json::Value {
    json!({
        "name": name,
        "start_date": "2025-07-01",
        "end_date": "2026-06-30",
        "amount_professional": 8500,
        "amount_student": 6500,
        "grace_period_days": 30,
        "is_active": is_active
    })
}

async fn create_cycle(app: &Router, actor: Actor, body: serde_json::Value) -> serde_json::Value {
    testing::post(app.clone(), "/dues/cycles")
        .with_actor(actor)
        .json_body(&body)
        .execute()
        .await
        .assert_created()
        .json()
        .await
}

#[tokio::test]
async fn test_cycle_crud_round_trip() {
    let app = build_app();

    let created = create_cycle(&app, treasurer(), cycle_body("2025-2026", true)).await;
    assert_eq!(created["name"], "2025-2026");
    assert_eq!(created["is_active"], true);

    let cycles: serde_json::Value = testing::get(app.clone(), "/dues/cycles")
        .with_actor(president())
        .execute()
        .await
        .assert_ok()
        .json()
        .await;
    assert_eq!(cycles.as_array().unwrap().len(), 1);

    let updated: serde_json::Value = testing::patch(
        app.clone(),
        &format!("/dues/cycles/{}", created["id"].as_str().unwrap()),
    )
    .with_actor(treasurer())
    .json_body(&json!({ "amount_student": 7000 }))
    .execute()
    .await
    .assert_ok()
    .json()
    .await;
    assert_eq!(updated["amount_student"], 7000);
    assert_eq!(updated["amount_professional"], 8500);
}

#[tokio::test]
async fn test_activating_a_cycle_deactivates_the_rest() {
    let app = build_app();

    let first = create_cycle(&app, treasurer(), cycle_body("2024-2025", true)).await;
    let second = create_cycle(&app, treasurer(), cycle_body("2025-2026", false)).await;

    testing::patch(
        app.clone(),
        &format!("/dues/cycles/{}", second["id"].as_str().unwrap()),
    )
    .with_actor(treasurer())
    .json_body(&json!({ "is_active": true }))
    .execute()
    .await
    .assert_ok();

    let cycles: serde_json::Value = testing::get(app, "/dues/cycles")
        .with_actor(treasurer())
        .execute()
        .await
        .assert_ok()
        .json()
        .await;
    let active: Vec<_> = cycles
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["is_active"] == true)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["id"], second["id"]);
    assert_ne!(active[0]["id"], first["id"]);
}

#[tokio::test]
async fn test_cycle_routes_are_role_gated() {
    let app = build_app();
    let member = Actor::new("mem_1", ClubRole::Member);

    testing::get(app.clone(), "/dues/cycles")
        .with_actor(member.clone())
        .execute()
        .await
        .assert_forbidden();

    testing::post(app.clone(), "/dues/cycles")
        .with_actor(member)
        .json_body(&cycle_body("2025-2026", false))
        .execute()
        .await
        .assert_forbidden();

    // Board members can read reports but not manage cycles
    testing::post(app, "/dues/cycles")
        .with_actor(Actor::new("board_1", ClubRole::Board))
        .json_body(&cycle_body("2025-2026", false))
        .execute()
        .await
        .assert_forbidden();
}

#[tokio::test]
async fn test_update_unknown_cycle_is_not_found() {
    let app = build_app();

    testing::patch(app, "/dues/cycles/cyc_missing")
        .with_actor(treasurer())
        .json_body(&json!({ "name": "renamed" }))
        .execute()
        .await
        .assert_not_found();
}

#[tokio::test]
async fn test_invalid_cycle_fields_are_rejected() {
    let app = build_app();

    testing::post(app.clone(), "/dues/cycles")
        .with_actor(treasurer())
        .json_body(&json!({
            "name": "backwards",
            "start_date": "2026-06-30",
            "end_date": "2025-07-01",
            "amount_professional": 8500,
            "amount_student": 6500
        }))
        .execute()
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_payment_settings_round_trip() {
    let app = build_app();
    let member = Actor::new("mem_1", ClubRole::Member);

    // Defaults: every channel disabled
    let settings: serde_json::Value = testing::get(app.clone(), "/settings/payment")
        .with_actor(member.clone())
        .execute()
        .await
        .assert_ok()
        .json()
        .await;
    assert_eq!(settings["zelle"]["enabled"], false);

    // Members may read but not write
    testing::put(app.clone(), "/settings/payment")
        .with_actor(member.clone())
        .json_body(&json!({
            "zelle": { "enabled": true, "handle": "dues@club.org" }
        }))
        .execute()
        .await
        .assert_forbidden();

    testing::put(app.clone(), "/settings/payment")
        .with_actor(treasurer())
        .json_body(&json!({
            "zelle": { "enabled": true, "handle": "dues@club.org" },
            "venmo": { "enabled": false, "handle": "@club" }
        }))
        .execute()
        .await
        .assert_ok();

    let settings: serde_json::Value = testing::get(app, "/settings/payment")
        .with_actor(member)
        .execute()
        .await
        .assert_ok()
        .json()
        .await;
    assert_eq!(settings["zelle"]["enabled"], true);
    assert_eq!(settings["zelle"]["handle"], "dues@club.org");
    assert_eq!(settings["venmo"]["enabled"], false);
}

//! API Integration Tests
//!
//! Drives the full router over mock ports: real middleware, real handlers,
//! real domain services, in-memory storage. Requests go through
//! `tower::ServiceExt::oneshot` so every test exercises the same stack a
//! deployed server runs, minus PostgreSQL.
//!
//! # Test Coverage
//!
//! ## Authentication
//! - Bearer token enforcement on `/api/v1`, public health endpoints
//!
//! ## Visits
//! - Recording, identity forcing, the per-day duplicate guard with its
//!   conflict payload, outcome validation, cross-day updates
//!
//! ## Coverage
//! - Plan lifecycle across a month of visits, manual recompute, duplicate
//!   slots, summary grouping and its scope rules, synchronizer isolation
//!
//! ## Beat plans
//! - Creation, the one-plan-per-day slot, entry marking from visits
//!
//! ## Directory
//! - Doctor approval flow, owner-only user creation, MR listings

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use domain_beat::{BeatPlanStore, MockBeatPlanStore};
use domain_coverage::{CoveragePlanStore, MockCoveragePlanStore};
use domain_directory::{DirectoryPort, Doctor, MockDirectoryPort, Role, User};
use domain_visit::{MockVisitLedger, VisitLedgerPort};
use interface_api::auth::create_token;
use interface_api::config::ApiConfig;
use interface_api::{router, AppState};

// ============================================================================
// TEST HARNESS
// ============================================================================

struct TestContext {
    app: Router,
    plans: Arc<MockCoveragePlanStore>,
    owner: User,
    manager_a: User,
    mr_a: User,
    mr_b: User,
    doctor_a: Doctor,
    doctor_b: Doctor,
    owner_token: String,
    manager_a_token: String,
    mr_a_token: String,
    mr_b_token: String,
}

impl TestContext {
    /// Seeds two manager/MR/doctor pairs plus an owner and wires the router
    /// over mocks. The backdate window is opened wide so tests can place
    /// visits on fixed historical days.
    async fn new() -> Self {
        let owner = User::new("Owner", Role::Owner);
        let manager_a = User::new("Asha Patel", Role::Manager);
        let manager_b = User::new("Vikram Singh", Role::Manager);
        let mr_a = User::new_mr("Ravi Kumar", manager_a.id);
        let mr_b = User::new_mr("Sunil Shah", manager_b.id);

        let mut doctor_a = Doctor::new("Dr. Mehta", manager_a.id);
        doctor_a.assign_to(mr_a.id);
        doctor_a.approve();
        let mut doctor_b = Doctor::new("Dr. Rao", manager_b.id);
        doctor_b.assign_to(mr_b.id);
        doctor_b.approve();

        let directory = Arc::new(
            MockDirectoryPort::new()
                .with_users(vec![
                    owner.clone(),
                    manager_a.clone(),
                    manager_b,
                    mr_a.clone(),
                    mr_b.clone(),
                ])
                .await
                .with_doctors(vec![doctor_a.clone(), doctor_b.clone()])
                .await,
        );
        let ledger = Arc::new(MockVisitLedger::new());
        let plans = Arc::new(MockCoveragePlanStore::new());
        let beats = Arc::new(MockBeatPlanStore::new());

        let config = ApiConfig {
            backdate_window_days: 36500,
            ..ApiConfig::default()
        };
        let state = AppState::new(
            directory as Arc<dyn DirectoryPort>,
            ledger as Arc<dyn VisitLedgerPort>,
            plans.clone() as Arc<dyn CoveragePlanStore>,
            beats as Arc<dyn BeatPlanStore>,
            config.clone(),
        );

        let token = |user: &User| {
            create_token(user.id, user.role, &config.jwt_secret, config.jwt_expiration_secs)
                .unwrap()
        };

        Self {
            app: router(state),
            plans,
            owner_token: token(&owner),
            manager_a_token: token(&manager_a),
            mr_a_token: token(&mr_a),
            mr_b_token: token(&mr_b),
            owner,
            manager_a,
            mr_a,
            mr_b,
            doctor_a,
            doctor_b,
        }
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        send(&self.app, request).await
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        send(&self.app, with_json("POST", path, token, body)).await
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        send(&self.app, with_json("PUT", path, token, body)).await
    }

    /// Records one met visit for `mr_a` at `doctor_a`, returning its id
    async fn record_met_visit(&self, date: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/visits",
                &self.mr_a_token,
                json!({
                    "doctorId": self.doctor_a.id,
                    "visitDate": date,
                    "outcome": "MET_DOCTOR",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "visit on {}: {}", date, body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Creates an active plan as the owner, returning its id
    async fn create_plan(&self, doctor: &Doctor, month: &str, planned: u32) -> String {
        let (status, body) = self
            .post(
                "/api/v1/coverage/create",
                &self.owner_token,
                json!({
                    "doctorId": doctor.id,
                    "month": month,
                    "plannedVisits": planned,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "plan for {}: {}", month, body);
        body["id"].as_str().unwrap().to_string()
    }
}

fn with_json(method: &str, path: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Reads a decimal field regardless of whether serde wrote it as a JSON
/// string or a bare number
fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        Value::Number(n) => n.to_string().parse().unwrap(),
        other => panic!("Expected a decimal, got {:?}", other),
    }
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let ctx = TestContext::new().await;

    let bare = Request::builder()
        .method("GET")
        .uri("/api/v1/doctors")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&ctx.app, bare).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.get("/api/v1/doctors", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx.get("/api/v1/doctors", &ctx.mr_a_token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoints_are_public() {
    let ctx = TestContext::new().await;

    let health = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&ctx.app, health).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let ready = Request::builder()
        .method("GET")
        .uri("/health/ready")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&ctx.app, ready).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// VISITS
// ============================================================================

#[tokio::test]
async fn test_record_visit_returns_camel_case_payload() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post(
            "/api/v1/visits",
            &ctx.mr_a_token,
            json!({
                "doctorId": ctx.doctor_a.id,
                "visitDate": "2024-06-03T05:00:00Z",
                "outcome": "MET_DOCTOR",
                "notes": "Discussed the new antibiotic line",
                "orders": [
                    {"product": "Amoxicillin 500mg", "quantity": 10, "amount": "1200.00"}
                ],
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["mrId"].as_str().unwrap(), uuid_of(&ctx.mr_a));
    assert_eq!(body["status"], "COMPLETED");
    assert_eq!(body["outcome"], "MET_DOCTOR");
    assert_eq!(body["orders"][0]["currency"], "INR");
    assert_eq!(decimal(&body["orders"][0]["amount"]), dec!(1200.00));
    // camelCase keys, not snake_case
    assert!(body.get("mr_id").is_none());
    assert!(body["createdBy"].is_string());
}

#[tokio::test]
async fn test_spoofed_mr_identity_is_overridden() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post(
            "/api/v1/visits",
            &ctx.mr_a_token,
            json!({
                "doctorId": ctx.doctor_a.id,
                "mrId": ctx.mr_b.id,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["mrId"].as_str().unwrap(), uuid_of(&ctx.mr_a));
}

#[tokio::test]
async fn test_same_day_duplicate_conflicts_with_existing_visit() {
    let ctx = TestContext::new().await;
    let first_id = ctx.record_met_visit("2024-06-03T05:00:00Z").await;

    // Same reporting day, different time
    let (status, body) = ctx
        .post(
            "/api/v1/visits",
            &ctx.mr_a_token,
            json!({
                "doctorId": ctx.doctor_a.id,
                "visitDate": "2024-06-03T09:30:00Z",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
    assert_eq!(body["existingVisit"]["id"].as_str().unwrap(), first_id);
}

#[tokio::test]
async fn test_unknown_outcome_is_a_validation_error() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post(
            "/api/v1/visits",
            &ctx.mr_a_token,
            json!({
                "doctorId": ctx.doctor_a.id,
                "outcome": "TELEPORTED",
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_manager_recording_on_behalf() {
    let ctx = TestContext::new().await;

    // Managers must name the MR
    let (status, _) = ctx
        .post(
            "/api/v1/visits",
            &ctx.manager_a_token,
            json!({"doctorId": ctx.doctor_a.id}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Naming an MR outside the team is forbidden
    let (status, _) = ctx
        .post(
            "/api/v1/visits",
            &ctx.manager_a_token,
            json!({"doctorId": ctx.doctor_b.id, "mrId": ctx.mr_b.id}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Inside the team it works, with creator tracked separately
    let (status, body) = ctx
        .post(
            "/api/v1/visits",
            &ctx.manager_a_token,
            json!({"doctorId": ctx.doctor_a.id, "mrId": ctx.mr_a.id}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["mrId"].as_str().unwrap(), uuid_of(&ctx.mr_a));
    assert_eq!(body["createdBy"].as_str().unwrap(), uuid_of(&ctx.manager_a));
}

#[tokio::test]
async fn test_moving_a_visit_onto_an_occupied_day_conflicts() {
    let ctx = TestContext::new().await;
    let monday = ctx.record_met_visit("2024-06-03T05:00:00Z").await;
    let tuesday = ctx.record_met_visit("2024-06-04T05:00:00Z").await;

    let (status, body) = ctx
        .put(
            &format!("/api/v1/visits/{}", tuesday),
            &ctx.mr_a_token,
            json!({"visitDate": "2024-06-03T11:00:00Z"}),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["existingVisit"]["id"].as_str().unwrap(), monday);
}

#[tokio::test]
async fn test_visit_listing_is_scoped_to_the_caller() {
    let ctx = TestContext::new().await;
    ctx.record_met_visit("2024-06-03T05:00:00Z").await;
    let (status, _) = ctx
        .post(
            "/api/v1/visits",
            &ctx.mr_b_token,
            json!({"doctorId": ctx.doctor_b.id, "visitDate": "2024-06-03T05:00:00Z"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // An MR's filter for someone else is overridden, never honored
    let (status, body) = ctx
        .get(
            &format!("/api/v1/visits?mrId={}", uuid_of(&ctx.mr_b)),
            &ctx.mr_a_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["mrId"].as_str().unwrap(), uuid_of(&ctx.mr_a));

    // A manager naming a foreign MR is rejected outright
    let (status, _) = ctx
        .get(
            &format!("/api/v1/visits?mrId={}", uuid_of(&ctx.mr_b)),
            &ctx.manager_a_token,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, all) = ctx.get("/api/v1/visits", &ctx.owner_token).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

// ============================================================================
// COVERAGE
// ============================================================================

#[tokio::test]
async fn test_coverage_plan_lifecycle_through_a_month() {
    let ctx = TestContext::new().await;

    // A fresh plan with no visits starts missed at zero
    let (status, body) = ctx
        .post(
            "/api/v1/coverage/create",
            &ctx.owner_token,
            json!({
                "doctorId": ctx.doctor_a.id,
                "month": "2024-06",
                "plannedVisits": 10,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let plan_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["doctorName"], "Dr. Mehta");
    assert_eq!(body["mrName"], "Ravi Kumar");
    assert_eq!(body["month"], "2024-06");
    assert_eq!(body["actualVisits"], 0);
    assert_eq!(decimal(&body["compliancePercentage"]), Decimal::ZERO);
    assert_eq!(body["status"], "MISSED");

    // Five met visits on distinct June days: 50% puts the plan at risk
    for day in 1..=5 {
        ctx.record_met_visit(&format!("2024-06-0{}T05:00:00Z", day))
            .await;
    }
    let (_, plans) = ctx
        .get("/api/v1/coverage/plans?month=2024-06", &ctx.owner_token)
        .await;
    let plan = &plans.as_array().unwrap()[0];
    assert_eq!(plan["actualVisits"], 5);
    assert_eq!(decimal(&plan["compliancePercentage"]), dec!(50.00));
    assert_eq!(plan["status"], "AT_RISK");

    // Four more bring it to 90%: on track
    for day in 6..=9 {
        ctx.record_met_visit(&format!("2024-06-0{}T05:00:00Z", day))
            .await;
    }
    let (_, plans) = ctx
        .get("/api/v1/coverage/plans?month=2024-06", &ctx.owner_token)
        .await;
    let plan = &plans.as_array().unwrap()[0];
    assert_eq!(plan["actualVisits"], 9);
    assert_eq!(decimal(&plan["compliancePercentage"]), dec!(90.00));
    assert_eq!(plan["status"], "ON_TRACK");

    // Cancelling a visit does not rewrite the stored aggregate by itself
    let (_, visits) = ctx
        .get(
            "/api/v1/visits?from=2024-06-09T00:00:00Z&to=2024-06-10T00:00:00Z",
            &ctx.mr_a_token,
        )
        .await;
    let ninth = visits.as_array().unwrap()[0]["id"].as_str().unwrap().to_string();
    let (status, _) = ctx
        .put(
            &format!("/api/v1/visits/{}", ninth),
            &ctx.mr_a_token,
            json!({"status": "CANCELLED"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // The next trigger (an empty update) recomputes from the ledger: 8/10
    // lands exactly on the 80 boundary, which is still at risk
    let (status, body) = ctx
        .put(
            &format!("/api/v1/coverage/{}", plan_id),
            &ctx.owner_token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["actualVisits"], 8);
    assert_eq!(decimal(&body["compliancePercentage"]), dec!(80.00));
    assert_eq!(body["status"], "AT_RISK");
}

#[tokio::test]
async fn test_second_active_plan_for_the_slot_conflicts() {
    let ctx = TestContext::new().await;
    ctx.create_plan(&ctx.doctor_a, "2024-07", 10).await;

    let (status, body) = ctx
        .post(
            "/api/v1/coverage/create",
            &ctx.owner_token,
            json!({
                "doctorId": ctx.doctor_a.id,
                "month": "2024-07",
                "plannedVisits": 4,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_mrs_cannot_create_or_update_plans() {
    let ctx = TestContext::new().await;
    let plan_id = ctx.create_plan(&ctx.doctor_a, "2024-06", 10).await;

    let (status, _) = ctx
        .post(
            "/api/v1/coverage/create",
            &ctx.mr_a_token,
            json!({
                "doctorId": ctx.doctor_a.id,
                "month": "2024-08",
                "plannedVisits": 10,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .put(
            &format!("/api/v1/coverage/{}", plan_id),
            &ctx.mr_a_token,
            json!({"plannedVisits": 1}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_month_is_a_validation_error() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post(
            "/api/v1/coverage/create",
            &ctx.owner_token,
            json!({
                "doctorId": ctx.doctor_a.id,
                "month": "June 2024",
                "plannedVisits": 10,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_summary_group_by_is_required_and_validated() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .get("/api/v1/coverage/summary", &ctx.owner_token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = ctx
        .get("/api/v1/coverage/summary?groupBy=week", &ctx.owner_token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_never_leaks_rows_across_teams() {
    let ctx = TestContext::new().await;
    ctx.create_plan(&ctx.doctor_a, "2024-06", 10).await;
    ctx.create_plan(&ctx.doctor_b, "2024-06", 10).await;

    // The owner sees both MRs
    let (status, body) = ctx
        .get(
            "/api/v1/coverage/summary?groupBy=mr&month=2024-06",
            &ctx.owner_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    // Manager A's aggregate contains only their own MR
    let (status, body) = ctx
        .get(
            "/api/v1/coverage/summary?groupBy=mr&month=2024-06",
            &ctx.manager_a_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["key"], ctx.mr_a.id.to_string());
    assert_eq!(rows[0]["planCount"], 1);
    assert_eq!(rows[0]["totalPlanned"], 10);

    // Asking for the foreign MR directly is rejected, not silently filtered
    let (status, _) = ctx
        .get(
            &format!(
                "/api/v1/coverage/summary?groupBy=mr&mrId={}",
                uuid_of(&ctx.mr_b)
            ),
            &ctx.manager_a_token,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_my_coverage_is_for_mrs_only() {
    let ctx = TestContext::new().await;
    ctx.create_plan(&ctx.doctor_a, "2024-06", 10).await;
    ctx.create_plan(&ctx.doctor_b, "2024-06", 10).await;

    let (status, _) = ctx
        .get("/api/v1/coverage/my-coverage", &ctx.owner_token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .get("/api/v1/coverage/my-coverage?month=2024-06", &ctx.mr_a_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["assignedMR"].as_str().unwrap(), uuid_of(&ctx.mr_a));
}

#[tokio::test]
async fn test_plan_store_outage_never_blocks_visit_recording() {
    let ctx = TestContext::new().await;
    let plan_id = ctx.create_plan(&ctx.doctor_a, "2024-06", 10).await;

    ctx.plans.fail_writes(true);

    // The synchronizer write fails inside the request; recording still wins
    let (status, _) = ctx
        .post(
            "/api/v1/visits",
            &ctx.mr_a_token,
            json!({
                "doctorId": ctx.doctor_a.id,
                "visitDate": "2024-06-03T05:00:00Z",
                "outcome": "MET_DOCTOR",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // The stored aggregate is stale, not corrupted
    let (_, plans) = ctx
        .get("/api/v1/coverage/plans?month=2024-06", &ctx.owner_token)
        .await;
    assert_eq!(plans.as_array().unwrap()[0]["actualVisits"], 0);

    // Once the store recovers, a manual recompute catches up
    ctx.plans.fail_writes(false);
    let (status, body) = ctx
        .put(
            &format!("/api/v1/coverage/{}", plan_id),
            &ctx.owner_token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["actualVisits"], 1);
}

#[tokio::test]
async fn test_not_met_visits_do_not_move_coverage() {
    let ctx = TestContext::new().await;
    let plan_id = ctx.create_plan(&ctx.doctor_a, "2024-06", 10).await;

    let (status, _) = ctx
        .post(
            "/api/v1/visits",
            &ctx.mr_a_token,
            json!({
                "doctorId": ctx.doctor_a.id,
                "visitDate": "2024-06-03T05:00:00Z",
                "outcome": "DOCTOR_NOT_AVAILABLE",
                "notMetReason": "Emergency surgery",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = ctx
        .put(
            &format!("/api/v1/coverage/{}", plan_id),
            &ctx.owner_token,
            json!({}),
        )
        .await;
    assert_eq!(body["actualVisits"], 0);
    assert_eq!(body["status"], "MISSED");
}

// ============================================================================
// BEAT PLANS
// ============================================================================

#[tokio::test]
async fn test_beat_plan_day_slot_is_unique() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post(
            "/api/v1/beat-plans",
            &ctx.mr_a_token,
            json!({
                "planDate": "2024-06-15",
                "doctorIds": [ctx.doctor_a.id],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["mrId"].as_str().unwrap(), uuid_of(&ctx.mr_a));
    assert_eq!(body["entries"][0]["status"], "PLANNED");
    assert_eq!(body["visitedCount"], 0);

    let (status, body) = ctx
        .post(
            "/api/v1/beat-plans",
            &ctx.mr_a_token,
            json!({
                "planDate": "2024-06-15",
                "doctorIds": [ctx.doctor_a.id],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_recording_a_visit_marks_the_beat_entry() {
    let ctx = TestContext::new().await;

    ctx.post(
        "/api/v1/beat-plans",
        &ctx.mr_a_token,
        json!({
            "planDate": "2024-06-15",
            "doctorIds": [ctx.doctor_a.id],
        }),
    )
    .await;

    // Same doctor on the planned reporting day
    ctx.record_met_visit("2024-06-15T05:00:00Z").await;

    let (status, body) = ctx
        .get("/api/v1/beat-plans?date=2024-06-15", &ctx.mr_a_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let plan = &body.as_array().unwrap()[0];
    assert_eq!(plan["entries"][0]["status"], "VISITED");
    assert_eq!(plan["visitedCount"], 1);
}

// ============================================================================
// DIRECTORY
// ============================================================================

#[tokio::test]
async fn test_mr_created_doctors_await_approval() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .post(
            "/api/v1/doctors",
            &ctx.mr_a_token,
            json!({
                "name": "Dr. Iyer",
                "city": "Pune",
                // A spoofed assignee is overridden for MR callers
                "assignedMR": ctx.mr_b.id,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["isApproved"], false);
    assert_eq!(body["assignedMR"].as_str().unwrap(), uuid_of(&ctx.mr_a));

    // The manager approves it
    let doctor_id = body["id"].as_str().unwrap().to_string();
    let (status, body) = ctx
        .put(
            &format!("/api/v1/doctors/{}", doctor_id),
            &ctx.manager_a_token,
            json!({"isApproved": true}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isApproved"], true);
}

#[tokio::test]
async fn test_user_creation_is_owner_only() {
    let ctx = TestContext::new().await;
    let request = json!({
        "name": "Priya Nair",
        "role": "MR",
        "managerId": ctx.manager_a.id,
    });

    let (status, _) = ctx
        .post("/api/v1/users", &ctx.manager_a_token, request.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx.post("/api/v1/users", &ctx.owner_token, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "MR");
    assert_eq!(body["managerId"].as_str().unwrap(), uuid_of(&ctx.manager_a));

    let (status, _) = ctx
        .post(
            "/api/v1/users",
            &ctx.owner_token,
            json!({"name": "X", "role": "WIZARD"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mr_listing_is_scoped() {
    let ctx = TestContext::new().await;

    let (_, body) = ctx.get("/api/v1/users/mrs", &ctx.owner_token).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = ctx.get("/api/v1/users/mrs", &ctx.manager_a_token).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"].as_str().unwrap(), uuid_of(&ctx.mr_a));
}

#[tokio::test]
async fn test_missing_doctor_is_not_found() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .get(
            &format!("/api/v1/doctors/{}", uuid::Uuid::new_v4()),
            &ctx.owner_token,
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

fn uuid_of(user: &User) -> String {
    uuid::Uuid::from(user.id).to_string()
}

//! Invitation lifecycle integration tests.
//!
//! Exercises create -> verify -> accept, the unified not-found rule for
//! stale tokens, and single-use enforcement under concurrency.

mod common;

use chrono::{Duration, Utc};
use common::{claims_token, TestApp};
use qbank_service::models::Role;
use serde_json::json;
use uuid::Uuid;

/// Register a company and return (company_id, admin bearer token).
async fn register_company(app: &TestApp, name: &str, admin_subject: &str) -> (String, String) {
    let id_token = format!("{}-register-token", admin_subject);
    app.identity.register_token(&id_token, admin_subject);

    let response = app
        .client()
        .post(format!("{}/company/register", app.address))
        .json(&json!({
            "companyName": name,
            "adminEmail": format!("admin@{}.example.com", admin_subject),
            "idToken": id_token
        }))
        .send()
        .await
        .expect("Failed to register company");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let company_id = body["companyId"].as_str().unwrap().to_string();

    // A bearer carrying the claims the provider would now issue
    let bearer = claims_token(admin_subject, "admin", &company_id);
    app.identity.register_token(&bearer, admin_subject);

    (company_id, bearer)
}

/// Create an invitation and return its token.
async fn create_invitation(app: &TestApp, bearer: &str, email: &str, role: &str) -> String {
    let response = app
        .client()
        .post(format!("{}/invitation/create", app.address))
        .bearer_auth(bearer)
        .json(&json!({ "email": email, "role": role }))
        .send()
        .await
        .expect("Failed to create invitation");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    body["invitationToken"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn full_invitation_scenario() {
    // Register Acme with its admin
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    let (company_id, admin_bearer) = register_company(&app, "Acme Flow", "subject-acme-flow").await;

    // Admin invites an evaluator
    let token = create_invitation(&app, &admin_bearer, "b@acme.com", "evaluator").await;
    assert_eq!(token.len(), 43);

    // Verify shows company, role, and email without consuming the token
    let response = app
        .client()
        .get(format!("{}/invitation/verify/{}", app.address, token))
        .send()
        .await
        .expect("Failed to verify invitation");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["valid"], true);
    assert_eq!(body["companyName"], "Acme Flow");
    assert_eq!(body["role"], "evaluator");
    assert_eq!(body["email"], "b@acme.com");

    // Bob accepts
    app.identity.register_token("bob-token", "subject-bob");
    let response = app
        .client()
        .post(format!("{}/invitation/accept", app.address))
        .json(&json!({
            "token": token,
            "idToken": "bob-token",
            "fullName": "Bob"
        }))
        .send()
        .await
        .expect("Failed to accept invitation");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["role"], "evaluator");
    assert_eq!(body["user"]["companyId"], company_id);

    // The created user matches the invitation
    let (email, role_code, full_name): (String, String, Option<String>) = sqlx::query_as(
        "SELECT email, role_code, full_name FROM users WHERE subject = $1",
    )
    .bind("subject-bob")
    .fetch_one(&app.pool)
    .await
    .expect("accepted user missing");
    assert_eq!(email, "b@acme.com");
    assert_eq!(role_code, "evaluator");
    assert_eq!(full_name.as_deref(), Some("Bob"));

    // Claims were propagated for Bob
    let recorded = app.identity.recorded_claims();
    let bob_claims = recorded
        .iter()
        .find(|(subject, _)| subject == "subject-bob")
        .expect("no claims recorded for Bob");
    assert_eq!(bob_claims.1.role, Role::Evaluator);
    assert_eq!(bob_claims.1.company_id.to_string(), company_id);

    // The token is burned: verify and accept now both report not-found
    let response = app
        .client()
        .get(format!("{}/invitation/verify/{}", app.address, token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    app.identity.register_token("carol-token", "subject-carol");
    let response = app
        .client()
        .post(format!("{}/invitation/accept", app.address))
        .json(&json!({
            "token": token,
            "idToken": "carol-token",
            "fullName": "Carol"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn concurrent_accepts_provision_exactly_one_user() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    let (_, admin_bearer) = register_company(&app, "Race Corp", "subject-race-admin").await;
    let token = create_invitation(&app, &admin_bearer, "racer@race.com", "candidate").await;

    let racers = 8;
    for i in 0..racers {
        app.identity
            .register_token(&format!("racer-token-{}", i), &format!("subject-racer-{}", i));
    }

    let attempts = (0..racers).map(|i| {
        let client = app.client();
        let address = app.address.clone();
        let token = token.clone();
        async move {
            client
                .post(format!("{}/invitation/accept", address))
                .json(&json!({
                    "token": token,
                    "idToken": format!("racer-token-{}", i),
                    "fullName": format!("Racer {}", i)
                }))
                .send()
                .await
                .expect("Failed to execute request")
                .status()
                .as_u16()
        }
    });

    let statuses = futures::future::join_all(attempts).await;

    let successes = statuses.iter().filter(|s| **s == 200).count();
    assert_eq!(successes, 1, "statuses: {:?}", statuses);
    assert!(statuses.iter().all(|s| *s == 200 || *s == 404));

    let (users,): (i64,) = sqlx::query_as("SELECT count(*) FROM users WHERE email = $1")
        .bind("racer@race.com")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(users, 1);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn expired_invitation_is_not_found() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    let (company_id, _) = register_company(&app, "Expired Corp", "subject-expired-admin").await;

    // Insert an already-expired invitation directly
    let token = "expired-invitation-token-for-integration-test";
    sqlx::query(
        r#"
        INSERT INTO invitations
            (invitation_id, company_id, email, role_code, token, used_flag, expiry_utc, created_utc)
        VALUES ($1, $2, 'late@expired.com', 'evaluator', $3, FALSE, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(Uuid::parse_str(&company_id).unwrap())
    .bind(token)
    .bind(Utc::now() - Duration::hours(1))
    .bind(Utc::now() - Duration::days(8))
    .execute(&app.pool)
    .await
    .expect("Failed to insert expired invitation");

    let response = app
        .client()
        .get(format!("{}/invitation/verify/{}", app.address, token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    app.identity.register_token("late-token", "subject-late");
    let response = app
        .client()
        .post(format!("{}/invitation/accept", app.address))
        .json(&json!({
            "token": token,
            "idToken": "late-token",
            "fullName": "Latecomer"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn invitation_with_admin_role_is_rejected() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    let (_, admin_bearer) = register_company(&app, "Strict Corp", "subject-strict-admin").await;

    let response = app
        .client()
        .post(format!("{}/invitation/create", app.address))
        .bearer_auth(&admin_bearer)
        .json(&json!({ "email": "x@strict.com", "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = app
        .client()
        .post(format!("{}/invitation/create", app.address))
        .bearer_auth(&admin_bearer)
        .json(&json!({ "email": "x@strict.com", "role": "superuser" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn invitation_create_without_company_claim_is_unauthorized() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    register_company(&app, "Claimless Corp", "subject-claimless-admin").await;

    // A bearer that verifies and carries a role but no companyId
    let bearer = {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload =
            URL_SAFE_NO_PAD.encode(serde_json::json!({ "role": "admin" }).to_string());
        format!("{}.{}.sig", header, payload)
    };
    app.identity.register_token(&bearer, "subject-claimless-admin");

    let response = app
        .client()
        .post(format!("{}/invitation/create", app.address))
        .bearer_auth(&bearer)
        .json(&json!({ "email": "x@claimless.com", "role": "evaluator" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn candidate_cannot_create_invitations() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    let (company_id, _) = register_company(&app, "Gated Corp", "subject-gated-admin").await;

    let bearer = claims_token("subject-gated-candidate", "candidate", &company_id);
    app.identity.register_token(&bearer, "subject-gated-candidate");

    let response = app
        .client()
        .post(format!("{}/invitation/create", app.address))
        .bearer_auth(&bearer)
        .json(&json!({ "email": "y@gated.com", "role": "candidate" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn repeated_invites_for_same_email_each_stay_valid() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    let (_, admin_bearer) = register_company(&app, "Repeat Corp", "subject-repeat-admin").await;

    let first = create_invitation(&app, &admin_bearer, "again@repeat.com", "evaluator").await;
    let second = create_invitation(&app, &admin_bearer, "again@repeat.com", "evaluator").await;
    assert_ne!(first, second);

    for token in [&first, &second] {
        let response = app
            .client()
            .get(format!("{}/invitation/verify/{}", app.address, token))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
}

//! Company registration integration tests.
//!
//! Covers the atomic register workflow: company + admin rows plus claims
//! propagation commit or roll back together.

mod common;

use common::TestApp;
use qbank_service::models::Role;
use serde_json::json;

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn register_company_creates_company_and_admin() {
    // Arrange
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.identity
        .register_token("acme-admin-token", "subject-acme-admin");

    // Act
    let response = app
        .client()
        .post(format!("{}/company/register", app.address))
        .json(&json!({
            "companyName": "Acme Registration",
            "description": "Assessment platform customer",
            "adminEmail": "a@acme-registration.com",
            "idToken": "acme-admin-token"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    let company_id = body["companyId"].as_str().expect("companyId missing").to_string();

    let (companies,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM companies WHERE company_name = $1")
            .bind("Acme Registration")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(companies, 1);

    let (role, email): (String, String) =
        sqlx::query_as("SELECT role_code, email FROM users WHERE subject = $1")
            .bind("subject-acme-admin")
            .fetch_one(&app.pool)
            .await
            .expect("admin user missing");
    assert_eq!(role, "admin");
    assert_eq!(email, "a@acme-registration.com");

    // Claims were propagated with the admin role and the new company id
    let recorded = app.identity.recorded_claims();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, "subject-acme-admin");
    assert_eq!(recorded[0].1.role, Role::Admin);
    assert_eq!(recorded[0].1.company_id.to_string(), company_id);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn register_company_rolls_back_when_claims_propagation_fails() {
    // Arrange
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.identity
        .register_token("rollback-token", "subject-rollback");
    app.identity.fail_claim_writes(true);

    // Act
    let response = app
        .client()
        .post(format!("{}/company/register", app.address))
        .json(&json!({
            "companyName": "Rollback Inc",
            "adminEmail": "a@rollback.com",
            "idToken": "rollback-token"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert - neither the company nor the admin user survived
    assert_eq!(response.status(), 502);

    let (companies,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM companies WHERE company_name = $1")
            .bind("Rollback Inc")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(companies, 0);

    let (users,): (i64,) = sqlx::query_as("SELECT count(*) FROM users WHERE subject = $1")
        .bind("subject-rollback")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(users, 0);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn register_company_with_unknown_token_is_unauthorized() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");

    let response = app
        .client()
        .post(format!("{}/company/register", app.address))
        .json(&json!({
            "companyName": "No Token Corp",
            "adminEmail": "a@notoken.com",
            "idToken": "never-registered"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 401);

    let (companies,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM companies WHERE company_name = $1")
            .bind("No Token Corp")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(companies, 0);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn duplicate_company_name_conflicts() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.identity.register_token("dup-token-1", "subject-dup-1");
    app.identity.register_token("dup-token-2", "subject-dup-2");

    let register = |id_token: &'static str, email: &'static str| {
        let client = app.client();
        let address = app.address.clone();
        async move {
            client
                .post(format!("{}/company/register", address))
                .json(&json!({
                    "companyName": "Duplicate Name Ltd",
                    "adminEmail": email,
                    "idToken": id_token
                }))
                .send()
                .await
                .expect("Failed to execute request")
        }
    };

    let first = register("dup-token-1", "a@dup.com").await;
    assert_eq!(first.status(), 200);

    let second = register("dup-token-2", "b@dup.com").await;
    assert_eq!(second.status(), 409);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn profile_returns_user_with_company_name() {
    // Arrange - register, then call the profile endpoint with the same token
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.identity
        .register_token("profile-token", "subject-profile");

    let response = app
        .client()
        .post(format!("{}/company/register", app.address))
        .json(&json!({
            "companyName": "Profile Corp",
            "adminEmail": "a@profile.com",
            "idToken": "profile-token"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), 200);

    // Act
    let response = app
        .client()
        .get(format!("{}/company/profile", app.address))
        .bearer_auth("profile-token")
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["user"]["email"], "a@profile.com");
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["companyName"], "Profile Corp");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn profile_without_bearer_token_is_unauthorized() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");

    let response = app
        .client()
        .get(format!("{}/company/profile", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn profile_for_unprovisioned_subject_is_not_found() {
    let app = TestApp::spawn().await.expect("Failed to spawn test app");
    app.identity
        .register_token("ghost-token", "subject-ghost");

    let response = app
        .client()
        .get(format!("{}/company/profile", app.address))
        .bearer_auth("ghost-token")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 404);
}

//! Role-gated dashboard handlers.
//!
//! The feature lists are placeholders; question-bank content itself is a
//! separate concern.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::policy::role_claim;

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub message: String,
    pub role: String,
    pub features: Vec<String>,
}

/// Admin dashboard.
///
/// GET /admin/dashboard
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Admin dashboard", body = DashboardResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn admin_dashboard(user: AuthenticatedUser) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        message: "Welcome to Admin Dashboard".to_string(),
        role: caller_role(&user),
        features: features(&["User Management", "Company Settings", "Analytics"]),
    })
}

/// Evaluator dashboard.
///
/// GET /evaluator/dashboard
#[utoipa::path(
    get,
    path = "/evaluator/dashboard",
    responses(
        (status = 200, description = "Evaluator dashboard", body = DashboardResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is neither evaluator nor admin")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn evaluator_dashboard(user: AuthenticatedUser) -> Json<DashboardResponse> {
    Json(DashboardResponse {
        message: "Welcome to Evaluator Dashboard".to_string(),
        role: caller_role(&user),
        features: features(&["Create Questions", "Manage Evaluations", "View Reports"]),
    })
}

/// Dashboard shared by every provisioned role.
///
/// GET /shared/dashboard
#[utoipa::path(
    get,
    path = "/shared/dashboard",
    responses(
        (status = 200, description = "Shared dashboard", body = DashboardResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller carries no recognized role")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn shared_dashboard(user: AuthenticatedUser) -> Json<DashboardResponse> {
    let role = caller_role(&user);
    Json(DashboardResponse {
        message: format!("Welcome to Shared Dashboard - {}", role),
        role,
        features: features(&["Profile Management", "Notifications", "Help"]),
    })
}

fn caller_role(user: &AuthenticatedUser) -> String {
    role_claim(user).unwrap_or("unknown").to_string()
}

fn features(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

//! Role-based authorization policies.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::auth::AuthenticatedUser;
use crate::dtos::ErrorResponse;

pub const ROLE_CLAIM: &str = "role";
pub const COMPANY_CLAIM: &str = "companyId";

/// Claim-type names under which tokens may carry the role. The two URIs
/// are legacy names kept for backward compatibility.
const ROLE_CLAIM_ALIASES: [&str; 3] = [
    ROLE_CLAIM,
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/role",
    "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
];

/// Named authorization policies gating route groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    AdminOnly,
    EvaluatorOrAdmin,
    AnyRole,
}

impl Policy {
    /// Pure predicate over the principal's claim set.
    pub fn allows(&self, user: &AuthenticatedUser) -> bool {
        let Some(role) = role_claim(user) else {
            return false;
        };
        match self {
            Policy::AdminOnly => role == "admin",
            Policy::EvaluatorOrAdmin => matches!(role, "admin" | "evaluator"),
            Policy::AnyRole => matches!(role, "admin" | "evaluator" | "candidate"),
        }
    }
}

/// The principal's role, under any of the known claim-type names.
pub fn role_claim(user: &AuthenticatedUser) -> Option<&str> {
    ROLE_CLAIM_ALIASES
        .iter()
        .find_map(|claim_type| user.claim_value(claim_type))
}

async fn enforce(policy: Policy, req: Request, next: Next) -> Response {
    match req.extensions().get::<AuthenticatedUser>() {
        Some(user) if policy.allows(user) => next.run(req).await,
        Some(user) => {
            tracing::warn!(
                subject = %user.subject,
                policy = ?policy,
                role = role_claim(user).unwrap_or("none"),
                "Policy rejected request"
            );
            (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("Insufficient role for this resource")),
            )
                .into_response()
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Authentication required")),
        )
            .into_response(),
    }
}

pub async fn admin_only(req: Request, next: Next) -> Response {
    enforce(Policy::AdminOnly, req, next).await
}

pub async fn evaluator_or_admin(req: Request, next: Next) -> Response {
    enforce(Policy::EvaluatorOrAdmin, req, next).await
}

pub async fn any_role(req: Request, next: Next) -> Response {
    enforce(Policy::AnyRole, req, next).await
}

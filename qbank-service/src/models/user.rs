//! User model - company-scoped accounts mapped onto identity-provider subjects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role codes. The set is closed; anything else is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Evaluator,
    Candidate,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Evaluator => "evaluator",
            Role::Candidate => "candidate",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "evaluator" => Ok(Role::Evaluator),
            "candidate" => Ok(Role::Candidate),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

/// Roles an invitation may carry. Admins are created only through company
/// registration, never by invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InviteRole {
    Evaluator,
    Candidate,
}

impl From<InviteRole> for Role {
    fn from(role: InviteRole) -> Self {
        match role {
            InviteRole::Evaluator => Role::Evaluator,
            InviteRole::Candidate => Role::Candidate,
        }
    }
}

/// User entity (company-scoped).
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub subject: String,
    pub company_id: Uuid,
    pub email: String,
    pub role_code: String,
    pub full_name: Option<String>,
    pub active_flag: bool,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a new user.
    pub fn new(
        subject: String,
        company_id: Uuid,
        email: String,
        role: Role,
        full_name: Option<String>,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            subject,
            company_id,
            email,
            role_code: role.as_str().to_string(),
            full_name,
            active_flag: true,
            created_utc: Utc::now(),
        }
    }

    /// Check if user is active.
    pub fn is_active(&self) -> bool {
        self.active_flag
    }
}

/// User joined with the owning company's name, for the profile endpoint.
#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub role_code: String,
    pub full_name: Option<String>,
    pub company_name: String,
}

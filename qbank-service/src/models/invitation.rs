//! Invitation model - single-use, expiring onboarding tokens.

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::{InviteRole, Role};

/// Invitations expire this many days after creation.
pub const INVITATION_EXPIRY_DAYS: i64 = 7;

/// Invitation entity.
#[derive(Debug, Clone, FromRow)]
pub struct Invitation {
    pub invitation_id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub role_code: String,
    pub token: String,
    pub used_flag: bool,
    pub expiry_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl Invitation {
    /// Create a new invitation.
    pub fn new(company_id: Uuid, email: String, role: InviteRole, token: String) -> Self {
        let now = Utc::now();
        Self {
            invitation_id: Uuid::new_v4(),
            company_id,
            email,
            role_code: Role::from(role).as_str().to_string(),
            token,
            used_flag: false,
            expiry_utc: now + Duration::days(INVITATION_EXPIRY_DAYS),
            created_utc: now,
        }
    }

    /// Check if the invitation can still be accepted.
    pub fn is_valid(&self) -> bool {
        !self.used_flag && Utc::now() < self.expiry_utc
    }
}

/// Invitation joined with the company name, for the public verify endpoint.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationPreview {
    pub company_name: String,
    pub role_code: String,
    pub email: String,
}

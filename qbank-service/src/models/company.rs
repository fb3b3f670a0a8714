//! Company model - top-level tenant owning users and invitations.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Company entity.
#[derive(Debug, Clone, FromRow)]
pub struct Company {
    pub company_id: Uuid,
    pub company_name: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Company {
    /// Create a new company.
    pub fn new(company_name: String, description: Option<String>) -> Self {
        Self {
            company_id: Uuid::new_v4(),
            company_name,
            description,
            created_utc: Utc::now(),
        }
    }
}

//! Company registration workflow.

use std::sync::Arc;

use service_core::error::AppError;

use crate::models::{Company, Role, User, UserProfile};
use crate::services::identity::{CustomClaims, IdentityProvider};
use crate::services::Database;

/// Orchestrates company registration and profile lookups.
#[derive(Clone)]
pub struct CompanyService {
    db: Database,
    identity: Arc<dyn IdentityProvider>,
}

impl CompanyService {
    pub fn new(db: Database, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { db, identity }
    }

    /// Register a company together with its admin user.
    ///
    /// The company row, the admin row, and the claims write at the identity
    /// provider commit or roll back as one unit: a company whose admin the
    /// provider does not know about would be unreachable.
    #[tracing::instrument(skip_all, fields(company_name = %company_name))]
    pub async fn register_company(
        &self,
        company_name: &str,
        description: Option<String>,
        admin_email: &str,
        id_token: &str,
    ) -> Result<Company, AppError> {
        let subject = self.identity.verify_id_token(id_token).await?;

        let company = Company::new(company_name.to_string(), description);
        let admin = User::new(
            subject.clone(),
            company.company_id,
            admin_email.to_string(),
            Role::Admin,
            None,
        );

        let mut tx = self.db.begin().await?;
        self.db.insert_company(&mut tx, &company).await?;
        self.db.insert_user(&mut tx, &admin).await?;

        self.identity
            .set_custom_claims(
                &subject,
                &CustomClaims {
                    role: Role::Admin,
                    company_id: company.company_id,
                },
            )
            .await?;

        self.db.commit(tx).await?;

        tracing::info!(
            company_id = %company.company_id,
            admin_user_id = %admin.user_id,
            "Company registered"
        );

        Ok(company)
    }

    /// Look up the caller's profile by identity-provider subject.
    pub async fn user_profile(&self, subject: &str) -> Result<UserProfile, AppError> {
        self.db
            .find_user_profile(subject)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))
    }
}

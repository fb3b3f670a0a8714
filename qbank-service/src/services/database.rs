//! PostgreSQL persistence for qbank-service.

use service_core::error::AppError;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::models::{Company, Invitation, InvitationPreview, User, UserProfile};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    /// Open a transaction for a multi-write workflow.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Commit a workflow transaction.
    pub async fn commit(&self, tx: Transaction<'static, Postgres>) -> Result<(), AppError> {
        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    // ==================== Company Operations ====================

    /// Find company by ID.
    pub async fn find_company_by_id(&self, company_id: Uuid) -> Result<Option<Company>, AppError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE company_id = $1")
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Insert a new company inside a workflow transaction.
    pub async fn insert_company(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        company: &Company,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO companies (company_id, company_name, description, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(company.company_id)
        .bind(&company.company_name)
        .bind(&company.description)
        .bind(company.created_utc)
        .execute(&mut **tx)
        .await
        .map_err(map_unique_violation)?;
        Ok(())
    }

    // ==================== User Operations ====================

    /// Find a user joined with the owning company's name.
    pub async fn find_user_profile(&self, subject: &str) -> Result<Option<UserProfile>, AppError> {
        sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.user_id, u.email, u.role_code, u.full_name, c.company_name
            FROM users u
            JOIN companies c ON c.company_id = u.company_id
            WHERE u.subject = $1
            "#,
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Insert a new user inside a workflow transaction.
    pub async fn insert_user(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        user: &User,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users
                (user_id, subject, company_id, email, role_code, full_name, active_flag, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.subject)
        .bind(user.company_id)
        .bind(&user.email)
        .bind(&user.role_code)
        .bind(&user.full_name)
        .bind(user.active_flag)
        .bind(user.created_utc)
        .execute(&mut **tx)
        .await
        .map_err(map_unique_violation)?;
        Ok(())
    }

    // ==================== Invitation Operations ====================

    /// Insert an invitation. Returns false when the generated token
    /// collided with an existing one, so the caller can regenerate.
    pub async fn insert_invitation(&self, invitation: &Invitation) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO invitations
                (invitation_id, company_id, email, role_code, token, used_flag, expiry_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(invitation.invitation_id)
        .bind(invitation.company_id)
        .bind(&invitation.email)
        .bind(&invitation.role_code)
        .bind(&invitation.token)
        .bind(invitation.used_flag)
        .bind(invitation.expiry_utc)
        .bind(invitation.created_utc)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db))
                if db.is_unique_violation()
                    && db.constraint() == Some("invitations_token_key") =>
            {
                Ok(false)
            }
            Err(e) => Err(map_unique_violation(e)),
        }
    }

    /// Find an invitation that is neither used nor expired. Used, expired,
    /// and unknown tokens all come back as None.
    pub async fn find_valid_invitation(&self, token: &str) -> Result<Option<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations WHERE token = $1 AND used_flag = FALSE AND expiry_utc > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Same lookup joined with the company name, for the verify endpoint.
    pub async fn find_valid_invitation_preview(
        &self,
        token: &str,
    ) -> Result<Option<InvitationPreview>, AppError> {
        sqlx::query_as::<_, InvitationPreview>(
            r#"
            SELECT c.company_name, i.role_code, i.email
            FROM invitations i
            JOIN companies c ON c.company_id = i.company_id
            WHERE i.token = $1 AND i.used_flag = FALSE AND i.expiry_utc > now()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Flip `used_flag`, conditional on the invitation still being
    /// acceptable at write time. Returns false when another transaction won
    /// the race or the invitation expired in the meantime.
    pub async fn mark_invitation_used(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        invitation_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE invitations
            SET used_flag = TRUE
            WHERE invitation_id = $1 AND used_flag = FALSE AND expiry_utc > now()
            "#,
        )
        .bind(invitation_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        Ok(result.rows_affected() > 0)
    }
}

/// Map unique-constraint violations onto Conflict with a client-safe
/// message; everything else is a generic database error.
fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            let message = match db.constraint() {
                Some("companies_company_name_key") => "A company with this name already exists",
                Some("users_subject_key") => "This account is already provisioned",
                Some("users_company_id_email_key") => {
                    "A user with this email already exists in the company"
                }
                _ => "Resource already exists",
            };
            return AppError::Conflict(anyhow::anyhow!(message));
        }
    }
    AppError::DatabaseError(anyhow::anyhow!(e))
}

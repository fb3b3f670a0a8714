//! Invitation lifecycle workflow: create, verify, accept.

use std::sync::Arc;

use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{Invitation, InvitationPreview, InviteRole, Role, User};
use crate::services::identity::{CustomClaims, IdentityProvider};
use crate::services::token::generate_invitation_token;
use crate::services::Database;

/// Attempts before giving up when a generated token collides with an
/// existing one. With 256-bit tokens a single collision is already
/// vanishingly unlikely.
const MAX_TOKEN_ATTEMPTS: usize = 3;

/// Orchestrates the invitation lifecycle.
#[derive(Clone)]
pub struct InvitationService {
    db: Database,
    identity: Arc<dyn IdentityProvider>,
}

impl InvitationService {
    pub fn new(db: Database, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { db, identity }
    }

    /// Create an invitation for an email address.
    ///
    /// Repeated invites to the same address each get their own token; no
    /// dedupe against pending invitations is attempted.
    #[tracing::instrument(skip(self), fields(company_id = %company_id, email = %email))]
    pub async fn create_invitation(
        &self,
        company_id: Uuid,
        email: &str,
        role: InviteRole,
    ) -> Result<Invitation, AppError> {
        self.db
            .find_company_by_id(company_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let invitation = Invitation::new(
                company_id,
                email.to_string(),
                role,
                generate_invitation_token(),
            );

            if self.db.insert_invitation(&invitation).await? {
                tracing::info!(invitation_id = %invitation.invitation_id, "Invitation created");
                return Ok(invitation);
            }
            tracing::warn!("Invitation token collision, regenerating");
        }

        Err(AppError::InternalError(anyhow::anyhow!(
            "Could not generate a unique invitation token"
        )))
    }

    /// Resolve a token to its company/role/email for the acceptance form.
    ///
    /// Used, expired, and unknown tokens are indistinguishable: all come
    /// back as not-found, so a stale token leaks nothing about its state.
    pub async fn verify_invitation(&self, token: &str) -> Result<InvitationPreview, AppError> {
        self.db
            .find_valid_invitation_preview(token)
            .await?
            .ok_or_else(invitation_not_found)
    }

    /// Accept an invitation: provision the user and burn the token.
    ///
    /// The used-flag update is conditional on the flag still being clear at
    /// write time, so of N concurrent accepts exactly one wins; the rest
    /// observe the same not-found as any stale token. User creation and the
    /// claims write roll back with the flag if anything fails.
    #[tracing::instrument(skip_all)]
    pub async fn accept_invitation(
        &self,
        token: &str,
        id_token: &str,
        full_name: &str,
    ) -> Result<User, AppError> {
        let invitation = self
            .db
            .find_valid_invitation(token)
            .await?
            .ok_or_else(invitation_not_found)?;

        let subject = self.identity.verify_id_token(id_token).await?;

        let role: Role = invitation
            .role_code
            .parse()
            .map_err(|e: String| AppError::InternalError(anyhow::anyhow!(e)))?;

        let user = User::new(
            subject.clone(),
            invitation.company_id,
            invitation.email.clone(),
            role,
            Some(full_name.to_string()),
        );

        let mut tx = self.db.begin().await?;

        if !self
            .db
            .mark_invitation_used(&mut tx, invitation.invitation_id)
            .await?
        {
            return Err(invitation_not_found());
        }

        self.db.insert_user(&mut tx, &user).await?;

        self.identity
            .set_custom_claims(
                &subject,
                &CustomClaims {
                    role,
                    company_id: invitation.company_id,
                },
            )
            .await?;

        self.db.commit(tx).await?;

        tracing::info!(
            user_id = %user.user_id,
            invitation_id = %invitation.invitation_id,
            "Invitation accepted"
        );

        Ok(user)
    }
}

fn invitation_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Invalid or expired invitation"))
}

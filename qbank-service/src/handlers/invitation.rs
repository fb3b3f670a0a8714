//! Invitation handlers: create (role-gated), verify and accept (public).

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::ErrorResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::policy::COMPANY_CLAIM;
use crate::models::InviteRole;
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

/// Request to invite an email address into the caller's company.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvitationRequest {
    #[validate(email)]
    pub email: String,
    pub role: InviteRole,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitationResponse {
    pub success: bool,
    pub invitation_token: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyInvitationResponse {
    pub valid: bool,
    pub company_name: String,
    pub role: String,
    pub email: String,
}

/// Request to accept an invitation.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitationRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 1))]
    pub id_token: String,
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitationResponse {
    pub success: bool,
    pub message: String,
    pub user: AcceptedUser,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedUser {
    pub role: String,
    pub company_id: Uuid,
}

/// Create an invitation within the caller's company.
///
/// POST /invitation/create
#[utoipa::path(
    post,
    path = "/invitation/create",
    request_body = CreateInvitationRequest,
    responses(
        (status = 200, description = "Invitation created", body = CreateInvitationResponse),
        (status = 401, description = "Missing or unparsable company claim", body = ErrorResponse),
        (status = 403, description = "Caller role not allowed to invite", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Invitation"
)]
#[tracing::instrument(skip_all, fields(email = %req.email))]
pub async fn create_invitation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<CreateInvitationRequest>,
) -> Result<Json<CreateInvitationResponse>, AppError> {
    // The target company comes from the caller's own claims, never from
    // the request body.
    let company_id = user
        .claim_value(COMPANY_CLAIM)
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid company context")))?;

    let invitation = state
        .invitations
        .create_invitation(company_id, &req.email, req.role)
        .await?;

    Ok(Json(CreateInvitationResponse {
        success: true,
        invitation_token: invitation.token,
        message: "Invitation created successfully".to_string(),
    }))
}

/// Resolve an invitation token for the acceptance form.
///
/// GET /invitation/verify/{token}
#[utoipa::path(
    get,
    path = "/invitation/verify/{token}",
    params(("token" = String, Path, description = "Invitation token")),
    responses(
        (status = 200, description = "Invitation is valid", body = VerifyInvitationResponse),
        (status = 404, description = "Unknown, used, or expired token", body = ErrorResponse)
    ),
    tag = "Invitation"
)]
pub async fn verify_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<VerifyInvitationResponse>, AppError> {
    let preview = state.invitations.verify_invitation(&token).await?;

    Ok(Json(VerifyInvitationResponse {
        valid: true,
        company_name: preview.company_name,
        role: preview.role_code,
        email: preview.email,
    }))
}

/// Accept an invitation and provision the invitee.
///
/// POST /invitation/accept
#[utoipa::path(
    post,
    path = "/invitation/accept",
    request_body = AcceptInvitationRequest,
    responses(
        (status = 200, description = "Invitation accepted", body = AcceptInvitationResponse),
        (status = 401, description = "Identity token rejected", body = ErrorResponse),
        (status = 404, description = "Unknown, used, or expired token", body = ErrorResponse)
    ),
    tag = "Invitation"
)]
#[tracing::instrument(skip_all)]
pub async fn accept_invitation(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<AcceptInvitationRequest>,
) -> Result<Json<AcceptInvitationResponse>, AppError> {
    let user = state
        .invitations
        .accept_invitation(&req.token, &req.id_token, &req.full_name)
        .await?;

    Ok(Json(AcceptInvitationResponse {
        success: true,
        message: "Invitation accepted successfully".to_string(),
        user: AcceptedUser {
            role: user.role_code,
            company_id: user.company_id,
        },
    }))
}

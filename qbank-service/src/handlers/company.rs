//! Company handlers: public registration and the caller's profile.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::ErrorResponse;
use crate::middleware::auth::AuthenticatedUser;
use crate::utils::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

/// Request to register a company with its admin.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCompanyRequest {
    #[validate(length(min = 1, max = 255))]
    pub company_name: String,
    pub description: Option<String>,
    #[validate(email)]
    pub admin_email: String,
    #[validate(length(min = 1))]
    pub id_token: String,
}

/// Response after registering a company.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCompanyResponse {
    pub success: bool,
    pub company_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub user: ProfileUser,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub full_name: Option<String>,
    pub company_name: String,
}

/// Register a company and its admin user.
///
/// POST /company/register
#[utoipa::path(
    post,
    path = "/company/register",
    request_body = RegisterCompanyRequest,
    responses(
        (status = 200, description = "Company registered", body = RegisterCompanyResponse),
        (status = 401, description = "Identity token rejected", body = ErrorResponse),
        (status = 409, description = "Company name or admin already taken", body = ErrorResponse)
    ),
    tag = "Company"
)]
#[tracing::instrument(skip_all, fields(company_name = %req.company_name))]
pub async fn register_company(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterCompanyRequest>,
) -> Result<Json<RegisterCompanyResponse>, AppError> {
    let company = state
        .companies
        .register_company(
            &req.company_name,
            req.description,
            &req.admin_email,
            &req.id_token,
        )
        .await?;

    Ok(Json(RegisterCompanyResponse {
        success: true,
        company_id: company.company_id,
        message: "Company registered successfully".to_string(),
    }))
}

/// The authenticated caller's profile.
///
/// GET /company/profile
#[utoipa::path(
    get,
    path = "/company/profile",
    responses(
        (status = 200, description = "Caller profile", body = ProfileResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "No user for this subject", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.companies.user_profile(&user.subject).await?;

    Ok(Json(ProfileResponse {
        user: ProfileUser {
            id: profile.user_id,
            email: profile.email,
            role: profile.role_code,
            full_name: profile.full_name,
            company_name: profile.company_name,
        },
    }))
}


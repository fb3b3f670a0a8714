use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::IntoResponse,
    Json,
};

use crate::dtos::ErrorResponse;
use crate::AppState;

/// A single claim on the request principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
}

/// The authenticated principal for the current request.
///
/// Created by `auth_middleware` with an empty claim set; the claims
/// augmentation middleware fills in whatever the bearer token carries.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub subject: String,
    pub claims: Vec<Claim>,
}

impl AuthenticatedUser {
    pub fn new(subject: String) -> Self {
        Self {
            subject,
            claims: Vec::new(),
        }
    }

    pub fn has_claim(&self, claim_type: &str) -> bool {
        self.claims.iter().any(|c| c.claim_type == claim_type)
    }

    pub fn claim_value(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Attach a claim unless one of the same type is already present.
    pub fn add_claim_if_absent(&mut self, claim_type: &str, value: String) {
        if !self.has_claim(claim_type) {
            self.claims.push(Claim {
                claim_type: claim_type.to_string(),
                value,
            });
        }
    }
}

/// Middleware to require a verified bearer token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let token = match token {
        Some(token) => token,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Missing or invalid Authorization header")),
            ));
        }
    };

    let subject = match state.identity.verify_id_token(token).await {
        Ok(subject) => subject,
        Err(_) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new("Invalid or expired token")),
            ));
        }
    };

    // Store the principal in request extensions so handlers can access it
    req.extensions_mut().insert(AuthenticatedUser::new(subject));

    Ok(next.run(req).await)
}

/// Extractor to easily get the principal in handlers
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<AuthenticatedUser>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "Authenticated principal missing from request extensions",
            )),
        ))?;

        Ok(user.clone())
    }
}

//! Supplementary claim extraction from the already-verified bearer token.
//!
//! The generic bearer validation only yields the provider subject. The
//! custom claims written back by provisioning (`role`, `companyId`) live in
//! the token payload, so this middleware re-decodes the payload segment and
//! attaches those fields to the request principal. No signature
//! re-verification happens here; upstream validation already did that.

use axum::{extract::Request, http::header, middleware::Next, response::Response};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::auth::AuthenticatedUser;
use super::policy::{COMPANY_CLAIM, ROLE_CLAIM};

/// Custom fields carried in the token payload.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SupplementaryClaims {
    pub role: Option<String>,
    pub company_id: Option<String>,
}

/// Decode the payload of a compact JWT and pull out the custom fields.
///
/// Returns None when the token is not a three-segment JWT, the payload is
/// not valid base64url JSON, or neither custom field is present.
pub fn supplementary_claims(token: &str) -> Option<SupplementaryClaims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .ok()?;
    let payload: serde_json::Value = serde_json::from_slice(&payload).ok()?;

    let claims = SupplementaryClaims {
        role: payload
            .get("role")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        company_id: payload
            .get("companyId")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    };

    if claims == SupplementaryClaims::default() {
        return None;
    }
    Some(claims)
}

/// Attach role/companyId claims from the bearer token to the principal.
///
/// Runs once per request, between authentication and policy evaluation.
/// Never rejects: an absent or undecodable token leaves the request exactly
/// as the generic validation produced it.
pub async fn claims_augmentation_middleware(mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    if let Some(token) = token {
        if let Some(extra) = supplementary_claims(&token) {
            if let Some(user) = req.extensions_mut().get_mut::<AuthenticatedUser>() {
                if let Some(role) = extra.role {
                    user.add_claim_if_absent(ROLE_CLAIM, role);
                }
                if let Some(company_id) = extra.company_id {
                    user.add_claim_if_absent(COMPANY_CLAIM, company_id);
                }
            }
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsigned_jwt(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn extracts_role_and_company_id() {
        let token = unsigned_jwt(serde_json::json!({
            "sub": "subject-1",
            "role": "evaluator",
            "companyId": "0a4edd21-0a07-4ff1-b081-1b79b218b5e8"
        }));

        let claims = supplementary_claims(&token).unwrap();
        assert_eq!(claims.role.as_deref(), Some("evaluator"));
        assert_eq!(
            claims.company_id.as_deref(),
            Some("0a4edd21-0a07-4ff1-b081-1b79b218b5e8")
        );
    }

    #[test]
    fn role_alone_is_enough() {
        let token = unsigned_jwt(serde_json::json!({"role": "candidate"}));
        let claims = supplementary_claims(&token).unwrap();
        assert_eq!(claims.role.as_deref(), Some("candidate"));
        assert_eq!(claims.company_id, None);
    }

    #[test]
    fn missing_custom_fields_yield_none() {
        let token = unsigned_jwt(serde_json::json!({"sub": "subject-1"}));
        assert!(supplementary_claims(&token).is_none());
    }

    #[test]
    fn malformed_tokens_yield_none() {
        assert!(supplementary_claims("not-a-jwt").is_none());
        assert!(supplementary_claims("a.b").is_none());
        assert!(supplementary_claims("a.!!!.c").is_none());
        assert!(supplementary_claims("a.b.c.d").is_none());
    }

    #[test]
    fn non_string_fields_are_ignored() {
        let token = unsigned_jwt(serde_json::json!({"role": 42}));
        assert!(supplementary_claims(&token).is_none());
    }
}

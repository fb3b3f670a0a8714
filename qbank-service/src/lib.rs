pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Environment, QbankConfig, SwaggerMode};
use crate::services::{CompanyService, Database, IdentityProvider, InvitationService};
use service_core::error::AppError;
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::company::register_company,
        handlers::company::get_profile,
        handlers::invitation::create_invitation,
        handlers::invitation::verify_invitation,
        handlers::invitation::accept_invitation,
        handlers::dashboard::admin_dashboard,
        handlers::dashboard::evaluator_dashboard,
        handlers::dashboard::shared_dashboard,
    ),
    components(schemas(
        dtos::ErrorResponse,
        handlers::company::RegisterCompanyRequest,
        handlers::company::RegisterCompanyResponse,
        handlers::company::ProfileResponse,
        handlers::company::ProfileUser,
        handlers::invitation::CreateInvitationRequest,
        handlers::invitation::CreateInvitationResponse,
        handlers::invitation::VerifyInvitationResponse,
        handlers::invitation::AcceptInvitationRequest,
        handlers::invitation::AcceptInvitationResponse,
        handlers::invitation::AcceptedUser,
        handlers::dashboard::DashboardResponse,
        models::Role,
        models::InviteRole,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Company", description = "Company registration and profiles"),
        (name = "Invitation", description = "Invitation lifecycle"),
        (name = "Dashboard", description = "Role-gated dashboards"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: QbankConfig,
    pub db: Database,
    pub identity: Arc<dyn IdentityProvider>,
    pub companies: CompanyService,
    pub invitations: InvitationService,
}

impl AppState {
    pub fn new(config: QbankConfig, db: Database, identity: Arc<dyn IdentityProvider>) -> Self {
        let companies = CompanyService::new(db.clone(), identity.clone());
        let invitations = InvitationService::new(db.clone(), identity.clone());
        Self {
            config,
            db,
            identity,
            companies,
            invitations,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Role-gated route groups. Within each group the chain runs
    // auth -> claims augmentation -> policy -> handler.
    let admin_routes = Router::new()
        .route("/admin/dashboard", get(handlers::dashboard::admin_dashboard))
        .layer(from_fn(middleware::policy::admin_only));

    let evaluator_routes = Router::new()
        .route(
            "/evaluator/dashboard",
            get(handlers::dashboard::evaluator_dashboard),
        )
        .route(
            "/invitation/create",
            post(handlers::invitation::create_invitation),
        )
        .layer(from_fn(middleware::policy::evaluator_or_admin));

    let shared_routes = Router::new()
        .route(
            "/shared/dashboard",
            get(handlers::dashboard::shared_dashboard),
        )
        .layer(from_fn(middleware::policy::any_role));

    let authenticated = Router::new()
        .route("/company/profile", get(handlers::company::get_profile))
        .merge(admin_routes)
        .merge(evaluator_routes)
        .merge(shared_routes)
        .layer(from_fn(middleware::claims::claims_augmentation_middleware))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let mut app = Router::new().route("/health", get(health_check));

    let swagger_enabled = match state.config.environment {
        Environment::Dev => true,
        Environment::Prod => state.config.swagger.enabled == SwaggerMode::Public,
    };

    if swagger_enabled {
        app = app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        // Keep the OpenAPI JSON available for programmatic access
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    app.route(
        "/company/register",
        post(handlers::company::register_company),
    )
    .route(
        "/invitation/verify/:token",
        get(handlers::invitation::verify_invitation),
    )
    .route(
        "/invitation/accept",
        post(handlers::invitation::accept_invitation),
    )
    .merge(authenticated)
    .with_state(state.clone())
    .layer(
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");

            tracing::info_span!(
                "http_request",
                request_id = %request_id,
                method = %request.method(),
                uri = %request.uri(),
            )
        }),
    )
    .layer(from_fn(request_id_middleware))
    .layer(from_fn(security_headers_middleware))
    .layer(cors_layer(&state.config))
}

fn cors_layer(config: &QbankConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(
            config
                .security
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<axum::http::HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .allow_credentials(true)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Database unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.health_check().await?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": {
            "postgres": "up"
        }
    })))
}

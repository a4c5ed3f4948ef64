//! OpenAPI document for the REST endpoints

use crate::auth::{AuthResponse, CredentialsRequest, TokenResponse, UserInfo};
use crate::error::ApiError;
use crate::handlers::chirps::{ChirpRequest, ChirpResponse, ValidateChirpResponse};
use crate::handlers::webhooks::{PolkaWebhook, PolkaWebhookData};
use crate::handlers::{admin, auth, chirps, health, users, webhooks};
use axum::Json;
use utoipa::openapi::security::{
    ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme,
};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(title = "Chirpy API", description = "Short posts with password, access token and refresh token authentication"),
    paths(
        health::healthz,
        users::create_user_handler,
        users::update_user_handler,
        auth::login_handler,
        auth::refresh_handler,
        auth::revoke_handler,
        chirps::validate_chirp_handler,
        chirps::create_chirp_handler,
        chirps::list_chirps_handler,
        chirps::get_chirp_handler,
        chirps::delete_chirp_handler,
        webhooks::polka_webhook_handler,
        admin::metrics_handler,
        admin::reset_handler,
    ),
    components(schemas(
        CredentialsRequest,
        UserInfo,
        AuthResponse,
        TokenResponse,
        ChirpRequest,
        ChirpResponse,
        ValidateChirpResponse,
        PolkaWebhook,
        PolkaWebhookData,
        ApiError,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "users", description = "User accounts"),
        (name = "auth", description = "Login and token lifecycle"),
        (name = "chirps", description = "Posting and reading chirps"),
        (name = "webhooks", description = "Payment provider callbacks"),
        (name = "admin", description = "Operator endpoints"),
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
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "Authorization",
                    "ApiKey <key>",
                ))),
            );
        }
    }
}

/// Serve the generated document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

//! HTTP front door.
//!
//! Small router over the core clients: health, installation-token issuance,
//! installation listing, and the OAuth endpoints. Caller input is validated
//! before any upstream call; every failure becomes the `{error}` envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{RelayError, Result};
use crate::github::{self, InstallationSummary};
use crate::oauth::OAuthExchangeResult;
use crate::state::AppState;

/// Build the relay router.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/github/installation-token", post(installation_token))
        .route("/api/github/installations", get(list_installations))
        .route("/oauth/client-id", get(oauth_client_id))
        .route("/oauth/exchange", post(oauth_exchange))
        .route("/oauth/me", get(oauth_me))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS policy: explicit allow-list when `ALLOWED_ORIGINS` is configured
/// (persistent server), any origin otherwise (edge). Preflight OPTIONS
/// requests are answered by the layer with headers only.
pub fn cors_layer(allowed_origins: Option<&[String]>) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match allowed_origins {
        Some(origins) => {
            let values = origins
                .iter()
                .map(|origin| {
                    HeaderValue::from_str(origin).map_err(|_| {
                        RelayError::Config(format!(
                            "invalid origin in ALLOWED_ORIGINS: \"{origin}\""
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(layer.allow_origin(AllowOrigin::list(values)))
        }
        None => Ok(layer.allow_origin(Any)),
    }
}

/// Liveness probe; succeeds regardless of configuration state.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}

#[derive(Debug, Deserialize)]
struct InstallationTokenRequest {
    // Number or numeric string; validated in github::parse_installation_id.
    #[serde(rename = "installationId")]
    installation_id: Option<Value>,
}

#[derive(Debug, Serialize)]
struct InstallationTokenReply {
    token: String,
    #[serde(rename = "expiresAt")]
    expires_at: String,
}

async fn installation_token(
    State(app): State<AppState>,
    payload: std::result::Result<Json<InstallationTokenRequest>, JsonRejection>,
) -> Result<Json<InstallationTokenReply>> {
    let Json(request) = payload.map_err(bad_body)?;
    let installation_id = github::parse_installation_id(request.installation_id.as_ref())?;

    let context = app.context()?;
    let access = context.github.fetch_installation_token(installation_id).await?;
    info!(installation_id, "issued installation access token");

    Ok(Json(InstallationTokenReply {
        token: access.token,
        expires_at: access
            .expires_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

#[derive(Serialize)]
struct InstallationsReply {
    installations: Vec<InstallationSummary>,
}

async fn list_installations(State(app): State<AppState>) -> Result<Json<InstallationsReply>> {
    let context = app.context()?;
    let installations = context.github.list_installations().await?;
    Ok(Json(InstallationsReply { installations }))
}

async fn oauth_client_id(State(app): State<AppState>) -> Result<Json<Value>> {
    let context = app.context()?;
    let client_id = context.oauth.client_id()?;
    Ok(Json(json!({ "client_id": client_id })))
}

#[derive(Debug, Deserialize)]
struct ExchangeRequestBody {
    code: Option<String>,
    // `state` is verified by the mobile client and ignored here; unknown
    // fields are dropped by serde.
    code_verifier: Option<String>,
}

async fn oauth_exchange(
    State(app): State<AppState>,
    payload: std::result::Result<Json<ExchangeRequestBody>, JsonRejection>,
) -> Result<Json<OAuthExchangeResult>> {
    let Json(request) = payload.map_err(bad_body)?;
    let code = request
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or_else(|| RelayError::Validation("authorization code is required".into()))?;

    let context = app.context()?;
    let result = context
        .oauth
        .exchange_code(code, request.code_verifier.as_deref())
        .await?;
    info!("exchanged authorization code for access token");

    Ok(Json(result))
}

async fn oauth_me(State(app): State<AppState>, headers: HeaderMap) -> Result<Json<Value>> {
    let token = bearer_token(&headers)?;
    let context = app.context()?;

    // Upstream rejection of the token is the caller's 401, not our 500.
    let profile = context
        .oauth
        .fetch_user_info(token)
        .await
        .map_err(|err| match err {
            RelayError::Upstream { status, body } => RelayError::Unauthorized(format!(
                "GitHub rejected the access token ({status}): {body}"
            )),
            other => other,
        })?;

    Ok(Json(profile))
}

fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            RelayError::Unauthorized("Authorization header with a bearer token is required".into())
        })
}

fn bad_body(rejection: JsonRejection) -> RelayError {
    RelayError::Validation(format!("invalid request body: {rejection}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        let headers = headers_with("Bearer gho_sometoken");
        assert_eq!(bearer_token(&headers).unwrap(), "gho_sometoken");
    }

    #[test]
    fn rejects_missing_or_malformed_authorization() {
        assert!(bearer_token(&HeaderMap::new()).is_err());
        assert!(bearer_token(&headers_with("Basic dXNlcg==")).is_err());
        assert!(bearer_token(&headers_with("Bearer ")).is_err());
        assert!(bearer_token(&headers_with("Bearer    ")).is_err());
    }

    #[test]
    fn cors_layer_rejects_unparsable_origins() {
        let origins = vec!["https://ok.example".to_string(), "bad\norigin".to_string()];
        let err = cors_layer(Some(&origins[..])).unwrap_err();
        assert!(err.to_string().contains("ALLOWED_ORIGINS"));
    }

    #[test]
    fn cors_layer_accepts_origin_lists() {
        let origins = vec!["https://app.example".to_string()];
        assert!(cors_layer(Some(&origins[..])).is_ok());
        assert!(cors_layer(None).is_ok());
    }
}

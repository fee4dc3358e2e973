//! OAuth code-exchange client.
//!
//! Forwards an authorization code (plus optional PKCE verifier) to GitHub's
//! token endpoint and relays the result. The redirect URI is always the
//! configured value, never caller-supplied.

use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::github::upstream_error;

const RELAY_USER_AGENT: &str = "GitHub-Projects-Mobile-App/1.0";

/// Result of a successful code exchange, relayed as-is to the caller.
#[derive(Debug, Serialize)]
pub struct OAuthExchangeResult {
    pub access_token: String,
    pub token_type: String,
    pub scope: String,
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
}

// GitHub's token endpoint reports failures as a 200 response carrying
// `{error, error_description}`, so both shapes are decoded from one body.
#[derive(Deserialize)]
struct ExchangeResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Client for GitHub's OAuth token endpoint.
pub struct OAuthClient {
    http: reqwest::Client,
    api_base: String,
    oauth_base: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: String,
}

impl OAuthClient {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            http,
            api_base: config.github_api_base.clone(),
            oauth_base: config.github_oauth_base.clone(),
            client_id: config.oauth_client_id.clone(),
            client_secret: config.oauth_client_secret.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
        }
    }

    /// The public client id the mobile client embeds in its authorize URL.
    pub fn client_id(&self) -> Result<&str> {
        self.client_id.as_deref().ok_or_else(|| {
            RelayError::Config("OAUTH_CLIENT_ID is not set; OAuth endpoints are disabled".into())
        })
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(RelayError::Config(
                "OAuth is not configured; set OAUTH_CLIENT_ID and OAUTH_CLIENT_SECRET".into(),
            )),
        }
    }

    /// Exchange an authorization code for an access token.
    ///
    /// Re-submitting a code is not idempotent on GitHub's side, so callers
    /// must not double-submit; this client performs no retry.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<OAuthExchangeResult> {
        let (client_id, client_secret) = self.credentials()?;
        let url = format!("{}/login/oauth/access_token", self.oauth_base);
        debug!(pkce = code_verifier.is_some(), "exchanging authorization code");

        let request = ExchangeRequest {
            client_id,
            client_secret,
            code,
            redirect_uri: &self.redirect_uri,
            code_verifier,
        };

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, RELAY_USER_AGENT)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let body: ExchangeResponse = response.json().await?;

        if let Some(code) = body.error {
            return Err(RelayError::OAuth {
                code,
                description: body.error_description.unwrap_or_default(),
            });
        }

        let access_token = body.access_token.ok_or(RelayError::Upstream {
            status: 200,
            body: "token endpoint returned neither access_token nor error".into(),
        })?;

        Ok(OAuthExchangeResult {
            access_token,
            token_type: body.token_type.unwrap_or_else(|| "bearer".to_string()),
            scope: body.scope.unwrap_or_default(),
        })
    }

    /// Fetch the authenticated user's profile. Diagnostic operation for
    /// verifying an access token end to end.
    pub async fn fetch_user_info(&self, access_token: &str) -> Result<Value> {
        let url = format!("{}/user", self.api_base);

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {access_token}"))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, RELAY_USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        Ok(response.json().await?)
    }
}

//! GitHub App API client.
//!
//! Authenticates as the App with a freshly signed JWT and talks to the two
//! App-level endpoints the mobile client needs: creating installation access
//! tokens and listing installations. Every call is a single request/response
//! with a bounded timeout and no retry.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::EncodingKey;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::{jwt, redact};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const RELAY_USER_AGENT: &str = "GitHub-Projects-Mobile-App/1.0";

/// Fallback token lifetime when GitHub omits `expires_at`.
const FALLBACK_TOKEN_TTL_SECS: i64 = 3600;

/// A scoped, time-limited credential for one installation.
///
/// Not stored anywhere; the caller owns its lifecycle.
#[derive(Debug, Clone)]
pub struct InstallationAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// One installation of the App, relayed from GitHub with unknown fields
/// passed through untouched.
#[derive(Debug, Serialize, Deserialize)]
pub struct InstallationSummary {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<InstallationAccount>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstallationAccount {
    pub login: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct InstallationTokenResponse {
    token: String,
    expires_at: Option<String>,
}

/// Client for App-authenticated GitHub REST calls.
pub struct GitHubAppClient {
    http: reqwest::Client,
    api_base: String,
    app_id: u64,
    signing_key: EncodingKey,
}

impl GitHubAppClient {
    pub fn new(config: &Config, http: reqwest::Client) -> Result<Self> {
        let signing_key = jwt::encoding_key_from_pem(&config.private_key_pem)?;
        Ok(Self {
            http,
            api_base: config.github_api_base.clone(),
            app_id: config.app_id,
            signing_key,
        })
    }

    fn fresh_bearer(&self) -> Result<String> {
        let token = jwt::sign_app_jwt(self.app_id, &self.signing_key, jwt::unix_now()?)?;
        Ok(format!("Bearer {token}"))
    }

    /// Create an installation access token.
    ///
    /// Returns the upstream-supplied expiry when present, otherwise a
    /// caller-computed fallback of one hour.
    pub async fn fetch_installation_token(
        &self,
        installation_id: u64,
    ) -> Result<InstallationAccessToken> {
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_base, installation_id
        );
        debug!(installation_id, "requesting installation access token");

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.fresh_bearer()?)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, RELAY_USER_AGENT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let body: InstallationTokenResponse = response.json().await?;
        let expires_at = body
            .expires_at
            .as_deref()
            .and_then(parse_expiry)
            .unwrap_or_else(|| Utc::now() + Duration::seconds(FALLBACK_TOKEN_TTL_SECS));

        Ok(InstallationAccessToken {
            token: body.token,
            expires_at,
        })
    }

    /// List every installation of the App.
    pub async fn list_installations(&self) -> Result<Vec<InstallationSummary>> {
        let url = format!("{}/app/installations", self.api_base);
        debug!("listing App installations");

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, self.fresh_bearer()?)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, RELAY_USER_AGENT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        Ok(response.json().await?)
    }
}

/// Validate the caller-supplied installation id before any network call.
///
/// The mobile client sends either a JSON number or a numeric string; both are
/// accepted, everything else (missing, empty, non-numeric, zero, negative,
/// fractional) is rejected.
pub fn parse_installation_id(raw: Option<&Value>) -> Result<u64> {
    let raw = raw.ok_or_else(|| RelayError::Validation("installationId is required".into()))?;

    let text = match raw {
        Value::Number(n) => {
            return match n.as_u64() {
                Some(id) if id > 0 => Ok(id),
                _ => Err(RelayError::Validation(
                    "installationId must be a positive integer".into(),
                )),
            };
        }
        Value::String(s) => s.trim(),
        _ => {
            return Err(RelayError::Validation(
                "installationId must be a positive integer".into(),
            ))
        }
    };

    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RelayError::Validation(
            "installationId must be a positive integer".into(),
        ));
    }

    match text.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(RelayError::Validation(
            "installationId must be a positive integer".into(),
        )),
    }
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Turn a non-2xx upstream response into an error with a sanitized body.
pub(crate) async fn upstream_error(response: reqwest::Response) -> RelayError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    RelayError::Upstream {
        status,
        body: redact::mask_secrets(&body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<u64> {
        parse_installation_id(Some(&value))
    }

    #[test]
    fn accepts_numeric_and_string_ids() {
        assert_eq!(parse(json!(12345)).unwrap(), 12345);
        assert_eq!(parse(json!("12345")).unwrap(), 12345);
        assert_eq!(parse(json!(" 42 ")).unwrap(), 42);
    }

    #[test]
    fn rejects_missing_and_empty_ids() {
        assert!(parse_installation_id(None).is_err());
        assert!(parse(json!("")).is_err());
        assert!(parse(json!("   ")).is_err());
    }

    #[test]
    fn rejects_non_positive_and_non_integer_ids() {
        assert!(parse(json!(0)).is_err());
        assert!(parse(json!(-3)).is_err());
        assert!(parse(json!(1.5)).is_err());
        assert!(parse(json!("0")).is_err());
        assert!(parse(json!("-3")).is_err());
        assert!(parse(json!("1.5")).is_err());
        assert!(parse(json!("abc")).is_err());
        assert!(parse(json!(true)).is_err());
        assert!(parse(json!(["12345"])).is_err());
    }

    #[test]
    fn rejects_overflowing_ids() {
        assert!(parse(json!("99999999999999999999999999")).is_err());
    }

    #[test]
    fn parses_rfc3339_expiry() {
        let dt = parse_expiry("2030-01-01T00:00:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2030-01-01T00:00:00+00:00");
        assert!(parse_expiry("not-a-date").is_none());
    }

    #[test]
    fn installation_summary_relays_unknown_fields() {
        let raw = json!({
            "id": 7,
            "app_id": 2587071,
            "account": { "login": "octo-org", "type": "Organization", "node_id": "x" },
            "repository_selection": "all"
        });
        let summary: InstallationSummary = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(summary.id, 7);
        assert_eq!(summary.account.as_ref().unwrap().login, "octo-org");

        let back = serde_json::to_value(&summary).unwrap();
        assert_eq!(back["repository_selection"], "all");
        assert_eq!(back["account"]["node_id"], "x");
    }
}

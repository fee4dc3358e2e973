//! Shared application state for the two hosting adapters.
//!
//! The persistent server validates configuration once at startup and carries
//! an immutable context for its whole lifetime. The edge adapter owns no
//! process-level state: a fresh context is built from the environment per
//! invocation, so configuration problems surface as per-request errors.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::github::GitHubAppClient;
use crate::oauth::OAuthClient;

/// Immutable per-context bundle: configuration plus the upstream clients.
pub struct RelayContext {
    pub config: Config,
    pub github: GitHubAppClient,
    pub oauth: OAuthClient,
}

impl RelayContext {
    /// Build the context from an already-constructed configuration.
    ///
    /// One HTTP client with a bounded timeout is shared by both upstream
    /// clients; every call is a single request/response with no retry.
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.upstream_timeout)
            .build()?;

        let github = GitHubAppClient::new(&config, http.clone())?;
        let oauth = OAuthClient::new(&config, http);

        Ok(Self {
            config,
            github,
            oauth,
        })
    }

    /// Persistent-server construction: key material may come from a file.
    pub fn from_process_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    /// Edge construction: environment-only key material.
    pub fn from_edge_env() -> Result<Self> {
        Self::new(Config::from_env_only()?)
    }
}

/// Router state: either a startup-validated context or per-request rebuild.
#[derive(Clone)]
pub enum AppState {
    Startup(Arc<RelayContext>),
    PerRequest,
}

impl AppState {
    pub fn startup(context: RelayContext) -> Self {
        AppState::Startup(Arc::new(context))
    }

    pub fn per_request() -> Self {
        AppState::PerRequest
    }

    /// Resolve the context for the current request.
    ///
    /// In [`AppState::PerRequest`] mode a configuration error here becomes a
    /// 500 for this request only, mirroring the edge hosting model.
    pub fn context(&self) -> Result<Arc<RelayContext>> {
        match self {
            AppState::Startup(context) => Ok(context.clone()),
            AppState::PerRequest => RelayContext::from_edge_env().map(Arc::new),
        }
    }
}

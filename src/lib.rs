//! GitHub App Backend Relay
//!
//! Exchanges short-lived credentials with the GitHub REST/OAuth API on behalf
//! of a mobile client. The GitHub App flow (RS256-signed JWT → installation
//! access token) and the OAuth code exchange both require a confidential
//! secret that cannot live on-device, so this crate relays them.
//!
//! ## Binaries
//!
//! - `relay-server`: persistent process; configuration is validated once at
//!   startup and the private key may be loaded from a file.
//! - `relay-edge`: stateless variant; key material comes from the environment
//!   only and configuration problems surface as per-request errors.
//!
//! Both binaries are thin adapters over the same core: [`jwt`] signs the App
//! JWT, [`github`] and [`oauth`] talk to the upstream API, and [`routes`]
//! frames everything as HTTP.

pub mod config;
pub mod error;
pub mod github;
pub mod jwt;
pub mod oauth;
pub mod redact;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::RelayError;
pub use state::{AppState, RelayContext};

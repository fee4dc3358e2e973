//! Secret masking for log output and error bodies.
//!
//! GitHub issues `gho_`/`ghu_`/`ghr_`/`ghs_`/`ghp_` prefixed tokens and
//! 40-hex authorization codes; none of them may reach a log line or an error
//! envelope intact.

use regex::Regex;
use std::sync::OnceLock;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"gh[ousrp]_[A-Za-z0-9_]+").expect("valid token pattern"))
}

fn code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-f0-9]{40}\b").expect("valid code pattern"))
}

fn secret_field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#""(access_token|client_secret|code)"\s*:\s*"[^"]*""#)
            .expect("valid field pattern")
    })
}

/// Mask GitHub tokens, authorization codes and sensitive JSON fields.
///
/// Token prefixes survive so operators can still tell which kind of
/// credential leaked into an upstream error body.
pub fn mask_secrets(input: &str) -> String {
    let masked = token_re().replace_all(input, |caps: &regex::Captures<'_>| {
        format!("{}***", &caps[0][..4])
    });
    let masked = code_re().replace_all(&masked, "***");
    secret_field_re()
        .replace_all(&masked, r#""$1":"***""#)
        .into_owned()
}

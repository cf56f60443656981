//! Failure classification and provider wait-hint extraction.

use crate::errors::GenerateError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

/// Recoverable failure classes the retry controller distinguishes.
///
/// `Auth` and `Cancelled` never reach classification: auth failures are
/// fatal for the run and cancellation is a terminal user stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Provider throttling; wait-then-retry with backoff.
    RateLimited,
    /// Connectivity or timeout; a short wait then retry usually works.
    Network,
    /// Anything else, including malformed module output (a retry may
    /// still produce well-formed text).
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Network => write!(f, "network"),
            Self::Other => write!(f, "other"),
        }
    }
}

fn rate_limit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"(?i)\b429\b|rate.?limit|too many requests|quota").unwrap()
    })
}

fn network_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"(?i)time.?out|timed out|connection|network|unreachable|dns|reset").unwrap()
    })
}

fn wait_hint_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"(?i)(?:retry.?after|try again in|wait)\D{0,5}(\d+)\s*(ms|milliseconds?|s|sec|seconds?|m|min|minutes?)?").unwrap()
    })
}

/// Classifies a generation failure.
///
/// Typed variants are trusted first; for untyped errors the message is
/// sniffed, since providers often tunnel 429s and socket errors through
/// generic failure strings.
#[must_use]
pub fn classify(error: &GenerateError) -> FailureKind {
    match error {
        GenerateError::RateLimited { .. } => FailureKind::RateLimited,
        GenerateError::Network(_) => FailureKind::Network,
        GenerateError::Auth(message) | GenerateError::MalformedResponse(message)
        | GenerateError::Cancelled(message) => {
            if rate_limit_regex().is_match(message) {
                FailureKind::RateLimited
            } else if network_regex().is_match(message) {
                FailureKind::Network
            } else {
                FailureKind::Other
            }
        }
    }
}

/// Extracts a provider-suggested wait from error text.
///
/// Recognizes forms like "retry after 20s", "Retry-After: 30",
/// "try again in 2 minutes". Bare numbers are read as seconds.
#[must_use]
pub fn suggested_wait(message: &str) -> Option<Duration> {
    let captures = wait_hint_regex().captures(message)?;
    let value: u64 = captures.get(1)?.as_str().parse().ok()?;
    let unit = captures.get(2).map_or("s", |m| m.as_str());
    let duration = match unit.to_ascii_lowercase().as_str() {
        "ms" | "millisecond" | "milliseconds" => Duration::from_millis(value),
        "m" | "min" | "minute" | "minutes" => Duration::from_secs(value * 60),
        _ => Duration::from_secs(value),
    };
    Some(duration)
}

/// Pulls the best available wait hint out of an error.
#[must_use]
pub fn wait_hint(error: &GenerateError) -> Option<Duration> {
    match error {
        GenerateError::RateLimited {
            retry_after: Some(wait),
            ..
        } => Some(*wait),
        GenerateError::RateLimited { message, .. } => suggested_wait(message),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_typed_variants() {
        assert_eq!(
            classify(&GenerateError::rate_limited("slow down")),
            FailureKind::RateLimited
        );
        assert_eq!(
            classify(&GenerateError::Network("connection refused".to_string())),
            FailureKind::Network
        );
    }

    #[test]
    fn test_classify_sniffs_messages() {
        let err = GenerateError::MalformedResponse("HTTP 429 too many requests".to_string());
        assert_eq!(classify(&err), FailureKind::RateLimited);

        let err = GenerateError::MalformedResponse("upstream timed out".to_string());
        assert_eq!(classify(&err), FailureKind::Network);

        let err = GenerateError::MalformedResponse("expected JSON".to_string());
        assert_eq!(classify(&err), FailureKind::Other);
    }

    #[test]
    fn test_suggested_wait_seconds() {
        assert_eq!(suggested_wait("retry after 20s"), Some(Duration::from_secs(20)));
        assert_eq!(suggested_wait("Retry-After: 30"), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_suggested_wait_units() {
        assert_eq!(
            suggested_wait("try again in 2 minutes"),
            Some(Duration::from_secs(120))
        );
        assert_eq!(
            suggested_wait("wait 500 ms before retrying"),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_suggested_wait_absent() {
        assert_eq!(suggested_wait("something broke"), None);
    }

    #[test]
    fn test_wait_hint_prefers_typed_value() {
        let err = GenerateError::RateLimited {
            message: "retry after 99s".to_string(),
            retry_after: Some(Duration::from_secs(10)),
        };
        assert_eq!(wait_hint(&err), Some(Duration::from_secs(10)));

        let err = GenerateError::rate_limited("retry after 25s");
        assert_eq!(wait_hint(&err), Some(Duration::from_secs(25)));

        let err = GenerateError::Network("reset".to_string());
        assert_eq!(wait_hint(&err), None);
    }
}

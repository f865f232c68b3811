//! Structured logging initialisation for the miner node.
//!
//! Two output formats are supported:
//! - [`LogFormat::Human`]: coloured, human-readable lines (operators at a console).
//! - [`LogFormat::Json`]: newline-delimited JSON (log shipping).
//!
//! The filter level can be overridden at runtime via the `RUST_LOG`
//! environment variable. Challenge diagnostics use the targets
//! [`IDLE_CHALLENGE_TARGET`] and [`SERVICE_CHALLENGE_TARGET`], so a filter
//! such as `"warn,strata::idle_challenge=debug"` isolates one proof kind.

use std::str::FromStr;

use strata_types::ProofKind;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::NodeError;

/// Log target for idle-proof challenge diagnostics.
pub const IDLE_CHALLENGE_TARGET: &str = "strata::idle_challenge";
/// Log target for service-proof challenge diagnostics.
pub const SERVICE_CHALLENGE_TARGET: &str = "strata::service_challenge";

/// Selects the output format for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}

impl FromStr for LogFormat {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(NodeError::Config(format!("unknown log format: {other}"))),
        }
    }
}

/// Emit a challenge diagnostic under the target of its proof kind.
pub fn challenge_error(kind: ProofKind, query: &str, error: &dyn std::fmt::Display) {
    match kind {
        ProofKind::Idle => {
            tracing::error!(target: IDLE_CHALLENGE_TARGET, query, error = %error, "challenge query failed")
        }
        ProofKind::Service => {
            tracing::error!(target: SERVICE_CHALLENGE_TARGET, query, error = %error, "challenge query failed")
        }
    }
}

/// Emit a failed challenge job under the target of its proof kind.
pub fn challenge_job_error(kind: ProofKind, job: &str, error: &dyn std::fmt::Display) {
    match kind {
        ProofKind::Idle => {
            tracing::error!(target: IDLE_CHALLENGE_TARGET, job, error = %error, "challenge job failed")
        }
        ProofKind::Service => {
            tracing::error!(target: SERVICE_CHALLENGE_TARGET, job, error = %error, "challenge job failed")
        }
    }
}

/// Initialise the global tracing subscriber.
///
/// # Panics
///
/// Panics if a global subscriber has already been set (i.e. this function
/// was called twice in the same process).
pub fn init_logging(format: LogFormat, level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Human => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_thread_ids(true))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(true).with_thread_ids(true))
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!("human".parse::<LogFormat>().unwrap(), LogFormat::Human);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn targets_match_constants() {
        assert!(IDLE_CHALLENGE_TARGET.ends_with(ProofKind::Idle.as_str()));
        assert!(SERVICE_CHALLENGE_TARGET.ends_with(ProofKind::Service.as_str()));
    }
}

//! Pre-built [`tracing::Span`] constructors for the miner's recurring work.
//!
//! Consistent span names make it easy to follow one tick or one job
//! through interleaved log output.

use strata_types::BlockHeight;
use tracing::{info_span, Span};

use crate::slot::TaskKind;

/// Span covering one challenge tick.
pub fn challenge_tick_span(tick: u64) -> Span {
    info_span!("challenge_tick", tick = tick)
}

/// Span covering a dispatched job for its whole lifetime.
pub fn job_span(kind: TaskKind) -> Span {
    info_span!("job", kind = %kind)
}

/// Span covering a proof or verify-result job bound to a deadline.
pub fn deadline_job_span(kind: TaskKind, height: BlockHeight, deadline: BlockHeight) -> Span {
    info_span!("job", kind = %kind, height = %height, deadline = %deadline)
}

/// Span covering the bootstrap key fetch.
pub fn bootstrap_span() -> Span {
    info_span!("bootstrap")
}

/// Span covering one run of the discovery job.
pub fn discovery_span() -> Span {
    info_span!("discovery")
}

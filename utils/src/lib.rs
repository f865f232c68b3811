//! Shared helpers for the Strata storage miner.

pub mod net;
pub mod time;

pub use net::{dedup_preserving_order, find_ipv4, is_intranet_ipv4, is_public_addr};
pub use time::{format_block_span, format_duration};

//! Human-readable spans for logs and operator messages.

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Render a number of blocks together with its approximate wall-clock span.
pub fn format_block_span(blocks: u32, block_interval_secs: u64) -> String {
    let secs = u64::from(blocks).saturating_mul(block_interval_secs);
    format!("{blocks} blocks (~{})", format_duration(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_magnitude() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7260), "2h 1m");
        assert_eq!(format_duration(90_000), "1d 1h");
    }

    #[test]
    fn block_span_uses_interval() {
        assert_eq!(format_block_span(10, 6), "10 blocks (~1m 0s)");
    }
}

use chrono::Utc;

/// RFC3339 timestamp in UTC (for stats and logs).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

use reqwest::header::HeaderMap;

use crate::consts::RATE_LIMIT_RESET_HEADER;

/// Read the rate limit window reset (epoch seconds) from response headers.
pub fn rate_limit_reset(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(RATE_LIMIT_RESET_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
}

pub fn join_fields(fields: &[&str]) -> String {
    fields.join(",")
}

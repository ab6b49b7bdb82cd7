//! Shared utility functions used across the codebase.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Placeholder shown in forms in place of a stored secret.
pub const SECRET_MASK: &str = "••••••••••••••••";

/// Show the first eight characters of a secret followed by `...`.
pub fn mask_secret(secret: &str) -> String {
    let prefix: String = secret.chars().take(8).collect();
    format!("{}...", prefix)
}

/// RFC 3339 timestamp for the current instant.
pub fn now_string() -> String {
    Utc::now().to_rfc3339()
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Short lowercase alphanumeric suffix for locally minted ids.
pub fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect()
}

/// Treat empty and whitespace-only strings as absent.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

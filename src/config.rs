//! API key resolution
//!
//! The key comes from the environment (or the `--api-key` flag) and is
//! overridden by a `VITE_AISSTREAM_API_KEY=<key>` line in a local env file,
//! the same file the front-end build reads.

use std::path::Path;

use crate::error::{Error, Result};

/// Environment variable (and env-file prefix) holding the feed API key
pub const API_KEY_VAR: &str = "VITE_AISSTREAM_API_KEY";

/// Environment variable holding the listening port
pub const PORT_VAR: &str = "AIS_PROXY_PORT";

/// Find the API key line in env-file contents
pub fn api_key_from_env_file(contents: &str) -> Option<String> {
    contents
        .lines()
        .find_map(|line| line.strip_prefix(API_KEY_VAR)?.strip_prefix('='))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Resolve the API key: env file first, then the given fallback.
///
/// A missing or unreadable env file is not an error. Fails only when neither
/// source yields a non-empty key.
pub fn resolve_api_key(fallback: Option<&str>, env_file: &Path) -> Result<String> {
    match std::fs::read_to_string(env_file) {
        Ok(contents) => {
            if let Some(key) = api_key_from_env_file(&contents) {
                tracing::debug!(file = %env_file.display(), "API key taken from env file");
                return Ok(key);
            }
        }
        Err(e) => {
            tracing::debug!(file = %env_file.display(), error = %e, "Env file not read");
        }
    }

    fallback
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Config(format!(
                "no API key: set {} or add it to {}",
                API_KEY_VAR,
                env_file.display()
            ))
        })
}

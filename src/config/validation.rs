//! Configuration validation logic.

use super::ClientConfig;
use crate::core::capture::{MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::core::live::Endpoint;

/// Hosted endpoints reject unauthenticated connections.
pub(crate) fn validate_credentials(
    endpoint: &Endpoint,
    access_token: Option<&str>,
) -> Result<(), String> {
    if matches!(endpoint, Endpoint::Custom(_)) {
        return Ok(());
    }
    match access_token {
        Some(token) if !token.trim().is_empty() => Ok(()),
        _ => Err(format!(
            "An access token is required for the {endpoint} endpoint (set LIVE_ACCESS_TOKEN)"
        )),
    }
}

pub(crate) fn validate_capture_block_size(block_size: usize) -> Result<(), String> {
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
        return Err(format!(
            "Capture block size {block_size} is outside {MIN_BLOCK_SIZE}..={MAX_BLOCK_SIZE}"
        ));
    }
    Ok(())
}

pub(crate) fn validate_timeouts(connect: u64, setup: u64) -> Result<(), String> {
    if connect == 0 || setup == 0 {
        return Err("Connect and setup timeouts must be at least one second".to_string());
    }
    Ok(())
}

/// Validate the merged configuration.
pub(crate) fn validate_config(config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = config.endpoint()?;
    validate_credentials(&endpoint, config.access_token.as_deref())?;
    validate_capture_block_size(config.capture_block_size)?;
    validate_timeouts(config.connect_timeout_seconds, config.setup_timeout_seconds)?;
    config.to_session_config()?.validate()?;
    Ok(())
}

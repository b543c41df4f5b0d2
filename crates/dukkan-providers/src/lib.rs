//! # dukkan-providers
//!
//! Language-model port adapters. Every backend implements
//! [`dukkan_core::traits::Provider`]; persona sampling parameters arrive
//! through the request context.

pub mod anthropic;
pub mod groq;

use dukkan_core::error::DukkanError;
use reqwest::StatusCode;

/// Map a reqwest error to the port's failure kinds.
pub(crate) fn classify_request_error(provider: &str, e: &reqwest::Error) -> DukkanError {
    if e.is_timeout() {
        DukkanError::Timeout(format!("{provider} request timed out"))
    } else {
        DukkanError::Transport(format!("{provider} request failed: {e}"))
    }
}

/// Map a non-success HTTP status to the port's failure kinds.
pub(crate) fn classify_status(provider: &str, status: StatusCode, body: &str) -> DukkanError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        DukkanError::Quota(format!("{provider} returned 429: {body}"))
    } else if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        DukkanError::Timeout(format!("{provider} returned {status}"))
    } else {
        DukkanError::Transport(format!("{provider} returned {status}: {body}"))
    }
}

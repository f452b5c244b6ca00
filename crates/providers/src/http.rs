//! Status handling shared by the HTTP-backed providers.

use reqwest::{Response, StatusCode, header::RETRY_AFTER};
use rxpilot_core::error::ProviderError;
use tracing::warn;

const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Pass a successful response through; map anything else to a [`ProviderError`].
pub(crate) async fn check_status(provider: &str, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            Err(ProviderError::RateLimited { retry_after_secs })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProviderError::AuthenticationFailed(
            format!("{provider} rejected the API key ({status})"),
        )),
        _ => {
            let body = response.text().await.unwrap_or_default();
            warn!(provider, status = status.as_u16(), body = %body, "Provider returned error");
            Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: body,
            })
        }
    }
}

/// Transport failures, stripped of the request URL.
pub(crate) fn network_error(e: reqwest::Error) -> ProviderError {
    ProviderError::Network(e.without_url().to_string())
}

/// Decode a JSON body, reporting malformed payloads as API errors.
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    provider: &str,
    response: Response,
) -> Result<T, ProviderError> {
    let status_code = response.status().as_u16();
    response.json().await.map_err(|e| ProviderError::ApiError {
        status_code,
        message: format!("Failed to parse {provider} response: {}", e.without_url()),
    })
}

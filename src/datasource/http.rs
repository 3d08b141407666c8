//! Shared JSON GET with retry, used by every HTTP-backed source.

use super::DataSourceError;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;

/// Total retry budget for one request.
pub const MAX_RETRY_ELAPSED: Duration = Duration::from_secs(30);

/// Hard limit on a single attempt, connect to last body byte.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client shared by one source. Every request it sends is bounded by `timeout`.
pub fn build_client(timeout: Duration) -> Result<Client, DataSourceError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DataSourceError::Other(format!("cannot build HTTP client: {}", e)))
}

/// A timed-out attempt is not retried: the caller already waited the full
/// request timeout once.
fn send_error(e: reqwest::Error) -> backoff::Error<DataSourceError> {
    if e.is_timeout() {
        backoff::Error::permanent(DataSourceError::NetworkError(format!("timed out: {}", e)))
    } else {
        backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
    }
}

/// GET `url` and decode the JSON body.
///
/// 429 and 5xx responses and network failures are retried with exponential
/// backoff; any other non-success status or a timeout fails immediately.
pub async fn get_json(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    query: &[(&str, String)],
) -> Result<serde_json::Value, DataSourceError> {
    let backoff = ExponentialBackoff {
        max_elapsed_time: Some(MAX_RETRY_ELAPSED),
        ..Default::default()
    };

    retry(backoff, || async {
        let mut request = client.get(url).query(query);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(send_error)?;

        let status = response.status();
        if status == 429 {
            return Err(backoff::Error::transient(DataSourceError::RateLimited));
        }
        if status.is_server_error() {
            return Err(backoff::Error::transient(DataSourceError::HttpError {
                status: status.as_u16(),
                message: "Server error".to_string(),
            }));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(backoff::Error::permanent(DataSourceError::HttpError {
                status: status.as_u16(),
                message,
            }));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    send_error(e)
                } else {
                    backoff::Error::permanent(DataSourceError::ParseError(e.to_string()))
                }
            })
    })
    .await
}

/// Decode a JSON value into `T`, mapping failures to `ParseError`.
pub fn decode<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> Result<T, DataSourceError> {
    serde_json::from_value(value)
        .map_err(|e| DataSourceError::ParseError(format!("invalid {}: {}", what, e)))
}

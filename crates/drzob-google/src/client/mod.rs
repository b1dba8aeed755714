//! HTTP clients for the Google REST APIs.

mod calendar;
mod people;

pub use calendar::GoogleCalendarClient;
pub use people::GooglePeopleClient;

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::{GoogleError, GoogleResult};

fn build_http_client(timeout: Duration) -> GoogleResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GoogleError::configuration("failed to create HTTP client").with_source(e))
}

/// Maps a transport failure of `call` to an operation error.
fn request_failed(call: &str, e: reqwest::Error) -> GoogleError {
    let message = if e.is_timeout() {
        format!("{} timed out", call)
    } else if e.is_connect() {
        format!("{} could not connect", call)
    } else {
        format!("{} request failed", call)
    };
    GoogleError::operation(message).with_source(e)
}

/// Checks the status of a response to `call` and decodes its JSON body.
async fn read_json<T: DeserializeOwned>(call: &str, response: reqwest::Response) -> GoogleResult<T> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GoogleError::authorization(format!(
            "{}: access token expired or invalid",
            call
        )));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GoogleError::operation(format!(
            "{} failed ({}): {}",
            call,
            status,
            body.trim()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| GoogleError::operation(format!("failed to read {} response", call)).with_source(e))?;

    serde_json::from_str(&body)
        .map_err(|e| GoogleError::operation(format!("failed to parse {} response", call)).with_source(e))
}

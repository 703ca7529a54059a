//! Firebase REST implementation of the backend seams.

mod auth;
mod firestore;
mod functions;
mod storage;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::BackendConfig;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";
const FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";
const STORAGE_URL: &str = "https://firebasestorage.googleapis.com/v0";

#[derive(Debug)]
pub struct Firebase {
    config: BackendConfig,
    client: Client,
}

impl Firebase {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    fn identity_url(&self, method: &str) -> String {
        format!("{}/accounts:{}?key={}", IDENTITY_TOOLKIT_URL, method, self.config.api_key)
    }

    fn secure_token_url(&self) -> String {
        format!("{}?key={}", SECURE_TOKEN_URL, self.config.api_key)
    }

    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            FIRESTORE_URL, self.config.project_id
        )
    }

    fn storage_objects_url(&self) -> String {
        format!("{}/b/{}/o", STORAGE_URL, self.config.storage_bucket)
    }

    fn function_url(&self, name: &str) -> String {
        format!(
            "https://{}-{}.cloudfunctions.net/{}",
            self.config.functions_region, self.config.project_id, name
        )
    }

    /// Sends a request and decodes a successful JSON body.
    fn send_json<T: DeserializeOwned>(&self, what: &str, request: RequestBuilder) -> Result<T> {
        let response = self.send(what, request)?;
        response
            .json()
            .with_context(|| format!("Failed to parse {} response", what))
    }

    /// Sends a request, turning non-2xx replies into errors carrying the
    /// server's message.
    fn send(&self, what: &str, request: RequestBuilder) -> Result<Response> {
        debug!(request = what, "sending");
        let response = request
            .send()
            .with_context(|| format!("Failed to send {} request", what))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "{} request failed with status {}: {}",
                what,
                status,
                api_error_message(&error_text)
            ));
        }
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Google APIs reply with `{"error": {"message": ...}}`; fall back to the raw
/// body for anything else.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.trim().to_string(),
    }
}

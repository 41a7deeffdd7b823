//! HTTP client for the card registry.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use cardkit_core::RawSignedModel;

use crate::client::{CardClient, GetCardResponse};
use crate::error::{ClientError, ErrorResponse, Result};

/// Public card registry.
pub const DEFAULT_SERVICE_URL: &str = "https://api.virgilsecurity.com";

/// Response header the registry sets on cards that have been replaced.
pub const SUPERSEDED_HEADER: &str = "x-virgil-is-superseeded";

const CARDS_PATH: &str = "/card/v5";

#[derive(Serialize)]
struct SearchRequest<'a> {
    identity: &'a str,
}

/// [`CardClient`] speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCardClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpCardClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Use a preconfigured `reqwest` client (timeouts, proxies, TLS roots).
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url.trim_end_matches('/'), CARDS_PATH, path)
    }

    async fn send(&self, request: RequestBuilder, token: &str) -> Result<Response> {
        let response = request
            .header(AUTHORIZATION, format!("Virgil {token}"))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let error = error_from_body(status, &body);
        tracing::debug!(status = status.as_u16(), code = error.code, "registry rejected request");
        Err(ClientError::Service(error))
    }
}

#[async_trait]
impl CardClient for HttpCardClient {
    async fn publish_card(&self, model: &RawSignedModel, token: &str) -> Result<RawSignedModel> {
        let url = self.endpoint("");
        tracing::debug!(%url, "publishing card");
        let response = self.send(self.http.post(&url).json(model), token).await?;
        decode(response).await
    }

    async fn get_card(&self, card_id: &str, token: &str) -> Result<GetCardResponse> {
        let url = self.endpoint(&format!("/{card_id}"));
        tracing::debug!(%url, "fetching card");
        let response = self.send(self.http.get(&url), token).await?;
        let is_outdated = is_superseded(response.headers());
        let model = decode(response).await?;
        Ok(GetCardResponse { model, is_outdated })
    }

    async fn search_cards(&self, identity: &str, token: &str) -> Result<Vec<RawSignedModel>> {
        let url = self.endpoint("/actions/search");
        tracing::debug!(%url, "searching cards");
        let request = self.http.post(&url).json(&SearchRequest { identity });
        let response = self.send(request, token).await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response
        .bytes()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| ClientError::Decoding(e.to_string()))
}

/// The registry's JSON error payload, or a synthetic one from the status line.
fn error_from_body(status: StatusCode, body: &str) -> ErrorResponse {
    if let Ok(error) = serde_json::from_str::<ErrorResponse>(body) {
        return error;
    }
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    } else {
        body.to_string()
    };
    ErrorResponse::new(u32::from(status.as_u16()), message)
}

fn is_superseded(headers: &HeaderMap) -> bool {
    headers
        .get(SUPERSEDED_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

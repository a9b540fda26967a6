//! Read-only client for the map API, used by the command-line player.

use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::config::MapConfig;
use crate::models::pinpoint::Pinpoint;

#[derive(Debug)]
pub enum ClientError {
    InvalidUrl(String),
    Http(reqwest::Error),
    /// The server answered with its JSON error envelope.
    Api { status: u16, code: String, message: String },
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::InvalidUrl(msg) => write!(f, "invalid server url: {msg}"),
            ClientError::Http(e) => write!(f, "request failed: {e}"),
            ClientError::Api {
                status,
                code,
                message,
            } => write!(f, "server returned {status} {code}: {message}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e)
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[derive(Clone)]
pub struct MapClient {
    http: reqwest::Client,
    base_url: Url,
}

impl MapClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn list_pinpoints(&self) -> Result<Vec<Pinpoint>, ClientError> {
        self.get("/api/pinpoints").await
    }

    pub async fn get_pinpoint(&self, pinpoint_id: i64) -> Result<Pinpoint, ClientError> {
        self.get(&format!("/api/pinpoints/{pinpoint_id}")).await
    }

    pub async fn get_config(&self) -> Result<MapConfig, ClientError> {
        self.get("/api/config").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(format!("{path}: {e}")))?;
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let (code, message) = match response.json::<ErrorEnvelope>().await {
                Ok(body) => (body.error.code, body.error.message),
                Err(_) => ("unknown".to_string(), status.to_string()),
            };
            return Err(ClientError::Api {
                status: status.as_u16(),
                code,
                message,
            });
        }

        Ok(response.json::<Envelope<T>>().await?.data)
    }
}

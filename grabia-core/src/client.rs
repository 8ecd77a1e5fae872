use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::manifest::ItemMetadata;

const DEFAULT_BASE_URL: &str = "https://archive.org";

pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(15);
pub const USER_AGENT: &str = "grab-IA/2.0 (Archive Mirroring Tool)";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry path segments: {0}")]
    CannotBeABase(Url),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

impl ArchiveError {
    /// Timeouts, connection failures and unreadable bodies, as opposed to an
    /// explicit non-success answer from the service.
    pub fn is_transport(&self) -> bool {
        matches!(self, ArchiveError::Request(_))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ArchiveError::Api { status, .. } => Some(*status),
            ArchiveError::Request(err) => err.status(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ArchiveClient {
    http: Client,
    base_url: Url,
}

impl ArchiveClient {
    pub fn new() -> Result<Self, ArchiveError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, ArchiveError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ArchiveError::CannotBeABase(base_url));
        }
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(CONNECTION_TIMEOUT)
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET {base}/metadata/{identifier}`.
    pub async fn get_metadata(&self, identifier: &str) -> Result<ItemMetadata, ArchiveError> {
        let url = self.metadata_endpoint(identifier)?;
        let response = self.http.get(url).send().await?;
        Self::handle_response(response).await
    }

    fn metadata_endpoint(&self, identifier: &str) -> Result<Url, ArchiveError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ArchiveError::CannotBeABase(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["metadata", identifier]);
        Ok(url)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ArchiveError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ArchiveError::Api { status, body })
        }
    }
}

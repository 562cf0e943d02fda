use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use shared::domain::ContinuationToken;
use url::Url;

use crate::error::TransportError;

/// The server holds a poll open up to its long-poll window (20s in the
/// deployed config) before answering with empty content, so the request
/// timeout sits comfortably above that.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The wire to the game server: one resource polled for state, plus
/// form-shaped mutations posted against it.
#[async_trait]
pub trait SnapshotTransport: Send + Sync {
    /// `GET <resource>[?id=<token>]`. No token requests the initial snapshot.
    async fn fetch_state(&self, token: Option<ContinuationToken>)
        -> Result<String, TransportError>;

    /// `POST <action>` with url-encoded fields; the response body is ignored
    /// beyond its status.
    async fn submit_form(
        &self,
        action: &str,
        fields: &[(String, String)],
    ) -> Result<(), TransportError>;
}

pub struct HttpTransport {
    http: Client,
    resource_url: Url,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(resource_url: Url) -> Self {
        Self::with_request_timeout(resource_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_request_timeout(resource_url: Url, request_timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            resource_url,
            request_timeout,
        }
    }
}

#[async_trait]
impl SnapshotTransport for HttpTransport {
    async fn fetch_state(
        &self,
        token: Option<ContinuationToken>,
    ) -> Result<String, TransportError> {
        let mut request = self
            .http
            .get(self.resource_url.clone())
            .header(header::ACCEPT, "application/json")
            .timeout(self.request_timeout);
        if let Some(token) = token {
            request = request.query(&[("id", token.0)]);
        }

        let body = request
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }

    async fn submit_form(
        &self,
        action: &str,
        fields: &[(String, String)],
    ) -> Result<(), TransportError> {
        let url = self
            .resource_url
            .join(action)
            .map_err(|source| TransportError::BadAction {
                action: action.to_string(),
                source,
            })?;

        self.http
            .post(url)
            .header(header::ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .form(fields)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

use std::future::Future;
use std::sync::Arc;

use content::PreviewPayload;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{PreviewConfig, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub item: PreviewPayload,
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipResponse {
    pub is_owner: bool,
}

#[derive(Serialize)]
struct StartRequest<'a> {
    item: &'a PreviewPayload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    item: &'a PreviewPayload,
    session_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest<'a> {
    session_id: &'a str,
}

/// The preview endpoints of the sign server.
pub trait PreviewTransport: Send + Sync + 'static {
    fn start(&self, payload: &PreviewPayload) -> impl Future<Output = Result<StartResponse, TransportError>> + Send;

    fn update(
        &self,
        payload: &PreviewPayload,
        session_id: &str,
    ) -> impl Future<Output = Result<UpdateResponse, TransportError>> + Send;

    fn ping(&self, session_id: &str) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn check_ownership(&self, session_id: &str) -> impl Future<Output = Result<OwnershipResponse, TransportError>> + Send;

    /// Releases the session. Callers treat failures as best-effort.
    fn stop(&self, session_id: &str) -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl<T: PreviewTransport> PreviewTransport for Arc<T> {
    fn start(&self, payload: &PreviewPayload) -> impl Future<Output = Result<StartResponse, TransportError>> + Send {
        (**self).start(payload)
    }

    fn update(
        &self,
        payload: &PreviewPayload,
        session_id: &str,
    ) -> impl Future<Output = Result<UpdateResponse, TransportError>> + Send {
        (**self).update(payload, session_id)
    }

    fn ping(&self, session_id: &str) -> impl Future<Output = Result<(), TransportError>> + Send { (**self).ping(session_id) }

    fn check_ownership(&self, session_id: &str) -> impl Future<Output = Result<OwnershipResponse, TransportError>> + Send {
        (**self).check_ownership(session_id)
    }

    fn stop(&self, session_id: &str) -> impl Future<Output = Result<(), TransportError>> + Send { (**self).stop(session_id) }
}

pub(crate) fn check_status(status: StatusCode) -> Result<(), TransportError> {
    if status.is_success() { return Ok(()); }
    match status.as_u16() {
        403 => Err(TransportError::Conflict),
        404 => Err(TransportError::NotFound),
        code => Err(TransportError::Status(code)),
    }
}

/// JSON-over-HTTP transport against `{base_url}/api/preview`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &PreviewConfig) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, suffix: &str) -> String { format!("{}/api/preview{}", self.base_url, suffix) }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let response = request.send().await?;
        trace!(status = %response.status(), url = %response.url(), "preview request");
        check_status(response.status())?;
        Ok(response)
    }
}

impl PreviewTransport for HttpTransport {
    async fn start(&self, payload: &PreviewPayload) -> Result<StartResponse, TransportError> {
        let request = self.client.post(self.url("")).json(&StartRequest { item: payload });
        Ok(self.send(request).await?.json().await?)
    }

    async fn update(&self, payload: &PreviewPayload, session_id: &str) -> Result<UpdateResponse, TransportError> {
        let request = self.client.put(self.url("")).json(&UpdateRequest { item: payload, session_id });
        Ok(self.send(request).await?.json().await?)
    }

    async fn ping(&self, session_id: &str) -> Result<(), TransportError> {
        self.send(self.client.post(self.url("/ping")).json(&SessionRequest { session_id })).await?;
        Ok(())
    }

    async fn check_ownership(&self, session_id: &str) -> Result<OwnershipResponse, TransportError> {
        let request = self.client.post(self.url("/ownership")).json(&SessionRequest { session_id });
        Ok(self.send(request).await?.json().await?)
    }

    async fn stop(&self, session_id: &str) -> Result<(), TransportError> {
        self.send(self.client.delete(self.url("")).json(&SessionRequest { session_id })).await?;
        Ok(())
    }
}

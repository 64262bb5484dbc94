//! The HTTP collaborator used by the token handshake.

use async_trait::async_trait;
use http::{header::AUTHORIZATION, Method};
use reqwest::Client as ReqwestClient;
use url::Url;

use crate::Result;

/// A signed request ready to be sent.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    /// Fully signed URL for GET, plain URL otherwise.
    pub url: Url,
    /// `Authorization` header value, when the request is header-signed.
    pub authorization: Option<String>,
    /// Form body pairs, sent as `application/x-www-form-urlencoded`.
    pub form: Vec<(String, String)>,
}

/// Status code and raw body, nothing more is inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait(?Send)]
pub trait Transport {
    async fn execute(&self, request: TransportRequest) -> Result<HttpResponse>;
}

#[async_trait(?Send)]
impl<T> Transport for &T
where
    T: Transport + ?Sized,
{
    async fn execute(&self, request: TransportRequest) -> Result<HttpResponse> {
        (**self).execute(request).await
    }
}

#[async_trait(?Send)]
impl Transport for ReqwestClient {
    async fn execute(&self, request: TransportRequest) -> Result<HttpResponse> {
        let mut builder = self.request(request.method, request.url);
        if let Some(authorization) = request.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        #[cfg(feature = "tracing")]
        tracing::debug!(status, path = response.url().path(), "transport response");
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}

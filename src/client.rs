// ----------------------------------------------------------------------------
// This source code contains derived artifacts from seanmonstar's `reqwest`.
// for further information(including license information),
// please visit their repository: https://github.com/seanmonstar/reqwest .
// ----------------------------------------------------------------------------
use reqwest::{Client as ReqwestClient, IntoUrl, Method};

use crate::{OAuthParameters, SecretsProvider, Signer};

use super::request::RequestBuilder;

/// Turns a `reqwest::Client` into a signing [`Client`].
///
/// The secrets are borrowed for as long as the returned client lives.
pub trait OAuthClientProvider {
    /// Sign with generated nonce and timestamp and `oauth_version="1.0"`.
    fn oauth1<'a, T>(self, secrets: &'a T) -> Client<Signer<'a, T>>
    where
        Self: Sized,
        T: SecretsProvider,
    {
        self.oauth1_with_params(secrets, OAuthParameters::new())
    }

    fn oauth1_with_params<'a, TSecrets>(
        self,
        secrets: &'a TSecrets,
        params: OAuthParameters<'a>,
    ) -> Client<Signer<'a, TSecrets>>
    where
        Self: Sized,
        TSecrets: SecretsProvider;
}

/// A `reqwest::Client` paired with a signer.
///
/// `Client<()>` builds unsigned requests; call
/// [`RequestBuilder::sign`] on them before sending.
#[derive(Debug)]
pub struct Client<TSigner> {
    inner: ReqwestClient,
    signer: TSigner,
}

impl OAuthClientProvider for ReqwestClient {
    fn oauth1_with_params<'a, TSecrets>(
        self,
        secrets: &'a TSecrets,
        parameters: OAuthParameters<'a>,
    ) -> Client<Signer<'a, TSecrets>>
    where
        Self: Sized,
        TSecrets: SecretsProvider,
    {
        Client {
            inner: self,
            signer: Signer::new(secrets, parameters),
        }
    }
}

impl Default for Client<()> {
    fn default() -> Self {
        Client::new()
    }
}

impl Client<()> {
    pub fn new() -> Self {
        Client {
            inner: ReqwestClient::new(),
            signer: (),
        }
    }

    /// Wrap an already configured `reqwest::Client`.
    pub fn new_with_client(client: ReqwestClient) -> Self {
        Client {
            inner: client,
            signer: (),
        }
    }
}

impl<T> Client<T>
where
    T: Clone,
{
    /// GET, signed through the query string.
    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder<T> {
        self.request(Method::GET, url)
    }

    /// POST, signed through the `Authorization` header. Form pairs are signed too.
    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder<T> {
        self.request(Method::POST, url)
    }

    pub fn put<U: IntoUrl>(&self, url: U) -> RequestBuilder<T> {
        self.request(Method::PUT, url)
    }

    pub fn patch<U: IntoUrl>(&self, url: U) -> RequestBuilder<T> {
        self.request(Method::PATCH, url)
    }

    pub fn delete<U: IntoUrl>(&self, url: U) -> RequestBuilder<T> {
        self.request(Method::DELETE, url)
    }

    pub fn head<U: IntoUrl>(&self, url: U) -> RequestBuilder<T> {
        self.request(Method::HEAD, url)
    }

    /// Request with an arbitrary method. Only GET is signed through the URL.
    ///
    /// An unparsable URL is reported by `generate_signature` or `send`,
    /// not here.
    pub fn request<U: IntoUrl>(&self, method: Method, url: U) -> RequestBuilder<T> {
        RequestBuilder::new(
            self.inner.clone(),
            self.inner.request(method, url),
            self.signer.clone(),
        )
    }
}

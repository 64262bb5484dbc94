// ----------------------------------------------------------------------------
// This source code contains derived artifacts from seanmonstar's `reqwest`.
// for further information(including license information),
// please visit their repository: https://github.com/seanmonstar/reqwest .
// ----------------------------------------------------------------------------
use std::{convert::TryFrom, time::Duration};

use http::{header::AUTHORIZATION, Method};
use reqwest::{
    header::HeaderMap, header::HeaderName, header::HeaderValue, Body, Client as ReqwestClient,
    Request, RequestBuilder as ReqwestRequestBuilder, Response, Url,
};
use serde::Serialize;

use crate::{
    OAuthParameters, ParameterSet, Result, SecretsProvider, SignError, SignResult, SignedRequest,
    Signer,
};

pub struct RequestBuilder<TSigner>
where
    TSigner: Clone,
{
    client: ReqwestClient,
    inner: ReqwestRequestBuilder,
    signer: TSigner,
    body: String,
}

impl RequestBuilder<()> {
    // ------------------------------------------------------------------------
    // Set signing information

    /// Add the signing information.
    pub fn sign<'a, T>(self, secrets: &'a T) -> RequestBuilder<Signer<'a, T>>
    where
        T: SecretsProvider,
    {
        self.sign_with_params(secrets, OAuthParameters::new())
    }

    /// Add the signing information with OAuth parameters.
    pub fn sign_with_params<'a, T>(
        self,
        secrets: &'a T,
        params: OAuthParameters<'a>,
    ) -> RequestBuilder<Signer<'a, T>>
    where
        T: SecretsProvider,
    {
        RequestBuilder {
            client: self.client,
            inner: self.inner,
            body: self.body,
            signer: Signer::new(secrets, params),
        }
    }
}

impl<'a, TSecretsProvider> RequestBuilder<Signer<'a, TSecretsProvider>>
where
    TSecretsProvider: SecretsProvider,
{
    // ------------------------------------------------------------------------
    // Finish building the request and send it to server with OAuth signature

    /// Constructs the Request and sends it to the target URL.
    ///
    /// # Errors
    ///
    /// This method fails if the request could not be built or signed, if
    /// there was an error while sending request, redirect loop was detected
    /// or redirect limit was exhausted.
    pub async fn send(self) -> Result<Response> {
        let client = self.client.clone();
        let request = self.generate_signature()?;
        Ok(client.execute(request).await?)
    }

    /// Build the request and sign it.
    ///
    /// Query and form body pairs take part in the signature. GET requests
    /// carry the protocol parameters in their query string, every other
    /// method in the `Authorization` header.
    pub fn generate_signature(self) -> Result<Request> {
        let mut request = self.inner.build()?;
        let payload = url::form_urlencoded::parse(self.body.as_bytes())
            .into_owned()
            .collect::<ParameterSet>();
        let signed = self
            .signer
            .generate_signature(request.method(), request.url(), &payload);
        attach_signature(&mut request, &signed)?;

        Ok(request)
    }
}

fn attach_signature(request: &mut Request, signed: &SignedRequest) -> SignResult<()> {
    if *request.method() == Method::GET {
        let url = Url::parse(&signed.signed_url(request.url().as_str()))?;
        *request.url_mut() = url;
    } else {
        let header = HeaderValue::from_str(&signed.authorization_header())
            .map_err(|e| SignError::InvalidHeader(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, header);
    }
    Ok(())
}

impl<TSigner> RequestBuilder<TSigner>
where
    TSigner: Clone,
{
    pub(crate) fn new(
        client: ReqwestClient,
        builder: ReqwestRequestBuilder,
        signer: TSigner,
    ) -> Self {
        RequestBuilder {
            client,
            inner: builder,
            body: String::new(),
            signer,
        }
    }

    // ------------------------------------------------------------------------
    // Trapped with the wrapper

    /// Modify the query string of the URL.
    ///
    /// Modifies the URL of this request, adding the parameters provided.
    /// This method appends and does not overwrite. This means that it can
    /// be called multiple times and that existing query parameters are not
    /// overwritten if the same key is used. The key will simply show up
    /// twice in the query string.
    /// Calling `.query([("foo", "a"), ("foo", "b")])` gives `"foo=a&foo=b"`.
    ///
    /// Query parameters are read back from the built URL when signing.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> Self {
        self.pass_through(|b| b.query(query))
    }

    /// Send a form body.
    ///
    /// The form pairs take part in the signature.
    pub fn form<T: Serialize + ?Sized>(mut self, form: &T) -> Self {
        match serde_urlencoded::to_string(form) {
            Ok(body) => {
                self.inner = self.inner.form(form);
                self.body = body;
                self
            }
            Err(_) => self.pass_through(|b| b.form(form)),
        }
    }

    // ------------------------------------------------------------------------
    // Pass-through to inner builder

    fn pass_through<F>(self, f: F) -> Self
    where
        F: FnOnce(ReqwestRequestBuilder) -> ReqwestRequestBuilder,
    {
        RequestBuilder {
            inner: f(self.inner),
            ..self
        }
    }

    // unsigned bodies drop the captured form pairs
    fn replace_body<F>(self, f: F) -> Self
    where
        F: FnOnce(ReqwestRequestBuilder) -> ReqwestRequestBuilder,
    {
        RequestBuilder {
            inner: f(self.inner),
            body: String::new(),
            ..self
        }
    }

    /// Add a `Header` to this Request.
    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.pass_through(|b| b.header(key, value))
    }

    /// Add a set of Headers to the existing ones on this Request.
    ///
    /// The headers will be merged in to any already set.
    pub fn headers(self, headers: HeaderMap) -> Self {
        self.pass_through(|b| b.headers(headers))
    }

    /// Set the request body.
    ///
    /// Raw bodies are not part of the signature, and replace any earlier
    /// `.form()` pairs.
    pub fn body<T: Into<Body>>(self, body: T) -> Self {
        self.replace_body(|b| b.body(body))
    }

    /// Enables a request timeout.
    ///
    /// The timeout is applied from the when the request starts connecting
    /// until the response body has finished. It affects only this request
    /// and overrides the timeout configured using `ClientBuilder::timeout()`.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.pass_through(|b| b.timeout(timeout))
    }

    /// Send a JSON body. Not part of the signature.
    #[cfg(feature = "json")]
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> Self {
        self.replace_body(|b| b.json(json))
    }

    /// Sends a multipart/form-data body.
    ///
    /// Note: multipart/form-data is not handled by the OAuth signer.
    #[cfg(feature = "multipart")]
    pub fn multipart(self, multipart: reqwest::multipart::Form) -> Self {
        self.replace_body(|b| b.multipart(multipart))
    }

    /// Attempt to clone the RequestBuilder.
    ///
    /// `None` is returned if the RequestBuilder can not be cloned,
    /// i.e. if the request body is a stream.
    pub fn try_clone(&self) -> Option<Self> {
        self.inner.try_clone().map(|inner| RequestBuilder {
            client: self.client.clone(),
            inner,
            body: self.body.clone(),
            signer: self.signer.clone(),
        })
    }
}

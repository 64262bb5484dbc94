//! Two step token handshake (RFC 5849, section 2).
//!
//! ```text
//! Unauthenticated --request_token--> RequestTokenObtained --access_token--> AccessTokenObtained
//! ```
//!
//! Every transition takes the current [`AuthState`] by reference and returns
//! the next one; a failed transition leaves the caller's state untouched.

use http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::token_reader::{check_status, read_oauth_token};
use crate::{
    Credentials, Error, OAuthParameters, ParameterSet, Result, SignError, Signer, StoredToken,
    Token, TokenResponse, TokenStore, Transport, TransportRequest, OAUTH_TOKEN_KEY,
};

/// Provider endpoints taking part in the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub request_token: String,
    pub authorize: String,
    pub authenticate: String,
    pub access_token: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            request_token: "https://api.twitter.com/oauth/request_token".to_string(),
            authorize: "https://api.twitter.com/oauth/authorize".to_string(),
            authenticate: "https://api.twitter.com/oauth/authenticate".to_string(),
            access_token: "https://api.twitter.com/oauth/access_token".to_string(),
        }
    }
}

impl Endpoints {
    pub fn request_token<T: Into<String>>(self, url: T) -> Self {
        Endpoints {
            request_token: url.into(),
            ..self
        }
    }

    pub fn authorize<T: Into<String>>(self, url: T) -> Self {
        Endpoints {
            authorize: url.into(),
            ..self
        }
    }

    pub fn authenticate<T: Into<String>>(self, url: T) -> Self {
        Endpoints {
            authenticate: url.into(),
            ..self
        }
    }

    pub fn access_token<T: Into<String>>(self, url: T) -> Self {
        Endpoints {
            access_token: url.into(),
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// Waiting for the user to authorize the request token.
    RequestTokenObtained(Token),
    /// Terminal; the token signs every further request.
    AccessTokenObtained(Token),
}

impl AuthState {
    pub fn token(&self) -> Option<&Token> {
        match self {
            AuthState::Unauthenticated => None,
            AuthState::RequestTokenObtained(token) | AuthState::AccessTokenObtained(token) => {
                Some(token)
            }
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthState::AccessTokenObtained(_))
    }
}

impl Default for AuthState {
    fn default() -> Self {
        AuthState::Unauthenticated
    }
}

/// Query parameters the provider redirects the user back with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub oauth_token: String,
    pub oauth_verifier: String,
}

impl CallbackParams {
    pub fn from_query(query: &str) -> Result<Self> {
        serde_urlencoded::from_str(query)
            .map_err(|e| Error::InvalidArgument(format!("callback query : {}", e)))
    }
}

/// Result of [`Handshake::authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Send the user here; they come back with [`CallbackParams`].
    Authorize(Url),
    Authorized(Token),
}

pub struct Handshake<T> {
    credentials: Credentials,
    callback: String,
    endpoints: Endpoints,
    transport: T,
}

impl<T> Handshake<T>
where
    T: Transport,
{
    /// `callback` is sent as `oauth_callback`; use `"oob"` for PIN based flows.
    pub fn new<C: Into<String>>(credentials: Credentials, callback: C, transport: T) -> Self {
        Handshake {
            credentials,
            callback: callback.into(),
            endpoints: Endpoints::default(),
            transport,
        }
    }

    pub fn endpoints(self, endpoints: Endpoints) -> Self {
        Handshake { endpoints, ..self }
    }

    pub fn get_endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Obtain a request token.
    ///
    /// Fails with [`Error::RemoteRejection`] on a non-2xx answer and with
    /// [`Error::MalformedResponse`] unless the provider confirms the callback.
    pub async fn request_token(&self, state: &AuthState) -> Result<AuthState> {
        if state.is_authorized() {
            return Err(Error::InvalidArgument(
                "an access token has already been obtained".to_string(),
            ));
        }

        let token = self.fetch_request_token().await?;
        Ok(AuthState::RequestTokenObtained(token))
    }

    /// Exchange an authorized request token and its verifier for an access
    /// token.
    pub async fn access_token(&self, state: &AuthState, verifier: &str) -> Result<AuthState> {
        let request_token = match state {
            AuthState::RequestTokenObtained(token) => token,
            _ => {
                return Err(Error::InvalidArgument(
                    "access token exchange requires a request token".to_string(),
                ))
            }
        };

        let token = self.fetch_access_token(request_token, verifier).await?;
        Ok(AuthState::AccessTokenObtained(token))
    }

    /// Where to send the user to authorize the request token.
    pub fn authorize_url(&self, state: &AuthState) -> Result<Url> {
        user_url(&self.endpoints.authorize, state)
    }

    /// Like [`authorize_url`](Self::authorize_url), for "sign in with" flows.
    pub fn authenticate_url(&self, state: &AuthState) -> Result<Url> {
        user_url(&self.endpoints.authenticate, state)
    }

    /// Drive the handshake across the authorization redirect, keeping the
    /// token in `store`.
    ///
    /// Without `callback`, a request token is obtained and stored and the
    /// authorization URL is returned. With `callback`, the stored request
    /// token is exchanged and the access token replaces it. The store is only
    /// written after a successful transition.
    pub async fn authenticate<S>(
        &self,
        store: &mut S,
        callback: Option<&CallbackParams>,
    ) -> Result<AuthOutcome>
    where
        S: TokenStore,
    {
        match (store.state(), callback) {
            (AuthState::AccessTokenObtained(token), _) => Ok(AuthOutcome::Authorized(token)),
            (state, None) => {
                let next = self.request_token(&state).await?;
                let url = self.authorize_url(&next)?;
                if let AuthState::RequestTokenObtained(token) = next {
                    store.save(StoredToken::request(token));
                }
                Ok(AuthOutcome::Authorize(url))
            }
            (AuthState::RequestTokenObtained(token), Some(callback)) => {
                if callback.oauth_token != token.key {
                    return Err(Error::InvalidArgument(
                        "callback token does not match the stored request token".to_string(),
                    ));
                }
                let access = self
                    .fetch_access_token(&token, &callback.oauth_verifier)
                    .await?;
                store.save(StoredToken::access(access.clone()));
                Ok(AuthOutcome::Authorized(access))
            }
            (AuthState::Unauthenticated, Some(_)) => Err(Error::InvalidArgument(
                "no request token stored for this callback".to_string(),
            )),
        }
    }

    async fn fetch_request_token(&self) -> Result<Token> {
        let params = OAuthParameters::new().callback(self.callback.as_str());
        let request = self.signed_post(&self.endpoints.request_token, None, params)?;
        let resp = self.exchange(request).await?;
        if !resp.callback_confirmed() {
            return Err(Error::MalformedResponse(
                "oauth_callback_confirmed=true missing from request token response".to_string(),
            ));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(token = %resp.oauth_token, "request token obtained");
        Ok(resp.into())
    }

    async fn fetch_access_token(&self, request_token: &Token, verifier: &str) -> Result<Token> {
        let params = OAuthParameters::new().verifier(verifier);
        let request =
            self.signed_post(&self.endpoints.access_token, Some(request_token), params)?;
        let resp = self.exchange(request).await?;

        #[cfg(feature = "tracing")]
        tracing::debug!("access token obtained");
        Ok(resp.into())
    }

    fn signed_post(
        &self,
        endpoint: &str,
        token: Option<&Token>,
        params: OAuthParameters<'_>,
    ) -> Result<TransportRequest> {
        let url = Url::parse(endpoint).map_err(SignError::from)?;
        let secrets = self.credentials.with_token(token);
        let signed = Signer::new(&secrets, params).generate_signature(
            &Method::POST,
            &url,
            &ParameterSet::new(),
        );

        Ok(TransportRequest {
            method: Method::POST,
            url,
            authorization: Some(signed.authorization_header()),
            form: Vec::new(),
        })
    }

    async fn exchange(&self, request: TransportRequest) -> Result<TokenResponse> {
        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = request.url.path(), "token exchange");
        let response = self.transport.execute(request).await?;
        let body = check_status(response.status, response.body)?;

        read_oauth_token(body).map_err(|e| Error::MalformedResponse(e.to_string()))
    }
}

fn user_url(endpoint: &str, state: &AuthState) -> Result<Url> {
    let token = match state {
        AuthState::RequestTokenObtained(token) => token,
        _ => {
            return Err(Error::InvalidArgument(
                "user authorization requires a request token".to_string(),
            ))
        }
    };
    let mut url = Url::parse(endpoint).map_err(SignError::from)?;
    url.query_pairs_mut().append_pair(OAUTH_TOKEN_KEY, &token.key);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use percent_encoding::percent_decode_str;

    use super::*;
    use crate::signer::{base_string, digest};
    use crate::{HttpResponse, MemoryStore};

    #[derive(Default)]
    struct FakeTransport {
        responses: RefCell<VecDeque<HttpResponse>>,
        requests: RefCell<Vec<TransportRequest>>,
    }

    impl FakeTransport {
        fn respond(self, status: u16, body: &str) -> Self {
            self.responses.borrow_mut().push_back(HttpResponse {
                status,
                body: body.to_string(),
            });
            self
        }

        fn last_header(&self) -> ParameterSet {
            let requests = self.requests.borrow();
            let header = requests
                .last()
                .and_then(|r| r.authorization.clone())
                .unwrap();
            parse_header(&header)
        }
    }

    #[async_trait(?Send)]
    impl Transport for FakeTransport {
        async fn execute(&self, request: TransportRequest) -> Result<HttpResponse> {
            self.requests.borrow_mut().push(request);
            Ok(self
                .responses
                .borrow_mut()
                .pop_front()
                .expect("unexpected request"))
        }
    }

    fn parse_header(header: &str) -> ParameterSet {
        header
            .strip_prefix("OAuth ")
            .unwrap()
            .split(", ")
            .map(|item| {
                let mut kv = item.splitn(2, '=');
                let key = kv.next().unwrap().to_string();
                let value = kv.next().unwrap().trim_matches('"');
                (key, percent_decode_str(value).decode_utf8_lossy().into_owned())
            })
            .collect()
    }

    fn handshake(transport: FakeTransport) -> Handshake<FakeTransport> {
        Handshake::new(
            Credentials::new("TEST_KEY", "TEST_SECRET"),
            "http://localhost/callback",
            transport,
        )
        .endpoints(
            Endpoints::default()
                .request_token("https://example.com/request_token")
                .authorize("https://example.com/authorize")
                .authenticate("https://example.com/authenticate")
                .access_token("https://example.com/access_token"),
        )
    }

    const REQUEST_TOKEN_BODY: &str =
        "oauth_token=key&oauth_token_secret=secret&oauth_callback_confirmed=true";
    const ACCESS_TOKEN_BODY: &str = "oauth_token=token_key&oauth_token_secret=token_secret";

    #[tokio::test]
    async fn request_token_success() {
        let hs = handshake(FakeTransport::default().respond(200, REQUEST_TOKEN_BODY));
        let state = hs.request_token(&AuthState::Unauthenticated).await.unwrap();
        assert_eq!(
            state,
            AuthState::RequestTokenObtained(Token::new("key", "secret"))
        );

        let requests = hs.transport.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].url.as_str(), "https://example.com/request_token");
        drop(requests);

        let header = hs.transport.last_header();
        assert_eq!(
            header.get("oauth_callback"),
            Some("http://localhost/callback")
        );
        assert_eq!(header.get("oauth_consumer_key"), Some("TEST_KEY"));
        assert!(!header.contains_key("oauth_token"));
    }

    #[tokio::test]
    async fn request_token_is_signed_with_empty_token_secret() {
        let hs = handshake(FakeTransport::default().respond(200, REQUEST_TOKEN_BODY));
        hs.request_token(&AuthState::Unauthenticated).await.unwrap();

        let mut header = hs.transport.last_header();
        let signature = header.remove("oauth_signature").unwrap();
        let base = base_string("POST", "https://example.com/request_token", &header);
        assert_eq!(signature, digest(&base, "TEST_SECRET", None));
    }

    #[tokio::test]
    async fn request_token_rejected() {
        let hs = handshake(FakeTransport::default().respond(500, "internal error"));
        let state = AuthState::Unauthenticated;
        match hs.request_token(&state).await {
            Err(Error::RemoteRejection { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal error");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(state, AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn request_token_callback_not_confirmed() {
        for body in &[
            "oauth_token=token&oauth_token_secret=secret&oauth_callback_confirmed=false",
            "oauth_token=token&oauth_token_secret=secret",
        ] {
            let hs = handshake(FakeTransport::default().respond(200, body));
            match hs.request_token(&AuthState::Unauthenticated).await {
                Err(Error::MalformedResponse(_)) => {}
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn request_token_unparsable() {
        let hs = handshake(FakeTransport::default().respond(200, "{\"a\":1}"));
        match hs.request_token(&AuthState::Unauthenticated).await {
            Err(Error::MalformedResponse(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn request_token_after_authorization() {
        let hs = handshake(FakeTransport::default());
        let state = AuthState::AccessTokenObtained(Token::new("a", "b"));
        match hs.request_token(&state).await {
            Err(Error::InvalidArgument(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(hs.transport.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn access_token_success() {
        let hs = handshake(FakeTransport::default().respond(200, ACCESS_TOKEN_BODY));
        let state = AuthState::RequestTokenObtained(Token::new("key", "secret"));
        let next = hs.access_token(&state, "verifier").await.unwrap();
        assert_eq!(
            next,
            AuthState::AccessTokenObtained(Token::new("token_key", "token_secret"))
        );
        assert!(next.is_authorized());

        let mut header = hs.transport.last_header();
        assert_eq!(header.get("oauth_token"), Some("key"));
        assert_eq!(header.get("oauth_verifier"), Some("verifier"));
        assert!(!header.contains_key("oauth_callback"));

        // signed with the request token secret
        let signature = header.remove("oauth_signature").unwrap();
        let base = base_string("POST", "https://example.com/access_token", &header);
        assert_eq!(signature, digest(&base, "TEST_SECRET", Some("secret")));
    }

    #[tokio::test]
    async fn access_token_requires_request_token() {
        let hs = handshake(FakeTransport::default());
        match hs.access_token(&AuthState::Unauthenticated, "verifier").await {
            Err(Error::InvalidArgument(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn access_token_rejected_keeps_state() {
        let hs = handshake(FakeTransport::default().respond(401, "Invalid verifier"));
        let state = AuthState::RequestTokenObtained(Token::new("key", "secret"));
        match hs.access_token(&state, "bad").await {
            Err(Error::RemoteRejection { status, .. }) => assert_eq!(status, 401),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(
            state,
            AuthState::RequestTokenObtained(Token::new("key", "secret"))
        );
    }

    #[test]
    fn authorize_url() {
        let hs = handshake(FakeTransport::default());
        let state = AuthState::RequestTokenObtained(Token::new("k y", "secret"));
        assert_eq!(
            hs.authorize_url(&state).unwrap().as_str(),
            "https://example.com/authorize?oauth_token=k+y"
        );
        assert_eq!(
            hs.authenticate_url(&state).unwrap().as_str(),
            "https://example.com/authenticate?oauth_token=k+y"
        );
        assert!(hs.authorize_url(&AuthState::Unauthenticated).is_err());
    }

    #[tokio::test]
    async fn authenticate_across_redirect() {
        let hs = handshake(
            FakeTransport::default()
                .respond(200, REQUEST_TOKEN_BODY)
                .respond(200, ACCESS_TOKEN_BODY),
        );
        let mut store = MemoryStore::new();

        // first visit: redirect the user
        match hs.authenticate(&mut store, None).await.unwrap() {
            AuthOutcome::Authorize(url) => {
                assert_eq!(url.as_str(), "https://example.com/authorize?oauth_token=key")
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            store.load(),
            Some(StoredToken::request(Token::new("key", "secret")))
        );

        // back from the provider
        let callback = CallbackParams::from_query("oauth_token=key&oauth_verifier=verifier").unwrap();
        let outcome = hs.authenticate(&mut store, Some(&callback)).await.unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::Authorized(Token::new("token_key", "token_secret"))
        );
        assert_eq!(
            store.load(),
            Some(StoredToken::access(Token::new("token_key", "token_secret")))
        );

        // already authorized, no further request
        let outcome = hs.authenticate(&mut store, None).await.unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::Authorized(Token::new("token_key", "token_secret"))
        );
        assert_eq!(hs.transport.requests.borrow().len(), 2);
    }

    #[tokio::test]
    async fn authenticate_rejected_leaves_store_unset() {
        let hs = handshake(FakeTransport::default().respond(500, "boom"));
        let mut store = MemoryStore::new();
        assert!(hs.authenticate(&mut store, None).await.is_err());
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn authenticate_unconfirmed_callback_leaves_store_unset() {
        let hs = handshake(
            FakeTransport::default().respond(200, "oauth_token=key&oauth_token_secret=secret"),
        );
        let mut store = MemoryStore::new();
        match hs.authenticate(&mut store, None).await {
            Err(Error::MalformedResponse(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn authenticate_token_mismatch() {
        let hs = handshake(FakeTransport::default());
        let mut store = MemoryStore::new();
        store.save(StoredToken::request(Token::new("key", "secret")));

        let callback = CallbackParams {
            oauth_token: "bad".to_string(),
            oauth_verifier: "verifier".to_string(),
        };
        match hs.authenticate(&mut store, Some(&callback)).await {
            Err(Error::InvalidArgument(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(
            store.load(),
            Some(StoredToken::request(Token::new("key", "secret")))
        );
        assert!(hs.transport.requests.borrow().is_empty());
    }

    #[tokio::test]
    async fn authenticate_callback_without_request_token() {
        let hs = handshake(FakeTransport::default());
        let mut store = MemoryStore::new();
        let callback = CallbackParams {
            oauth_token: "key".to_string(),
            oauth_verifier: "verifier".to_string(),
        };
        assert!(hs.authenticate(&mut store, Some(&callback)).await.is_err());
    }

    #[test]
    fn callback_params_from_query() {
        assert!(CallbackParams::from_query("oauth_token=key").is_err());
        let params = CallbackParams::from_query("oauth_verifier=v%20w&oauth_token=k").unwrap();
        assert_eq!(params.oauth_token, "k");
        assert_eq!(params.oauth_verifier, "v w");
    }

    #[test]
    fn endpoints_default_to_twitter() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.request_token,
            "https://api.twitter.com/oauth/request_token"
        );
        assert_eq!(
            endpoints.access_token,
            "https://api.twitter.com/oauth/access_token"
        );
    }
}

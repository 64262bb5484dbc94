use std::{collections::HashMap, future::Future};

use async_trait::async_trait;
use reqwest::Response;
use serde::Deserialize;

use crate::{Error, Result, Token, TokenReaderError, TokenReaderResult};

const OAUTH_TOKEN_KEY: &str = "oauth_token";

const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";

const OAUTH_CALLBACK_CONFIRMED_KEY: &str = "oauth_callback_confirmed";

/// Represents response of token acquisition.
#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    /// OAuth Token
    pub oauth_token: String,
    /// OAuth Token Secret
    pub oauth_token_secret: String,
    /// Other contents
    #[serde(flatten)]
    pub remain: HashMap<String, String>,
}

impl TokenResponse {
    /// Whether the provider acknowledged the `oauth_callback`
    /// (`oauth_callback_confirmed=true`).
    pub fn callback_confirmed(&self) -> bool {
        self.remain
            .get(OAUTH_CALLBACK_CONFIRMED_KEY)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    pub fn token(&self) -> Token {
        Token::new(self.oauth_token.as_str(), self.oauth_token_secret.as_str())
    }
}

impl From<TokenResponse> for Token {
    fn from(resp: TokenResponse) -> Self {
        Token::new(resp.oauth_token, resp.oauth_token_secret)
    }
}

/// Add parse_oauth_token feature to reqwest::Response.
// this trait is sealed
#[async_trait(?Send)]
pub trait TokenReader: private::Sealed {
    async fn parse_oauth_token(self) -> Result<TokenResponse>;
}

#[async_trait(?Send)]
impl TokenReader for Response {
    async fn parse_oauth_token(self) -> Result<TokenResponse> {
        let status = self.status().as_u16();
        let text = self.text().await?;
        let text = check_status(status, text)?;
        Ok(read_oauth_token(text)?)
    }
}

/// Add parse_oauth_token feature to Future of reqwest::Response.
// this trait is also sealed
#[async_trait(?Send)]
pub trait TokenReaderFuture: private::SealedWrapper {
    async fn parse_oauth_token(self) -> Result<TokenResponse>;
}

#[async_trait(?Send)]
impl<T, E> TokenReaderFuture for T
where
    T: Future<Output = std::result::Result<Response, E>>,
    E: Into<Error> + 'static,
{
    async fn parse_oauth_token(self) -> Result<TokenResponse> {
        match self.await {
            Ok(resp) => Ok(resp.parse_oauth_token().await?),
            Err(err) => Err(err.into()),
        }
    }
}

/// Pass `body` through on a 2xx `status`, otherwise reject with the raw body.
pub(crate) fn check_status(status: u16, body: String) -> Result<String> {
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(Error::RemoteRejection { status, body })
    }
}

/// Parse a `key=value&...` token response.
pub fn read_oauth_token(text: String) -> TokenReaderResult<TokenResponse> {
    let mut destructured = url::form_urlencoded::parse(text.as_bytes())
        .into_owned()
        .collect::<HashMap<String, String>>();
    let oauth_token = destructured.remove(OAUTH_TOKEN_KEY);
    let oauth_token_secret = destructured.remove(OAUTH_TOKEN_SECRET_KEY);
    match (oauth_token, oauth_token_secret) {
        (Some(t), Some(s)) => Ok(TokenResponse {
            oauth_token: t,
            oauth_token_secret: s,
            remain: destructured,
        }),
        (None, _) => Err(TokenReaderError::TokenKeyNotFound(OAUTH_TOKEN_KEY, text)),
        (_, _) => Err(TokenReaderError::TokenKeyNotFound(
            OAUTH_TOKEN_SECRET_KEY,
            text,
        )),
    }
}

mod private {
    use std::future::Future;

    use reqwest::Response;

    use crate::Error;

    pub trait Sealed {}
    impl Sealed for Response {}
    pub trait SealedWrapper {}
    impl<T, E> SealedWrapper for T
    where
        T: Future<Output = Result<Response, E>>,
        E: Into<Error>,
    {
    }
}

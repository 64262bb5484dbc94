use std::borrow::Cow;
use std::fmt;

/// Anything able to hand the signer a consumer key pair and, optionally, a
/// token pair.
pub trait SecretsProvider {
    fn get_consumer_key_pair<'a>(&'a self) -> (&'a str, &'a str);

    fn get_token_pair_option<'a>(&'a self) -> Option<(&'a str, &'a str)>;

    fn get_token_option_pair<'a>(&'a self) -> (Option<&'a str>, Option<&'a str>) {
        self.get_token_pair_option()
            .map(|s| (Some(s.0), Some(s.1)))
            .unwrap_or_else(|| (None, None))
    }
}

/// The registered application identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        Credentials {
            key: consumer_key.into(),
            secret: consumer_secret.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Borrow these credentials together with an optional token, ready to be
    /// handed to a [`Signer`](crate::Signer).
    pub fn with_token<'a>(&'a self, token: Option<&'a Token>) -> Secrets<'a> {
        let secrets = Secrets::new(self.key.as_str(), self.secret.as_str());
        match token {
            Some(token) => secrets.token(token.key.as_str(), token.secret.as_str()),
            None => secrets,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A user specific key/secret pair (request token or access token).
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub key: String,
    pub secret: String,
}

impl Token {
    pub fn new<TKey, TSecret>(key: TKey, secret: TSecret) -> Self
    where
        TKey: Into<String>,
        TSecret: Into<String>,
    {
        Token {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Consumer key pair plus an optional token pair, borrowed or owned.
#[derive(Clone)]
pub struct Secrets<'a> {
    consumer_key: Cow<'a, str>,
    consumer_secret: Cow<'a, str>,
    token: Option<(Cow<'a, str>, Cow<'a, str>)>,
}

impl<'a> Secrets<'a> {
    pub fn new<TKey, TSecret>(consumer_key: TKey, consumer_secret: TSecret) -> Self
    where
        TKey: Into<Cow<'a, str>>,
        TSecret: Into<Cow<'a, str>>,
    {
        Secrets {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: None,
        }
    }

    /// Attach (or replace) the token pair.
    pub fn token<TKey, TSecret>(self, token: TKey, token_secret: TSecret) -> Self
    where
        TKey: Into<Cow<'a, str>>,
        TSecret: Into<Cow<'a, str>>,
    {
        Secrets {
            token: Some((token.into(), token_secret.into())),
            ..self
        }
    }
}

impl fmt::Debug for Secrets<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("consumer_key", &self.consumer_key)
            .field("token", &self.token.as_ref().map(|(k, _)| k))
            .finish()
    }
}

impl SecretsProvider for Secrets<'_> {
    fn get_consumer_key_pair<'a>(&'a self) -> (&'a str, &'a str) {
        (&self.consumer_key, &self.consumer_secret)
    }

    fn get_token_pair_option<'a>(&'a self) -> Option<(&'a str, &'a str)> {
        self.token.as_ref().map(|(k, s)| (k.as_ref(), s.as_ref()))
    }
}

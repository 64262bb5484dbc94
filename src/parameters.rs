use std::borrow::Cow;
use std::iter::FromIterator;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::ser::{Serialize, SerializeMap, Serializer};
use sha1::{Digest, Sha1};

use crate::encode::percent_encode;
use crate::{
    HMAC_SHA1, OAUTH_CALLBACK_KEY, OAUTH_CONSUMER_KEY, OAUTH_KEY_PREFIX, OAUTH_NONCE_KEY,
    OAUTH_SIGNATURE_METHOD_KEY, OAUTH_TIMESTAMP_KEY, OAUTH_TOKEN_KEY, OAUTH_VERIFIER_KEY,
    OAUTH_VERSION, OAUTH_VERSION_KEY,
};

/// Ordered multimap of request parameters taking part in a signature.
///
/// Insertion order is kept as-is; the canonical ordering is only applied
/// when the set is rendered (see [`ParameterSet::normalized`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet(Vec<(String, String)>);

impl ParameterSet {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set `key` to `value`, dropping any earlier value of the same key.
    pub fn insert<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let key = key.into();
        self.0.retain(|(k, _)| k != &key);
        self.0.push((key, value.into()));
    }

    /// Add `key=value`, keeping earlier values of the same key.
    pub fn append<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let position = self.0.iter().position(|(k, _)| k == key)?;
        let (_, value) = self.0.remove(position);
        self.0.retain(|(k, _)| k != key);
        Some(value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Only the `oauth_*` protocol parameters.
    pub fn protocol(&self) -> ParameterSet {
        self.iter()
            .filter(|(k, _)| k.starts_with(OAUTH_KEY_PREFIX))
            .collect()
    }

    /// Percent-encoded pairs sorted ascending by key, then by value.
    pub fn normalized(&self) -> Vec<(String, String)> {
        let mut pairs = self
            .0
            .iter()
            .map(|(k, v)| (percent_encode(k).into_owned(), percent_encode(v).into_owned()))
            .collect::<Vec<_>>();
        pairs.sort();
        pairs
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        ParameterSet(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K, V> Extend<(K, V)> for ParameterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        self.0
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

/// Protocol options applied on top of the mandatory `oauth_*` parameters.
///
/// Nonce and timestamp are generated per request unless fixed here.
#[derive(Debug, Clone)]
pub struct OAuthParameters<'a> {
    callback: Option<Cow<'a, str>>,
    nonce: Option<Cow<'a, str>>,
    realm: Option<Cow<'a, str>>,
    timestamp: Option<u64>,
    verifier: Option<Cow<'a, str>>,
    version: bool,
}

impl Default for OAuthParameters<'static> {
    fn default() -> Self {
        OAuthParameters {
            callback: None,
            nonce: None,
            realm: None,
            timestamp: None,
            verifier: None,
            version: true,
        }
    }
}

impl<'a> OAuthParameters<'a> {
    pub fn new() -> Self {
        Default::default()
    }

    /// set the oauth_callback value (request token step only)
    pub fn callback<T>(self, callback: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// set the oauth_nonce value
    pub fn nonce<T>(self, nonce: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// set the realm value
    ///
    /// The realm is rendered in the `Authorization` header but never signed.
    pub fn realm<T>(self, realm: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            realm: Some(realm.into()),
            ..self
        }
    }

    /// set the oauth_timestamp value
    pub fn timestamp<T>(self, timestamp: T) -> Self
    where
        T: Into<u64>,
    {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// set the oauth_verifier value (access token step only)
    pub fn verifier<T>(self, verifier: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    /// set the oauth_version value (boolean)
    ///
    /// # Note
    /// Defaults to `true`, which sends `oauth_version="1.0"`.
    /// With `false`, oauth_version is left out of the request; the protocol
    /// allows both.
    pub fn version<T>(self, version: T) -> Self
    where
        T: Into<bool>,
    {
        OAuthParameters {
            version: version.into(),
            ..self
        }
    }

    pub fn get_realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    /// Assemble the protocol parameter set (everything but `oauth_signature`).
    pub fn build(&self, consumer_key: &str, token: Option<&str>) -> ParameterSet {
        let mut params = ParameterSet::new();

        if let Some(ref callback) = self.callback {
            params.insert(OAUTH_CALLBACK_KEY, callback.as_ref());
        }
        params.insert(OAUTH_CONSUMER_KEY, consumer_key);
        let nonce = match self.nonce {
            Some(ref nonce) => nonce.to_string(),
            None => generate_nonce(),
        };
        params.insert(OAUTH_NONCE_KEY, nonce);
        params.insert(OAUTH_SIGNATURE_METHOD_KEY, HMAC_SHA1);
        let timestamp = self.timestamp.unwrap_or_else(unix_timestamp);
        params.insert(OAUTH_TIMESTAMP_KEY, timestamp.to_string());
        if let Some(token) = token {
            params.insert(OAUTH_TOKEN_KEY, token);
        }
        if let Some(ref verifier) = self.verifier {
            params.insert(OAUTH_VERIFIER_KEY, verifier.as_ref());
        }
        if self.version {
            params.insert(OAUTH_VERSION_KEY, OAUTH_VERSION);
        }

        params
    }
}

/// A fresh nonce: hex encoded SHA-1 of the current time and a random number.
pub fn generate_nonce() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let salt: u64 = rand::random();

    Sha1::new()
        .chain_update(nanos.to_string())
        .chain_update(salt.to_string())
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Seconds since the Unix epoch; a clock set before the epoch yields 0.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// A user addressed either by numeric id or by screen name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(u64),
    ScreenName(String),
}

impl UserRef {
    /// The request parameter identifying this user.
    pub fn to_parameter(&self) -> (&'static str, String) {
        match self {
            UserRef::Id(id) => ("user_id", id.to_string()),
            UserRef::ScreenName(name) => ("screen_name", name.clone()),
        }
    }
}

/// Serializes as the single `user_id` or `screen_name` pair, so a `UserRef`
/// can be passed straight to `.query()` or `.form()`.
impl Serialize for UserRef {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (key, value) = self.to_parameter();
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(key, &value)?;
        map.end()
    }
}

impl From<UserRef> for ParameterSet {
    fn from(user: UserRef) -> Self {
        std::iter::once(user.to_parameter()).collect()
    }
}

impl From<u64> for UserRef {
    fn from(id: u64) -> Self {
        UserRef::Id(id)
    }
}

impl From<&str> for UserRef {
    fn from(name: &str) -> Self {
        UserRef::ScreenName(name.to_string())
    }
}

impl From<String> for UserRef {
    fn from(name: String) -> Self {
        UserRef::ScreenName(name)
    }
}

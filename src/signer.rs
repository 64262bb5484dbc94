use std::borrow::Cow;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use http::Method;
use sha1::Sha1;
use url::Url;

use crate::encode::percent_encode;
use crate::{OAuthParameters, ParameterSet, SecretsProvider, OAUTH_SIGNATURE_KEY, REALM_KEY};

type HmacSha1 = Hmac<Sha1>;

/// Signs requests on behalf of a [`SecretsProvider`].
pub struct Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    secrets: &'a TSecretsProvider,
    parameters: OAuthParameters<'a>,
}

impl<TSecretsProvider> Clone for Signer<'_, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    fn clone(&self) -> Self {
        Signer {
            secrets: self.secrets,
            parameters: self.parameters.clone(),
        }
    }
}

impl<TSecretsProvider> fmt::Debug for Signer<'_, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("parameters", &self.parameters)
            .finish()
    }
}

impl<'a, TSecretsProvider> Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub fn new(secrets: &'a TSecretsProvider, parameters: OAuthParameters<'a>) -> Self {
        Signer {
            secrets,
            parameters,
        }
    }

    /// Sign a request.
    ///
    /// Query pairs of `url` and the `payload` (form body pairs) take part in
    /// the signature; the returned [`SignedRequest`] only carries the
    /// `oauth_*` parameters, `oauth_signature` included.
    pub fn generate_signature(
        &self,
        method: &Method,
        url: &Url,
        payload: &ParameterSet,
    ) -> SignedRequest {
        let (consumer_key, consumer_secret) = self.secrets.get_consumer_key_pair();
        let (token, token_secret) = self.secrets.get_token_option_pair();

        let mut protocol = self.parameters.build(consumer_key, token);

        // caller parameters never override the protocol ones
        let mut signed = protocol.clone();
        signed.extend(
            url.query_pairs()
                .chain(payload.iter().map(|(k, v)| (Cow::from(k), Cow::from(v))))
                .filter(|(k, _)| !protocol.contains_key(k)),
        );

        let base = base_string(method.as_str(), base_string_uri(url).as_str(), &signed);
        protocol.insert(
            OAUTH_SIGNATURE_KEY,
            digest(&base, consumer_secret, token_secret),
        );

        SignedRequest {
            parameters: protocol,
            realm: self.parameters.get_realm().map(ToString::to_string),
        }
    }
}

/// Output of [`Signer::generate_signature`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    parameters: ParameterSet,
    realm: Option<String>,
}

impl SignedRequest {
    /// Protocol parameters, `oauth_signature` included.
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// The base64 signature, not yet percent-encoded.
    pub fn signature(&self) -> &str {
        self.parameters.get(OAUTH_SIGNATURE_KEY).unwrap_or_default()
    }

    /// `Authorization` header value for body bearing requests.
    pub fn authorization_header(&self) -> String {
        authorization_header(&self.parameters, self.realm.as_deref())
    }

    /// `url` with the protocol parameters appended, for GET requests.
    pub fn signed_url(&self, url: &str) -> String {
        signed_url(url, &self.parameters)
    }
}

/// The URL as it enters the base string: no query, no fragment.
fn base_string_uri(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_query(None);
    base.set_fragment(None);
    base
}

/// Signature base string (RFC 5849, section 3.4.1).
///
/// `parameters` must not contain `oauth_signature`.
pub fn base_string(method: &str, url: &str, parameters: &ParameterSet) -> String {
    let parameter_string = parameters
        .normalized()
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(url),
        percent_encode(&parameter_string)
    )
}

/// `enc(consumer_secret)&enc(token_secret)`; the token part is empty when
/// there is no token yet.
pub fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or_default())
    )
}

/// HMAC-SHA1 of `base`, base64 encoded.
pub fn digest(base: &str, consumer_secret: &str, token_secret: Option<&str>) -> String {
    let key = signing_key(consumer_secret, token_secret);
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(base.as_bytes());

    STANDARD.encode(mac.finalize().into_bytes())
}

/// [`digest`], percent-encoded and ready to be put on the wire.
pub fn sign(base: &str, consumer_secret: &str, token_secret: Option<&str>) -> String {
    percent_encode(&digest(base, consumer_secret, token_secret)).into_owned()
}

/// Render `OAuth k1="v1", k2="v2", ...` from the `oauth_*` entries of
/// `parameters`, sorted, each value percent-encoded once.
pub fn authorization_header(parameters: &ParameterSet, realm: Option<&str>) -> String {
    let mut items = Vec::with_capacity(parameters.len() + 1);
    if let Some(realm) = realm {
        items.push(format!("{}=\"{}\"", REALM_KEY, percent_encode(realm)));
    }
    items.extend(
        parameters
            .protocol()
            .normalized()
            .into_iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, v)),
    );

    format!("OAuth {}", items.join(", "))
}

/// Append `parameters` to the query of `url`.
///
/// A fragment stays at the end, after the appended query.
pub fn signed_url(url: &str, parameters: &ParameterSet) -> String {
    let (target, fragment) = match url.find('#') {
        Some(at) => url.split_at(at),
        None => (url, ""),
    };
    let mut signed = target.to_string();
    for (key, value) in parameters.iter() {
        signed.push(if signed.contains('?') { '&' } else { '?' });
        signed.push_str(&percent_encode(key));
        signed.push('=');
        signed.push_str(&percent_encode(value));
    }
    signed.push_str(fragment);
    signed
}

/*!
oauth1-signer: OAuth 1.0a request signing and token handshake for reqwest.

# Overview

This library signs HTTP requests with OAuth 1.0a (RFC 5849, HMAC-SHA1) and
drives the two step token handshake against a provider such as Twitter.

The signing core ([`base_string`], [`sign`], [`authorization_header`],
[`signed_url`]) is pure and usable on its own. [`OAuthClientProvider`] plugs
it into [`reqwest`](https://crates.io/crates/reqwest): GET requests are signed
through their query string, every other method through the `Authorization`
header.

# How to use

## Basic usecase 1 - sending the tweet

```rust,no_run
use oauth1_signer::{OAuthClientProvider, Secrets};

# async fn run() -> oauth1_signer::Result<()> {
// prepare authorization info
let secrets = Secrets::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]")
    .token("[ACCESS_TOKEN]", "[TOKEN_SECRET]");

// sample: send new tweet to twitter
let endpoint = "https://api.twitter.com/1.1/statuses/update.json";

let resp = reqwest::Client::new()
    // enable OAuth1 request
    .oauth1(&secrets)
    .post(endpoint)
    .form(&[("status", "Hello, Twitter!")])
    .send()
    .await?;
# let _ = resp;
# Ok(())
# }
```

## Basic usecase 2 - Acquiring OAuth token & secret

```rust,no_run
use oauth1_signer::{AuthState, Credentials, Handshake};

# async fn run() -> oauth1_signer::Result<()> {
let credentials = Credentials::new("[CONSUMER_KEY]", "[CONSUMER_SECRET]");
let handshake = Handshake::new(credentials, "oob", reqwest::Client::new());

// step 1: acquire request token & token secret
let state = handshake.request_token(&AuthState::Unauthenticated).await?;

// step 2. acquire user pin
println!("please access to: {}", handshake.authorize_url(&state)?);
let pin = "[PIN]";

// step 3. acquire access token
let state = handshake.access_token(&state, pin).await?;
if let Some(token) = state.token() {
    println!("your token is: {}", token.key);
}
# Ok(())
# }
```

For web flows spanning the authorization redirect, see
[`Handshake::authenticate`] and [`TokenStore`].
*/
mod client;
mod encode;
mod error;
mod handshake;
mod parameters;
mod request;
mod secrets;
mod signer;
mod store;
mod token_reader;
mod transport;

// exposed to external program
pub use client::{Client, OAuthClientProvider};
pub use encode::{percent_encode, percent_encode_all};
pub use error::{Error, Result, SignError, SignResult, TokenReaderError, TokenReaderResult};
pub use handshake::{AuthOutcome, AuthState, CallbackParams, Endpoints, Handshake};
pub use parameters::{generate_nonce, unix_timestamp, OAuthParameters, ParameterSet, UserRef};
pub use request::RequestBuilder;
pub use secrets::{Credentials, Secrets, SecretsProvider, Token};
pub use signer::{
    authorization_header, base_string, digest, sign, signed_url, signing_key, SignedRequest,
    Signer,
};
pub use store::{MemoryStore, StoredToken, TokenKind, TokenStore};
pub use token_reader::{read_oauth_token, TokenReader, TokenReaderFuture, TokenResponse};
pub use transport::{HttpResponse, Transport, TransportRequest};

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_nonce`.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";
/// Represents `oauth_signature`.
pub const OAUTH_SIGNATURE_KEY: &str = "oauth_signature";
/// Represents `oauth_timestamp`.
pub const OAUTH_TIMESTAMP_KEY: &str = "oauth_timestamp";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `oauth_version`.
pub const OAUTH_VERSION_KEY: &str = "oauth_version";
/// Represents `realm`.
pub const REALM_KEY: &str = "realm";

// crate-private constant variables
pub(crate) const OAUTH_KEY_PREFIX: &str = "oauth_";
pub(crate) const OAUTH_SIGNATURE_METHOD_KEY: &str = "oauth_signature_method";
pub(crate) const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
pub(crate) const OAUTH_TOKEN_KEY: &str = "oauth_token";
pub(crate) const HMAC_SHA1: &str = "HMAC-SHA1";
pub(crate) const OAUTH_VERSION: &str = "1.0";

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type SignResult<T> = std::result::Result<T, SignError>;
pub type TokenReaderResult<T> = std::result::Result<T, TokenReaderError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed token response : {0}")]
    MalformedResponse(String),
    #[error("provider rejected the request with status {status} : {body}")]
    RemoteRejection { status: u16, body: String },
    #[error("invalid argument : {0}")]
    InvalidArgument(String),
    #[error("token acquisition failed : {0}")]
    TokenReader(#[from] TokenReaderError),
    #[error("OAuth sign failed : {0}")]
    Signer(#[from] SignError),
    #[error("request failed : {0}")]
    Reqwest(#[from] reqwest::Error),
}

#[derive(Error, Debug, Clone)]
pub enum SignError {
    #[error("signed Authorization header is not a valid header value : {0}")]
    InvalidHeader(String),
    #[error("signed URL could not be parsed : {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Error, Debug, Clone)]
pub enum TokenReaderError {
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
}

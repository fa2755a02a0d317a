use serde::Deserialize;
use std::fmt::{self, Display};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every way a call against the tracking server can fail.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable HTTP exchange took place.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },
    /// The server understood the request and refused it.
    #[error("{status} {code}: {message}")]
    Rejected {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    /// Any status that is neither a success nor a well-formed rejection.
    #[error("unexpected {status} response:\n{body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("serializing request failed: {0}")]
    Serialize(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("deserializing response failed: {source}\n{body}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
        body: String,
    },
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// The service error code, if the server rejected the request.
    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            Error::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(&ErrorCode::ResourceDoesNotExist)
    }

    pub fn is_already_exists(&self) -> bool {
        self.code() == Some(&ErrorCode::ResourceAlreadyExists)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("reading response failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// The `error_code`/`message` envelope the server puts into rejections.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    pub error_code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ErrorCode {
    ResourceAlreadyExists,
    ResourceDoesNotExist,
    InvalidParameterValue,
    InvalidState,
    BadRequest,
    PermissionDenied,
    EndpointNotFound,
    InternalError,
    Unknown(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::ResourceAlreadyExists => "RESOURCE_ALREADY_EXISTS",
            ErrorCode::ResourceDoesNotExist => "RESOURCE_DOES_NOT_EXIST",
            ErrorCode::InvalidParameterValue => "INVALID_PARAMETER_VALUE",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::EndpointNotFound => "ENDPOINT_NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::Unknown(code) => code,
        }
    }
}

impl From<String> for ErrorCode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "RESOURCE_ALREADY_EXISTS" => ErrorCode::ResourceAlreadyExists,
            "RESOURCE_DOES_NOT_EXIST" => ErrorCode::ResourceDoesNotExist,
            "INVALID_PARAMETER_VALUE" => ErrorCode::InvalidParameterValue,
            "INVALID_STATE" => ErrorCode::InvalidState,
            "BAD_REQUEST" => ErrorCode::BadRequest,
            "PERMISSION_DENIED" => ErrorCode::PermissionDenied,
            "ENDPOINT_NOT_FOUND" => ErrorCode::EndpointNotFound,
            "INTERNAL_ERROR" => ErrorCode::InternalError,
            _ => ErrorCode::Unknown(value),
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("only up to 1000 items can be logged at once, found {0}")]
    TooManyItems(usize),
    #[error("only up to 1000 metrics can be logged at once, found {0}")]
    TooManyMetrics(usize),
    #[error("only up to 100 params can be logged at once, found {0}")]
    TooManyParams(usize),
    #[error("only up to 100 tags can be logged at once, found {0}")]
    TooManyTags(usize),
}

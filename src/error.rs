use serde::{de::DeserializeOwned, Deserialize, Serialize};
use snafu::Snafu;
use tide::StatusCode;

/// Errors which can be serialized in a response body.
///
/// When a request fails for any reason, the body of the response will contain a serialization of
/// the error that caused the failure. If the error is an instance of the API's error type it is
/// serialized as is; other errors (such as those generated by the [tide] framework) are converted
/// to strings using their [Display](std::fmt::Display) instance and wrapped using [catch_all].
///
/// [catch_all]: Error::catch_all
pub trait Error: std::error::Error + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn catch_all(msg: String) -> Self;
    fn status(&self) -> StatusCode;

    /// Convert from a generic HTTP error to a specific error type.
    ///
    /// If `source` can be downcast to `Self`, it is simply downcasted. Otherwise, it is converted
    /// to a [String] using [Display](std::fmt::Display) and then converted to `Self` using
    /// [catch_all](Error::catch_all).
    fn from_client_error(source: surf::Error) -> Self {
        match source.downcast::<Self>() {
            Ok(err) => err,
            Err(err) => Self::catch_all(err.to_string()),
        }
    }
}

/// Convert a concrete error type into a server error.
///
/// The error is embedded in a [tide::Error] using the status code indicated by
/// [Error::status], where the `add_error_body` middleware can recover it.
pub fn server_error<E: Error>(error: E) -> tide::Error {
    tide::Error::new(error.status(), error)
}

/// Everything that can go wrong while serving a record search.
#[derive(Clone, Debug, Snafu, Serialize, Deserialize, PartialEq, Eq)]
#[snafu(visibility(pub))]
#[serde(into = "ErrorBody", from = "ErrorBody")]
pub enum ProxyError {
    /// A query parameter failed its range or option check.
    #[snafu(display("{}", message))]
    InvalidParameter { message: String },

    /// The upstream search could not be completed or answered with something unusable.
    #[snafu(display("upstream search failed: {}", message))]
    UpstreamFailure { message: String },

    #[snafu(display("{}", message))]
    Internal { message: String },
}

impl ProxyError {
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidParameter { message }
            | Self::UpstreamFailure { message }
            | Self::Internal { message } => message,
        }
    }
}

impl Error for ProxyError {
    fn catch_all(message: String) -> Self {
        Self::Internal { message }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidParameter { .. } => StatusCode::BadRequest,
            Self::UpstreamFailure { .. } => StatusCode::BadGateway,
            Self::Internal { .. } => StatusCode::InternalServerError,
        }
    }
}

/// Wire shape of an error response: `{"code": 400, "message": "..."}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl From<ProxyError> for ErrorBody {
    fn from(error: ProxyError) -> Self {
        let code = error.status() as u16;
        let message = match error {
            ProxyError::InvalidParameter { message }
            | ProxyError::UpstreamFailure { message }
            | ProxyError::Internal { message } => message,
        };
        Self { code, message }
    }
}

impl From<ErrorBody> for ProxyError {
    fn from(body: ErrorBody) -> Self {
        let ErrorBody { code, message } = body;
        match code {
            400 => Self::InvalidParameter { message },
            502 => Self::UpstreamFailure { message },
            _ => Self::Internal { message },
        }
    }
}

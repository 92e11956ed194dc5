use serde_json::Value;
use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error codes the platform uses for an invalid or expired access token.
pub const CREDENTIAL_EXPIRED_CODES: [i64; 3] = [40001, 40014, 42001];

/// Error code returned when the recipient no longer follows the account.
pub const USER_UNSUBSCRIBED_CODE: i64 = 43004;

/// Errors returned by the SDK.
///
/// Only [`Error::CredentialExpired`] is ever recovered locally, by
/// [`run_with_credential`](crate::CredentialManagerExt::run_with_credential).
/// Everything else surfaces to the caller unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// The credential used for the call is invalid or has been superseded.
    /// Transient: retried once after a forced refresh.
    #[error("access token expired or invalid (errcode={code}): {message}")]
    CredentialExpired { code: i64, message: String },

    /// The target recipient has unsubscribed and cannot receive pushes.
    #[error("recipient has unsubscribed: {message}")]
    UserUnsubscribed { message: String },

    /// Any other non-zero platform error code.
    #[error("platform error (errcode={code}): {message}")]
    Api { code: i64, message: String },

    /// Inbound discriminator with no registered variant.
    #[error("unknown {family} variant: {tag:?}")]
    UnknownVariant { family: &'static str, tag: String },

    /// Network-level failure from the HTTP client.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Malformed inbound or outbound payload.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A background task was requested outside a tokio runtime.
    #[error("no tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Failure raised by a user-supplied webhook handler.
    #[error("handler error: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Wrap an arbitrary handler failure.
    pub fn handler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Handler(err.into())
    }

    pub fn is_credential_expired(&self) -> bool {
        matches!(self, Error::CredentialExpired { .. })
    }
}

/// Inspect a decoded API response body.
///
/// Returns the body unchanged when `errcode` is absent or zero, otherwise
/// the classified failure.
pub fn check_response(body: Value) -> Result<Value> {
    let code = body.get("errcode").and_then(Value::as_i64).unwrap_or(0);
    if code == 0 {
        return Ok(body);
    }

    let message = body
        .get("errmsg")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Err(classify(code, message))
}

/// Map a non-zero platform error code to its error kind.
pub fn classify(code: i64, message: String) -> Error {
    if CREDENTIAL_EXPIRED_CODES.contains(&code) {
        Error::CredentialExpired { code, message }
    } else if code == USER_UNSUBSCRIBED_CODE {
        Error::UserUnsubscribed { message }
    } else {
        Error::Api { code, message }
    }
}

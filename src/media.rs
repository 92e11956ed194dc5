use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Mime type assumed when the source does not say.
pub const DEFAULT_MEDIA_MIME: &str = "image/jpg";

#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    pub media_id: String,
}

/// Decoded upload payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaData {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl MediaData {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// Decode base64 input.
    ///
    /// `data` may be a data URL (`data:<mime>;base64,<payload>`), whose mime
    /// is used unless `mime` overrides it. Plain base64 falls back to
    /// [`DEFAULT_MEDIA_MIME`].
    pub fn from_base64(data: &str, mime: Option<&str>) -> Result<Self> {
        let (embedded, payload) = match data.split_once(";base64,") {
            Some((head, payload)) => (head.split_once(':').map(|(_, m)| m), payload),
            None => (None, data),
        };

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::decode(format!("invalid base64 media: {e}")))?;
        let mime = mime.or(embedded).unwrap_or(DEFAULT_MEDIA_MIME);

        Ok(Self::new(bytes, mime))
    }

    /// Upload file name, `media_<millis>.<subtype>`.
    pub fn file_name(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        format!("media_{}.{}", millis, mime_extension(&self.mime))
    }
}

/// Subtype of a mime type, used as file extension (`image/png` -> `png`).
pub fn mime_extension(mime: &str) -> &str {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    essence
        .split_once('/')
        .map(|(_, sub)| sub)
        .filter(|sub| !sub.is_empty())
        .unwrap_or("bin")
}

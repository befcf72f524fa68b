//! Inline file payloads encoded as `data:` URLs.
//!
//! Format: `data:<mime>[;param]*[;base64],<data>`. The host stores attachments
//! this way; the sync layer uploads the decoded bytes and keeps only the
//! returned URL.

use base64::{engine::general_purpose::STANDARD, Engine};

/// Prefix that identifies an inline payload.
pub const DATA_URL_MARKER: &str = "data:";

const DEFAULT_MIME: &str = "application/octet-stream";

/// A decoded inline payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime: String,
    bytes: Vec<u8>,
}

impl DataUrl {
    /// Creates a payload from raw parts.
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    /// Returns true if the string carries the data-URL marker.
    pub fn is_data_url(value: &str) -> bool {
        value.starts_with(DATA_URL_MARKER)
    }

    /// Parses and decodes a data URL.
    pub fn parse(value: &str) -> crate::Result<Self> {
        let rest = value
            .strip_prefix(DATA_URL_MARKER)
            .ok_or_else(|| crate::Error::InvalidDataUrl("missing data: marker".to_string()))?;

        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| crate::Error::InvalidDataUrl("missing ',' separator".to_string()))?;

        let mut params = header.split(';');
        let mime = params.next().map(str::trim).unwrap_or_default();
        let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

        let bytes = if is_base64 {
            STANDARD
                .decode(data.trim())
                .map_err(|e| crate::Error::InvalidDataUrl(format!("bad base64 payload: {e}")))?
        } else {
            urlencoding::decode_binary(data.as_bytes()).into_owned()
        };

        Ok(Self {
            mime: if mime.is_empty() {
                DEFAULT_MIME.to_string()
            } else {
                mime.to_string()
            },
            bytes,
        })
    }

    /// MIME type declared by the marker.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Decoded payload.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the payload, returning the decoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// File extension derived from the MIME subtype.
    pub fn extension(&self) -> &str {
        self.mime
            .split_once('/')
            .map(|(_, sub)| sub)
            .filter(|sub| !sub.is_empty())
            .unwrap_or("bin")
    }

    /// Upload filename. The server renames files, so only the extension matters.
    pub fn filename(&self) -> String {
        format!("upload.{}", self.extension())
    }
}

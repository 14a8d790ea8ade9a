//! Self-describing image payloads.
//!
//! Callers hand images over as `data:<mime>;base64,<data>` strings. Parsing is
//! split in two steps so the declared type can be checked before any base64
//! decoding happens.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Serialize, Serializer};

use crate::error::NormalizeError;

/// A data URL whose header has been parsed but whose body is still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl<'a> {
    /// Declared MIME type, lowercased
    pub mime_type: String,
    /// Base64 text after the comma
    pub encoded: &'a str,
}

impl<'a> DataUrl<'a> {
    /// Split a `data:<mime>[;param]*;base64,<data>` string.
    ///
    /// # Errors
    /// `Empty` for blank input, `MalformedEnvelope` when the header cannot be
    /// parsed or the payload is not base64-encoded.
    pub fn parse(input: &'a str) -> Result<Self, NormalizeError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(NormalizeError::Empty);
        }

        let rest = input
            .get(..5)
            .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
            .map(|_| &input[5..])
            .ok_or_else(|| NormalizeError::malformed("expected a data: URL"))?;

        let (header, encoded) = rest
            .split_once(',')
            .ok_or_else(|| NormalizeError::malformed("missing ',' between header and data"))?;

        let mut params = header.split(';').map(str::trim);
        let mime_type = params.next().unwrap_or_default().to_ascii_lowercase();
        if mime_type.is_empty() || !mime_type.contains('/') {
            return Err(NormalizeError::malformed("missing MIME type"));
        }
        if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
            return Err(NormalizeError::malformed("payload is not base64-encoded"));
        }

        Ok(Self { mime_type, encoded })
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Decode the base64 body. Embedded whitespace is ignored.
    pub fn decode(&self) -> Result<Bytes, NormalizeError> {
        let compact: String = self
            .encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        STANDARD
            .decode(compact.as_bytes())
            .map(Bytes::from)
            .map_err(|e| NormalizeError::CorruptEncoding(e.to_string()))
    }
}

/// A binary image payload labelled with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImagePayload {
    mime_type: String,
    data: Bytes,
}

impl EncodedImagePayload {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into().to_ascii_lowercase(),
            data: data.into(),
        }
    }

    /// Parse and decode a data URL in one go.
    pub fn from_data_url(input: &str) -> Result<Self, NormalizeError> {
        let url = DataUrl::parse(input)?;
        let data = url.decode()?;
        Ok(Self {
            mime_type: url.mime_type,
            data,
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `data:<mime>;base64,<data>`
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

impl Serialize for EncodedImagePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_url() {
        let url = DataUrl::parse("data:image/PNG;base64,aGVsbG8=").unwrap();
        assert_eq!(url.mime_type, "image/png");
        assert_eq!(url.encoded, "aGVsbG8=");
        assert!(url.is_image());
        assert_eq!(url.decode().unwrap(), Bytes::from_static(b"hello"));
    }

    #[test]
    fn test_parse_with_extra_params() {
        let url = DataUrl::parse("data:image/jpeg;name=a.jpg;base64,/9j/").unwrap();
        assert_eq!(url.mime_type, "image/jpeg");
        assert_eq!(url.decode().unwrap().as_ref(), &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(DataUrl::parse("   "), Err(NormalizeError::Empty)));
        assert!(matches!(
            DataUrl::parse("aGVsbG8="),
            Err(NormalizeError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            DataUrl::parse("data:image/png;base64"),
            Err(NormalizeError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            DataUrl::parse("data:image/png,rawtext"),
            Err(NormalizeError::MalformedEnvelope(_))
        ));
        assert!(matches!(
            DataUrl::parse("data:;base64,aGVsbG8="),
            Err(NormalizeError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_decode_ignores_whitespace_and_rejects_garbage() {
        let url = DataUrl::parse("data:image/png;base64,aGVs\nbG8=").unwrap();
        assert_eq!(url.decode().unwrap(), Bytes::from_static(b"hello"));

        let url = DataUrl::parse("data:image/png;base64,!!!not base64!!!").unwrap();
        assert!(matches!(url.decode(), Err(NormalizeError::CorruptEncoding(_))));
    }

    #[test]
    fn test_payload_data_url_round_trip() {
        let payload = EncodedImagePayload::new("image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xD9]);
        let url = payload.to_data_url();
        assert_eq!(url, "data:image/jpeg;base64,/9j/2Q==");
        assert_eq!(EncodedImagePayload::from_data_url(&url).unwrap(), payload);
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::Value::String(url)
        );
    }
}

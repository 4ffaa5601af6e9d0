use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use bytes::Bytes;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::errors::ServiceError;

/// Image formats accepted for uploads, identified from file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageKind::Png)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else {
            None
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
        }
    }
}

/// A file part of a multipart submission.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn kind(&self) -> Option<ImageKind> {
        ImageKind::sniff(&self.bytes)
    }
}

#[derive(Debug, Clone)]
pub enum FieldValue {
    Empty,
    Text(String),
    File(UploadedFile),
}

impl FieldValue {
    fn text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Accepts an optional sign followed by digits, nothing else.
pub fn decode_integer(raw: &str) -> Option<i32> {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

pub fn decode_decimal(raw: &str) -> Option<Decimal> {
    let (sign, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !digits_only(whole) || !digits_only(frac) {
        return None;
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let normalized = if frac.is_empty() {
        format!("{sign}{whole}")
    } else {
        format!("{sign}{whole}.{frac}")
    };
    Decimal::from_str(&normalized).ok()
}

pub fn decode_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// A submitted form, decoded from JSON, urlencoded or multipart bodies into
/// one shape so validation never sees the transport.
#[derive(Debug, Clone, Default)]
pub struct FormInput {
    fields: BTreeMap<String, FieldValue>,
}

impl FormInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn with_text(mut self, key: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.insert(key, FieldValue::text(value.as_ref()));
        self
    }

    pub fn with_file(mut self, key: impl Into<String>, file: UploadedFile) -> Self {
        self.insert(key, FieldValue::File(file));
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(FieldValue::as_text)
    }

    pub fn file(&self, key: &str) -> Option<&UploadedFile> {
        match self.get(key) {
            Some(FieldValue::File(file)) => Some(file),
            _ => None,
        }
    }

    pub fn required_text(&self, key: &str) -> Result<String, ServiceError> {
        self.text(key)
            .map(str::to_string)
            .ok_or_else(|| unvalidated(key))
    }

    pub fn integer(&self, key: &str) -> Result<i32, ServiceError> {
        self.text(key)
            .and_then(decode_integer)
            .ok_or_else(|| unvalidated(key))
    }

    pub fn decimal(&self, key: &str) -> Result<Decimal, ServiceError> {
        self.text(key)
            .and_then(decode_decimal)
            .ok_or_else(|| unvalidated(key))
    }

    pub fn boolean(&self, key: &str) -> Result<bool, ServiceError> {
        self.text(key)
            .and_then(decode_bool)
            .ok_or_else(|| unvalidated(key))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut input = Self::new();
        for (key, value) in pairs {
            input.insert(key, FieldValue::text(value.as_ref()));
        }
        input
    }

    pub fn from_json(value: Value) -> Result<Self, ServiceError> {
        let Value::Object(map) = value else {
            return Err(ServiceError::BadRequest(
                "Expected a JSON object".to_string(),
            ));
        };

        let mut input = Self::new();
        for (key, value) in map {
            let field = match value {
                Value::Null => FieldValue::Empty,
                Value::String(s) => FieldValue::text(&s),
                Value::Number(n) => FieldValue::Text(n.to_string()),
                Value::Bool(b) => FieldValue::Text(b.to_string()),
                Value::Array(_) | Value::Object(_) => {
                    return Err(ServiceError::BadRequest(format!(
                        "Field '{}' must be a scalar value",
                        key
                    )))
                }
            };
            input.insert(key, field);
        }
        Ok(input)
    }

    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, ServiceError> {
        let mut input = Self::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ServiceError::BadRequest(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServiceError::BadRequest(e.body_text()))?;

            let value = match file_name {
                // Browsers send an empty part when no file was chosen.
                Some(_) if bytes.is_empty() => FieldValue::Empty,
                Some(file_name) => FieldValue::File(UploadedFile {
                    file_name: Some(file_name),
                    content_type,
                    bytes,
                }),
                None => FieldValue::text(&String::from_utf8_lossy(&bytes)),
            };
            input.insert(name, value);
        }
        Ok(input)
    }
}

fn unvalidated(key: &str) -> ServiceError {
    ServiceError::InternalError(format!("field '{}' used before validation", key))
}

#[async_trait]
impl<S> FromRequest<S> for FormInput
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ServiceError::BadRequest(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| ServiceError::BadRequest(e.body_text()))?;
            Ok(Self::from_pairs(pairs))
        } else if content_type.starts_with("application/json") {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| ServiceError::BadRequest(e.body_text()))?;
            Self::from_json(value)
        } else {
            Err(ServiceError::BadRequest(format!(
                "Unsupported content type '{}'",
                content_type
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn json_scalars_decode_to_text() {
        let input = FormInput::from_json(json!({
            "name": "  Oil Filter ",
            "stock": 10,
            "status": true,
            "description": null,
            "slug": "   ",
        }))
        .unwrap();

        assert_eq!(input.text("name"), Some("Oil Filter"));
        assert_eq!(input.integer("stock").unwrap(), 10);
        assert!(input.boolean("status").unwrap());
        assert!(input.get("description").unwrap().is_empty());
        assert!(input.get("slug").unwrap().is_empty());
        assert!(!input.contains("price"));
    }

    #[test]
    fn nested_json_is_rejected() {
        let err = FormInput::from_json(json!({ "name": ["a"] })).unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
        assert!(FormInput::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn integer_decode_fails_closed() {
        assert_eq!(decode_integer("42"), Some(42));
        assert_eq!(decode_integer("-3"), Some(-3));
        assert_eq!(decode_integer("+7"), Some(7));
        assert_eq!(decode_integer("4.0"), None);
        assert_eq!(decode_integer("1e3"), None);
        assert_eq!(decode_integer("abc"), None);
        assert_eq!(decode_integer("-"), None);
        assert_eq!(decode_integer("99999999999"), None);
    }

    #[test]
    fn decimal_decode_fails_closed() {
        assert_eq!(decode_decimal("9.99"), Some(dec!(9.99)));
        assert_eq!(decode_decimal("5"), Some(dec!(5)));
        assert_eq!(decode_decimal(".5"), Some(dec!(0.5)));
        assert_eq!(decode_decimal("-0.01"), Some(dec!(-0.01)));
        assert_eq!(decode_decimal("1,000"), None);
        assert_eq!(decode_decimal("1e2"), None);
        assert_eq!(decode_decimal("."), None);
        assert_eq!(decode_decimal("ten"), None);
    }

    #[test]
    fn boolean_decode_accepts_form_spellings_only() {
        for raw in ["true", "TRUE", "1", "on", "yes"] {
            assert_eq!(decode_bool(raw), Some(true), "{raw}");
        }
        for raw in ["false", "0", "off", "No"] {
            assert_eq!(decode_bool(raw), Some(false), "{raw}");
        }
        assert_eq!(decode_bool("2"), None);
        assert_eq!(decode_bool("maybe"), None);
    }

    #[test]
    fn image_kinds_are_sniffed_from_content() {
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(
            ImageKind::sniff(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            Some(ImageKind::Png)
        );
        assert_eq!(ImageKind::sniff(b"RIFF\x24\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
        assert_eq!(ImageKind::sniff(b"GIF89a"), None);
        assert_eq!(ImageKind::sniff(b"RIFF"), None);
    }
}

//! Data types: a runtime type name plus a media type.
//!
//! A `DataType` is the vertex identity of the transformation graph, so equality
//! and hashing cover both the type name and the full media type (charset included).
//! Matching for resolution purposes goes through [`DataType::is_compatible_with`]
//! instead, which is looser.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::MediaTypeError;

const WILDCARD: &str = "*";

/// A `type/subtype` media type with an optional charset.
///
/// Primary type and subtype are stored lower-cased and the charset upper-cased,
/// so two spellings of the same media type compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    primary: Cow<'static, str>,
    sub: Cow<'static, str>,
    charset: Option<Cow<'static, str>>,
}

impl MediaType {
    /// `*/*`, matches every media type.
    pub const ANY: MediaType = MediaType::from_static("*", "*");
    /// `text/plain`
    pub const TEXT: MediaType = MediaType::from_static("text", "plain");
    /// `application/json`
    pub const JSON: MediaType = MediaType::from_static("application", "json");
    /// `application/xml`
    pub const XML: MediaType = MediaType::from_static("application", "xml");
    /// `application/octet-stream`
    pub const BINARY: MediaType = MediaType::from_static("application", "octet-stream");

    /// Create a media type from already lower-cased static parts.
    pub const fn from_static(primary: &'static str, sub: &'static str) -> Self {
        Self {
            primary: Cow::Borrowed(primary),
            sub: Cow::Borrowed(sub),
            charset: None,
        }
    }

    /// Create a media type from its primary type and subtype.
    pub fn new(primary: &str, sub: &str) -> Self {
        Self {
            primary: Cow::Owned(primary.trim().to_ascii_lowercase()),
            sub: Cow::Owned(sub.trim().to_ascii_lowercase()),
            charset: None,
        }
    }

    /// Parse a media type such as `text/plain; charset=utf-8`.
    ///
    /// Parameters other than `charset` are accepted and dropped.
    pub fn parse(input: &str) -> Result<Self, MediaTypeError> {
        let mut parts = input.split(';');
        let essence = parts.next().map(str::trim).unwrap_or_default();
        if essence.is_empty() {
            return Err(MediaTypeError::Empty);
        }

        let (primary, sub) = essence
            .split_once('/')
            .filter(|(p, s)| is_token(p.trim()) && is_token(s.trim()))
            .ok_or_else(|| MediaTypeError::Malformed(input.to_string()))?;

        let mut media_type = Self::new(primary, sub);
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| MediaTypeError::InvalidParameter(param.to_string()))?;
            let value = value.trim().trim_matches('"');
            if value.is_empty() {
                return Err(MediaTypeError::InvalidParameter(param.to_string()));
            }
            if key.trim().eq_ignore_ascii_case("charset") {
                media_type = media_type.with_charset(value);
            }
        }
        Ok(media_type)
    }

    /// The primary type, e.g. `text`.
    pub fn primary_type(&self) -> &str {
        &self.primary
    }

    /// The subtype, e.g. `plain`.
    pub fn sub_type(&self) -> &str {
        &self.sub
    }

    /// The charset parameter, if any.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Returns a copy carrying the given charset.
    pub fn with_charset(mut self, charset: &str) -> Self {
        self.charset = Some(Cow::Owned(charset.trim().to_ascii_uppercase()));
        self
    }

    /// Returns a copy without a charset.
    pub fn without_charset(mut self) -> Self {
        self.charset = None;
        self
    }

    /// Whether this is `*/*`, regardless of charset.
    pub fn is_any(&self) -> bool {
        self.primary == WILDCARD && self.sub == WILDCARD
    }

    /// Whether the two media types match, treating `*` as a wildcard on either
    /// side. Parameters are ignored.
    pub fn matches(&self, other: &MediaType) -> bool {
        let primary = self.primary == WILDCARD
            || other.primary == WILDCARD
            || self.primary == other.primary;
        let sub = self.sub == WILDCARD || other.sub == WILDCARD || self.sub == other.sub;
        primary && sub
    }
}

impl Default for MediaType {
    fn default() -> Self {
        Self::ANY
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.primary, self.sub)?;
        if let Some(charset) = &self.charset {
            write!(f, "; charset={charset}")?;
        }
        Ok(())
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+*".contains(c))
}

/// Describes a runtime value: its type name plus a media type.
///
/// # Example
///
/// ```rust
/// use transform_registry::{DataType, MediaType};
///
/// let json = DataType::STRING.with_media_type(MediaType::JSON);
/// assert!(DataType::STRING.is_compatible_with(&json));
/// assert!(!json.is_compatible_with(&DataType::STRING.with_media_type(MediaType::XML)));
/// assert!(DataType::OBJECT.is_compatible_with(&DataType::BYTES));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataType {
    type_name: Cow<'static, str>,
    media_type: MediaType,
}

impl DataType {
    /// The top type, assignable from every other type.
    pub const OBJECT: DataType = DataType::from_static("object");
    /// Text values.
    pub const STRING: DataType = DataType::from_static("string");
    /// Byte arrays.
    pub const BYTES: DataType = DataType::from_static("bytes");
    /// Streams of bytes.
    pub const INPUT_STREAM: DataType = DataType::from_static("input-stream");
    /// Numeric values.
    pub const NUMBER: DataType = DataType::from_static("number");
    /// Boolean values.
    pub const BOOLEAN: DataType = DataType::from_static("boolean");

    /// Create a data type with any media type from a static name.
    pub const fn from_static(type_name: &'static str) -> Self {
        Self {
            type_name: Cow::Borrowed(type_name),
            media_type: MediaType::ANY,
        }
    }

    /// Create a data type with any media type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Cow::Owned(type_name.into()),
            media_type: MediaType::ANY,
        }
    }

    /// Returns a copy with the given media type.
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    /// Returns a copy whose media type carries the given charset.
    pub fn with_charset(mut self, charset: &str) -> Self {
        self.media_type = self.media_type.with_charset(charset);
        self
    }

    /// The runtime type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The media type.
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// The charset, if the media type declares one.
    pub fn charset(&self) -> Option<&str> {
        self.media_type.charset()
    }

    /// Whether a value described by `other` can be used where `self` is expected.
    ///
    /// The type must be assignable (same name, or `self` is [`DataType::OBJECT`])
    /// and the media types must match, `*/*` on either side matching anything.
    pub fn is_compatible_with(&self, other: &DataType) -> bool {
        if self == other {
            return true;
        }
        let assignable = self.type_name == DataType::OBJECT.type_name
            || self.type_name == other.type_name;
        let media = self.media_type.is_any()
            || other.media_type.is_any()
            || self.media_type.matches(&other.media_type);
        assignable && media
    }

    /// The form used as a lookup key: media type widened to `*/*`, charset dropped.
    pub fn normalized_for_lookup(&self) -> DataType {
        Self {
            type_name: self.type_name.clone(),
            media_type: MediaType::ANY,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.type_name, self.media_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_type() {
        let media_type = MediaType::parse("Text/Plain; charset=utf-8").unwrap();
        assert_eq!(media_type.primary_type(), "text");
        assert_eq!(media_type.sub_type(), "plain");
        assert_eq!(media_type.charset(), Some("UTF-8"));
        assert_eq!(media_type.to_string(), "text/plain; charset=UTF-8");
    }

    #[test]
    fn test_parse_drops_unknown_parameters() {
        let media_type: MediaType = "application/json; q=0.9".parse().unwrap();
        assert_eq!(media_type, MediaType::JSON);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert_eq!(MediaType::parse("  "), Err(MediaTypeError::Empty));
        assert!(matches!(
            MediaType::parse("json"),
            Err(MediaTypeError::Malformed(_))
        ));
        assert!(matches!(
            MediaType::parse("text/plain; charset"),
            Err(MediaTypeError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_media_type_wildcards() {
        let any_text = MediaType::new("text", "*");
        assert!(any_text.matches(&MediaType::TEXT));
        assert!(MediaType::ANY.matches(&MediaType::JSON));
        assert!(!MediaType::JSON.matches(&MediaType::XML));
    }

    #[test]
    fn test_equality_covers_media_type_and_charset() {
        let utf8 = DataType::STRING.with_charset("UTF-8");
        assert_ne!(DataType::STRING, utf8);
        assert_eq!(utf8, DataType::new("string").with_charset("utf-8"));
    }

    #[test]
    fn test_compatibility() {
        let json = DataType::STRING.with_media_type(MediaType::JSON);
        let xml = DataType::STRING.with_media_type(MediaType::XML);

        assert!(DataType::STRING.is_compatible_with(&json));
        assert!(json.is_compatible_with(&DataType::STRING));
        assert!(!json.is_compatible_with(&xml));
        assert!(!DataType::STRING.is_compatible_with(&DataType::BYTES));
        assert!(DataType::OBJECT.is_compatible_with(&json));
        assert!(!json.is_compatible_with(&DataType::OBJECT.with_media_type(MediaType::XML)));
    }

    #[test]
    fn test_normalized_for_lookup() {
        let json = DataType::STRING
            .with_media_type(MediaType::JSON)
            .with_charset("UTF-8");
        assert_eq!(json.normalized_for_lookup(), DataType::STRING);
    }
}

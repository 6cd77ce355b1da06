use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::errors::HandshakeError;

pub const DNSTAP_CONTENT_TYPE: &str = "protobuf:dnstap.Dnstap";

/// Negotiated identifier of the data frame payload schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentType(Arc<str>);

impl ContentType {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl PartialEq<str> for ContentType {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

/// Whether a negotiated content type is private to one connection or shared
/// by every connection of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentTypeScope {
    #[default]
    Connection,
    Process,
}

/// Write-once content type slot.
///
/// The first successful negotiation fixes the value; every later offer must
/// match it exactly. Share one cell behind an `Arc` to make the type process
/// wide, or create one per connection.
#[derive(Debug, Default)]
pub struct ContentTypeCell {
    value: OnceLock<ContentType>,
}

impl ContentTypeCell {
    pub fn new() -> Self {
        Self {
            value: OnceLock::new(),
        }
    }

    pub fn preset(content_type: ContentType) -> Self {
        let value = OnceLock::new();
        let _ = value.set(content_type);
        Self { value }
    }

    pub fn get(&self) -> Option<&ContentType> {
        self.value.get()
    }

    /// Picks the content type to accept from the offered list.
    ///
    /// With nothing negotiated yet the first offer wins and is recorded.
    pub fn negotiate(&self, offered: &[String]) -> Result<ContentType, HandshakeError> {
        let first = offered.first().ok_or(HandshakeError::MissingContentType)?;
        let current = self.value.get_or_init(|| ContentType::from(first.as_str()));

        if offered.iter().any(|candidate| current == candidate.as_str()) {
            return Ok(current.clone());
        }

        Err(HandshakeError::TypeMismatch {
            expected: current.to_string(),
            received: offered.join(", "),
        })
    }
}

//! Ferrous Tap Domain Layer
pub mod config;
pub mod content_type;
pub mod decoded;
pub mod dns_message;
pub mod dnstap;
pub mod errors;
pub mod frame;
pub mod schema;

pub use config::{CliOverrides, Config, DispatchMode};
pub use content_type::{ContentType, ContentTypeCell, ContentTypeScope, DNSTAP_CONTENT_TYPE};
pub use decoded::{DecodedMessage, FieldEntry, FieldValue, UnknownField, WireValue};
pub use dns_message::{AnswerData, DnsAnswer, DnsMessageSummary, DnsQuestion, DnsRcode};
pub use errors::{ConnectionError, DecodeError, DomainError, FramingError, HandshakeError};
pub use frame::{ControlFrame, ControlType, Frame, FrameKind, MAX_CONTROL_FRAME_LENGTH};
pub use schema::{FieldDescriptor, FieldKind, Schema, SchemaBuilder, WireType};

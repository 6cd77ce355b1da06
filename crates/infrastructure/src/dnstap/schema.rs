use ferrous_tap_domain::dnstap::*;
use ferrous_tap_domain::{FieldKind, Schema};
use std::sync::{Arc, LazyLock};

static REGISTRY: LazyLock<SchemaRegistry> = LazyLock::new(SchemaRegistry::build);

/// The dnstap envelope and its embedded message schema.
///
/// Built once and read-only afterwards.
#[derive(Debug)]
pub struct SchemaRegistry {
    envelope: Arc<Schema>,
    message: Arc<Schema>,
}

impl SchemaRegistry {
    pub fn global() -> &'static SchemaRegistry {
        &REGISTRY
    }

    pub fn envelope(&self) -> &Schema {
        &self.envelope
    }

    pub fn message(&self) -> &Schema {
        &self.message
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        match name {
            ENVELOPE_SCHEMA => Some(&self.envelope),
            MESSAGE_SCHEMA => Some(&self.message),
            _ => None,
        }
    }

    fn build() -> Self {
        let message = Arc::new(
            Schema::builder(MESSAGE_SCHEMA)
                .field(FIELD_TYPE, 1, FieldKind::Enum(MESSAGE_TYPES))
                .field(FIELD_SOCKET_FAMILY, 2, FieldKind::Enum(SOCKET_FAMILIES))
                .field(FIELD_SOCKET_PROTOCOL, 3, FieldKind::Enum(SOCKET_PROTOCOLS))
                .field(FIELD_QUERY_ADDRESS, 4, FieldKind::IpAddress)
                .field(FIELD_RESPONSE_ADDRESS, 5, FieldKind::IpAddress)
                .field(FIELD_QUERY_PORT, 6, FieldKind::Varint)
                .field(FIELD_RESPONSE_PORT, 7, FieldKind::Varint)
                .field(FIELD_QUERY_TIME_SEC, 8, FieldKind::Varint)
                .field(FIELD_QUERY_TIME_NSEC, 9, FieldKind::Fixed32)
                .field(FIELD_QUERY_MESSAGE, 10, FieldKind::DnsWireMessage)
                .field(FIELD_QUERY_ZONE, 11, FieldKind::Opaque)
                .field(FIELD_RESPONSE_TIME_SEC, 12, FieldKind::Varint)
                .field(FIELD_RESPONSE_TIME_NSEC, 13, FieldKind::Fixed32)
                .field(FIELD_RESPONSE_MESSAGE, 14, FieldKind::DnsWireMessage)
                .build(),
        );

        let envelope = Arc::new(
            Schema::builder(ENVELOPE_SCHEMA)
                .field(FIELD_IDENTITY, 1, FieldKind::Bytes)
                .field(FIELD_VERSION, 2, FieldKind::Bytes)
                .field(FIELD_EXTRA, 3, FieldKind::Opaque)
                .field(FIELD_MESSAGE, 14, FieldKind::Embedded(message.clone()))
                .field(FIELD_TYPE, 15, FieldKind::Enum(DNSTAP_TYPES))
                .build(),
        );

        Self { envelope, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_ids() {
        let registry = SchemaRegistry::global();
        let envelope = registry.envelope();
        assert_eq!(envelope.len(), 5);
        assert_eq!(envelope.field(14).map(|f| f.name), Some(FIELD_MESSAGE));
        assert_eq!(envelope.field(15).map(|f| f.name), Some(FIELD_TYPE));
        assert!(envelope.field(4).is_none());
    }

    #[test]
    fn test_message_ids_are_contiguous() {
        let message = SchemaRegistry::global().message();
        assert_eq!(message.len(), 14);
        for id in 1..=14 {
            assert!(message.field(id).is_some(), "missing field id {}", id);
        }
        assert!(matches!(
            message.field_by_name(FIELD_RESPONSE_MESSAGE).map(|f| &f.kind),
            Some(FieldKind::DnsWireMessage)
        ));
    }

    #[test]
    fn test_lookup_by_schema_name() {
        let registry = SchemaRegistry::global();
        assert_eq!(registry.get("Dnstap").map(Schema::name), Some("Dnstap"));
        assert_eq!(registry.get("Message").map(Schema::name), Some("Message"));
        assert!(registry.get("Other").is_none());
    }
}

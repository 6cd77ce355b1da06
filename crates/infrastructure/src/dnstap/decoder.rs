use bytes::Bytes;
use ferrous_tap_application::ports::TapDecoder;
use ferrous_tap_domain::{DecodeError, DecodedMessage};

use super::schema::SchemaRegistry;
use crate::protobuf::WireDecoder;

/// Decodes data frames as dnstap envelopes.
pub struct DnstapDecoder {
    wire: WireDecoder,
    registry: &'static SchemaRegistry,
}

impl DnstapDecoder {
    pub fn new(wire: WireDecoder) -> Self {
        Self {
            wire,
            registry: SchemaRegistry::global(),
        }
    }
}

impl Default for DnstapDecoder {
    fn default() -> Self {
        Self::new(WireDecoder::new())
    }
}

impl TapDecoder for DnstapDecoder {
    fn decode(&self, payload: &Bytes) -> Result<DecodedMessage, DecodeError> {
        self.wire.decode_message(payload, self.registry.envelope())
    }
}

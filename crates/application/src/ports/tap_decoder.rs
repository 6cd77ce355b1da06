use bytes::Bytes;
use ferrous_tap_domain::{DecodeError, DecodedMessage};

/// Turns one data frame payload into a decoded envelope.
///
/// Decoding is pure and bounded, so it is synchronous.
pub trait TapDecoder: Send + Sync {
    fn decode(&self, payload: &Bytes) -> Result<DecodedMessage, DecodeError>;
}

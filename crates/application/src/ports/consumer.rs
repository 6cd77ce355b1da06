use async_trait::async_trait;
use bytes::Bytes;
use ferrous_tap_domain::{ContentType, DecodedMessage};

/// Receives decoded telemetry records from a tap connection.
///
/// Returning `false` from [`accepted`](Consumer::accepted) or
/// [`consume`](Consumer::consume) closes the connection cleanly; it is not
/// treated as an error.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Called once per connection after the content type is negotiated.
    async fn accepted(&self, content_type: &ContentType) -> bool;

    async fn consume(&self, message: DecodedMessage) -> bool;

    /// Called once when the connection ends, with any bytes that never
    /// formed a complete frame.
    async fn finished(&self, partial: Bytes);
}

pub mod decoder;
pub mod dns_message;
pub mod json;
pub mod render;
pub mod schema;

pub use decoder::DnstapDecoder;
pub use dns_message::HickoryDnsMessageParser;
pub use json::{JsonLinesConsumer, TapRecord};
pub use render::render_message;
pub use schema::SchemaRegistry;

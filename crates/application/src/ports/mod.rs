mod consumer;
mod dns_message_parser;
mod tap_decoder;

pub use consumer::Consumer;
pub use dns_message_parser::DnsMessageParser;
pub use tap_decoder::TapDecoder;

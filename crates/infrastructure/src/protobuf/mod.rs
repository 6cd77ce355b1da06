pub mod decoder;
pub mod encoder;
pub mod varint;

pub use decoder::{WireDecoder, WireTypeObserver};
pub use encoder::MessageEncoder;
pub use varint::{decode_signed, encode_signed, encode_tag, encode_varint, read_tag, read_varint};

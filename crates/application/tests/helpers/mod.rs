mod mock_consumers;

pub use mock_consumers::{RecordingConsumer, StubDecoder};

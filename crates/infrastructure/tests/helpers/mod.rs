mod consumers;

pub use consumers::RecordingConsumer;

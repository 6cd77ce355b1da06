pub mod connection;
pub mod dispatcher;
pub mod listener;

pub use connection::{ConnectionEnd, ConnectionHandler, ConnectionSettings};
pub use dispatcher::Dispatcher;
pub use listener::{ContentTypePolicy, TapListener};

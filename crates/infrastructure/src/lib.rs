//! Ferrous Tap Infrastructure Layer
pub mod dnstap;
pub mod fstrm;
pub mod protobuf;
pub mod server;

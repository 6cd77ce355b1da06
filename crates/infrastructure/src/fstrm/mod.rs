pub mod handshake;
pub mod reassembler;

pub use handshake::{HandshakeAction, HandshakeNegotiator, HandshakePhase};
pub use reassembler::FrameReassembler;

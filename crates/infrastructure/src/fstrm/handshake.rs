use ferrous_tap_domain::{ContentType, ContentTypeCell, ControlFrame, ControlType, HandshakeError};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    AwaitingReady,
    AwaitingStart,
    Streaming,
    Stopped,
}

impl HandshakePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandshakePhase::AwaitingReady => "awaiting READY",
            HandshakePhase::AwaitingStart => "awaiting START",
            HandshakePhase::Streaming => "streaming",
            HandshakePhase::Stopped => "stopped",
        }
    }
}

/// What the connection must do after a control frame was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAction {
    /// Write this frame back to the sender (ACCEPT after READY).
    Reply(ControlFrame),
    /// Data frames may follow; notify the consumer.
    Started(ContentType),
    /// Write this frame back (FINISH) and close.
    Stopped(ControlFrame),
}

/// Control frame exchange of a bidirectional Frame Streams receiver.
pub struct HandshakeNegotiator {
    phase: HandshakePhase,
    content_types: Arc<ContentTypeCell>,
    negotiated: Option<ContentType>,
}

impl HandshakeNegotiator {
    /// `content_types` is either private to this connection or shared by the
    /// whole process, in which case every connection must agree on the type.
    pub fn new(content_types: Arc<ContentTypeCell>) -> Self {
        Self {
            phase: HandshakePhase::AwaitingReady,
            content_types,
            negotiated: None,
        }
    }

    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    pub fn negotiated(&self) -> Option<&ContentType> {
        self.negotiated.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.phase == HandshakePhase::Streaming
    }

    pub fn on_control(&mut self, payload: &[u8]) -> Result<HandshakeAction, HandshakeError> {
        let control = ControlFrame::decode(payload)?;
        debug!(
            control_type = %control.control_type,
            phase = self.phase.as_str(),
            "Control frame received"
        );

        match (self.phase, control.control_type) {
            (_, ControlType::Stop) => {
                self.phase = HandshakePhase::Stopped;
                Ok(HandshakeAction::Stopped(ControlFrame::finish()))
            }
            (HandshakePhase::AwaitingReady, ControlType::Ready) => {
                let content_type = self.content_types.negotiate(&control.content_types)?;
                self.phase = HandshakePhase::AwaitingStart;
                let reply = ControlFrame::accept(content_type.as_str());
                self.negotiated = Some(content_type);
                Ok(HandshakeAction::Reply(reply))
            }
            (HandshakePhase::AwaitingStart, ControlType::Start) => {
                let content_type = self.content_types.negotiate(&control.content_types)?;
                self.phase = HandshakePhase::Streaming;
                self.negotiated = Some(content_type.clone());
                Ok(HandshakeAction::Started(content_type))
            }
            (phase, other) => Err(HandshakeError::UnexpectedControlType {
                control_type: other.code(),
                phase: phase.as_str(),
            }),
        }
    }

    /// Data frames are only legal while streaming.
    pub fn check_data(&self) -> Result<(), HandshakeError> {
        if self.is_streaming() {
            Ok(())
        } else {
            Err(HandshakeError::UnexpectedDataFrame {
                phase: self.phase.as_str(),
            })
        }
    }
}

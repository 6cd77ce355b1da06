use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Embedded message types to emit (e.g. "TYPE_CLIENT_RESPONSE"); empty emits all
    #[serde(default)]
    pub message_types: Vec<String>,

    #[serde(default)]
    pub pretty: bool,
}

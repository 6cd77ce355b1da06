use serde::{Deserialize, Serialize};

use crate::content_type::{ContentTypeScope, DNSTAP_CONTENT_TYPE};

/// How decoded records are handed to the consumer of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One worker per connection, records delivered in receipt order
    #[default]
    Ordered,
    /// Up to `max_in_flight` records processed at once, completion order not kept
    Concurrent,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// Content type the receiver insists on; `None` accepts whatever the first sender offers
    #[serde(default = "default_content_type")]
    pub content_type: Option<String>,

    #[serde(default)]
    pub content_type_scope: ContentTypeScope,

    #[serde(default)]
    pub dispatch_mode: DispatchMode,

    /// Bound on queued plus running records per connection
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Log every protobuf tag read at trace level
    #[serde(default)]
    pub trace_wire_types: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            content_type: default_content_type(),
            content_type_scope: ContentTypeScope::default(),
            dispatch_mode: DispatchMode::default(),
            max_in_flight: default_max_in_flight(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            trace_wire_types: false,
        }
    }
}

impl IngestConfig {
    /// An empty configured content type means "accept the first offer".
    pub fn expected_content_type(&self) -> Option<&str> {
        self.content_type.as_deref().filter(|ct| !ct.is_empty())
    }
}

fn default_content_type() -> Option<String> {
    Some(DNSTAP_CONTENT_TYPE.to_string())
}

fn default_max_in_flight() -> usize {
    64
}

fn default_shutdown_grace_ms() -> u64 {
    2000
}

//! Field names and enum tables of the dnstap telemetry message.
//!
//! Enum tables are 1-based: ordinal `n` maps to `TABLE[n - 1]`.

pub const ENVELOPE_SCHEMA: &str = "Dnstap";
pub const MESSAGE_SCHEMA: &str = "Message";

pub const FIELD_IDENTITY: &str = "identity";
pub const FIELD_VERSION: &str = "version";
pub const FIELD_EXTRA: &str = "extra";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_MESSAGE: &str = "message";

pub const FIELD_SOCKET_FAMILY: &str = "socket_family";
pub const FIELD_SOCKET_PROTOCOL: &str = "socket_protocol";
pub const FIELD_QUERY_ADDRESS: &str = "query_address";
pub const FIELD_RESPONSE_ADDRESS: &str = "response_address";
pub const FIELD_QUERY_PORT: &str = "query_port";
pub const FIELD_RESPONSE_PORT: &str = "response_port";
pub const FIELD_QUERY_TIME_SEC: &str = "query_time_sec";
pub const FIELD_QUERY_TIME_NSEC: &str = "query_time_nsec";
pub const FIELD_QUERY_MESSAGE: &str = "query_message";
pub const FIELD_QUERY_ZONE: &str = "query_zone";
pub const FIELD_RESPONSE_TIME_SEC: &str = "response_time_sec";
pub const FIELD_RESPONSE_TIME_NSEC: &str = "response_time_nsec";
pub const FIELD_RESPONSE_MESSAGE: &str = "response_message";

pub const DNSTAP_TYPES: &[&str] = &["TYPE_MESSAGE"];

pub const MESSAGE_TYPES: &[&str] = &[
    "TYPE_AUTH_QUERY",
    "TYPE_AUTH_RESPONSE",
    "TYPE_RESOLVER_QUERY",
    "TYPE_RESOLVER_RESPONSE",
    "TYPE_CLIENT_QUERY",
    "TYPE_CLIENT_RESPONSE",
    "TYPE_FORWARDER_QUERY",
    "TYPE_FORWARDER_RESPONSE",
    "TYPE_STUB_QUERY",
    "TYPE_STUB_RESPONSE",
    "TYPE_TOOL_QUERY",
    "TYPE_TOOL_RESPONSE",
];

pub const SOCKET_FAMILIES: &[&str] = &["SOCKET_FAMILY_INET", "SOCKET_FAMILY_INET6"];

pub const SOCKET_PROTOCOLS: &[&str] = &["SOCKET_PROTOCOL_UDP", "SOCKET_PROTOCOL_TCP"];

/// Ordinal of a name in a 1-based enum table.
pub fn ordinal_of(table: &[&str], name: &str) -> Option<u64> {
    table
        .iter()
        .position(|candidate| *candidate == name)
        .map(|idx| idx as u64 + 1)
}

/// Name for a 1-based ordinal; 0 and out of range ordinals have none.
pub fn name_of(table: &'static [&'static str], ordinal: u64) -> Option<&'static str> {
    let idx = usize::try_from(ordinal.checked_sub(1)?).ok()?;
    table.get(idx).copied()
}

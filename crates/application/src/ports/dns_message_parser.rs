use ferrous_tap_domain::{DnsMessageSummary, DomainError};

pub trait DnsMessageParser: Send + Sync {
    fn parse(&self, wire: &[u8]) -> Result<DnsMessageSummary, DomainError>;
}

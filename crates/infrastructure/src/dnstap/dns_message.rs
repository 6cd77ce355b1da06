use ferrous_tap_application::ports::DnsMessageParser;
use ferrous_tap_domain::{AnswerData, DnsAnswer, DnsMessageSummary, DnsQuestion, DnsRcode, DomainError};
use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RData;
use std::net::IpAddr;

const DNS_HEADER_LEN: usize = 12;
const QR_BIT: u8 = 0x80;

/// Parses DNS wire messages carried in telemetry records.
#[derive(Debug, Default, Clone, Copy)]
pub struct HickoryDnsMessageParser;

impl HickoryDnsMessageParser {
    pub fn new() -> Self {
        Self
    }
}

impl DnsMessageParser for HickoryDnsMessageParser {
    fn parse(&self, wire: &[u8]) -> Result<DnsMessageSummary, DomainError> {
        if wire.len() < DNS_HEADER_LEN {
            return Err(DomainError::InvalidDnsMessage(format!(
                "{} bytes is shorter than a DNS header",
                wire.len()
            )));
        }

        let message = Message::from_vec(wire).map_err(|e| {
            DomainError::InvalidDnsMessage(format!("Failed to parse DNS message: {}", e))
        })?;

        let questions = message
            .queries()
            .iter()
            .map(|query| DnsQuestion {
                name: query.name().to_utf8(),
                record_type: query.query_type().to_string(),
            })
            .collect();

        let answers = message
            .answers()
            .iter()
            .map(|record| {
                let data = match record.data() {
                    RData::A(a) => AnswerData::Address(IpAddr::V4(a.0)),
                    RData::AAAA(aaaa) => AnswerData::Address(IpAddr::V6(aaaa.0)),
                    RData::CNAME(canonical) => AnswerData::Name(canonical.to_utf8()),
                    other => AnswerData::Other(other.to_string()),
                };
                DnsAnswer {
                    name: record.name().to_utf8(),
                    record_type: record.record_type().to_string(),
                    ttl: record.ttl(),
                    data,
                }
            })
            .collect();

        Ok(DnsMessageSummary {
            id: u16::from_be_bytes([wire[0], wire[1]]),
            is_response: wire[2] & QR_BIT != 0,
            rcode: map_rcode(message.response_code()),
            questions,
            answers,
        })
    }
}

fn map_rcode(code: ResponseCode) -> DnsRcode {
    match code {
        ResponseCode::NoError => DnsRcode::NoError,
        ResponseCode::FormErr => DnsRcode::FormErr,
        ResponseCode::ServFail => DnsRcode::ServFail,
        ResponseCode::NXDomain => DnsRcode::NxDomain,
        ResponseCode::NotImp => DnsRcode::NotImp,
        ResponseCode::Refused => DnsRcode::Refused,
        other => DnsRcode::Other(u16::from(other)),
    }
}

use serde::Serialize;
use std::fmt;
use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnsRcode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    Other(u16),
}

impl DnsRcode {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => DnsRcode::NoError,
            1 => DnsRcode::FormErr,
            2 => DnsRcode::ServFail,
            3 => DnsRcode::NxDomain,
            4 => DnsRcode::NotImp,
            5 => DnsRcode::Refused,
            other => DnsRcode::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            DnsRcode::NoError => 0,
            DnsRcode::FormErr => 1,
            DnsRcode::ServFail => 2,
            DnsRcode::NxDomain => 3,
            DnsRcode::NotImp => 4,
            DnsRcode::Refused => 5,
            DnsRcode::Other(code) => *code,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DnsRcode::NoError => "NOERROR",
            DnsRcode::FormErr => "FORMERR",
            DnsRcode::ServFail => "SERVFAIL",
            DnsRcode::NxDomain => "NXDOMAIN",
            DnsRcode::NotImp => "NOTIMP",
            DnsRcode::Refused => "REFUSED",
            DnsRcode::Other(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for DnsRcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsRcode::Other(code) => write!(f, "RCODE{}", code),
            known => f.write_str(known.as_str()),
        }
    }
}

impl Serialize for DnsRcode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsQuestion {
    pub name: String,
    pub record_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnswerData {
    Address(IpAddr),
    Name(String),
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsAnswer {
    pub name: String,
    pub record_type: String,
    pub ttl: u32,
    pub data: AnswerData,
}

/// The parts of a DNS message that telemetry consumers look at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsMessageSummary {
    pub id: u16,
    pub is_response: bool,
    pub rcode: DnsRcode,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsAnswer>,
}

impl DnsMessageSummary {
    pub fn question(&self) -> Option<&DnsQuestion> {
        self.questions.first()
    }

    pub fn addresses(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.answers.iter().filter_map(|answer| match answer.data {
            AnswerData::Address(ip) => Some(ip),
            _ => None,
        })
    }

    /// Answer records owned by the question name.
    pub fn answers_for_question(&self) -> impl Iterator<Item = &DnsAnswer> + '_ {
        let qname = self.question().map(|q| q.name.to_ascii_lowercase());
        self.answers
            .iter()
            .filter(move |a| qname.as_deref() == Some(a.name.to_ascii_lowercase().as_str()))
    }
}

impl fmt::Display for DnsMessageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "< status={} question=<", self.rcode)?;
        if let Some(q) = self.question() {
            write!(f, "{} IN {}", q.name, q.record_type)?;
        }
        f.write_str("> answer=<")?;
        let mut first = true;
        for answer in self.answers_for_question() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            match &answer.data {
                AnswerData::Address(ip) => write!(f, "{} {}", answer.record_type, ip)?,
                AnswerData::Name(name) | AnswerData::Other(name) => {
                    write!(f, "{} {}", answer.record_type, name)?
                }
            }
        }
        f.write_str("> |>")
    }
}

use bytes::Bytes;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::net::IpAddr;

use crate::schema::{FieldDescriptor, WireType};

/// A payload as it sat on the wire, before any schema interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    Varint(u64),
    Fixed64(u64),
    LengthDelimited(Bytes),
    Fixed32(u32),
}

impl WireValue {
    pub fn wire_type(&self) -> WireType {
        match self {
            WireValue::Varint(_) => WireType::Varint,
            WireValue::Fixed64(_) => WireType::Fixed64,
            WireValue::LengthDelimited(_) => WireType::LengthDelimited,
            WireValue::Fixed32(_) => WireType::Fixed32,
        }
    }
}

impl fmt::Display for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Varint(v) | WireValue::Fixed64(v) => write!(f, "{}", v),
            WireValue::Fixed32(v) => write!(f, "{}", v),
            WireValue::LengthDelimited(b) => write_bytes(f, b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Fixed32(u32),
    Fixed64(u64),
    Bytes(Bytes),
    Ip(IpAddr),
    Enum {
        ordinal: u64,
        name: Option<&'static str>,
    },
    Message(DecodedMessage),
    DnsWire(Bytes),
    Raw(WireValue),
}

impl FieldValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::Unsigned(v) | FieldValue::Fixed64(v) => Some(*v),
            FieldValue::Fixed32(v) => Some(u64::from(*v)),
            FieldValue::Enum { ordinal, .. } => Some(*ordinal),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Signed(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            FieldValue::Bytes(b) | FieldValue::DnsWire(b) => Some(b),
            FieldValue::Raw(WireValue::LengthDelimited(b)) => Some(b),
            _ => None,
        }
    }

    pub fn as_ip(&self) -> Option<IpAddr> {
        match self {
            FieldValue::Ip(ip) => Some(*ip),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&DecodedMessage> {
        match self {
            FieldValue::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn enum_name(&self) -> Option<&'static str> {
        match self {
            FieldValue::Enum { name, .. } => *name,
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) | FieldValue::Fixed64(v) => write!(f, "{}", v),
            FieldValue::Signed(v) => write!(f, "{}", v),
            FieldValue::Fixed32(v) => write!(f, "{}", v),
            FieldValue::Bytes(b) => write_bytes(f, b),
            FieldValue::Ip(ip) => write!(f, "{}", ip),
            FieldValue::Enum {
                name: Some(name), ..
            } => f.write_str(name),
            FieldValue::Enum { ordinal, name: None } => write!(f, "{}", ordinal),
            FieldValue::Message(m) => write!(f, "{}", m),
            FieldValue::DnsWire(b) => write!(f, "<dns wire {} bytes>", b.len()),
            FieldValue::Raw(raw) => write!(f, "{}", raw),
        }
    }
}

fn write_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    write!(f, "{:?}", String::from_utf8_lossy(bytes))
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldEntry {
    Single(FieldValue),
    Repeated(Vec<FieldValue>),
}

impl FieldEntry {
    pub fn first(&self) -> Option<&FieldValue> {
        self.values().first()
    }

    pub fn values(&self) -> &[FieldValue] {
        match self {
            FieldEntry::Single(value) => std::slice::from_ref(value),
            FieldEntry::Repeated(values) => values,
        }
    }
}

/// Field id absent from the schema, kept for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    pub id: u32,
    pub raw: WireValue,
}

impl UnknownField {
    pub fn wire_type(&self) -> WireType {
        self.raw.wire_type()
    }
}

/// Named field values produced by applying a schema to bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    schema: &'static str,
    fields: FxHashMap<&'static str, FieldEntry>,
    order: SmallVec<[&'static str; 16]>,
    unknown: Vec<UnknownField>,
}

impl DecodedMessage {
    pub fn new(schema: &'static str) -> Self {
        Self {
            schema,
            fields: FxHashMap::default(),
            order: SmallVec::new(),
            unknown: Vec::new(),
        }
    }

    pub fn schema_name(&self) -> &'static str {
        self.schema
    }

    /// Stores a decoded value: appended for repeated fields, replaced otherwise.
    pub fn record(&mut self, descriptor: &FieldDescriptor, value: FieldValue) {
        let name = descriptor.name;
        if !self.fields.contains_key(name) {
            self.order.push(name);
        }
        if descriptor.repeated {
            match self.fields.get_mut(name) {
                Some(FieldEntry::Repeated(values)) => values.push(value),
                _ => {
                    self.fields.insert(name, FieldEntry::Repeated(vec![value]));
                }
            }
        } else {
            self.fields.insert(name, FieldEntry::Single(value));
        }
    }

    pub fn record_unknown(&mut self, field: UnknownField) {
        self.unknown.push(field);
    }

    pub fn get(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.get(name)
    }

    /// First occurrence of the named field.
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.get(name).and_then(FieldEntry::first)
    }

    pub fn values(&self, name: &str) -> &[FieldValue] {
        self.get(name).map(FieldEntry::values).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Names of the fields present, in the order they were first seen.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().copied()
    }

    pub fn unknown_fields(&self) -> &[UnknownField] {
        &self.unknown
    }

    pub fn unknown_field(&self, id: u32) -> Option<&UnknownField> {
        self.unknown.iter().find(|f| f.id == id)
    }

    pub fn unknown_fields_by_id(&self, id: u32) -> impl Iterator<Item = &UnknownField> + '_ {
        self.unknown.iter().filter(move |f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.unknown.is_empty()
    }

    pub fn enum_text(&self, name: &str) -> Option<String> {
        self.value(name).map(|v| v.to_string())
    }

    pub fn message(&self, name: &str) -> Option<&DecodedMessage> {
        self.value(name).and_then(FieldValue::as_message)
    }
}

impl fmt::Display for DecodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.schema)?;
        for name in self.field_names() {
            for value in self.values(name) {
                write!(f, " {}={}", name, value)?;
            }
        }
        for unknown in &self.unknown {
            write!(f, " ({})={}", unknown.id, unknown.raw)?;
        }
        f.write_str(" |>")
    }
}

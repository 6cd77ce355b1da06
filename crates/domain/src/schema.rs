//! Declarative protobuf message schemas.
//!
//! A [`Schema`] is immutable once built and is shared read-only between
//! connections. Decoding never mutates a descriptor.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    /// Maps the 3 bit tag suffix; groups (3, 4) and reserved codes yield `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            WireType::Varint => 0,
            WireType::Fixed64 => 1,
            WireType::LengthDelimited => 2,
            WireType::Fixed32 => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WireType::Varint => "varint",
            WireType::Fixed64 => "fixed64",
            WireType::LengthDelimited => "length-delimited",
            WireType::Fixed32 => "fixed32",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.as_str())
    }
}

/// How the payload of one field is interpreted.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Varint,
    /// Varint whose low bit carries the sign; negative values are offset by one.
    SignedVarint,
    Fixed32,
    Fixed64,
    Bytes,
    /// 4 or 16 raw octets.
    IpAddress,
    /// Varint ordinal into a 1-based name table.
    Enum(&'static [&'static str]),
    Embedded(Arc<Schema>),
    /// Opaque DNS wire format, parsed by a DNS message collaborator.
    DnsWireMessage,
    /// Any wire type, kept raw.
    Opaque,
}

impl FieldKind {
    /// Wire type the field must arrive with, `None` when any is accepted.
    pub fn expected_wire_type(&self) -> Option<WireType> {
        match self {
            FieldKind::Varint | FieldKind::SignedVarint | FieldKind::Enum(_) => {
                Some(WireType::Varint)
            }
            FieldKind::Fixed32 => Some(WireType::Fixed32),
            FieldKind::Fixed64 => Some(WireType::Fixed64),
            FieldKind::Bytes
            | FieldKind::IpAddress
            | FieldKind::Embedded(_)
            | FieldKind::DnsWireMessage => Some(WireType::LengthDelimited),
            FieldKind::Opaque => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub id: u32,
    pub kind: FieldKind,
    pub repeated: bool,
}

#[derive(Debug, Clone)]
pub struct Schema {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
    by_id: FxHashMap<u32, usize>,
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            name,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field(&self, id: u32) -> Option<&FieldDescriptor> {
        self.by_id.get(&id).map(|&idx| &self.fields[idx])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub struct SchemaBuilder {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl SchemaBuilder {
    pub fn field(mut self, name: &'static str, id: u32, kind: FieldKind) -> Self {
        self.fields.push(FieldDescriptor {
            name,
            id,
            kind,
            repeated: false,
        });
        self
    }

    pub fn repeated(mut self, name: &'static str, id: u32, kind: FieldKind) -> Self {
        self.fields.push(FieldDescriptor {
            name,
            id,
            kind,
            repeated: true,
        });
        self
    }

    /// Later declarations of the same id replace earlier ones.
    pub fn build(self) -> Schema {
        let mut fields: Vec<FieldDescriptor> = Vec::with_capacity(self.fields.len());
        let mut by_id = FxHashMap::default();
        for descriptor in self.fields {
            match by_id.get(&descriptor.id) {
                Some(&idx) => fields[idx] = descriptor,
                None => {
                    by_id.insert(descriptor.id, fields.len());
                    fields.push(descriptor);
                }
            }
        }
        Schema {
            name: self.name,
            fields,
            by_id,
        }
    }
}

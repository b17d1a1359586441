//! Frame schemas: ordered, typed field lists compiled once from type tokens.
//!
//! Token grammar (case-insensitive):
//!
//! | token                         | field                                  |
//! |-------------------------------|----------------------------------------|
//! | `i1` `i2` `i4` `i8` / `int8`..`int64`     | signed integer of that byte width |
//! | `u1` `u2` `u4` `u8` / `uint8`..`uint64`   | unsigned integer                  |
//! | `f4` `f8` / `float32` `float64`           | IEEE float                        |
//! | `n<N>` / `omit<N>`            | skip N bytes (always anonymous)        |
//! | `b<N>` / `byte<N>`            | keep N raw bytes under the field name  |

use crate::ast::FrameSection;
use std::collections::BTreeMap;
use std::fmt;

/// Selector values are the low 4 bits of the first payload byte.
pub const DISCRIMINATOR_MASK: u8 = 0x0F;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field {field:?}: missing type token")]
    EmptyToken { field: String },
    #[error("field {field:?}: type {token:?} not supported")]
    UnknownToken { field: String, token: String },
    #[error("field {field:?}: {token:?} byte count must be >= 0")]
    NegativeLength { field: String, token: String },
    #[error("field {field:?}: {token:?} has no valid byte count")]
    InvalidLength { field: String, token: String },
    #[error("frame {frame:?}: discriminator {value} does not fit in 4 bits")]
    DiscriminatorRange { frame: String, value: u64 },
    #[error("discriminator {value} used by both {first:?} and {second:?}")]
    DuplicateDiscriminator {
        value: u8,
        first: String,
        second: String,
    },
}

/// Fixed-width numeric type. Multi-byte values are read big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl NumericKind {
    pub fn width(self) -> usize {
        match self {
            NumericKind::I8 | NumericKind::U8 => 1,
            NumericKind::I16 | NumericKind::U16 => 2,
            NumericKind::I32 | NumericKind::U32 | NumericKind::F32 => 4,
            NumericKind::I64 | NumericKind::U64 | NumericKind::F64 => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            NumericKind::I8 | NumericKind::I16 | NumericKind::I32 | NumericKind::I64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, NumericKind::F32 | NumericKind::F64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric(NumericKind),
    /// `len` raw bytes; `keep_name` is false for skip tokens.
    Raw { len: usize, keep_name: bool },
}

impl FieldKind {
    pub fn width(&self) -> usize {
        match self {
            FieldKind::Numeric(k) => k.width(),
            FieldKind::Raw { len, .. } => *len,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Numeric(k) => {
                let prefix = if k.is_float() {
                    "f"
                } else if k.is_signed() {
                    "i"
                } else {
                    "u"
                };
                write!(f, "{}{}", prefix, k.width())
            }
            FieldKind::Raw { len, keep_name: true } => write!(f, "b{}", len),
            FieldKind::Raw { len, keep_name: false } => write!(f, "n{}", len),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Empty for anonymous fields: read, never emitted.
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Compile one `(name, token)` pair.
    pub fn compile(name: &str, token: &str) -> Result<Self, SchemaError> {
        let kind = parse_type_token(name, token)?;
        let name = match kind {
            FieldKind::Raw { keep_name: false, .. } => String::new(),
            _ => name.to_string(),
        };
        Ok(FieldSpec { name, kind })
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

/// Parse a type token; `field` is only used for error messages.
pub fn parse_type_token(field: &str, token: &str) -> Result<FieldKind, SchemaError> {
    if token.is_empty() {
        return Err(SchemaError::EmptyToken {
            field: field.to_string(),
        });
    }
    let lower = token.to_ascii_lowercase();
    let numeric = match lower.as_str() {
        "i1" | "int8" => Some(NumericKind::I8),
        "i2" | "int16" => Some(NumericKind::I16),
        "i4" | "int32" => Some(NumericKind::I32),
        "i8" | "int64" => Some(NumericKind::I64),
        "u1" | "uint8" => Some(NumericKind::U8),
        "u2" | "uint16" => Some(NumericKind::U16),
        "u4" | "uint32" => Some(NumericKind::U32),
        "u8" | "uint64" => Some(NumericKind::U64),
        "f4" | "float32" => Some(NumericKind::F32),
        "f8" | "float64" => Some(NumericKind::F64),
        _ => None,
    };
    if let Some(k) = numeric {
        return Ok(FieldKind::Numeric(k));
    }

    // Longer prefixes of the same letter are tried first.
    let (count, keep_name) = if let Some(rest) = lower.strip_prefix("omit") {
        (rest, false)
    } else if let Some(rest) = lower.strip_prefix('n') {
        (rest, false)
    } else if let Some(rest) = lower.strip_prefix("byte") {
        (rest, true)
    } else if let Some(rest) = lower.strip_prefix('b') {
        (rest, true)
    } else {
        return Err(SchemaError::UnknownToken {
            field: field.to_string(),
            token: token.to_string(),
        });
    };
    let n: i64 = count.parse().map_err(|_| SchemaError::InvalidLength {
        field: field.to_string(),
        token: token.to_string(),
    })?;
    if n < 0 {
        return Err(SchemaError::NegativeLength {
            field: field.to_string(),
            token: token.to_string(),
        });
    }
    let len = usize::try_from(n).map_err(|_| SchemaError::InvalidLength {
        field: field.to_string(),
        token: token.to_string(),
    })?;
    Ok(FieldKind::Raw { len, keep_name })
}

/// Named, ordered field list for one frame type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSchema {
    pub name: String,
    pub discriminator: u8,
    pub fields: Vec<FieldSpec>,
}

impl FrameSchema {
    pub fn compile(section: &FrameSection) -> Result<Self, SchemaError> {
        let discriminator = u8::try_from(section.discriminator)
            .ok()
            .filter(|d| d & !DISCRIMINATOR_MASK == 0)
            .ok_or_else(|| SchemaError::DiscriminatorRange {
                frame: section.name.clone(),
                value: section.discriminator,
            })?;
        let fields = section
            .fields
            .iter()
            .map(|f| FieldSpec::compile(&f.name, &f.token))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FrameSchema {
            name: section.name.clone(),
            discriminator,
            fields,
        })
    }

    /// Payload bytes required after the discriminator.
    pub fn body_len(&self) -> usize {
        self.fields.iter().map(|f| f.kind.width()).sum()
    }

    /// One line per field: offset (after the discriminator), name, type.
    pub fn describe(&self) -> Vec<String> {
        let mut offset = 0;
        self.fields
            .iter()
            .map(|f| {
                let name = if f.is_anonymous() { "-" } else { f.name.as_str() };
                let line = format!("{:4}  {:<16} {}", offset, name, f.kind);
                offset += f.kind.width();
                line
            })
            .collect()
    }
}

/// Read-only lookup from 4-bit discriminator to schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
    schemas: BTreeMap<u8, FrameSchema>,
}

impl SchemaTable {
    pub fn compile(sections: &[FrameSection]) -> Result<Self, SchemaError> {
        let mut schemas: BTreeMap<u8, FrameSchema> = BTreeMap::new();
        for section in sections {
            let schema = FrameSchema::compile(section)?;
            if let Some(existing) = schemas.get(&schema.discriminator) {
                return Err(SchemaError::DuplicateDiscriminator {
                    value: schema.discriminator,
                    first: existing.name.clone(),
                    second: schema.name,
                });
            }
            schemas.insert(schema.discriminator, schema);
        }
        log::debug!("compiled {} frame schema(s)", schemas.len());
        Ok(SchemaTable { schemas })
    }

    /// Schema for a raw first payload byte (only the low 4 bits select).
    pub fn lookup(&self, first_byte: u8) -> Option<&FrameSchema> {
        self.schemas.get(&(first_byte & DISCRIMINATOR_MASK))
    }

    pub fn get_by_name(&self, name: &str) -> Option<&FrameSchema> {
        self.schemas.values().find(|s| s.name == name)
    }

    /// Schemas in discriminator order.
    pub fn iter(&self) -> impl Iterator<Item = &FrameSchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

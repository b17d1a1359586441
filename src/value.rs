//! Decoded field values and records.

/// A single decoded value, normalized to its canonical width.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Every integer width, signed or unsigned.
    Int(i64),
    /// Every float width.
    Float(f64),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// Output of one successful decode.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    /// Name of the schema that decoded the payload.
    pub frame_type: String,
    /// First payload byte as received (all 8 bits).
    pub discriminator: u8,
    /// Named fields in schema order; anonymous fields are not present.
    pub fields: Vec<Field>,
    /// Payload bytes consumed, discriminator included.
    pub consumed: usize,
}

impl DecodedRecord {
    /// First field with this name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_i64)
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(FieldValue::as_bytes)
    }
}

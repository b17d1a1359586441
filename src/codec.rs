//! Decode frame payloads into records using a compiled [`SchemaTable`].
//!
//! The first payload byte selects the schema (low 4 bits). Fields follow in schema order;
//! multi-byte numbers are always big-endian, independent of the framing byte orders.

use crate::ast::FrameSection;
use crate::schema::{FieldKind, FieldSpec, FrameSchema, NumericKind, SchemaError, SchemaTable};
use crate::value::{DecodedRecord, Field, FieldValue};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("nothing in payload to decode")]
    EmptyPayload,
    #[error("frame type {0:#04x} not supported")]
    UnsupportedFrameType(u8),
    #[error("{frame}.{field}: needs {needed} byte(s), {available} left")]
    InsufficientData {
        frame: String,
        field: String,
        needed: usize,
        available: usize,
    },
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

/// Stateless decoder; safe to share across threads once built.
#[derive(Debug, Clone)]
pub struct Decoder {
    schemas: SchemaTable,
}

impl Decoder {
    pub fn new(schemas: SchemaTable) -> Self {
        Decoder { schemas }
    }

    /// Compile frame definitions and build a decoder. Any bad token fails here, not at decode time.
    pub fn from_frames(frames: &[FrameSection]) -> Result<Self, SchemaError> {
        Ok(Decoder::new(SchemaTable::compile(frames)?))
    }

    pub fn schemas(&self) -> &SchemaTable {
        &self.schemas
    }

    /// Decode one payload. No partial record is returned on error.
    pub fn decode(&self, payload: &[u8]) -> Result<DecodedRecord, DecodeError> {
        let mut cursor = Cursor::new(payload);
        let discriminator = cursor.read_u8().map_err(|_| DecodeError::EmptyPayload)?;
        let schema = self
            .schemas
            .lookup(discriminator)
            .ok_or(DecodeError::UnsupportedFrameType(discriminator))?;

        let mut fields = Vec::with_capacity(schema.fields.len());
        for spec in &schema.fields {
            let value = self.decode_field(&mut cursor, schema, spec)?;
            if !spec.is_anonymous() {
                fields.push(Field {
                    name: spec.name.clone(),
                    value,
                });
            }
        }

        let consumed = cursor.position() as usize;
        if consumed < payload.len() {
            log::debug!(
                "{}: {} trailing byte(s) ignored",
                schema.name,
                payload.len() - consumed
            );
        }
        Ok(DecodedRecord {
            frame_type: schema.name.clone(),
            discriminator,
            fields,
            consumed,
        })
    }

    fn decode_field(
        &self,
        r: &mut Cursor<&[u8]>,
        schema: &FrameSchema,
        spec: &FieldSpec,
    ) -> Result<FieldValue, DecodeError> {
        let needed = spec.kind.width();
        let available = r.get_ref().len().saturating_sub(r.position() as usize);
        if available < needed {
            return Err(DecodeError::InsufficientData {
                frame: schema.name.clone(),
                field: spec.name.clone(),
                needed,
                available,
            });
        }
        match spec.kind {
            FieldKind::Numeric(kind) => self.decode_numeric(r, kind),
            FieldKind::Raw { len, .. } => {
                let mut buf = vec![0u8; len];
                r.read_exact(&mut buf)?;
                Ok(FieldValue::Bytes(buf))
            }
        }
    }

    fn decode_numeric(&self, r: &mut Cursor<&[u8]>, kind: NumericKind) -> Result<FieldValue, DecodeError> {
        Ok(match kind {
            NumericKind::I8 => FieldValue::Int(r.read_i8()? as i64),
            NumericKind::I16 => FieldValue::Int(r.read_i16::<BigEndian>()? as i64),
            NumericKind::I32 => FieldValue::Int(r.read_i32::<BigEndian>()? as i64),
            NumericKind::I64 => FieldValue::Int(r.read_i64::<BigEndian>()?),
            NumericKind::U8 => FieldValue::Int(r.read_u8()? as i64),
            NumericKind::U16 => FieldValue::Int(r.read_u16::<BigEndian>()? as i64),
            NumericKind::U32 => FieldValue::Int(r.read_u32::<BigEndian>()? as i64),
            // Values above i64::MAX wrap.
            NumericKind::U64 => FieldValue::Int(r.read_u64::<BigEndian>()? as i64),
            NumericKind::F32 => FieldValue::Float(r.read_f32::<BigEndian>()? as f64),
            NumericKind::F64 => FieldValue::Float(r.read_f64::<BigEndian>()?),
        })
    }
}

//! Format decoded records and schemas for display.

use crate::schema::SchemaTable;
use crate::value::{DecodedRecord, FieldValue};

/// Single value: integers in decimal, floats as Rust prints them, bytes as `hex(..)`.
pub fn format_value(v: &FieldValue) -> String {
    match v {
        FieldValue::Int(x) => format!("{}", x),
        FieldValue::Float(x) => format!("{}", x),
        FieldValue::Bytes(b) => format!("hex({})", hex_string(b)),
    }
}

/// One line per record: `fog idx=1 data=590081 t1=2`.
pub fn format_record(record: &DecodedRecord) -> String {
    let mut line = record.frame_type.clone();
    for f in &record.fields {
        line.push(' ');
        line.push_str(&f.name);
        line.push('=');
        line.push_str(&format_value(&f.value));
    }
    line
}

/// Compiled table listing, one block per frame type.
pub fn format_schemas(table: &SchemaTable) -> String {
    let mut lines = Vec::new();
    for schema in table.iter() {
        lines.push(format!(
            "{}: type {} ({} byte body)",
            schema.name,
            schema.discriminator,
            schema.body_len()
        ));
        for field in schema.describe() {
            lines.push(format!("  {}", field));
        }
    }
    lines.join("\n")
}

pub fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

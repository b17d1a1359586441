//! Resolve a parsed configuration into a validated [`FramingConfig`] and a compiled
//! [`SchemaTable`]. Every configuration error surfaces here, before any byte is framed.

use crate::ast::{DaqConfig, PrefixSpec, SplitterSection};
use crate::codec::Decoder;
use crate::endian::Endianness;
use crate::frame::{FramingConfig, FramingError};
use crate::parser::parse;
use crate::schema::{SchemaError, SchemaTable};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Parse(String),
    #[error("splitter: {0}")]
    Framing(#[from] FramingError),
    #[error("schema: {0}")]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub framing: FramingConfig,
    pub schemas: SchemaTable,
}

impl Config {
    pub fn from_source(source: &str) -> Result<Self, ConfigError> {
        let ast = parse(source).map_err(ConfigError::Parse)?;
        Config::resolve(&ast)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Config::from_source(&source)
    }

    pub fn resolve(ast: &DaqConfig) -> Result<Self, ConfigError> {
        let framing = match &ast.splitter {
            Some(section) => build_framing(section)?,
            None => FramingConfig::default(),
        };
        if framing.checksum_width() > 0 {
            if let Some(method) = framing.checksum_method() {
                log::info!("checksum method {:?} configured; checksum bytes are not verified", method);
            }
        }
        let schemas = SchemaTable::compile(&ast.frames)?;
        Ok(Config { framing, schemas })
    }

    pub fn decoder(&self) -> Decoder {
        Decoder::new(self.schemas.clone())
    }
}

fn build_framing(section: &SplitterSection) -> Result<FramingConfig, FramingError> {
    let mut framing = match &section.delimiter {
        Some(d) => FramingConfig::new(d.clone())?,
        None => FramingConfig::default(),
    };
    if let Some(spec) = &section.index {
        let (width, order) = prefix(spec, "index")?;
        framing = framing.with_index(width, order)?;
    }
    if let Some(spec) = &section.length {
        let (width, order) = prefix(spec, "length")?;
        framing = framing.with_length(width, order)?;
    }
    if let Some(checksum) = &section.checksum {
        framing = framing.with_checksum(usize::try_from(checksum.width).unwrap_or(usize::MAX));
        if let Some(method) = &checksum.method {
            framing = framing.with_checksum_method(method.clone());
        }
    }
    Ok(framing)
}

/// Width plus byte order; the order string only matters when the width is non-zero.
fn prefix(spec: &PrefixSpec, field: &'static str) -> Result<(usize, Endianness), FramingError> {
    let width = usize::try_from(spec.width).map_err(|_| FramingError::InvalidWidth {
        field,
        width: usize::MAX,
    })?;
    if width == 0 {
        return Ok((0, Endianness::Big));
    }
    let order = match &spec.order {
        Some(s) => s.parse().map_err(FramingError::UnknownByteOrder)?,
        None => Endianness::Big,
    };
    Ok((width, order))
}

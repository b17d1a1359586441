//! # daqframe: framing and decoding for instrumentation byte streams
//!
//! Turns a continuous byte stream from acquisition hardware into records in two stages:
//!
//! 1. **Framing** ([`frame`]): split the stream on a delimiter, check the optional
//!    sequence index and declared length, strip trailing checksum bytes.
//! 2. **Decoding** ([`codec`]): pick a schema from the payload's first byte (low 4 bits)
//!    and read fixed-width big-endian fields into a named record.
//!
//! ## Configuration
//!
//! ```text
//! splitter {
//!   delimiter: 0x7E7E;
//!   index: 2 big;
//!   length: 1 little;
//!   checksum: 2;
//! }
//!
//! frame fog = 1 {
//!   idx: u1;
//!   data: i4;
//!   spare: n2;
//!   raw: b4;
//! }
//! ```
//!
//! ## Field types
//!
//! - Integers: `i1` `i2` `i4` `i8` / `u1` `u2` `u4` `u8` (or `int8`..`uint64`), widened to `i64`
//! - Floats: `f4` `f8` (or `float32` `float64`), widened to `f64`
//! - Raw: `b<N>` / `byte<N>` keeps N bytes; `n<N>` / `omit<N>` skips N bytes
//!
//! ## Usage
//!
//! ```no_run
//! use daqframe::{Config, Pipeline};
//!
//! let config = Config::load("daq.conf")?;
//! let mut pipeline = Pipeline::from_config(&config);
//! for record in pipeline.feed(b"...bytes from the device...") {
//!     println!("{:?}", record?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ast;
pub mod codec;
pub mod config;
pub mod dump;
pub mod endian;
pub mod frame;
pub mod parser;
pub mod pipeline;
pub mod schema;
pub mod value;

pub use ast::{DaqConfig, FieldDecl, FrameSection};
pub use codec::{DecodeError, Decoder};
pub use config::{Config, ConfigError};
pub use endian::Endianness;
pub use frame::{
    ExtractorState, FrameEvent, FrameExtractor, FrameObserver, FrameStream, FramingConfig,
    FramingError, LogObserver,
};
pub use parser::parse;
pub use pipeline::{Pipeline, PipelineStats};
pub use schema::{FieldKind, FieldSpec, FrameSchema, NumericKind, SchemaError, SchemaTable};
pub use value::{DecodedRecord, Field, FieldValue};

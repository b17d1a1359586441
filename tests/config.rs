//! Configuration language: parsing, splitter resolution, schema compilation, loading from disk.

use daqframe::{parse, Config, ConfigError, Endianness, FramingError, SchemaError};
use std::io::Write;

const FULL: &str = r#"
// acquisition board, revision B
splitter {
  delimiter: 0x7E7E;
  index: 2 big;
  length: 1 little;
  checksum: 2 "crc16";
}

frame fog = 1 {
  idx: u1;
  data: i4;
  t1: u1;
  t2: u1;
  st: u1;
}

/* power rails */
frame power = 0x2 {
  pv: u2;
  pi: u2;
  nv: u2;
  ni: u2;
  "spare bytes": n2;
}
"#;

#[test]
fn test_parse_full_config() {
    let ast = parse(FULL).unwrap();
    let splitter = ast.splitter.as_ref().unwrap();
    assert_eq!(splitter.delimiter.as_deref(), Some(&[0x7e, 0x7e][..]));
    assert_eq!(splitter.index.as_ref().map(|p| p.width), Some(2));
    assert_eq!(
        splitter.length.as_ref().and_then(|p| p.order.as_deref()),
        Some("little")
    );
    assert_eq!(
        splitter.checksum.as_ref().and_then(|c| c.method.as_deref()),
        Some("crc16")
    );
    assert_eq!(ast.frames.len(), 2);
    assert_eq!(ast.frames[1].name, "power");
    assert_eq!(ast.frames[1].discriminator, 2);
    assert_eq!(ast.frames[1].fields[4].name, "spare bytes");
    assert_eq!(ast.frames[1].fields[4].token, "n2");
}

#[test]
fn test_resolve_full_config() {
    let config = Config::from_source(FULL).unwrap();
    let framing = &config.framing;
    assert_eq!(framing.delimiter(), &[0x7e, 0x7e]);
    assert_eq!(framing.index().width, 2);
    assert_eq!(framing.index().order, Endianness::Big);
    assert_eq!(framing.length().width, 1);
    assert_eq!(framing.length().order, Endianness::Little);
    assert_eq!(framing.checksum_width(), 2);
    assert_eq!(framing.checksum_method(), Some("crc16"));
    assert_eq!(framing.overhead(), 5);

    assert_eq!(config.schemas.len(), 2);
    let power = config.schemas.get_by_name("power").unwrap();
    assert_eq!(power.body_len(), 10);
    assert!(power.fields[4].is_anonymous());
}

#[test]
fn test_defaults_without_splitter() {
    let config = Config::from_source("frame ping = 0 { }").unwrap();
    assert_eq!(config.framing.delimiter(), b"\n");
    assert_eq!(config.framing.overhead(), 0);
    assert_eq!(config.schemas.len(), 1);

    let config = Config::from_source("splitter { index: 1; }").unwrap();
    assert_eq!(config.framing.delimiter(), b"\n");
    assert_eq!(config.framing.index().order, Endianness::Big);
    assert!(config.schemas.is_empty());
}

#[test]
fn test_string_delimiter_escapes() {
    let config = Config::from_source(r#"splitter { delimiter: "\r\n"; }"#).unwrap();
    assert_eq!(config.framing.delimiter(), b"\r\n");
    let config = Config::from_source(r#"splitter { delimiter: "\x7e|"; }"#).unwrap();
    assert_eq!(config.framing.delimiter(), &[0x7e, b'|']);
}

#[test]
fn test_byte_order_aliases() {
    let config = Config::from_source("splitter { index: 4 L; length: 2 BigEndian; }").unwrap();
    assert_eq!(config.framing.index().order, Endianness::Little);
    assert_eq!(config.framing.length().order, Endianness::Big);
}

#[test]
fn test_order_ignored_for_zero_width() {
    let config = Config::from_source("splitter { index: 0 sideways; }").unwrap();
    assert_eq!(config.framing.index().width, 0);
}

#[test]
fn test_bad_byte_order() {
    let err = Config::from_source("splitter { length: 2 sideways; }").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Framing(FramingError::UnknownByteOrder(ref s)) if s == "sideways"
    ));
}

#[test]
fn test_bad_prefix_width() {
    let err = Config::from_source("splitter { index: 3; }").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Framing(FramingError::InvalidWidth { field: "index", width: 3 })
    ));
}

#[test]
fn test_empty_delimiter_rejected() {
    let err = Config::from_source(r#"splitter { delimiter: ""; }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Framing(FramingError::EmptyDelimiter)));
}

#[test]
fn test_odd_hex_delimiter_is_parse_error() {
    let err = Config::from_source("splitter { delimiter: 0x7E7; }").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_unknown_type_token() {
    let err = Config::from_source("frame f = 1 { x: u3; }").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Schema(SchemaError::UnknownToken { ref token, .. }) if token == "u3"
    ));
}

#[test]
fn test_negative_skip_length() {
    let err = Config::from_source("frame f = 1 { x: n-2; }").unwrap_err();
    assert!(matches!(err, ConfigError::Schema(SchemaError::NegativeLength { .. })));
}

#[test]
fn test_discriminator_out_of_range() {
    let err = Config::from_source("frame big = 16 { x: u1; }").unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Schema(SchemaError::DiscriminatorRange { value: 16, .. })
    ));
}

#[test]
fn test_duplicate_discriminator() {
    let src = "frame a = 3 { x: u1; } frame b = 3 { y: u2; }";
    let err = Config::from_source(src).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"schema: discriminator 3 used by both "a" and "b""#
    );
}

#[test]
fn test_duplicate_splitter_section() {
    let err = Config::from_source("splitter { } splitter { }").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(ref m) if m.contains("more than once")));
}

#[test]
fn test_syntax_error() {
    let err = Config::from_source("frame fog = { }").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(ref m) if m.starts_with("Parse error")));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL.as_bytes()).unwrap();
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.schemas.len(), 2);
    assert_eq!(config.decoder().schemas().len(), 2);
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(dir.path().join("absent.conf")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

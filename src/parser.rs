//! Parse configuration source into AST using PEST.

use crate::ast::*;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct ConfigParser;

/// Parse configuration source into AST.
pub fn parse(source: &str) -> Result<DaqConfig, String> {
    let pairs = ConfigParser::parse(Rule::config, source)
        .map_err(|e| format!("Parse error: {}", e))?;
    let pair = pairs.into_iter().next().ok_or("Empty parse")?;
    build_config(pair)
}

fn build_config(pair: pest::iterators::Pair<Rule>) -> Result<DaqConfig, String> {
    let mut splitter = None;
    let mut frames = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::splitter_section => {
                if splitter.is_some() {
                    return Err("splitter section defined more than once".to_string());
                }
                splitter = Some(build_splitter(inner)?);
            }
            Rule::frame_section => frames.push(build_frame(inner)?),
            _ => {}
        }
    }

    Ok(DaqConfig { splitter, frames })
}

// ==================== Splitter ====================

fn build_splitter(pair: pest::iterators::Pair<Rule>) -> Result<SplitterSection, String> {
    let mut section = SplitterSection::default();
    for option in pair.into_inner() {
        match option.as_rule() {
            Rule::delimiter_option => {
                let lit = option.into_inner().next().ok_or("delimiter: missing value")?;
                let bytes = match lit.as_rule() {
                    Rule::hex_bytes => parse_hex_bytes(lit.as_str())?,
                    _ => unescape(lit.as_str())?,
                };
                section.delimiter = Some(bytes);
            }
            Rule::index_option => section.index = Some(build_prefix(option)?),
            Rule::length_option => section.length = Some(build_prefix(option)?),
            Rule::checksum_option => {
                let mut width = None;
                let mut method = None;
                for inner in option.into_inner() {
                    match inner.as_rule() {
                        Rule::num => width = Some(parse_num(inner.as_str())?),
                        Rule::string_literal => method = Some(unescape_string(inner.as_str())?),
                        _ => {}
                    }
                }
                section.checksum = Some(ChecksumSpec {
                    width: width.ok_or("checksum: missing width")?,
                    method,
                });
            }
            _ => {}
        }
    }
    Ok(section)
}

fn build_prefix(pair: pest::iterators::Pair<Rule>) -> Result<PrefixSpec, String> {
    let mut width = None;
    let mut order = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::num => width = Some(parse_num(inner.as_str())?),
            Rule::byte_order => order = Some(inner.as_str().to_string()),
            _ => {}
        }
    }
    Ok(PrefixSpec {
        width: width.ok_or("prefix: missing width")?,
        order,
    })
}

// ==================== Frames ====================

fn build_frame(pair: pest::iterators::Pair<Rule>) -> Result<FrameSection, String> {
    let mut name = String::new();
    let mut discriminator = None;
    let mut fields = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::num => discriminator = Some(parse_num(inner.as_str())?),
            Rule::frame_field => fields.push(build_field(inner)?),
            _ => {}
        }
    }
    Ok(FrameSection {
        discriminator: discriminator.ok_or_else(|| format!("frame {}: missing discriminator", name))?,
        name,
        fields,
    })
}

fn build_field(pair: pest::iterators::Pair<Rule>) -> Result<FieldDecl, String> {
    let mut name = String::new();
    let mut token = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::string_literal => name = unescape_string(inner.as_str())?,
            Rule::type_token => token = Some(inner.as_str().to_string()),
            _ => {}
        }
    }
    Ok(FieldDecl {
        token: token.ok_or_else(|| format!("field {}: missing type", name))?,
        name,
    })
}

// ==================== Literals ====================

fn parse_num(s: &str) -> Result<u64, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse::<u64>()
    };
    parsed.map_err(|_| format!("Invalid number: {}", s))
}

fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let hex = &s[2..];
    if hex.len() % 2 != 0 {
        return Err("Hex literal must have even length".to_string());
    }
    hex.as_bytes()
        .chunks(2)
        .map(|chunk| {
            let digits = std::str::from_utf8(chunk).map_err(|_| "Invalid hex")?;
            u8::from_str_radix(digits, 16).map_err(|_| "Invalid hex".to_string())
        })
        .collect()
}

/// Unescape a quoted literal into raw bytes. Supports `\n \t \r \0 \\ \" \xHH`.
fn unescape(quoted: &str) -> Result<Vec<u8>, String> {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| format!("Expected quoted string: {}", quoted))?;
    let mut out = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('r') => out.push(b'\r'),
            Some('0') => out.push(0),
            Some('\\') => out.push(b'\\'),
            Some('"') => out.push(b'"'),
            Some('x') => {
                let hi = chars.next().and_then(|c| c.to_digit(16));
                let lo = chars.next().and_then(|c| c.to_digit(16));
                match hi.zip(lo) {
                    Some((hi, lo)) => out.push((hi * 16 + lo) as u8),
                    None => return Err(format!("Invalid \\x escape in {}", quoted)),
                }
            }
            Some(other) => return Err(format!("Unknown escape \\{} in {}", other, quoted)),
            None => return Err(format!("Dangling escape in {}", quoted)),
        }
    }
    Ok(out)
}

fn unescape_string(quoted: &str) -> Result<String, String> {
    String::from_utf8(unescape(quoted)?).map_err(|_| format!("Not valid UTF-8: {}", quoted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_control_and_hex() {
        assert_eq!(unescape(r#""\n""#).unwrap(), b"\n");
        assert_eq!(unescape(r#""a\tb""#).unwrap(), b"a\tb");
        assert_eq!(unescape(r#""\x7e\x7E""#).unwrap(), vec![0x7e, 0x7e]);
        assert_eq!(unescape(r#""\"\\""#).unwrap(), b"\"\\");
        assert!(unescape(r#""\x7""#).is_err());
        assert!(unescape(r#""\q""#).is_err());
    }

    #[test]
    fn hex_bytes_even_length() {
        assert_eq!(parse_hex_bytes("0x7E7e").unwrap(), vec![0x7e, 0x7e]);
        assert!(parse_hex_bytes("0x7E7").is_err());
    }

    #[test]
    fn numbers_decimal_and_hex() {
        assert_eq!(parse_num("12").unwrap(), 12);
        assert_eq!(parse_num("0x0F").unwrap(), 15);
        assert!(parse_num("99999999999999999999999").is_err());
    }
}

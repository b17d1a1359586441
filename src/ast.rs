//! Abstract Syntax Tree for the stream configuration language.

/// Root configuration: optional splitter section and the frame definitions.
#[derive(Debug, Clone, Default)]
pub struct DaqConfig {
    pub splitter: Option<SplitterSection>,
    pub frames: Vec<FrameSection>,
}

/// `splitter { ... }`. Options left out take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitterSection {
    pub delimiter: Option<Vec<u8>>,
    pub index: Option<PrefixSpec>,
    pub length: Option<PrefixSpec>,
    pub checksum: Option<ChecksumSpec>,
}

/// `index: 2 big;` / `length: 1 l;`. The order string is interpreted only for non-zero widths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixSpec {
    pub width: u64,
    pub order: Option<String>,
}

/// `checksum: 2 "crc16";`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumSpec {
    pub width: u64,
    pub method: Option<String>,
}

/// `frame fog = 1 { idx: u1; ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSection {
    pub name: String,
    pub discriminator: u64,
    pub fields: Vec<FieldDecl>,
}

impl FrameSection {
    pub fn new(name: impl Into<String>, discriminator: u64) -> Self {
        FrameSection {
            name: name.into(),
            discriminator,
            fields: Vec::new(),
        }
    }

    /// Builder-style field append, for frames defined in code.
    pub fn field(mut self, name: impl Into<String>, token: impl Into<String>) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            token: token.into(),
        });
        self
    }
}

/// One `name: token;` line. The token is compiled later by the schema module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: String,
    pub token: String,
}

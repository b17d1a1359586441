//! Frame handling: split a continuous byte stream into delimiter-bounded frames.
//!
//! Every delimiter closes the record in front of it and opens the next one; the start of
//! the stream opens the first record. Inside a record the layout is
//!
//! ```text
//! [index: index_width][length: length_width][payload ...][checksum: checksum_width]
//! ```
//!
//! Index gaps, length mismatches and checksum bytes are reported as [`FrameEvent`]s and
//! never stop the stream. A record shorter than its fixed overhead is dropped, but its
//! bytes are still consumed so the stream keeps moving.

use crate::endian::{width_mask, wrapping_successor, Endianness};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FramingError {
    #[error("delimiter must be at least one byte")]
    EmptyDelimiter,
    #[error("{field} width must be 0, 1, 2 or 4, got {width}")]
    InvalidWidth { field: &'static str, width: usize },
    #[error("byte order {0:?} is not supported (expected big/b/bigendian or little/l/littleendian)")]
    UnknownByteOrder(String),
}

/// A fixed-width unsigned prefix (sequence index or declared length).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Prefix {
    pub width: usize,
    pub order: Endianness,
}

impl Prefix {
    fn new(field: &'static str, width: usize, order: Endianness) -> Result<Self, FramingError> {
        match width {
            0 | 1 | 2 | 4 => Ok(Prefix { width, order }),
            _ => Err(FramingError::InvalidWidth { field, width }),
        }
    }
}

/// Immutable framing configuration. Built with [`FramingConfig::new`] and the
/// `with_*` methods, each of which validates its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramingConfig {
    delimiter: Vec<u8>,
    index: Prefix,
    length: Prefix,
    checksum_width: usize,
    checksum_method: Option<String>,
}

impl FramingConfig {
    pub fn new(delimiter: impl Into<Vec<u8>>) -> Result<Self, FramingError> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(FramingError::EmptyDelimiter);
        }
        Ok(FramingConfig {
            delimiter,
            index: Prefix::default(),
            length: Prefix::default(),
            checksum_width: 0,
            checksum_method: None,
        })
    }

    pub fn with_index(mut self, width: usize, order: Endianness) -> Result<Self, FramingError> {
        self.index = Prefix::new("index", width, order)?;
        Ok(self)
    }

    pub fn with_length(mut self, width: usize, order: Endianness) -> Result<Self, FramingError> {
        self.length = Prefix::new("length", width, order)?;
        Ok(self)
    }

    pub fn with_checksum(mut self, width: usize) -> Self {
        self.checksum_width = width;
        self
    }

    /// Record the configured checksum method. Checksum bytes are stripped and reported,
    /// never verified, whatever the method.
    pub fn with_checksum_method(mut self, method: impl Into<String>) -> Self {
        self.checksum_method = Some(method.into());
        self
    }

    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    pub fn index(&self) -> Prefix {
        self.index
    }

    pub fn length(&self) -> Prefix {
        self.length
    }

    pub fn checksum_width(&self) -> usize {
        self.checksum_width
    }

    pub fn checksum_method(&self) -> Option<&str> {
        self.checksum_method.as_deref()
    }

    /// Bytes of index, length and checksum carried by every record.
    pub fn overhead(&self) -> usize {
        self.index
            .width
            .saturating_add(self.length.width)
            .saturating_add(self.checksum_width)
    }
}

impl Default for FramingConfig {
    /// Newline-delimited records without index, length or checksum.
    fn default() -> Self {
        FramingConfig {
            delimiter: vec![b'\n'],
            index: Prefix::default(),
            length: Prefix::default(),
            checksum_width: 0,
            checksum_method: None,
        }
    }
}

/// Non-fatal framing anomaly or observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// Record shorter than index + length + checksum; dropped.
    ShortFrame { len: usize, overhead: usize },
    /// Sequence index did not follow the previous one.
    IndexGap { expected: u64, observed: u64 },
    /// Declared length differs from the payload actually present (compared at the prefix width).
    LengthMismatch { declared: u64, actual: u64 },
    /// Trailing checksum bytes stripped from the record (not verified).
    Checksum { bytes: Vec<u8> },
}

/// Receives framing events. The extractor never fails because of them.
pub trait FrameObserver {
    fn on_event(&mut self, event: FrameEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl FrameObserver for LogObserver {
    fn on_event(&mut self, event: FrameEvent) {
        match event {
            FrameEvent::ShortFrame { len, overhead } => {
                log::warn!("frame dropped: {} bytes, shorter than overhead {}", len, overhead)
            }
            FrameEvent::IndexGap { expected, observed } => {
                log::warn!("frame index gap: expected {}, got {}", expected, observed)
            }
            FrameEvent::LengthMismatch { declared, actual } => {
                log::warn!("frame length mismatch: declared {}, got {}", declared, actual)
            }
            FrameEvent::Checksum { bytes } => log::debug!("frame checksum {:02x?}", bytes),
        }
    }
}

/// Collects events in arrival order.
impl FrameObserver for Vec<FrameEvent> {
    fn on_event(&mut self, event: FrameEvent) {
        self.push(event);
    }
}

/// Sequence tracking carried from one extraction to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractorState {
    /// Last observed index; 0 before the first indexed frame, so the first expected index is 1.
    pub last_index: u64,
}

/// Stateful extractor for one stream. Calls must be made in stream order.
#[derive(Debug)]
pub struct FrameExtractor<O = LogObserver> {
    config: FramingConfig,
    state: ExtractorState,
    observer: O,
}

impl FrameExtractor {
    pub fn new(config: FramingConfig) -> Self {
        FrameExtractor::with_observer(config, LogObserver)
    }
}

impl<O: FrameObserver> FrameExtractor<O> {
    pub fn with_observer(config: FramingConfig, observer: O) -> Self {
        FrameExtractor {
            config,
            state: ExtractorState::default(),
            observer,
        }
    }

    pub fn config(&self) -> &FramingConfig {
        &self.config
    }

    pub fn state(&self) -> ExtractorState {
        self.state
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Look for the next record at the front of `buf`.
    ///
    /// Returns `(bytes_consumed, payload)`:
    /// - `(0, None)`: no delimiter yet; nothing changed, append more bytes and retry.
    /// - `(n, None)`: a record was consumed but yielded nothing (empty or too short).
    /// - `(n, Some(payload))`: a record with index, length and checksum removed.
    pub fn extract<'a>(&mut self, buf: &'a [u8]) -> (usize, Option<&'a [u8]>) {
        let delimiter = self.config.delimiter.as_slice();
        let pos = match find(buf, delimiter) {
            Some(p) => p,
            None => return (0, None),
        };
        let consumed = pos + delimiter.len();
        let record = &buf[..pos];
        if record.is_empty() {
            return (consumed, None);
        }

        let overhead = self.config.overhead();
        if record.len() < overhead {
            self.observer.on_event(FrameEvent::ShortFrame {
                len: record.len(),
                overhead,
            });
            return (consumed, None);
        }

        let mut data = record;
        let index = self.config.index;
        if index.width > 0 {
            let observed = index.order.read_uint(&data[..index.width]);
            let expected = wrapping_successor(self.state.last_index, index.width);
            if observed != expected {
                self.observer.on_event(FrameEvent::IndexGap { expected, observed });
            }
            self.state.last_index = observed;
            data = &data[index.width..];
        }

        let length = self.config.length;
        if length.width > 0 {
            let declared = length.order.read_uint(&data[..length.width]);
            let actual = ((record.len() - overhead) as u64) & width_mask(length.width);
            if declared != actual {
                self.observer.on_event(FrameEvent::LengthMismatch { declared, actual });
            }
            data = &data[length.width..];
        }

        let checksum_width = self.config.checksum_width;
        if checksum_width > 0 {
            let (body, checksum) = data.split_at(data.len() - checksum_width);
            self.observer.on_event(FrameEvent::Checksum {
                bytes: checksum.to_vec(),
            });
            data = body;
        }

        (consumed, Some(data))
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    match needle {
        [b] => haystack.iter().position(|x| x == b),
        _ => haystack.windows(needle.len()).position(|w| w == needle),
    }
}

/// An extractor together with the unconsumed tail of its stream.
#[derive(Debug)]
pub struct FrameStream<O = LogObserver> {
    extractor: FrameExtractor<O>,
    buf: Vec<u8>,
}

impl FrameStream {
    pub fn new(config: FramingConfig) -> Self {
        FrameStream::with_observer(config, LogObserver)
    }
}

impl<O: FrameObserver> FrameStream<O> {
    pub fn with_observer(config: FramingConfig, observer: O) -> Self {
        FrameStream {
            extractor: FrameExtractor::with_observer(config, observer),
            buf: Vec::new(),
        }
    }

    /// Append bytes read from the source.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// One extraction step; consumed bytes are dropped from the buffer.
    pub fn extract_next(&mut self) -> (usize, Option<Vec<u8>>) {
        let (consumed, payload) = self.extractor.extract(&self.buf);
        let payload = payload.map(<[u8]>::to_vec);
        self.buf.drain(..consumed);
        (consumed, payload)
    }

    /// Next payload, skipping dropped records. `None` means more input is needed.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.extract_next() {
                (0, _) => return None,
                (_, Some(payload)) => return Some(payload),
                (_, None) => continue,
            }
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &[u8] {
        &self.buf
    }

    pub fn extractor(&self) -> &FrameExtractor<O> {
        &self.extractor
    }

    pub fn extractor_mut(&mut self) -> &mut FrameExtractor<O> {
        &mut self.extractor
    }
}

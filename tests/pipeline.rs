//! End to end: configuration source -> framed byte stream -> decoded records.

use daqframe::dump::{format_record, format_schemas};
use daqframe::{
    Config, DecodeError, Decoder, FrameEvent, FrameSection, FramingConfig, Pipeline,
    PipelineStats,
};
use std::sync::Arc;

const BOARD: &str = r#"
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

frame power = 2 {
  pv: u2;
  pi: u2;
  nv: u2;
  ni: u2;
}
"#;

/// `[index BE16][length u8][payload][checksum 2]` followed by the delimiter.
fn framed(index: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = index.to_be_bytes().to_vec();
    out.push(payload.len() as u8);
    out.extend_from_slice(payload);
    out.extend_from_slice(&[0xc0, 0xde]);
    out.extend_from_slice(&[0x7e, 0x7e]);
    out
}

const FOG: [u8; 9] = [1, 1, 0, 9, 1, 1, 2, 3, 4];
const POWER: [u8; 9] = [2, 0, 6, 0, 2, 0, 5, 0, 1];

fn board_pipeline() -> Pipeline<Vec<FrameEvent>> {
    let config = Config::from_source(BOARD).unwrap();
    Pipeline::with_observer(config.framing.clone(), Arc::new(config.decoder()), Vec::new())
}

#[test]
fn test_decode_framed_stream() {
    let mut pipeline = board_pipeline();
    let mut stream = framed(1, &FOG);
    stream.extend(framed(2, &POWER));
    let records: Vec<_> = pipeline
        .feed(&stream)
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(format_record(&records[0]), "fog idx=1 data=590081 t1=2 t2=3 st=4");
    assert_eq!(format_record(&records[1]), "power pv=6 pi=2 nv=5 ni=1");

    let events = pipeline.stream().extractor().observer();
    assert_eq!(
        events.as_slice(),
        &[
            FrameEvent::Checksum { bytes: vec![0xc0, 0xde] },
            FrameEvent::Checksum { bytes: vec![0xc0, 0xde] },
        ]
    );
    assert_eq!(
        pipeline.stats(),
        PipelineStats {
            bytes_in: stream.len() as u64,
            frames: 2,
            records: 2,
            rejected: 0,
        }
    );
}

#[test]
fn test_byte_at_a_time() {
    let mut pipeline = board_pipeline();
    let mut stream = framed(1, &FOG);
    stream.extend(framed(2, &POWER));
    stream.extend_from_slice(&[0x00, 0x03]);
    let mut records = Vec::new();
    for b in &stream {
        records.extend(pipeline.feed(std::slice::from_ref(b)));
    }
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(Result::is_ok));
    assert_eq!(pipeline.stream().remaining(), &[0x00, 0x03]);
}

#[test]
fn test_rejected_frames_do_not_stop_stream() {
    let mut pipeline = board_pipeline();
    let mut stream = framed(1, &FOG);
    stream.extend(framed(2, &[9, 1, 2]));
    stream.extend(framed(3, &FOG[..4]));
    stream.extend(framed(4, &POWER));
    let results = pipeline.feed(&stream);
    assert_eq!(results.len(), 4);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(DecodeError::UnsupportedFrameType(9))));
    assert!(matches!(results[2], Err(DecodeError::InsufficientData { .. })));
    assert_eq!(
        results[3].as_ref().ok().map(|r| r.frame_type.as_str()),
        Some("power")
    );
    let stats = pipeline.stats();
    assert_eq!((stats.frames, stats.records, stats.rejected), (4, 2, 2));
}

#[test]
fn test_anomalies_reported_not_fatal() {
    let mut pipeline = board_pipeline();
    let mut stream = framed(1, &FOG);
    // Gap in the sequence.
    stream.extend(framed(5, &POWER));
    // Wrong declared length.
    let mut bad_len = framed(6, &POWER);
    bad_len[2] = 42;
    stream.extend(bad_len);
    // Too short to carry index, length and checksum.
    stream.extend_from_slice(&[0x01, 0x7e, 0x7e]);
    stream.extend(framed(7, &FOG));

    let results = pipeline.feed(&stream);
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(Result::is_ok));

    let anomalies: Vec<_> = pipeline
        .stream()
        .extractor()
        .observer()
        .iter()
        .filter(|e| !matches!(e, FrameEvent::Checksum { .. }))
        .cloned()
        .collect();
    assert_eq!(
        anomalies,
        vec![
            FrameEvent::IndexGap { expected: 2, observed: 5 },
            FrameEvent::LengthMismatch { declared: 42, actual: 9 },
            FrameEvent::ShortFrame { len: 1, overhead: 5 },
        ]
    );
    assert_eq!(pipeline.stats().frames, 4);
}

#[test]
fn test_default_newline_framing() {
    let decoder = Decoder::from_frames(&[FrameSection::new("tick", 3).field("n", "u1")]).unwrap();
    let mut pipeline = Pipeline::new(FramingConfig::default(), Arc::new(decoder));
    let results = pipeline.feed(b"\x03\x07\n\x03\x08\n\x03");
    let values: Vec<_> = results
        .into_iter()
        .map(|r| r.unwrap().int("n"))
        .collect();
    assert_eq!(values, [Some(7), Some(8)]);
    assert_eq!(pipeline.stream().remaining(), b"\x03");
}

#[test]
fn test_pipelines_share_one_decoder() {
    let config = Config::from_source(BOARD).unwrap();
    let decoder = Arc::new(config.decoder());
    let handles: Vec<_> = (0..3u16)
        .map(|n| {
            let decoder = Arc::clone(&decoder);
            let framing = config.framing.clone();
            std::thread::spawn(move || {
                let mut pipeline = Pipeline::new(framing, decoder);
                let mut stream = Vec::new();
                for i in 1..=n + 1 {
                    stream.extend(framed(i, &POWER));
                }
                let ok = pipeline.feed(&stream).iter().filter(|r| r.is_ok()).count();
                (ok, pipeline.stats().records)
            })
        })
        .collect();
    for (n, h) in handles.into_iter().enumerate() {
        let (ok, records) = h.join().unwrap();
        assert_eq!(ok, n + 1);
        assert_eq!(records, n as u64 + 1);
    }
}

#[test]
fn test_from_config_and_schema_listing() {
    let config = Config::from_source(BOARD).unwrap();
    let mut pipeline = Pipeline::from_config(&config);
    assert_eq!(pipeline.decoder().schemas().len(), 2);
    let results = pipeline.feed(&framed(1, &POWER));
    assert_eq!(results.len(), 1);

    let listing = format_schemas(&config.schemas);
    let first = listing.lines().next().unwrap();
    assert_eq!(first, "fog: type 1 (8 byte body)");
    assert!(listing.contains("power: type 2 (8 byte body)"));
}

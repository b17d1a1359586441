//! Stream fuzz target: split arbitrary bytes with a fully loaded splitter and decode each frame.
//! The first byte picks the chunk size so frames straddle push boundaries.
//! Consumed bytes must never exceed what was buffered, and decoding must not panic.
//! Build with: cargo fuzz run extract_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
const BOARD: &str = r#"
splitter { delimiter: 0x7E7E; index: 2 big; length: 1 little; checksum: 2; }
frame fog = 1 { idx: u1; data: i4; t1: u1; t2: u1; st: u1; }
frame power = 2 { pv: u2; pi: u2; nv: u2; ni: u2; }
frame env = 3 { t: f4; p: f8; pad: n3; serial: b4; }
"#;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let (chunk, data) = match data.split_first() {
        Some((c, rest)) => ((*c as usize).max(1), rest),
        None => return,
    };
    let config = match daqframe::Config::from_source(BOARD) {
        Ok(c) => c,
        Err(_) => return,
    };
    let decoder = config.decoder();
    let mut stream = daqframe::FrameStream::with_observer(config.framing.clone(), Vec::new());
    for part in data.chunks(chunk) {
        stream.push(part);
        loop {
            let buffered = stream.remaining().len();
            let (consumed, payload) = stream.extract_next();
            assert!(consumed <= buffered);
            if consumed == 0 {
                break;
            }
            if let Some(payload) = payload {
                let _ = decoder.decode(&payload);
            }
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run extract_fuzz");
}

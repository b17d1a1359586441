//! Replay a captured byte stream through the framing + decoding pipeline.
//!
//! Usage:
//!   daq_decode [OPTIONS] CONFIG [INPUT]
//!
//! INPUT is a raw byte capture (default: stdin) or, with `--pcap` or when the file starts with a
//! pcap/pcapng magic, a packet capture whose UDP payloads are concatenated into the stream.
//!
//! Options:
//!   --pcap         Treat INPUT as a packet capture
//!   --chunk=N      Feed raw input N bytes at a time (default 4096)
//!   --verbose, -v  Print every framing event as it happens

use daqframe::dump::format_record;
use daqframe::{Config, FrameEvent, FrameObserver, Pipeline};
use pcap_parser::pcapng::Block as PcapNgBlock;
use pcap_parser::traits::{PcapNGPacketBlock, PcapReaderIterator};
use pcap_parser::{Linktype, PcapBlockOwned, PcapError};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

const PCAP_MAGICS: [[u8; 4]; 3] = [
    [0xd4, 0xc3, 0xb2, 0xa1],
    [0xa1, 0xb2, 0xc3, 0xd4],
    [0x0a, 0x0d, 0x0d, 0x0a],
];

/// Counts framing events by kind; optionally echoes them.
#[derive(Debug, Default)]
struct EventTally {
    verbose: bool,
    short_frames: u64,
    index_gaps: u64,
    length_mismatches: u64,
    checksums: u64,
}

impl FrameObserver for EventTally {
    fn on_event(&mut self, event: FrameEvent) {
        match &event {
            FrameEvent::ShortFrame { .. } => self.short_frames += 1,
            FrameEvent::IndexGap { .. } => self.index_gaps += 1,
            FrameEvent::LengthMismatch { .. } => self.length_mismatches += 1,
            FrameEvent::Checksum { .. } => self.checksums += 1,
        }
        if self.verbose {
            eprintln!("event: {:?}", event);
        }
    }
}

fn drain(pipeline: &mut Pipeline<EventTally>, out: &mut dyn Write) -> anyhow::Result<()> {
    while let Some(result) = pipeline.next_record() {
        match result {
            Ok(record) => writeln!(out, "{}", format_record(&record))?,
            Err(e) => eprintln!("rejected: {}", e),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let mut raw_args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = if let Some(pos) = raw_args.iter().position(|a| a == "--verbose" || a == "-v") {
        raw_args.remove(pos);
        true
    } else {
        false
    };
    let force_pcap = if let Some(pos) = raw_args.iter().position(|a| a == "--pcap") {
        raw_args.remove(pos);
        true
    } else {
        false
    };
    let chunk: usize = match raw_args.iter().position(|a| a.starts_with("--chunk=")) {
        Some(pos) => {
            let arg = raw_args.remove(pos);
            let n: usize = arg["--chunk=".len()..]
                .parse()
                .map_err(|_| anyhow::anyhow!("--chunk expects a positive number, got {}", arg))?;
            n.max(1)
        }
        None => 4096,
    };
    let mut args = raw_args.into_iter();
    let config_path: PathBuf = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("usage: daq_decode [--pcap] [--chunk=N] [-v] CONFIG [INPUT]"))?;
    let input_path: Option<PathBuf> = args.next().map(PathBuf::from);

    let config = Config::load(&config_path)?;
    let tally = EventTally {
        verbose,
        ..EventTally::default()
    };
    let mut pipeline = Pipeline::with_observer(config.framing.clone(), Arc::new(config.decoder()), tally);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let is_pcap = match &input_path {
        Some(p) if !force_pcap => {
            let mut probe = [0u8; 4];
            let n = File::open(p)?.read(&mut probe)?;
            n == 4 && PCAP_MAGICS.contains(&probe)
        }
        _ => force_pcap,
    };

    let mut packets = 0u64;
    if is_pcap {
        let path = input_path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("--pcap needs an INPUT file"))?;
        let mut probe = [0u8; 4];
        File::open(path)?.read_exact(&mut probe)?;
        let file = File::open(path)?;
        let mut on_payload = |payload: &[u8]| -> anyhow::Result<()> {
            packets += 1;
            pipeline.push(payload);
            drain(&mut pipeline, &mut out)
        };
        if probe == PCAP_MAGICS[2] {
            run_pcapng(file, &mut on_payload)?;
        } else {
            run_legacy_pcap(file, &mut on_payload)?;
        }
    } else {
        let mut reader: Box<dyn Read> = match &input_path {
            Some(p) => Box::new(File::open(p)?),
            None => Box::new(io::stdin()),
        };
        let mut buf = vec![0u8; chunk];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            pipeline.push(&buf[..n]);
            drain(&mut pipeline, &mut out)?;
        }
    }

    let stats = pipeline.stats();
    let remaining = pipeline.stream().remaining().len();
    let tally = pipeline.stream().extractor().observer();
    eprintln!("config: {}", config_path.display());
    if is_pcap {
        eprintln!("udp payloads: {}", packets);
    }
    eprintln!("bytes: {}", stats.bytes_in);
    eprintln!("frames: {}", stats.frames);
    eprintln!("records: {}", stats.records);
    eprintln!("rejected: {}", stats.rejected);
    eprintln!("short frames dropped: {}", tally.short_frames);
    eprintln!("index gaps: {}", tally.index_gaps);
    eprintln!("length mismatches: {}", tally.length_mismatches);
    eprintln!("checksums stripped (unverified): {}", tally.checksums);
    eprintln!("unframed tail: {} byte(s)", remaining);
    Ok(())
}

fn run_legacy_pcap<R: Read>(
    file: R,
    on_payload: &mut dyn FnMut(&[u8]) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let mut reader = pcap_parser::pcap::LegacyPcapReader::new(1 << 20, file)?;
    let mut linktype: Option<Linktype> = None;
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                match block {
                    PcapBlockOwned::LegacyHeader(h) => linktype = Some(h.network),
                    PcapBlockOwned::Legacy(b) => {
                        let lt = linktype.unwrap_or(Linktype(1));
                        if let Some(udp_payload) = udp_payload_from_linktype(lt, b.data) {
                            on_payload(udp_payload)?;
                        }
                    }
                    PcapBlockOwned::NG(_) => {}
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| anyhow::anyhow!("pcap refill error: {:?}", e))?;
            }
            Err(e) => return Err(anyhow::anyhow!("pcap read error: {:?}", e)),
        }
    }
    Ok(())
}

fn run_pcapng<R: Read>(
    file: R,
    on_payload: &mut dyn FnMut(&[u8]) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let mut reader = pcap_parser::pcapng::PcapNGReader::new(1 << 20, file)?;
    let mut if_linktypes: Vec<Linktype> = Vec::new();
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                if let PcapBlockOwned::NG(b) = block {
                    match &b {
                        PcapNgBlock::InterfaceDescription(idb) => if_linktypes.push(idb.linktype),
                        PcapNgBlock::EnhancedPacket(epb) => {
                            let lt = if_linktypes.get(epb.if_id as usize).copied().unwrap_or(Linktype(1));
                            if let Some(udp_payload) = udp_payload_from_linktype(lt, epb.packet_data()) {
                                on_payload(udp_payload)?;
                            }
                        }
                        PcapNgBlock::SimplePacket(spb) => {
                            let lt = if_linktypes.first().copied().unwrap_or(Linktype(1));
                            if let Some(udp_payload) = udp_payload_from_linktype(lt, spb.packet_data()) {
                                on_payload(udp_payload)?;
                            }
                        }
                        _ => {}
                    }
                }
                reader.consume(offset);
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| anyhow::anyhow!("pcapng refill error: {:?}", e))?;
            }
            Err(e) => return Err(anyhow::anyhow!("pcapng read error: {:?}", e)),
        }
    }
    Ok(())
}

/// UDP payload of a captured frame, sized from the IPv4/UDP length fields (drops Ethernet padding).
fn udp_payload_from_linktype(linktype: Linktype, frame: &[u8]) -> Option<&[u8]> {
    let l3 = match linktype.0 {
        1 => ethernet_l3(frame)?,      // DLT_EN10MB
        101 => frame,                  // DLT_RAW
        113 => linux_sll_l3(frame)?,   // DLT_LINUX_SLL
        _ => return None,
    };
    ipv4_udp_payload(l3)
}

fn ethernet_l3(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < 14 {
        return None;
    }
    let mut off = 12usize;
    let mut ethertype = u16::from_be_bytes([frame[off], frame[off + 1]]);
    off += 2;
    // 802.1Q / 802.1ad tags
    while ethertype == 0x8100 || ethertype == 0x88a8 {
        if frame.len() < off + 4 + 2 {
            return None;
        }
        off += 4;
        ethertype = u16::from_be_bytes([frame[off - 2], frame[off - 1]]);
    }
    match ethertype {
        0x0800 => Some(&frame[off..]),
        _ => None,
    }
}

fn linux_sll_l3(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < 16 {
        return None;
    }
    match u16::from_be_bytes([frame[14], frame[15]]) {
        0x0800 => Some(&frame[16..]),
        _ => None,
    }
}

fn ipv4_udp_payload(l3: &[u8]) -> Option<&[u8]> {
    if l3.len() < 20 || l3[0] >> 4 != 4 {
        return None;
    }
    let ihl = (l3[0] & 0x0f) as usize * 4;
    let total_len = u16::from_be_bytes([l3[2], l3[3]]) as usize;
    if ihl < 20 || l3.len() < ihl || total_len < ihl {
        return None;
    }
    let l3 = if total_len <= l3.len() { &l3[..total_len] } else { l3 };
    if l3.len() < ihl + 8 || l3[9] != 17 {
        return None;
    }
    let udp = &l3[ihl..];
    let udp_len = u16::from_be_bytes([udp[4], udp[5]]) as usize;
    if udp_len < 8 || udp.len() < udp_len {
        return None;
    }
    Some(&udp[8..udp_len])
}

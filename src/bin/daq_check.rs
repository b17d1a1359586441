//! Check acquisition configuration files: parse, validate framing and compile every frame schema.
//!
//! Usage:
//!   daq_check [OPTIONS] [FILE ...]
//!   daq_check < daq.conf
//!
//! Options:
//!   --human, -H  Print the resolved splitter and the compiled schema table
//!
//! Exits with status 1 if any file fails to load.

use daqframe::dump::format_schemas;
use daqframe::{Config, FramingConfig};
use std::io::{self, Read};
use std::path::Path;

#[derive(Clone, Copy)]
enum OutputStyle {
    Compact,
    Human,
}

fn describe_framing(framing: &FramingConfig) -> Vec<String> {
    let mut lines = vec![format!("delimiter: {:02x?}", framing.delimiter())];
    let index = framing.index();
    if index.width > 0 {
        lines.push(format!("index: {} byte(s), {}", index.width, index.order));
    }
    let length = framing.length();
    if length.width > 0 {
        lines.push(format!("length: {} byte(s), {}", length.width, length.order));
    }
    if framing.checksum_width() > 0 {
        lines.push(format!(
            "checksum: {} byte(s), method {} (not verified)",
            framing.checksum_width(),
            framing.checksum_method().unwrap_or("unspecified")
        ));
    }
    lines
}

fn report(name: &str, src: &str, style: OutputStyle) -> bool {
    let config = match Config::from_source(src) {
        Ok(c) => c,
        Err(e) => {
            println!("{}: error: {}", name, e);
            return false;
        }
    };
    match style {
        OutputStyle::Compact => {
            println!(
                "{}: ok ({} frame type(s), overhead {} byte(s))",
                name,
                config.schemas.len(),
                config.framing.overhead()
            );
        }
        OutputStyle::Human => {
            println!("{}", name);
            for line in describe_framing(&config.framing) {
                println!("  {}", line);
            }
            for line in format_schemas(&config.schemas).lines() {
                println!("  {}", line);
            }
        }
    }
    true
}

fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let style = if let Some(pos) = args.iter().position(|a| a == "--human" || a == "-H") {
        args.remove(pos);
        OutputStyle::Human
    } else {
        OutputStyle::Compact
    };

    let mut failed = 0usize;
    if args.is_empty() {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        if !report("<stdin>", &src, style) {
            failed += 1;
        }
    } else {
        for path in &args {
            let path = Path::new(path);
            let src = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    failed += 1;
                    continue;
                }
            };
            if !report(&path.display().to_string(), &src, style) {
                failed += 1;
            }
        }
    }

    if failed > 0 {
        eprintln!("check: {} file(s) failed", failed);
        std::process::exit(1);
    }
    Ok(())
}

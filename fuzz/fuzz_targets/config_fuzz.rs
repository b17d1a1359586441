//! Configuration fuzz target: feed arbitrary text to the config loader.
//! Parsing and resolution must not panic; they return Ok(Config) or Err(ConfigError).
//! Build with: cargo fuzz run config_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let _ = daqframe::Config::from_source(s);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run config_fuzz");
}

//! Fuzz target for pkt-line wire framing.
//!
//! Tests that the pkt-line scanner and the operations built on it handle
//! arbitrary input without panicking.

#![no_main]

use gitlet_protocol::PktLineScanner;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Walk every line; the scanner advances at least four bytes per line,
    // so this terminates. Errors are expected for malformed input.
    let mut scanner = PktLineScanner::new(data);
    loop {
        match scanner.next_line() {
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(_) => break,
        }
    }

    let _ = gitlet_protocol::parse_head_advert(data);
    let _ = gitlet_protocol::strip_sideband(data);
});

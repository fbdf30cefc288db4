//! Fuzz target for pack file parsing.
//!
//! Tests that the pack parser handles arbitrary input without panicking.

#![no_main]

use gitlet_protocol::PackParser;
use gitlet_storage::ObjectStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Create a fresh object store for each fuzz iteration
    let dir = tempfile::TempDir::new().unwrap();
    let store = ObjectStore::init(&dir.path().join(".git")).unwrap();

    // Try to parse the data as a pack file
    let mut parser = PackParser::new(data);
    let _ = parser.parse(&store);
});

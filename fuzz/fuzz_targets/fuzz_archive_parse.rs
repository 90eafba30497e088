#![no_main]

use initfs_rs::archive::{decode_body, encode_body};
use initfs_rs::Container;
use libfuzzer_sys::fuzz_target;
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    // Plain body decoding - should never panic
    if let Ok(root) = decode_body(data) {
        // Anything that decodes must re-encode and decode to the same tree
        let encoded = encode_body(&root).expect("decoded tree re-encodes");
        assert_eq!(decode_body(&encoded).expect("re-encoded tree decodes"), root);
    }

    // Full file path, including platform header detection
    let mut temp_file = match NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };
    if temp_file.write_all(data).is_err() || temp_file.flush().is_err() {
        return;
    }

    let container = match Container::from_archive(temp_file.path()) {
        Ok(c) => c,
        Err(_) => return, // Expected for invalid data
    };

    // Listing walks every entry - should never panic
    let _ = container.summaries();
});

#![no_main]

use initfs_rs::{Manifest, MANIFEST_V1};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Arbitrary text must parse or fail cleanly
    let Ok(manifest) = Manifest::decode(text, &MANIFEST_V1) else {
        return;
    };

    // Re-encoding keeps the platform flag and key material
    if let Ok(reparsed) = Manifest::decode(&manifest.encode(&MANIFEST_V1), &MANIFEST_V1) {
        assert_eq!(reparsed.header.platform, manifest.header.platform);
        assert_eq!(reparsed.header.keys, manifest.header.keys);
    }
});

//! Fuzz target for label JSON parsing.
//!
//! Feeds arbitrary bytes to the label parser and, when a label parses,
//! to keypoint set construction.
//!
//! Run with:
//!   cargo +nightly fuzz run label_json_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use landmarkit::ir::io_label_json::from_label_slice;

fuzz_target!(|data: &[u8]| {
    // Label files are small; skip anything over 10MB.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(label) = from_label_slice(data) {
        let _ = label.keypoints(label.landmarks.len());
    }
});

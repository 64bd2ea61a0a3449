//! Fuzz target for heatmap decoding.
//!
//! Interprets the input as little-endian f32 cells of a square heatmap,
//! so NaN, infinities and flat maps all reach the decoder.
//!
//! Run with:
//!   cargo +nightly fuzz run heatmap_decode

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = landmarkit::heatmap::fuzz_decode_bytes(data);
});

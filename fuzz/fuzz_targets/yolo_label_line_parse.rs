//! Fuzz target for single YOLO label lines.
//!
//!   cargo +nightly fuzz run yolo_label_line_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use orchardlabel::ir::io_yolo::fuzz_parse_label_line;

fuzz_target!(|data: &[u8]| {
    if data.len() > 64 * 1024 {
        return;
    }

    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_label_line(line);
});

//! Run-tree fixtures shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use prost::Message;
use tfr_core::events::masked_crc32c;
use tfr_core::events::proto::{Event, Summary, SummaryValue};

/// TFRecord framing with masked CRC32C checksums.
pub fn frame(event: &Event) -> Vec<u8> {
    let payload = event.encode_to_vec();
    let header = (payload.len() as u64).to_le_bytes();
    let mut out = Vec::with_capacity(payload.len() + 16);
    out.write_all(&header).unwrap();
    out.write_u32::<LittleEndian>(masked_crc32c(&header)).unwrap();
    out.write_all(&payload).unwrap();
    out.write_u32::<LittleEndian>(masked_crc32c(&payload)).unwrap();
    out
}

pub fn event_file(scalars: &[(&str, i64, f32)]) -> Vec<u8> {
    let mut bytes = frame(&Event {
        wall_time: 1.0,
        file_version: "brain.Event:2".to_string(),
        ..Default::default()
    });
    for (tag, step, value) in scalars {
        bytes.extend(frame(&Event {
            wall_time: 1.0,
            step: *step,
            summary: Some(Summary {
                value: vec![SummaryValue {
                    tag: tag.to_string(),
                    simple_value: Some(*value),
                    ..Default::default()
                }],
            }),
            ..Default::default()
        }));
    }
    bytes
}

/// `<root>/<folder>/<run>/seed0/run.params` and
/// `<root>/<folder>/<run>/seed0/logs/events.out.tfevents.0`.
pub fn write_run(
    root: &Path,
    folder: &str,
    run: &str,
    params: &str,
    scalars: &[(&str, i64, f32)],
) -> std::io::Result<PathBuf> {
    let run_dir = root.join(folder).join(run);
    let seed = run_dir.join("seed0");
    fs::create_dir_all(seed.join("logs"))?;
    fs::write(seed.join("run.params"), params)?;
    fs::write(seed.join("logs/events.out.tfevents.0"), event_file(scalars))?;
    Ok(run_dir)
}

pub fn sizes(hidden: i64, batch: i64) -> String {
    format!(" < hidden_size: {} >,  < batch_size: {} >, ", hidden, batch)
}

/// Final test curve ending at `last`.
pub fn test_curve(last: f32) -> Vec<(&'static str, i64, f32)> {
    vec![
        ("Network/Train/Loss", 0, 1.0),
        ("Network/Test/Best Avg", 0, 999.0),
        ("Network/Test/Avg", 0, last / 2.0),
        ("Network/Test/Avg", 1, last),
    ]
}

//! Event Log Reader
//!
//! Reads scalar summaries out of TensorBoard `events.out.tfevents.*` files:
//! TFRecord framing (length, length CRC, payload, payload CRC) around
//! protobuf `Event` messages. Only the fields needed for scalars are decoded.
//! Both masked CRC32C checksums are verified; a mismatch is a corrupt record.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use prost::Message;
use tracing::{debug, warn};

use crate::error::SeriesError;
use crate::series::ScalarTable;

/// Upper bound on a single record, to fail fast on garbage length headers.
const MAX_RECORD_LEN: u64 = 256 * 1024 * 1024;

const CRC_MASK_DELTA: u32 = 0xa282_ead8;

const DT_FLOAT: i32 = 1;
const DT_DOUBLE: i32 = 2;
const SCALARS_PLUGIN: &str = "scalars";

/// Subset of `tensorflow.Event` / `Summary` / `TensorProto`.
pub mod proto {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Event {
        #[prost(double, tag = "1")]
        pub wall_time: f64,
        #[prost(int64, tag = "2")]
        pub step: i64,
        #[prost(string, tag = "3")]
        pub file_version: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "5")]
        pub summary: ::core::option::Option<Summary>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Summary {
        #[prost(message, repeated, tag = "1")]
        pub value: ::prost::alloc::vec::Vec<SummaryValue>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SummaryValue {
        #[prost(string, tag = "1")]
        pub tag: ::prost::alloc::string::String,
        #[prost(float, optional, tag = "2")]
        pub simple_value: ::core::option::Option<f32>,
        #[prost(message, optional, tag = "8")]
        pub tensor: ::core::option::Option<TensorProto>,
        #[prost(message, optional, tag = "9")]
        pub metadata: ::core::option::Option<SummaryMetadata>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SummaryMetadata {
        #[prost(message, optional, tag = "1")]
        pub plugin_data: ::core::option::Option<PluginData>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct PluginData {
        #[prost(string, tag = "1")]
        pub plugin_name: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct TensorProto {
        #[prost(int32, tag = "1")]
        pub dtype: i32,
        #[prost(bytes = "vec", tag = "4")]
        pub tensor_content: ::prost::alloc::vec::Vec<u8>,
        #[prost(float, repeated, tag = "5")]
        pub float_val: ::prost::alloc::vec::Vec<f32>,
        #[prost(double, repeated, tag = "6")]
        pub double_val: ::prost::alloc::vec::Vec<f64>,
    }
}

/// Loads a run's scalar table from its event log path.
///
/// Implementations are called from the query worker pool.
pub trait ScalarSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<ScalarTable, SeriesError>;
}

impl<T: ScalarSource + ?Sized> ScalarSource for &T {
    fn load(&self, path: &Path) -> Result<ScalarTable, SeriesError> {
        (**self).load(path)
    }
}

/// [`ScalarSource`] for TensorBoard event files.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFileReader;

impl ScalarSource for EventFileReader {
    fn load(&self, path: &Path) -> Result<ScalarTable, SeriesError> {
        let file = File::open(path).map_err(|source| SeriesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        read_scalars(BufReader::new(file), path)
    }
}

/// Decodes every scalar summary in a TFRecord stream. A truncated final
/// record (a log still being written) ends the stream with a warning.
pub fn read_scalars<R: BufRead>(mut reader: R, path: &Path) -> Result<ScalarTable, SeriesError> {
    let io_err = |source| SeriesError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut table = ScalarTable::default();
    let mut offset = 0u64;
    let mut records = 0usize;

    loop {
        if reader.fill_buf().map_err(io_err)?.is_empty() {
            break;
        }

        let payload = match read_record(&mut reader) {
            Ok(Record::Payload(payload)) => payload,
            Ok(Record::Truncated) => {
                warn!("⚠️ Truncated record at byte {} of {:?}, stopping early", offset, path);
                break;
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(SeriesError::CorruptRecord {
                    path: path.to_path_buf(),
                    offset,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(io_err(e)),
        };

        let event = proto::Event::decode(payload.as_slice()).map_err(|source| {
            SeriesError::Decode {
                path: path.to_path_buf(),
                offset,
                source,
            }
        })?;
        collect_scalars(&event, &mut table);

        offset += 8 + 4 + payload.len() as u64 + 4;
        records += 1;
    }

    debug!(
        "Read {} records ({} scalars) from {:?}",
        records,
        table.len(),
        path
    );
    Ok(table)
}

enum Record {
    Payload(Vec<u8>),
    Truncated,
}

/// TFRecord checksum: CRC32C rotated right by 15 bits plus a constant.
pub fn masked_crc32c(data: &[u8]) -> u32 {
    let crc = crc32c::crc32c(data);
    ((crc >> 15) | (crc << 17)).wrapping_add(CRC_MASK_DELTA)
}

fn checked(what: &str, data: &[u8], expected: u32) -> std::io::Result<()> {
    let actual = masked_crc32c(data);
    if actual != expected {
        return Err(std::io::Error::new(
            ErrorKind::InvalidData,
            format!("{} checksum mismatch ({:#010x} != {:#010x})", what, actual, expected),
        ));
    }
    Ok(())
}

/// EOF only counts as truncation after every checksum read so far matched.
fn read_record<R: Read>(reader: &mut R) -> std::io::Result<Record> {
    let truncated = |e: std::io::Error| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Ok(Record::Truncated)
        } else {
            Err(e)
        }
    };

    let mut header = [0u8; 8];
    if let Err(e) = reader.read_exact(&mut header) {
        return truncated(e);
    }
    let header_crc = match reader.read_u32::<LittleEndian>() {
        Ok(crc) => crc,
        Err(e) => return truncated(e),
    };
    checked("length", &header, header_crc)?;

    let len = u64::from_le_bytes(header);
    if len > MAX_RECORD_LEN {
        return Err(std::io::Error::new(
            ErrorKind::InvalidData,
            format!("record length {} exceeds {}", len, MAX_RECORD_LEN),
        ));
    }

    let mut payload = vec![0u8; len as usize];
    if let Err(e) = reader.read_exact(&mut payload) {
        return truncated(e);
    }
    let payload_crc = match reader.read_u32::<LittleEndian>() {
        Ok(crc) => crc,
        Err(e) => return truncated(e),
    };
    checked("payload", &payload, payload_crc)?;
    Ok(Record::Payload(payload))
}

fn collect_scalars(event: &proto::Event, table: &mut ScalarTable) {
    let Some(summary) = &event.summary else {
        return;
    };
    for value in &summary.value {
        if let Some(v) = scalar_value(value) {
            table.push(value.tag.clone(), event.step, v);
        }
    }
}

/// Scalar payload of a summary value: legacy `simple_value` or a one-element
/// float/double tensor from the scalars plugin.
fn scalar_value(value: &proto::SummaryValue) -> Option<f64> {
    if let Some(v) = value.simple_value {
        return Some(v as f64);
    }

    let plugin = value
        .metadata
        .as_ref()
        .and_then(|m| m.plugin_data.as_ref())
        .map(|p| p.plugin_name.as_str())
        .unwrap_or_default();
    if !plugin.is_empty() && plugin != SCALARS_PLUGIN {
        return None;
    }

    let tensor = value.tensor.as_ref()?;
    match tensor.dtype {
        DT_FLOAT => match (tensor.float_val.as_slice(), tensor.tensor_content.as_slice()) {
            ([v], _) => Some(*v as f64),
            ([], mut content) if content.len() == 4 => {
                content.read_f32::<LittleEndian>().ok().map(f64::from)
            }
            _ => None,
        },
        DT_DOUBLE => match (tensor.double_val.as_slice(), tensor.tensor_content.as_slice()) {
            ([v], _) => Some(*v),
            ([], mut content) if content.len() == 8 => content.read_f64::<LittleEndian>().ok(),
            _ => None,
        },
        _ => None,
    }
}

//! The lossless binary record dump.
//!
//! A 16-byte file header followed by one frame per record:
//!
//! ```text
//! header: magic "CCPK" | version u16 LE | flags u16 LE | 8 reserved bytes
//! frame:  kind u8 | 3 reserved bytes | len u32 LE | payload (len bytes)
//! ```
//!
//! Frames of kind [`FRAME_KIND_RECORD_JSON`] carry one record as JSON with
//! tagged values, so dates and raw bytes survive a round trip.

use std::io::{BufRead, ErrorKind, Read, Write};

use crate::codec::{Codec, RecordStream, lazy};
use crate::error::{CctoolError, CctoolResult};
use crate::multidict::Record;

const FORMAT: &str = "pickle";

pub const MAGIC: &[u8; 4] = b"CCPK";
pub const VERSION: u16 = 0x0001;
pub const HEADER_SIZE: usize = 16;
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest payload accepted for a single record: 16 MiB.
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

pub const FRAME_KIND_RECORD_JSON: u8 = 0x01;

fn corrupt(message: impl Into<String>) -> CctoolError {
    CctoolError::format(FORMAT, message)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u16,
    pub flags: u16,
}

impl FileHeader {
    pub fn new() -> Self {
        FileHeader {
            version: VERSION,
            flags: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.flags.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> CctoolResult<Self> {
        if &bytes[0..4] != MAGIC {
            return Err(corrupt(format!("invalid magic {:?}", &bytes[0..4])));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(corrupt(format!(
                "unsupported version 0x{version:04x}, expected 0x{VERSION:04x}"
            )));
        }

        let flags = u16::from_le_bytes([bytes[6], bytes[7]]);
        if flags != 0 {
            return Err(corrupt(format!("non-zero flags 0x{flags:04x}")));
        }
        if bytes[8..] != [0u8; 8] {
            return Err(corrupt("non-zero reserved header bytes"));
        }

        Ok(FileHeader { version, flags })
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Header in front of every record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: u8,
    pub len: u32,
}

impl FrameHeader {
    pub fn new(kind: u8, len: usize) -> CctoolResult<Self> {
        match u32::try_from(len) {
            Ok(len) if len <= MAX_PAYLOAD_SIZE => Ok(FrameHeader { kind, len }),
            _ => Err(corrupt(format!(
                "record of {len} bytes exceeds the {MAX_PAYLOAD_SIZE} byte limit"
            ))),
        }
    }

    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut bytes = [0u8; FRAME_HEADER_SIZE];
        bytes[0] = self.kind;
        bytes[4..8].copy_from_slice(&self.len.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; FRAME_HEADER_SIZE]) -> CctoolResult<Self> {
        if bytes[1..4] != [0u8; 3] {
            return Err(corrupt("non-zero reserved frame bytes"));
        }
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if len > MAX_PAYLOAD_SIZE {
            return Err(corrupt(format!(
                "frame of {len} bytes exceeds the {MAX_PAYLOAD_SIZE} byte limit"
            )));
        }
        Ok(FrameHeader { kind: bytes[0], len })
    }
}

pub struct Pickle;

impl Codec for Pickle {
    fn decode(&self, mut reader: Box<dyn BufRead>) -> CctoolResult<RecordStream> {
        let mut header = [0u8; HEADER_SIZE];
        read_exact(&mut reader, &mut header, "file header")?;
        FileHeader::from_bytes(&header)?;

        Ok(lazy(Frames { reader, done: false }))
    }

    fn encode(&self, records: &[Record], writer: &mut dyn Write) -> CctoolResult<()> {
        writer.write_all(&FileHeader::new().to_bytes())?;
        for record in records {
            let payload = serde_json::to_vec(record).map_err(|e| corrupt(e.to_string()))?;
            let frame = FrameHeader::new(FRAME_KIND_RECORD_JSON, payload.len())?;
            writer.write_all(&frame.to_bytes())?;
            writer.write_all(&payload)?;
        }
        Ok(())
    }
}

fn read_exact(reader: &mut dyn Read, buf: &mut [u8], what: &str) -> CctoolResult<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => corrupt(format!("truncated {what}")),
        _ => e.into(),
    })
}

struct Frames {
    reader: Box<dyn BufRead>,
    done: bool,
}

impl Frames {
    fn next_record(&mut self) -> CctoolResult<Option<Record>> {
        if self.reader.fill_buf()?.is_empty() {
            return Ok(None);
        }

        let mut header = [0u8; FRAME_HEADER_SIZE];
        read_exact(&mut self.reader, &mut header, "frame header")?;
        let frame = FrameHeader::from_bytes(&header)?;
        if frame.kind != FRAME_KIND_RECORD_JSON {
            return Err(corrupt(format!("unknown frame kind 0x{:02x}", frame.kind)));
        }

        let mut payload = vec![0u8; frame.len as usize];
        read_exact(&mut self.reader, &mut payload, "frame payload")?;
        let record = serde_json::from_slice(&payload).map_err(|e| corrupt(e.to_string()))?;
        Ok(Some(record))
    }
}

impl Iterator for Frames {
    type Item = CctoolResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_record().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

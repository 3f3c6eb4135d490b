//! The contract every format adapter implements.

use std::io::{BufRead, Cursor, Write};

use crate::error::CctoolResult;
use crate::multidict::Record;

/// Records decoded from one input, in source order.
///
/// An `Err` item means the rest of the input could not be read; nothing
/// follows it.
pub type RecordStream = Box<dyn Iterator<Item = CctoolResult<Record>>>;

/// Reads and writes records in one concrete file format.
pub trait Codec {
    /// Parse `reader` into a stream of records.
    ///
    /// Malformed individual entries are skipped with a warning where the
    /// grammar allows recovering from them.
    fn decode(&self, reader: Box<dyn BufRead>) -> CctoolResult<RecordStream>;

    /// Write `records`, keeping only the fields this format knows about.
    fn encode(&self, records: &[Record], writer: &mut dyn Write) -> CctoolResult<()>;

    fn decode_bytes(&self, bytes: &[u8]) -> CctoolResult<Vec<Record>> {
        self.decode(Box::new(Cursor::new(bytes.to_vec())))?.collect()
    }

    fn encode_bytes(&self, records: &[Record]) -> CctoolResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode(records, &mut buf)?;
        Ok(buf)
    }
}

/// Stream already-parsed records.
pub(crate) fn stream(records: Vec<Record>) -> RecordStream {
    Box::new(records.into_iter().map(Ok))
}

/// Box a lazily parsed stream, ending it right after the first error.
pub(crate) fn lazy<I>(records: I) -> RecordStream
where
    I: Iterator<Item = CctoolResult<Record>> + 'static,
{
    let mut failed = false;
    Box::new(records.map_while(move |item| {
        if failed {
            return None;
        }
        failed = item.is_err();
        Some(item)
    }))
}

//! iCalendar files (RFC 5545).
//!
//! Only VEVENT components are read; each becomes one event record.

mod generate;
mod parse;

use std::io::{BufRead, Read, Write};

use crate::codec::{Codec, RecordStream, stream};
use crate::error::{CctoolError, CctoolResult};
use crate::multidict::Record;
use crate::remap::FieldMap;

pub use generate::generate_ics;
pub use parse::parse_events;

/// Lowercased iCalendar property names and the fields they map to.
const FIELDS: FieldMap = FieldMap::new(&[
    ("categories", "tag"),
    ("comment", "comment"),
    ("description", "description"),
    ("location", "location"),
    ("summary", "summary"),
    ("dtend", "dtend"),
    ("dtstart", "dtstart"),
    ("url", "url"),
    ("freq", "freq"),
]);

pub struct ICal;

impl Codec for ICal {
    fn decode(&self, mut reader: Box<dyn BufRead>) -> CctoolResult<RecordStream> {
        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| CctoolError::format("ics", e.to_string()))?;
        Ok(stream(parse_events(&content)?))
    }

    fn encode(&self, records: &[Record], writer: &mut dyn Write) -> CctoolResult<()> {
        writer.write_all(generate_ics(records).as_bytes())?;
        Ok(())
    }
}

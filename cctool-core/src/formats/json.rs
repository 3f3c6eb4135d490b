//! JSON documents: an array of objects mapping field names to lists.

use std::io::{BufRead, Read, Write};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use super::document::{Scalar, from_documents, to_documents};
use crate::codec::{Codec, RecordStream, stream};
use crate::error::{CctoolError, CctoolResult};
use crate::multidict::{MultiDict, Record};

const FORMAT: &str = "json";

pub struct Json;

impl Codec for Json {
    fn decode(&self, mut reader: Box<dyn BufRead>) -> CctoolResult<RecordStream> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        if content.trim().is_empty() {
            return Ok(stream(Vec::new()));
        }

        let documents: Vec<MultiDict<Scalar>> = serde_json::from_str(&content)
            .map_err(|e| CctoolError::format(FORMAT, e.to_string()))?;
        Ok(stream(from_documents(documents)))
    }

    fn encode(&self, records: &[Record], writer: &mut dyn Write) -> CctoolResult<()> {
        let mut serializer = Serializer::with_formatter(writer, PrettyFormatter::with_indent(b"    "));
        to_documents(records)
            .serialize(&mut serializer)
            .map_err(|e| CctoolError::format(FORMAT, e.to_string()))
    }
}

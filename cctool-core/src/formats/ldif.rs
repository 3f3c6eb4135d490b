//! LDAP Data Interchange Format (RFC 2849), person entries only.

use std::io::{BufRead, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::warn;

use crate::codec::{Codec, RecordStream, lazy};
use crate::error::{CctoolError, CctoolResult};
use crate::multidict::Record;
use crate::remap::{Direction, FieldMap, Unmapped, map_keys};
use crate::value::Value;

const FORMAT: &str = "ldif";

/// Lowercased attribute names and the fields they map to.
const FIELDS: FieldMap = FieldMap::new(&[
    ("cn", "name"),
    ("mail", "email"),
    ("telephonenumber", "phone"),
    ("mobile", "mobile"),
    ("description", "comment"),
]);

const OBJECT_CLASSES: [&str; 4] = ["top", "person", "organizationalPerson", "inetOrgPerson"];

/// Maximum line width before folding.
const WIDTH: usize = 76;

pub struct Ldif;

impl Codec for Ldif {
    fn decode(&self, reader: Box<dyn BufRead>) -> CctoolResult<RecordStream> {
        let records = Blocks::new(reader).filter_map(|block| {
            let record = block.and_then(|block| parse_block(&block));
            match record {
                Ok(record) => {
                    let record = map_keys(&record, &FIELDS, Direction::Forward, Unmapped::Drop);
                    (!record.is_empty()).then_some(Ok(record))
                }
                Err(e) => Some(Err(e)),
            }
        });
        Ok(lazy(records))
    }

    fn encode(&self, records: &[Record], writer: &mut dyn Write) -> CctoolResult<()> {
        let mut first = true;
        for record in records {
            let entry = map_keys(record, &FIELDS, Direction::Reverse, Unmapped::Drop);
            let Some(cn) = entry.get("cn").first() else {
                warn!("ldif: skipping record without a name");
                continue;
            };

            if !first {
                writeln!(writer)?;
            }
            first = false;

            let dn = format!("cn={}", escape_dn_value(&cn.to_string()));
            write_attr(writer, "dn", &Value::Text(dn))?;
            for class in OBJECT_CLASSES {
                write_attr(writer, "objectclass", &Value::from(class))?;
            }
            for (attr, values) in entry.iter() {
                for value in values {
                    write_attr(writer, attr, value)?;
                }
            }
        }
        Ok(())
    }
}

/// Blank-line separated blocks of unfolded, comment-free lines.
struct Blocks {
    lines: std::io::Split<Box<dyn BufRead>>,
    done: bool,
}

impl Blocks {
    fn new(reader: Box<dyn BufRead>) -> Self {
        Blocks {
            lines: reader.split(b'\n'),
            done: false,
        }
    }
}

impl Iterator for Blocks {
    type Item = CctoolResult<Vec<Vec<u8>>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut block: Vec<Vec<u8>> = Vec::new();
        loop {
            let mut line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.done = true;
                    return (!block.is_empty()).then_some(Ok(block));
                }
            };
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.is_empty() {
                if !block.is_empty() {
                    return Some(Ok(block));
                }
            } else if line[0] == b'#' {
                continue;
            } else if line[0] == b' ' {
                match block.last_mut() {
                    Some(last) => last.extend_from_slice(&line[1..]),
                    None => warn!("ldif: ignoring continuation line outside an entry"),
                }
            } else {
                block.push(line);
            }
        }
    }
}

fn parse_block(block: &[Vec<u8>]) -> CctoolResult<Record> {
    let mut record = Record::new();
    for line in block {
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            warn!("ldif: ignoring line without ':'");
            continue;
        };
        let attr = String::from_utf8_lossy(&line[..colon]).trim().to_lowercase();
        let rest = &line[colon + 1..];

        let value = match rest.first() {
            Some(b':') => {
                let encoded = rest[1..].trim_ascii();
                let bytes = STANDARD.decode(encoded).map_err(|e| {
                    CctoolError::format(FORMAT, format!("invalid base64 in '{attr}': {e}"))
                })?;
                match String::from_utf8(bytes) {
                    Ok(text) => Value::Text(text),
                    Err(e) => Value::Bytes(e.into_bytes()),
                }
            }
            Some(b'<') => {
                warn!("ldif: ignoring URL value of '{attr}'");
                continue;
            }
            _ => match std::str::from_utf8(rest.trim_ascii_start()) {
                Ok(text) => Value::from(text),
                Err(_) => Value::Bytes(rest.trim_ascii_start().to_vec()),
            },
        };
        record.append(attr, [value]);
    }
    Ok(record)
}

/// Escape an attribute value for use in a distinguished name (RFC 4514).
fn escape_dn_value(value: &str) -> String {
    let last = value.chars().count().saturating_sub(1);
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        let special = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && matches!(c, '#' | ' '))
            || (i == last && c == ' ');
        if special {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A value that can be written verbatim after `attr: `.
fn is_safe(value: &str) -> bool {
    let bytes = value.as_bytes();
    let safe_char = |b: &u8| b.is_ascii() && !matches!(b, b'\0' | b'\n' | b'\r');
    match bytes.first() {
        None => true,
        Some(b' ' | b':' | b'<') => false,
        Some(_) => bytes.iter().all(safe_char) && bytes.last() != Some(&b' '),
    }
}

fn write_attr(writer: &mut dyn Write, attr: &str, value: &Value) -> CctoolResult<()> {
    let line = match value {
        Value::Bytes(bytes) => format!("{attr}:: {}", STANDARD.encode(bytes)),
        other => {
            let text = other.to_string();
            if is_safe(&text) {
                format!("{attr}: {text}")
            } else {
                format!("{attr}:: {}", STANDARD.encode(text.as_bytes()))
            }
        }
    };
    writer.write_all(fold(&line).as_bytes())?;
    Ok(())
}

/// Wrap at [`WIDTH`] columns; continuation lines start with a space.
fn fold(line: &str) -> String {
    // everything written through here is ASCII
    let mut out = String::with_capacity(line.len() + line.len() / WIDTH * 2 + 1);
    let mut rest = line;
    let mut width = WIDTH;
    while rest.len() > width {
        let (head, tail) = rest.split_at(width);
        out.push_str(head);
        out.push_str("\n ");
        rest = tail;
        width = WIDTH - 1;
    }
    out.push_str(rest);
    out.push('\n');
    out
}

//! abook addressbook files.
//!
//! An INI file with one numbered section per contact plus an optional
//! `[format]` header section:
//!
//! ```text
//! [0]
//! name = foo
//! email = foo@example.com,foo@example.org
//! bday = 1970-01-01
//! ```

use std::io::{BufRead, Read, Write};

use chrono::{Datelike, NaiveDate};
use log::warn;

use crate::codec::{Codec, RecordStream, stream};
use crate::error::{CctoolError, CctoolResult};
use crate::multidict::Record;
use crate::remap::{Direction, FieldMap, Unmapped, map_keys};
use crate::value::Value;

const FORMAT: &str = "abook";

/// Year abook uses for birthdays without a year (`--MM-DD`).
const NO_YEAR: i32 = 1900;

const FIELDS: FieldMap = FieldMap::new(&[
    ("name", "name"),
    ("nick", "nick"),
    ("bday", "bday"),
    ("email", "email"),
    ("url", "url"),
    ("tag", "tag"),
    ("address_lines", "address_lines"),
    ("city", "city"),
    ("state", "state"),
    ("zip", "zip"),
    ("country", "country"),
    ("phone", "phone"),
    ("workphone", "workphone"),
    ("mobile", "mobile"),
    ("xmpp", "xmpp"),
    ("icq", "icq"),
    ("msn", "msn"),
    ("twitter", "twitter"),
    ("pgp", "pgp"),
    // LDIF-style names some records still carry
    ("mail", "email"),
    ("cn", "name"),
]);

pub struct ABook;

impl Codec for ABook {
    fn decode(&self, mut reader: Box<dyn BufRead>) -> CctoolResult<RecordStream> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        let mut records = Vec::new();
        'sections: for section in parse_sections(&text)? {
            if section.name == "format" {
                continue;
            }

            let mut record = Record::new();
            for (key, value) in section.items {
                if key == "bday" {
                    match parse_bday(&value) {
                        Some(date) => record.set(key, vec![Value::Date(date)]),
                        None => {
                            warn!("abook: skipping [{}], invalid bday '{value}'", section.name);
                            continue 'sections;
                        }
                    }
                } else {
                    let values = value
                        .split(',')
                        .filter(|v| !v.is_empty())
                        .map(Value::from)
                        .collect();
                    record.set(key, values);
                }
            }
            records.push(map_keys(&record, &FIELDS, Direction::Forward, Unmapped::Drop));
        }

        Ok(stream(records))
    }

    fn encode(&self, records: &[Record], writer: &mut dyn Write) -> CctoolResult<()> {
        for (i, record) in records.iter().enumerate() {
            let item = map_keys(record, &FIELDS, Direction::Forward, Unmapped::Drop);

            writeln!(writer, "[{i}]")?;
            for (key, values) in item.iter() {
                let value = if key == "bday" {
                    format_bday(&values[0])
                } else {
                    item.join_or(key, ",", "")
                };
                writeln!(writer, "{key} = {}", value.replace('\n', "\n\t"))?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

struct Section {
    name: String,
    items: Vec<(String, String)>,
}

fn parse_sections(text: &str) -> CctoolResult<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim();

        // an indented line continues the previous value, even if it is blank
        // or looks like a comment or header
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = sections.last_mut().and_then(|s| s.items.last_mut()) {
                value.push('\n');
                value.push_str(trimmed);
                continue;
            }
        }

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(name) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            sections.push(Section {
                name: name.trim().to_string(),
                items: Vec::new(),
            });
            continue;
        }

        let Some(section) = sections.last_mut() else {
            return Err(CctoolError::format(
                FORMAT,
                format!("line {}: entry before the first section header", lineno + 1),
            ));
        };

        match trimmed.find(['=', ':']) {
            Some(pos) => {
                let key = trimmed[..pos].trim().to_lowercase();
                let value = trimmed[pos + 1..].trim().to_string();
                section.items.push((key, value));
            }
            None => warn!("abook: ignoring malformed line {}: '{trimmed}'", lineno + 1),
        }
    }

    Ok(sections)
}

fn parse_bday(value: &str) -> Option<NaiveDate> {
    let value = match value.strip_prefix('-') {
        Some(rest) => format!("{NO_YEAR}{rest}"),
        None => value.to_string(),
    };
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").ok()
}

fn format_bday(value: &Value) -> String {
    match value.as_date() {
        Some(date) if date.year() == NO_YEAR => date.format("--%m-%d").to_string(),
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_load() {
        let text = b"[0]\nname = foo\nbday = 1970-01-01\n\n";
        let records = ABook.decode_bytes(text).unwrap();

        assert_eq!(
            records,
            vec![Record::from([
                ("name", vec![Value::from("foo")]),
                ("bday", vec![date(1970, 1, 1)]),
            ])]
        );
    }

    #[test]
    fn test_dump() {
        let records = vec![Record::from([
            ("name", vec![Value::from("foo")]),
            ("bday", vec![date(1970, 1, 1)]),
        ])];

        let text = ABook.encode_bytes(&records).unwrap();
        assert_eq!(text, b"[0]\nname = foo\nbday = 1970-01-01\n\n");
    }

    #[test]
    fn test_load_full_file() {
        let text = "\
# abook addressbook file

[format]
program=abook
version=0.6.1

[0]
name=Jane Doe
email=jane@example.com,jd@example.org
bday=--03-14
custom5=ignored

[1]
Name: John
nick = jo
";
        let records = ABook.decode_bytes(text.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0]["email"],
            [Value::from("jane@example.com"), Value::from("jd@example.org")]
        );
        assert_eq!(records[0]["bday"], [date(NO_YEAR, 3, 14)]);
        assert!(!records[0].contains("custom5"));
        assert_eq!(records[1]["name"], [Value::from("John")]);
        assert_eq!(records[1]["nick"], [Value::from("jo")]);
    }

    #[test]
    fn test_invalid_bday_skips_section() {
        let text = b"[0]\nname = a\nbday = someday\n\n[1]\nname = b\n";
        let records = ABook.decode_bytes(text).unwrap();

        assert_eq!(records, vec![Record::from([("name", vec![Value::from("b")])])]);
    }

    #[test]
    fn test_continuation_lines() {
        let text = "[0]\nname = a\n  #not a comment\n\t\n  [x]\n\n[1]\n  name = b\n";
        let sections = parse_sections(text).unwrap();

        assert_eq!(sections.len(), 2);
        assert_eq!(
            sections[0].items,
            vec![("name".to_string(), "a\n#not a comment\n\n[x]".to_string())]
        );
        assert_eq!(sections[1].items, vec![("name".to_string(), "b".to_string())]);
    }

    #[test]
    fn test_multiline_value_round_trip() {
        let records = vec![Record::from([(
            "name",
            vec![Value::from("first\n# second\n\n[third]")],
        )])];

        let bytes = ABook.encode_bytes(&records).unwrap();
        assert_eq!(ABook.decode_bytes(&bytes).unwrap(), records);
    }

    #[test]
    fn test_entry_before_section_is_an_error() {
        let result = ABook.decode_bytes(b"name = a\n");
        assert!(matches!(result, Err(CctoolError::Format { .. })));
    }

    #[test]
    fn test_dump_yearless_bday_and_aliases() {
        let records = vec![Record::from([
            ("cn", vec![Value::from("foo")]),
            ("mail", vec![Value::from("a@x"), Value::from("b@x")]),
            ("bday", vec![date(NO_YEAR, 12, 24)]),
            ("summary", vec![Value::from("dropped")]),
        ])];

        let text = String::from_utf8(ABook.encode_bytes(&records).unwrap()).unwrap();
        assert_eq!(text, "[0]\nname = foo\nemail = a@x,b@x\nbday = --12-24\n\n");
    }

    #[test]
    fn test_round_trip() {
        let records = vec![
            Record::from([
                ("name", vec![Value::from("foo")]),
                ("tag", vec![Value::from("friends"), Value::from("work")]),
            ]),
            Record::from([("name", vec![Value::from("bar")]), ("bday", vec![date(1984, 2, 29)])]),
        ];

        let bytes = ABook.encode_bytes(&records).unwrap();
        assert_eq!(ABook.decode_bytes(&bytes).unwrap(), records);
    }
}

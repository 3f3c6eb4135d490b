//! calendar(1) files, e.g. `~/.calendar/calendar`.
//!
//! Only the `MM/DD<TAB>text` subset is understood; a `*` after the day marks
//! an entry that repeats every year.

use std::io::{BufRead, Write};
use std::sync::LazyLock;

use chrono::{Datelike, Local, NaiveDate};
use log::warn;
use regex::bytes::Regex;

use crate::codec::{Codec, RecordStream, lazy};
use crate::error::CctoolResult;
use crate::multidict::Record;
use crate::value::Value;

static LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d\d)/(\d\d)(\*?)\t(.*)$").expect("bsdcal line pattern is valid")
});

pub struct BsdCal;

impl Codec for BsdCal {
    fn decode(&self, reader: Box<dyn BufRead>) -> CctoolResult<RecordStream> {
        let year = Local::now().year();
        let records = reader.split(b'\n').filter_map(move |line| match line {
            Ok(line) => parse_line(line.trim_ascii_end(), year).map(Ok),
            Err(e) => Some(Err(e.into())),
        });
        Ok(lazy(records))
    }

    fn encode(&self, records: &[Record], writer: &mut dyn Write) -> CctoolResult<()> {
        let year = Local::now().year();
        let yearly = Value::from("yearly");

        for item in records {
            if !item.contains("dtstart") || !item.contains("summary") {
                continue;
            }
            let Some(date) = item.first("dtstart")?.as_date() else {
                warn!("bsdcal: skipping entry with non-date dtstart");
                continue;
            };
            let summary = item.join("summary", ",")?;

            if item.get("freq").contains(&yearly) {
                writeln!(writer, "{}\t{summary}", date.format("%m/%d*"))?;
            } else if date.year() == year {
                writeln!(writer, "{}\t{summary}", date.format("%m/%d"))?;
            }
        }
        Ok(())
    }
}

fn parse_line(line: &[u8], year: i32) -> Option<Record> {
    let caps = LINE.captures(line)?;
    let field = |i: usize| std::str::from_utf8(&caps[i]).ok();

    let month: u32 = field(1)?.parse().ok()?;
    let day: u32 = field(2)?.parse().ok()?;
    let Some(summary) = field(4) else {
        warn!("bsdcal: skipping line that is not valid UTF-8");
        return None;
    };
    let Some(start) = NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        warn!("bsdcal: skipping invalid date {month:02}/{day:02}");
        return None;
    };

    let mut record = Record::new();
    record.set("dtstart", vec![Value::DateTime(start)]);
    record.set("summary", vec![Value::from(summary)]);
    if &caps[3] == b"*" {
        record.set("freq", vec![Value::from("yearly")]);
    }
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt() -> Value {
        let date = NaiveDate::from_ymd_opt(Local::now().year(), 1, 1).unwrap();
        Value::DateTime(date.and_hms_opt(0, 0, 0).unwrap())
    }

    fn data() -> Vec<Record> {
        vec![
            Record::from([("dtstart", vec![dt()]), ("summary", vec![Value::from("foo")])]),
            Record::from([
                ("dtstart", vec![dt()]),
                ("summary", vec![Value::from("bar")]),
                ("freq", vec![Value::from("yearly")]),
            ]),
        ]
    }

    const TEXT: &[u8] = b"01/01\tfoo\n01/01*\tbar\n";

    #[test]
    fn test_load() {
        assert_eq!(BsdCal.decode_bytes(TEXT).unwrap(), data());
    }

    #[test]
    fn test_dump() {
        assert_eq!(BsdCal.encode_bytes(&data()).unwrap(), TEXT);
    }

    #[test]
    fn test_load_skips_unknown_lines() {
        let text = b"#include <calendar.usholiday>\n02/30\tnope\n\n12/24*\tXmas  \r\n";
        let records = BsdCal.decode_bytes(text).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["summary"], [Value::from("Xmas")]);
        assert_eq!(records[0]["freq"], [Value::from("yearly")]);
    }

    #[test]
    fn test_dump_skips_other_years_unless_yearly() {
        let old = NaiveDate::from_ymd_opt(1970, 5, 4).unwrap();
        let records = vec![
            Record::from([("dtstart", vec![Value::Date(old)]), ("summary", vec![Value::from("once")])]),
            Record::from([
                ("dtstart", vec![Value::Date(old)]),
                ("summary", vec![Value::from("every year")]),
                ("freq", vec![Value::from("yearly")]),
            ]),
            Record::from([("summary", vec![Value::from("no date")])]),
        ];

        assert_eq!(BsdCal.encode_bytes(&records).unwrap(), b"05/04*\tevery year\n");
    }
}

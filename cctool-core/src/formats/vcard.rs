//! vCard files (RFC 2426 / RFC 6350).
//!
//! Reads versions 3.0 and 4.0 and writes 3.0.

use std::io::{BufRead, Read, Write};

use chrono::{Datelike, NaiveDate};
use log::warn;

use super::contentline::{ContentLine, escape, fold, parse_line, split_unescaped, unescape, unfold};
use crate::codec::{Codec, RecordStream, stream};
use crate::error::{CctoolError, CctoolResult};
use crate::multidict::Record;
use crate::value::Value;

const FORMAT: &str = "vcard";

/// Year used for birthdays without a year (`--MMDD`).
const NO_YEAR: i32 = 1900;

/// Properties whose text value maps directly onto a field.
const TEXT_PROPERTIES: [(&str, &str); 8] = [
    ("FN", "name"),
    ("EMAIL", "email"),
    ("URL", "url"),
    ("NOTE", "comment"),
    ("X-JABBER", "xmpp"),
    ("X-ICQ", "icq"),
    ("X-MSN", "msn"),
    ("X-TWITTER", "twitter"),
];

/// Address fields in `ADR` component order after PO box and extended address.
const ADDRESS_FIELDS: [&str; 5] = ["address_lines", "city", "state", "zip", "country"];

pub struct VCard;

impl Codec for VCard {
    fn decode(&self, mut reader: Box<dyn BufRead>) -> CctoolResult<RecordStream> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| CctoolError::format(FORMAT, e.to_string()))?;

        let mut records = Vec::new();
        let mut card: Option<Card> = None;

        for (lineno, raw) in unfold(&text).iter().enumerate() {
            let Some(line) = parse_line(raw) else {
                warn!("vcard: ignoring malformed line {}: '{raw}'", lineno + 1);
                continue;
            };

            let is_vcard = line.value.eq_ignore_ascii_case("VCARD");
            match line.name.as_str() {
                "BEGIN" if is_vcard => {
                    if card.is_some() {
                        return Err(CctoolError::format(FORMAT, "nested BEGIN:VCARD"));
                    }
                    card = Some(Card::default());
                }
                "END" if is_vcard => match card.take() {
                    Some(done) => records.push(done.finish()),
                    None => warn!("vcard: ignoring END:VCARD without BEGIN"),
                },
                _ => match card.as_mut() {
                    Some(current) => current.add(&line),
                    None => warn!("vcard: ignoring '{}' outside BEGIN:VCARD", line.name),
                },
            }
        }

        if card.is_some() {
            return Err(CctoolError::format(FORMAT, "missing END:VCARD"));
        }
        Ok(stream(records))
    }

    fn encode(&self, records: &[Record], writer: &mut dyn Write) -> CctoolResult<()> {
        for record in records {
            for line in card_lines(record) {
                writer.write_all(fold(&line).as_bytes())?;
            }
        }
        Ok(())
    }
}

/// A card being read; `N` only counts when there is no `FN`.
#[derive(Default)]
struct Card {
    record: Record,
    structured_name: Option<String>,
}

impl Card {
    fn add(&mut self, line: &ContentLine) {
        let record = &mut self.record;

        if let Some((_, field)) = TEXT_PROPERTIES.iter().find(|(name, _)| *name == line.name) {
            record.append(*field, [Value::from(unescape(&line.value))]);
            return;
        }

        match line.name.as_str() {
            "N" => {
                // family;given;additional;prefixes;suffixes
                let parts = split_unescaped(&line.value, ';');
                let order = [3, 1, 2, 0, 4];
                let name: Vec<&str> = order
                    .iter()
                    .filter_map(|&i| parts.get(i))
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .collect();
                if !name.is_empty() {
                    self.structured_name = Some(name.join(" "));
                }
            }
            "NICKNAME" => record.append("nick", values(split_unescaped(&line.value, ','))),
            "CATEGORIES" => record.append("tag", values(split_unescaped(&line.value, ','))),
            "BDAY" => match parse_bday(&line.value) {
                Some(date) => record.append("bday", [Value::Date(date)]),
                None => warn!("vcard: ignoring invalid BDAY '{}'", line.value),
            },
            "TEL" => {
                let number = unescape(&line.value);
                let number = number.strip_prefix("tel:").unwrap_or(&number).to_string();
                let field = if line.has_type("CELL") {
                    "mobile"
                } else if line.has_type("WORK") {
                    "workphone"
                } else {
                    "phone"
                };
                record.append(field, [Value::from(number)]);
            }
            "IMPP" => {
                let value = unescape(&line.value);
                if let Some(jid) = value.strip_prefix("xmpp:") {
                    record.append("xmpp", [Value::from(jid)]);
                }
            }
            "KEY" => record.append("pgp", [Value::from(unescape(&line.value))]),
            "ADR" => {
                let parts = split_unescaped(&line.value, ';');
                for (field, part) in ADDRESS_FIELDS.iter().zip(parts.iter().skip(2)) {
                    if *field == "address_lines" {
                        record.append(*field, values(part.lines().map(str::to_string)));
                    } else {
                        record.append(*field, values([part.clone()]));
                    }
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Record {
        if !self.record.contains("name") {
            if let Some(name) = self.structured_name {
                self.record.append("name", [Value::from(name)]);
            }
        }
        self.record
    }
}

fn values(parts: impl IntoIterator<Item = String>) -> Vec<Value> {
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(Value::from)
        .collect()
}

/// `1970-01-02`, `19700102`, `--0102`, `--01-02`, optionally followed by a
/// time which is ignored.
fn parse_bday(value: &str) -> Option<NaiveDate> {
    let date = value.trim().split('T').next()?;
    if let Some(md) = date.strip_prefix("--") {
        let md = md.replace('-', "");
        return NaiveDate::parse_from_str(&format!("{NO_YEAR}{md}"), "%Y%m%d").ok();
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%Y%m%d"))
        .ok()
}

fn format_bday(value: &Value) -> String {
    match value.as_date() {
        Some(date) if date.year() == NO_YEAR => date.format("--%m%d").to_string(),
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => escape(&value.to_string()),
    }
}

fn joined(record: &Record, field: &str, sep: &str) -> String {
    record
        .get(field)
        .iter()
        .map(|v| escape(&v.to_string()))
        .collect::<Vec<_>>()
        .join(sep)
}

fn card_lines(record: &Record) -> Vec<String> {
    let name = joined(record, "name", " ");
    let mut lines = vec![
        "BEGIN:VCARD".to_string(),
        "VERSION:3.0".to_string(),
        format!("FN:{name}"),
        format!("N:;{name};;;"),
    ];

    if record.contains("nick") {
        lines.push(format!("NICKNAME:{}", joined(record, "nick", ",")));
    }
    if let Some(bday) = record.get("bday").first() {
        lines.push(format!("BDAY:{}", format_bday(bday)));
    }
    for (property, field) in TEXT_PROPERTIES.iter().skip(1) {
        for value in record.get(field) {
            lines.push(format!("{property}:{}", escape(&value.to_string())));
        }
    }
    if record.contains("tag") {
        lines.push(format!("CATEGORIES:{}", joined(record, "tag", ",")));
    }
    for (field, ty) in [("phone", None), ("mobile", Some("CELL")), ("workphone", Some("WORK"))] {
        for value in record.get(field) {
            let params = ty.map(|t| format!(";TYPE={t}")).unwrap_or_default();
            lines.push(format!("TEL{params}:{}", escape(&value.to_string())));
        }
    }
    for value in record.get("pgp") {
        lines.push(format!("KEY:{}", escape(&value.to_string())));
    }
    if ADDRESS_FIELDS.iter().any(|f| record.contains(f)) {
        let street = joined(record, "address_lines", "\\n");
        let rest: Vec<String> = ADDRESS_FIELDS[1..]
            .iter()
            .map(|f| joined(record, f, ","))
            .collect();
        lines.push(format!("ADR:;;{street};{}", rest.join(";")));
    }

    lines.push("END:VCARD".to_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn decode(text: &str) -> CctoolResult<Vec<Record>> {
        VCard.decode_bytes(text.as_bytes())
    }

    #[test]
    fn test_load_v3() {
        let text = "\
BEGIN:VCARD\r
VERSION:3.0\r
FN:Jane Doe\r
N:Doe;Jane;;;\r
NICKNAME:jd,janie\r
BDAY:1970-01-02\r
EMAIL;TYPE=INTERNET:jane@example.com\r
TEL;TYPE=CELL:+49 1\r
TEL;TYPE=WORK,VOICE:+49 2\r
item1.TEL:+49 3\r
CATEGORIES:friends,work\r
NOTE:likes\\, commas\\nand lines\r
ADR;TYPE=HOME:;;Main St 1\\nBack door;Town;;12345;Germany\r
X-JABBER:jane@jabber.example\r
END:VCARD\r
";
        let records = decode(text).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];

        assert_eq!(r["name"], [Value::from("Jane Doe")]);
        assert_eq!(r["nick"], [Value::from("jd"), Value::from("janie")]);
        assert_eq!(r["bday"], [date(1970, 1, 2)]);
        assert_eq!(r["email"], [Value::from("jane@example.com")]);
        assert_eq!(r["mobile"], [Value::from("+49 1")]);
        assert_eq!(r["workphone"], [Value::from("+49 2")]);
        assert_eq!(r["phone"], [Value::from("+49 3")]);
        assert_eq!(r["tag"], [Value::from("friends"), Value::from("work")]);
        assert_eq!(r["comment"], [Value::from("likes, commas\nand lines")]);
        assert_eq!(
            r["address_lines"],
            [Value::from("Main St 1"), Value::from("Back door")]
        );
        assert_eq!(r["city"], [Value::from("Town")]);
        assert!(!r.contains("state"));
        assert_eq!(r["zip"], [Value::from("12345")]);
        assert_eq!(r["country"], [Value::from("Germany")]);
        assert_eq!(r["xmpp"], [Value::from("jane@jabber.example")]);
    }

    #[test]
    fn test_load_v4() {
        let text = "\
BEGIN:VCARD
VERSION:4.0
N:Doe;John;;Dr.;
BDAY:--0314
TEL;VALUE=uri;TYPE=cell:tel:+1-555
IMPP:xmpp:john@example.com
END:VCARD
";
        let records = decode(text).unwrap();
        assert_eq!(
            records,
            vec![Record::from([
                ("bday", vec![date(NO_YEAR, 3, 14)]),
                ("mobile", vec![Value::from("+1-555")]),
                ("xmpp", vec![Value::from("john@example.com")]),
                ("name", vec![Value::from("Dr. John Doe")]),
            ])]
        );
    }

    #[test]
    fn test_invalid_bday_is_dropped() {
        let records = decode("BEGIN:VCARD\nFN:a\nBDAY:someday\nEND:VCARD\n").unwrap();
        assert_eq!(records, vec![Record::from([("name", vec![Value::from("a")])])]);
    }

    #[test]
    fn test_unterminated_card() {
        let result = decode("BEGIN:VCARD\nFN:a\n");
        assert!(matches!(result, Err(CctoolError::Format { format: "vcard", .. })));
    }

    #[test]
    fn test_dump() {
        let records = vec![Record::from([
            ("name", vec![Value::from("Jane, Doe")]),
            ("bday", vec![date(NO_YEAR, 3, 14)]),
            ("mobile", vec![Value::from("+49 1")]),
            ("summary", vec![Value::from("dropped")]),
        ])];
        let text = String::from_utf8(VCard.encode_bytes(&records).unwrap()).unwrap();

        assert_eq!(
            text,
            "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Jane\\, Doe\r\nN:;Jane\\, Doe;;;\r\n\
             BDAY:--0314\r\nTEL;TYPE=CELL:+49 1\r\nEND:VCARD\r\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let records = vec![Record::from([
            ("name", vec![Value::from("Jane Doe")]),
            ("nick", vec![Value::from("jd")]),
            ("bday", vec![date(1970, 1, 2)]),
            ("email", vec![Value::from("a@example.com"), Value::from("b@example.com")]),
            ("tag", vec![Value::from("a,b"), Value::from("c")]),
            ("address_lines", vec![Value::from("Main St 1"), Value::from("Floor 2")]),
            ("city", vec![Value::from("Town")]),
            ("phone", vec![Value::from("1")]),
            ("workphone", vec![Value::from("2")]),
            ("pgp", vec![Value::from("0xDEADBEEF")]),
            ("comment", vec![Value::from("x".repeat(120).as_str())]),
        ])];

        let bytes = VCard.encode_bytes(&records).unwrap();
        assert_eq!(VCard.decode_bytes(&bytes).unwrap(), records);
    }
}

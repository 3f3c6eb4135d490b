//! YAML documents: a sequence of mappings, shaped like the JSON format.

use std::io::{BufRead, Read, Write};

use super::document::{Scalar, from_documents, to_documents};
use crate::codec::{Codec, RecordStream, stream};
use crate::error::{CctoolError, CctoolResult};
use crate::multidict::{MultiDict, Record};

const FORMAT: &str = "yml";

pub struct Yaml;

impl Codec for Yaml {
    fn decode(&self, mut reader: Box<dyn BufRead>) -> CctoolResult<RecordStream> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        if content.trim().is_empty() {
            return Ok(stream(Vec::new()));
        }

        let documents: Vec<MultiDict<Scalar>> = serde_yaml_ng::from_str(&content)
            .map_err(|e| CctoolError::format(FORMAT, e.to_string()))?;
        Ok(stream(from_documents(documents)))
    }

    fn encode(&self, records: &[Record], writer: &mut dyn Write) -> CctoolResult<()> {
        serde_yaml_ng::to_writer(writer, &to_documents(records))
            .map_err(|e| CctoolError::format(FORMAT, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use chrono::NaiveDate;

    #[test]
    fn test_load() {
        let text = "\
- name: foo
  email:
    - a@example.com
    - b@example.com
  bday: '1970-01-02'
- name: [bar]
";
        let records = Yaml.decode_bytes(text.as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![
                Record::from([
                    ("name", vec![Value::from("foo")]),
                    ("email", vec![Value::from("a@example.com"), Value::from("b@example.com")]),
                    ("bday", vec![Value::Date(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap())]),
                ]),
                Record::from([("name", vec![Value::from("bar")])]),
            ]
        );
    }

    #[test]
    fn test_round_trip() {
        let records = vec![
            Record::from([
                ("name", vec![Value::from("foo: bar")]),
                ("tag", vec![Value::from("a"), Value::from("b")]),
            ]),
            Record::from([("name", vec![Value::from("123")])]),
        ];
        let bytes = Yaml.encode_bytes(&records).unwrap();
        assert_eq!(Yaml.decode_bytes(&bytes).unwrap(), records);
    }

    #[test]
    fn test_load_invalid() {
        assert!(matches!(
            Yaml.decode_bytes(b"name: foo\n"),
            Err(CctoolError::Format { format: "yml", .. })
        ));
    }
}

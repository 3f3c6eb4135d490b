//! Shared value shapes for the JSON and YAML codecs.

use serde::Deserialize;

use super::restore_dates;
use crate::multidict::{MultiDict, Record};
use crate::value::Value;

/// A scalar as it may appear in a hand-written document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn into_value(self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Text(b.to_string()),
            Scalar::Int(i) => Value::Text(i.to_string()),
            Scalar::Float(f) => Value::Text(f.to_string()),
            Scalar::Text(s) => Value::Text(s),
        }
    }
}

/// Records from parsed documents, with dates restored.
pub(crate) fn from_documents(documents: Vec<MultiDict<Scalar>>) -> Vec<Record> {
    documents
        .into_iter()
        .map(|doc| {
            let record: Record = doc
                .iter()
                .map(|(key, values)| {
                    let values: Vec<Value> = values.iter().cloned().map(Scalar::into_value).collect();
                    (key.to_string(), values)
                })
                .collect();
            restore_dates(record)
        })
        .collect()
}

/// Documents with every value written as a string.
pub(crate) fn to_documents(records: &[Record]) -> Vec<MultiDict<String>> {
    records
        .iter()
        .map(|record| record.map_values(Value::to_string))
        .collect()
}

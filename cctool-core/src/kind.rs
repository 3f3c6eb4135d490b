//! Conversion between the two conventional record shapes.
//!
//! A *person* carries fields like `name`, `nick`, `bday`, `email`; an *event*
//! carries `summary`, `dtstart`, `dtend`, `freq`. Either may carry the
//! generic `tag`, `comment` and `url` fields.

use std::fmt;

use crate::multidict::Record;
use crate::remap::{Direction, FieldMap, Unmapped, map_keys};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Person,
    Event,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Person => write!(f, "person"),
            Kind::Event => write!(f, "event"),
        }
    }
}

const EVENT_PERSON: FieldMap = FieldMap::new(&[("summary", "name"), ("dtstart", "bday")]);

/// Reinterpret records as the other kind.
///
/// `Forward` turns events into people and keeps every record. `Reverse`
/// turns people into yearly events and drops those without a birthday.
pub fn event_to_person<I>(records: I, direction: Direction) -> impl Iterator<Item = Record>
where
    I: IntoIterator<Item = Record>,
{
    records.into_iter().filter_map(move |source| {
        let mut target = map_keys(&source, &EVENT_PERSON, direction, Unmapped::Keep);

        match direction {
            Direction::Forward => Some(target),
            Direction::Reverse => {
                if source.contains("bday") {
                    target.append("freq", [Value::from("yearly")]);
                }
                target.contains("dtstart").then_some(target)
            }
        }
    })
}

/// Translate `records` of kind `from` (if known) into kind `to`.
///
/// Records already of kind `to` pass through unchanged. Records of unknown
/// kind are translated as if they were of the opposite kind.
pub fn translate_kind(
    records: Vec<Record>,
    from: Option<Kind>,
    to: Kind,
) -> Vec<Record> {
    if from == Some(to) {
        return records;
    }
    let direction = match to {
        Kind::Person => Direction::Forward,
        Kind::Event => Direction::Reverse,
    };
    event_to_person(records, direction).collect()
}

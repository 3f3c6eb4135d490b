//! Field renaming through translation tables.
//!
//! Codecs use this to move between their native property names and the
//! canonical field names, and the kind translator uses it to turn events
//! into people and back.

use crate::multidict::MultiDict;

/// Which way a [`FieldMap`] is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// source name -> destination name
    Forward,
    /// destination name -> source name
    Reverse,
}

/// What happens to fields the table doesn't mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unmapped {
    Drop,
    Keep,
}

/// A fixed translation table of `(source, destination)` field names.
///
/// Forward lookups use the first pair naming the source. Reverse lookups
/// use the last pair naming the destination, so a many-to-one table read
/// backwards resolves each destination to the source listed last.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap<'a> {
    pairs: &'a [(&'a str, &'a str)],
}

impl<'a> FieldMap<'a> {
    pub const fn new(pairs: &'a [(&'a str, &'a str)]) -> Self {
        FieldMap { pairs }
    }

    pub fn translate(&self, key: &str, direction: Direction) -> Option<&'a str> {
        match direction {
            Direction::Forward => self
                .pairs
                .iter()
                .find(|(source, _)| *source == key)
                .map(|(_, destination)| *destination),
            Direction::Reverse => self
                .pairs
                .iter()
                .rev()
                .find(|(_, destination)| *destination == key)
                .map(|(source, _)| *source),
        }
    }
}

/// Build a new record with fields renamed according to `map`.
///
/// Fields that land on the same name are concatenated in encounter order
/// with duplicates removed. The input record is left untouched.
pub fn map_keys<V: Clone + PartialEq>(
    record: &MultiDict<V>,
    map: &FieldMap,
    direction: Direction,
    unmapped: Unmapped,
) -> MultiDict<V> {
    let mut out = MultiDict::new();

    for (key, values) in record.iter() {
        match map.translate(key, direction) {
            Some(target) => out.append(target, values.iter().cloned()),
            None if unmapped == Unmapped::Keep => out.append(key, values.iter().cloned()),
            None => {}
        }
    }

    out
}

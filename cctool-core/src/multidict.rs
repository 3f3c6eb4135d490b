//! Ordered multi-valued records.
//!
//! A field whose value list is empty counts as absent: it is skipped by
//! iteration, `contains` and equality, but keeps its slot so that setting it
//! again restores its original position.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Index;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CctoolError, CctoolResult};
use crate::value::Value;

/// Ordered mapping from field name to a list of values.
#[derive(Debug, Clone)]
pub struct MultiDict<V = Value> {
    entries: Vec<(String, Vec<V>)>,
}

/// The record type every codec produces and consumes.
pub type Record = MultiDict<Value>;

impl<V> MultiDict<V> {
    pub fn new() -> Self {
        MultiDict {
            entries: Vec::new(),
        }
    }

    fn slot(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    /// Values of `key`, or an empty slice if the field is absent.
    pub fn get(&self, key: &str) -> &[V] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, key: &str) -> bool {
        !self.get(key).is_empty()
    }

    /// Replace the values of `key`. An empty list makes the field absent.
    pub fn set(&mut self, key: impl Into<String>, values: Vec<V>) {
        let key = key.into();
        match self.slot(&key) {
            Some(i) => self.entries[i].1 = values,
            None => self.entries.push((key, values)),
        }
    }

    pub fn first(&self, key: &str) -> CctoolResult<&V> {
        self.get(key)
            .first()
            .ok_or_else(|| CctoolError::MissingField(key.to_string()))
    }

    pub fn first_or<'a>(&'a self, key: &str, default: &'a V) -> &'a V {
        self.get(key).first().unwrap_or(default)
    }

    /// Present field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(key, _)| key)
    }

    /// Present fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[V])> {
        self.entries
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn map_values<U>(&self, mut f: impl FnMut(&V) -> U) -> MultiDict<U> {
        MultiDict {
            entries: self
                .entries
                .iter()
                .map(|(key, values)| (key.clone(), values.iter().map(&mut f).collect()))
                .collect(),
        }
    }
}

impl<V: PartialEq> MultiDict<V> {
    /// Add values to `key`, skipping any that are already present.
    pub fn append(&mut self, key: impl Into<String>, values: impl IntoIterator<Item = V>) {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return;
        }

        let key = key.into();
        let i = match self.slot(&key) {
            Some(i) => i,
            None => {
                self.entries.push((key, Vec::new()));
                self.entries.len() - 1
            }
        };

        let slot = &mut self.entries[i].1;
        for value in values {
            if !slot.contains(&value) {
                slot.push(value);
            }
        }
    }
}

impl<V: PartialEq + Clone> MultiDict<V> {
    /// Append every field of `other` to this record.
    pub fn update(&mut self, other: &MultiDict<V>) {
        for (key, values) in other.iter() {
            self.append(key, values.iter().cloned());
        }
    }
}

impl<V: fmt::Display> MultiDict<V> {
    /// The single value of `key`, or all of its values joined with `sep`.
    pub fn join(&self, key: &str, sep: &str) -> CctoolResult<String> {
        match self.get(key) {
            [] => Err(CctoolError::MissingField(key.to_string())),
            [single] => Ok(single.to_string()),
            values => Ok(values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(sep)),
        }
    }

    pub fn join_or(&self, key: &str, sep: &str, default: &str) -> String {
        self.join(key, sep).unwrap_or_else(|_| default.to_string())
    }
}

impl<V> Default for MultiDict<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: PartialEq> PartialEq for MultiDict<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(key, values)| other.get(key) == values)
    }
}

impl<V: Eq> Eq for MultiDict<V> {}

impl<V> Index<&str> for MultiDict<V> {
    type Output = [V];

    fn index(&self, key: &str) -> &[V] {
        self.get(key)
    }
}

impl<K: Into<String>, V> FromIterator<(K, Vec<V>)> for MultiDict<V> {
    fn from_iter<I: IntoIterator<Item = (K, Vec<V>)>>(iter: I) -> Self {
        let mut dict = MultiDict::new();
        for (key, values) in iter {
            dict.set(key, values);
        }
        dict
    }
}

impl<K: Into<String>, V, const N: usize> From<[(K, Vec<V>); N]> for MultiDict<V> {
    fn from(pairs: [(K, Vec<V>); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<V: Serialize> Serialize for MultiDict<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, values) in self.iter() {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}

/// Field values as they appear in documents: usually a list, sometimes a
/// bare scalar.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<V> {
    Many(Vec<V>),
    One(V),
}

struct MultiDictVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for MultiDictVisitor<V> {
    type Value = MultiDict<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of field names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut dict = MultiDict::new();
        while let Some((key, values)) = access.next_entry::<String, OneOrMany<V>>()? {
            let values = match values {
                OneOrMany::Many(values) => values,
                OneOrMany::One(value) => vec![value],
            };
            dict.set(key, values);
        }
        Ok(dict)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for MultiDict<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MultiDictVisitor(PhantomData))
    }
}

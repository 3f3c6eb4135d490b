//! Outer join of records sharing a key field.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::CctoolError;
use crate::multidict::MultiDict;

/// How records are matched against each other when merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Merge when the key value sets share at least one value, so any of
    /// several email addresses can identify a person.
    #[default]
    Overlap,
    /// Merge when the first key values render to the same string.
    Exact,
}

impl FromStr for MergePolicy {
    type Err = CctoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overlap" => Ok(MergePolicy::Overlap),
            "exact" => Ok(MergePolicy::Exact),
            other => Err(CctoolError::Config(format!("Unknown merge policy: {other}"))),
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::Overlap => write!(f, "overlap"),
            MergePolicy::Exact => write!(f, "exact"),
        }
    }
}

/// Outer join `records` on `key`.
///
/// Grouped records come first, in the order their first member was seen,
/// followed by the records that lack `key` in their original order.
pub fn merged<V>(records: impl IntoIterator<Item = MultiDict<V>>, key: &str, policy: MergePolicy) -> Vec<MultiDict<V>>
where
    V: Clone + PartialEq + fmt::Display,
{
    let mut groups: Vec<MultiDict<V>> = Vec::new();
    let mut keyless = Vec::new();

    for record in records {
        if !record.contains(key) {
            keyless.push(record);
            continue;
        }

        let existing = groups.iter_mut().find(|group| match policy {
            MergePolicy::Overlap => {
                let theirs = group.get(key);
                record.get(key).iter().any(|value| theirs.contains(value))
            }
            MergePolicy::Exact => {
                first_as_string(group, key) == first_as_string(&record, key)
            }
        });

        match existing {
            Some(group) => group.update(&record),
            None => groups.push(record),
        }
    }

    groups.extend(keyless);
    groups
}

fn first_as_string<V: fmt::Display>(record: &MultiDict<V>, key: &str) -> Option<String> {
    record.get(key).first().map(ToString::to_string)
}

//! Format registry and the per-format codecs.
//!
//! Every format is listed in [`Format`]; formats whose optional dependency
//! was compiled out stay listed but report [`CctoolError::UnavailableFormat`]
//! when asked for a codec.

pub mod abook;
pub mod bsdcal;
#[cfg(feature = "ics")]
pub mod ics;
pub mod json;
pub mod ldif;
pub mod pickle;
pub mod vcard;
#[cfg(feature = "yaml")]
pub mod yaml;

mod contentline;
mod document;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::codec::Codec;
use crate::error::{CctoolError, CctoolResult};
use crate::kind::Kind;
use crate::multidict::Record;
use crate::value::Value;

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// abook's INI-style addressbook.
    Abook,
    /// BSD calendar(1) lines.
    Bsdcal,
    /// iCalendar (RFC 5545).
    Ics,
    Json,
    /// LDAP Data Interchange Format (RFC 2849).
    Ldif,
    /// Lossless binary record dump.
    Pickle,
    /// vCard (RFC 2426 / RFC 6350).
    Vcard,
    Yaml,
}

impl Format {
    pub const ALL: [Format; 8] = [
        Format::Abook,
        Format::Bsdcal,
        Format::Ics,
        Format::Json,
        Format::Ldif,
        Format::Pickle,
        Format::Vcard,
        Format::Yaml,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Format::Abook => "abook",
            Format::Bsdcal => "bsdcal",
            Format::Ics => "ics",
            Format::Json => "json",
            Format::Ldif => "ldif",
            Format::Pickle => "pickle",
            Format::Vcard => "vcard",
            Format::Yaml => "yml",
        }
    }

    /// Usual file extension, without the dot.
    pub const fn extension(&self) -> &'static str {
        match self {
            Format::Vcard => "vcf",
            _ => self.name(),
        }
    }

    /// Which record shape the format stores, if it has an opinion.
    pub const fn kind(&self) -> Option<Kind> {
        match self {
            Format::Abook | Format::Ldif | Format::Vcard => Some(Kind::Person),
            Format::Bsdcal | Format::Ics => Some(Kind::Event),
            Format::Json | Format::Pickle | Format::Yaml => None,
        }
    }

    /// Whether the optional dependency behind this format was compiled in.
    pub const fn is_available(&self) -> bool {
        match self {
            Format::Ics => cfg!(feature = "ics"),
            Format::Yaml => cfg!(feature = "yaml"),
            _ => true,
        }
    }

    pub const fn supports_decode(&self) -> bool {
        self.is_available()
    }

    pub const fn supports_encode(&self) -> bool {
        self.is_available()
    }

    /// Formats that can be read in this build.
    pub fn input_formats() -> Vec<Self> {
        Self::ALL.into_iter().filter(Format::supports_decode).collect()
    }

    /// Formats that can be written in this build.
    pub fn output_formats() -> Vec<Self> {
        Self::ALL.into_iter().filter(Format::supports_encode).collect()
    }

    /// Detects the format from the text after the last `.` of `path`.
    pub fn from_path(path: &Path) -> CctoolResult<Self> {
        let name = path.to_string_lossy();
        match name.rsplit_once('.') {
            Some((_, ext)) => ext.parse(),
            None => Err(CctoolError::UnsupportedFormat(format!(
                "cannot determine format of '{name}': no extension"
            ))),
        }
    }

    /// Fail with `UnavailableFormat` if this build can't handle the format.
    pub fn require_available(self) -> CctoolResult<Self> {
        if self.is_available() {
            Ok(self)
        } else {
            Err(CctoolError::UnavailableFormat(self.to_string()))
        }
    }

    pub fn codec(&self) -> CctoolResult<Box<dyn Codec>> {
        match self {
            Format::Abook => Ok(Box::new(abook::ABook)),
            Format::Bsdcal => Ok(Box::new(bsdcal::BsdCal)),
            #[cfg(feature = "ics")]
            Format::Ics => Ok(Box::new(ics::ICal)),
            Format::Json => Ok(Box::new(json::Json)),
            Format::Ldif => Ok(Box::new(ldif::Ldif)),
            Format::Pickle => Ok(Box::new(pickle::Pickle)),
            Format::Vcard => Ok(Box::new(vcard::VCard)),
            #[cfg(feature = "yaml")]
            Format::Yaml => Ok(Box::new(yaml::Yaml)),
            #[allow(unreachable_patterns)]
            _ => Err(CctoolError::UnavailableFormat(self.to_string())),
        }
    }
}

impl FromStr for Format {
    type Err = CctoolError;

    fn from_str(s: &str) -> CctoolResult<Self> {
        match s.to_lowercase().as_str() {
            "abook" => Ok(Format::Abook),
            "bsdcal" => Ok(Format::Bsdcal),
            "ics" | "ical" => Ok(Format::Ics),
            "json" => Ok(Format::Json),
            "ldif" => Ok(Format::Ldif),
            "pickle" | "pkl" => Ok(Format::Pickle),
            "vcard" | "vcf" => Ok(Format::Vcard),
            "yml" | "yaml" => Ok(Format::Yaml),
            _ => Err(CctoolError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fields that hold dates in the canonical vocabulary.
const DATE_FIELDS: [&str; 3] = ["bday", "dtstart", "dtend"];

/// Turn ISO date strings in date fields back into date values.
///
/// Text formats without a date type (JSON, YAML) write dates as strings;
/// this lets their output feed the calendar formats again.
pub(crate) fn restore_dates(mut record: Record) -> Record {
    for field in DATE_FIELDS {
        if !record.contains(field) {
            continue;
        }
        let values = record
            .get(field)
            .iter()
            .map(|value| match value {
                Value::Text(s) => Value::parse_iso(s).unwrap_or_else(|| value.clone()),
                other => other.clone(),
            })
            .collect();
        record.set(field, values);
    }
    record
}

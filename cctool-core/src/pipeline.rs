//! The conversion driver.
//!
//! Steps run in a fixed order: decode every input, translate each input's
//! records toward the output kind, merge, sort, encode.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use log::{debug, info};

use crate::error::{CctoolError, CctoolResult};
use crate::formats::Format;
use crate::kind::translate_kind;
use crate::merge::{MergePolicy, merged};
use crate::multidict::Record;

/// Where records are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    Path(PathBuf),
}

/// Where records are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    Path(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Stdin => f.write_str("<stdin>"),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Stdout => f.write_str("<stdout>"),
            Destination::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    pub location: Source,
    pub format: Format,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub location: Destination,
    pub format: Format,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSpec {
    pub key: String,
    pub policy: MergePolicy,
}

/// Everything needed for one conversion run.
#[derive(Debug, Clone)]
pub struct ConvertJob {
    pub inputs: Vec<InputSource>,
    pub output: OutputTarget,
    pub merge: Option<MergeSpec>,
    pub sort_key: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertReport {
    pub records_read: usize,
    pub records_written: usize,
}

/// Run `job` to completion.
///
/// The output is encoded into memory first; the destination is only
/// created once encoding succeeded.
pub fn run(job: &ConvertJob) -> CctoolResult<ConvertReport> {
    let output_codec = job.output.format.require_available()?.codec()?;
    let output_kind = job.output.format.kind();

    let mut records = Vec::new();
    let mut records_read = 0;
    for input in &job.inputs {
        let decoded = read_input(input)?;
        records_read += decoded.len();
        info!(
            "Read {} record(s) from {} as {}",
            decoded.len(),
            input.location,
            input.format
        );

        match output_kind {
            Some(kind) => records.extend(translate_kind(decoded, input.format.kind(), kind)),
            None => records.extend(decoded),
        }
    }

    if let Some(merge) = &job.merge {
        let before = records.len();
        records = merged(records, &merge.key, merge.policy);
        debug!(
            "Merged {before} record(s) into {} on '{}' ({})",
            records.len(),
            merge.key,
            merge.policy
        );
    }

    if let Some(key) = &job.sort_key {
        sort_records(&mut records, key);
        debug!("Sorted {} record(s) by '{key}'", records.len());
    }

    let bytes = output_codec.encode_bytes(&records)?;
    write_output(&job.output.location, &bytes)?;
    info!(
        "Wrote {} record(s) to {} as {}",
        records.len(),
        job.output.location,
        job.output.format
    );

    Ok(ConvertReport {
        records_read,
        records_written: records.len(),
    })
}

/// Stable ascending sort on the first value of `key`; records without the
/// field come first.
pub fn sort_records(records: &mut [Record], key: &str) {
    records.sort_by(|a, b| a.get(key).first().cmp(&b.get(key).first()));
}

fn read_input(input: &InputSource) -> CctoolResult<Vec<Record>> {
    let codec = input.format.require_available()?.codec()?;

    let reader: Box<dyn BufRead> = match &input.location {
        Source::Stdin => Box::new(io::stdin().lock()),
        Source::Path(path) => {
            let file = File::open(path).map_err(|e| with_path(e, &input.location))?;
            Box::new(BufReader::new(file))
        }
    };

    codec.decode(reader)?.collect()
}

fn write_output(location: &Destination, bytes: &[u8]) -> CctoolResult<()> {
    match location {
        Destination::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
        Destination::Path(path) => {
            std::fs::write(path, bytes).map_err(|e| with_path(e, location))?;
        }
    }
    Ok(())
}

fn with_path(err: io::Error, location: &impl fmt::Display) -> CctoolError {
    CctoolError::Io(io::Error::new(err.kind(), format!("{location}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::path::Path;

    fn input(path: &Path, format: Format) -> InputSource {
        InputSource {
            location: Source::Path(path.to_path_buf()),
            format,
        }
    }

    fn output(path: &Path, format: Format) -> OutputTarget {
        OutputTarget {
            location: Destination::Path(path.to_path_buf()),
            format,
        }
    }

    fn job(inputs: Vec<InputSource>, output: OutputTarget) -> ConvertJob {
        ConvertJob {
            inputs,
            output,
            merge: None,
            sort_key: None,
        }
    }

    #[test]
    fn test_sort() {
        let mut records: Vec<Record> = ["b", "a", "c"]
            .into_iter()
            .map(|name| Record::from([("name", vec![Value::from(name)])]))
            .collect();
        records.push(Record::from([("nick", vec![Value::from("z")])]));

        sort_records(&mut records, "name");

        let names: Vec<String> = records.iter().map(|r| r.join_or("name", ",", "-")).collect();
        assert_eq!(names, vec!["-", "a", "b", "c"]);
    }

    #[test]
    fn test_sort_ignores_later_values() {
        let mut records = vec![
            Record::from([("name", vec![Value::from("a"), Value::from("z")]), ("id", vec![Value::from("1")])]),
            Record::from([("name", vec![Value::from("a")]), ("id", vec![Value::from("2")])]),
        ];

        sort_records(&mut records, "name");

        let ids: Vec<String> = records.iter().map(|r| r.join_or("id", ",", "-")).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_abook_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("contacts.abook");
        let dst = dir.path().join("contacts.json");
        std::fs::write(&src, "[0]\nname = b\n\n[1]\nname = a\nemail = a@example.com\n").unwrap();

        let mut job = job(vec![input(&src, Format::Abook)], output(&dst, Format::Json));
        job.sort_key = Some("name".into());
        let report = run(&job).unwrap();

        assert_eq!(report, ConvertReport { records_read: 2, records_written: 2 });
        let text = std::fs::read_to_string(&dst).unwrap();
        assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
    }

    #[test]
    fn test_merge_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        let dst = dir.path().join("out.json");
        std::fs::write(&first, r#"[{"email": ["x@example.com"], "name": ["X"]}]"#).unwrap();
        std::fs::write(&second, r#"[{"email": ["x@example.com"], "nick": ["ex"]}, {"name": ["Y"]}]"#)
            .unwrap();

        let mut job = job(
            vec![input(&first, Format::Json), input(&second, Format::Json)],
            output(&dst, Format::Json),
        );
        job.merge = Some(MergeSpec {
            key: "email".into(),
            policy: MergePolicy::Overlap,
        });
        let report = run(&job).unwrap();
        assert_eq!(report, ConvertReport { records_read: 3, records_written: 2 });

        let bytes = std::fs::read(&dst).unwrap();
        let records = Format::Json.codec().unwrap().decode_bytes(&bytes).unwrap();
        assert_eq!(
            records,
            vec![
                Record::from([
                    ("email", vec![Value::from("x@example.com")]),
                    ("name", vec![Value::from("X")]),
                    ("nick", vec![Value::from("ex")]),
                ]),
                Record::from([("name", vec![Value::from("Y")])]),
            ]
        );
    }

    #[test]
    fn test_birthdays_to_calendar() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("contacts.abook");
        let dst = dir.path().join("birthdays.bsdcal");
        std::fs::write(&src, "[0]\nname = foo\nbday = 1970-03-14\n\n[1]\nname = no birthday\n")
            .unwrap();

        let report = run(&job(vec![input(&src, Format::Abook)], output(&dst, Format::Bsdcal)))
            .unwrap();

        assert_eq!(report, ConvertReport { records_read: 2, records_written: 1 });
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "03/14*\tfoo\n");
    }

    #[test]
    fn test_failed_decode_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("broken.json");
        let dst = dir.path().join("out.json");
        std::fs::write(&src, "{not json").unwrap();

        let result = run(&job(vec![input(&src, Format::Json)], output(&dst, Format::Json)));

        assert!(matches!(result, Err(CctoolError::Format { format: "json", .. })));
        assert!(!dst.exists());
    }

    #[test]
    fn test_missing_input_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("missing.json");
        let dst = dir.path().join("out.json");

        let err = run(&job(vec![input(&src, Format::Json)], output(&dst, Format::Json)))
            .unwrap_err();
        assert!(matches!(err, CctoolError::Io(_)));
        assert!(err.to_string().contains("missing.json"));
    }
}

//! Turning command line arguments into input sources and an output target.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use cctool_core::{Destination, Format, InputSource, OutputTarget, Source};

/// Resolve one `FILE[:FORMAT]` argument.
///
/// The format comes from the `:FORMAT` suffix, else `from`, else the
/// file extension.
pub fn input_source(arg: &str, from: Option<Format>) -> Result<InputSource> {
    let (path, suffix) = split_format_suffix(arg);

    let format = match (suffix, from) {
        (Some(name), _) => name.parse::<Format>()?,
        (None, Some(format)) => format,
        (None, None) if path == "-" => {
            bail!("Missing input format for stdin, use --from or '-:FORMAT'")
        }
        (None, None) => Format::from_path(Path::new(path))?,
    };

    Ok(InputSource {
        location: if path == "-" {
            Source::Stdin
        } else {
            Source::Path(expand(path))
        },
        format: format.require_available()?,
    })
}

/// Resolve the output: `to`, else the output file extension, else the
/// configured default.
pub fn output_target(
    output: Option<&str>,
    to: Option<Format>,
    default: Option<Format>,
) -> Result<OutputTarget> {
    let output = output.filter(|o| *o != "-");
    let from_extension = output.and_then(|o| Format::from_path(Path::new(o)).ok());

    let Some(format) = to.or(from_extension).or(default) else {
        bail!("Missing output format, use --to or an output file with a known extension");
    };

    Ok(OutputTarget {
        location: match output {
            Some(path) => Destination::Path(expand(path)),
            None => Destination::Stdout,
        },
        format: format.require_available()?,
    })
}

/// Split `foo.json:json` into `("foo.json", Some("json"))`.
fn split_format_suffix(arg: &str) -> (&str, Option<&str>) {
    match arg.rsplit_once(':') {
        Some((path, suffix))
            if !path.is_empty() && !suffix.is_empty() && !suffix.contains(['/', '\\']) =>
        {
            (path, Some(suffix))
        }
        _ => (arg, None),
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

//! Colored `--list-formats` output.

use cctool_core::Format;
use owo_colors::OwoColorize;

/// Cargo feature a format depends on, if any.
fn feature(format: Format) -> Option<&'static str> {
    match format {
        Format::Ics => Some("ics"),
        Format::Yaml => Some("yaml"),
        _ => None,
    }
}

fn render_format(format: Format) -> String {
    let kind = format
        .kind()
        .map_or_else(|| "-".to_string(), |k| k.to_string());
    let modes = [
        ("read", format.supports_decode()),
        ("write", format.supports_encode()),
    ]
    .iter()
    .filter(|(_, supported)| *supported)
    .map(|(mode, _)| *mode)
    .collect::<Vec<_>>()
    .join("/");

    let name = format!("{:<8}", format.name());
    let extension = format!(".{:<8}", format.extension());
    let kind = format!("{kind:<8}");
    if format.is_available() {
        format!(
            "{} {} {} {}",
            name.bold(),
            extension.dimmed(),
            kind.dimmed(),
            modes.green()
        )
    } else {
        let reason = match feature(format) {
            Some(feature) => format!("unavailable (built without feature '{feature}')"),
            None => "unavailable".to_string(),
        };
        format!(
            "{} {} {} {}",
            name.dimmed(),
            extension.dimmed(),
            kind.dimmed(),
            reason.red()
        )
    }
}

pub fn render_format_list() -> String {
    Format::ALL
        .into_iter()
        .map(render_format)
        .collect::<Vec<_>>()
        .join("\n")
}

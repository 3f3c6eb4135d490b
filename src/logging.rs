//! Logger setup.
//!
//! `RUST_LOG` is honoured unless `-v` is given, which forces `info`
//! (`-vv` and more: `debug`). Without either, only warnings are shown.

use log::LevelFilter;

pub fn init(verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn);
    builder.parse_default_env();
    if let Some(level) = level_for(verbosity) {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).format_target(false);
    builder.init();
}

fn level_for(verbosity: u8) -> Option<LevelFilter> {
    match verbosity {
        0 => None,
        1 => Some(LevelFilter::Info),
        _ => Some(LevelFilter::Debug),
    }
}

mod logging;
mod render;
mod resolve;

use anyhow::{Context, Result};
use cctool_core::{CctoolConfig, ConvertJob, Format, MergePolicy, MergeSpec, pipeline};
use clap::{ArgAction, Parser};
use log::debug;

use crate::render::render_format_list;

#[derive(Parser)]
#[command(name = "cctool")]
#[command(about = "Convert address books and calendars between formats")]
struct Cli {
    /// Input files, `-` for stdin. A `:FORMAT` suffix overrides detection
    /// (e.g. `contacts:json`, `-:ics`)
    #[arg(value_name = "FILE", default_value = "-")]
    inputs: Vec<String>,

    /// Format of inputs without a `:FORMAT` suffix
    #[arg(short, long, value_name = "FORMAT")]
    from: Option<String>,

    /// Output format (default: from the output file extension)
    #[arg(short, long, value_name = "FORMAT")]
    to: Option<String>,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Sort records by this field
    #[arg(short, long, value_name = "FIELD")]
    sort: Option<String>,

    /// Merge records sharing a value of this field
    #[arg(short, long, value_name = "FIELD")]
    merge: Option<String>,

    /// How merge keys are compared: overlap or exact
    #[arg(long, value_name = "POLICY")]
    merge_policy: Option<String>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// List the known formats and exit
    #[arg(long)]
    list_formats: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if cli.list_formats {
        println!("{}", render_format_list());
        return Ok(());
    }

    let config = CctoolConfig::load().context("Failed to load configuration")?;
    let job = build_job(&cli, &config)?;
    debug!("{job:?}");

    let report = pipeline::run(&job)?;
    debug!(
        "{} record(s) read, {} written",
        report.records_read, report.records_written
    );
    Ok(())
}

fn build_job(cli: &Cli, config: &CctoolConfig) -> Result<ConvertJob> {
    let from: Option<Format> = cli.from.as_deref().map(str::parse).transpose()?;
    let to: Option<Format> = cli.to.as_deref().map(str::parse).transpose()?;
    let default = config.default_output_format()?;

    let output = resolve::output_target(cli.output.as_deref(), to, default)?;
    let inputs = cli
        .inputs
        .iter()
        .map(|arg| resolve::input_source(arg, from))
        .collect::<Result<Vec<_>>>()?;

    let merge = match &cli.merge {
        Some(key) => {
            let policy = match &cli.merge_policy {
                Some(policy) => policy.parse::<MergePolicy>()?,
                None => config.merge_policy,
            };
            Some(MergeSpec {
                key: key.clone(),
                policy,
            })
        }
        None => None,
    };

    Ok(ConvertJob {
        inputs,
        output,
        merge,
        sort_key: cli.sort.clone(),
    })
}

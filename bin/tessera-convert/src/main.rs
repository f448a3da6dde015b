//! Converts decoded telemetry measurements into columnar tables.
//!
//! Reads measurements (or metric families) as JSON lines, converts them according to the loaded configuration, and
//! writes the resulting tables to standard output as a JSON array.

#![deny(warnings)]
#![deny(missing_docs)]

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write as _},
};

use clap::Parser as _;
use tessera_error::{ErrorContext as _, GenericError};
use tessera_frame::{Converter, Table};
use tessera_measurement::{Measurement, MetricFamily};
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

mod config;
use self::config::{load_configuration, Cli, ENV_PREFIX};

mod input;
use self::input::read_json_lines;

fn main() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .with_ansi(true)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{:?}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), GenericError> {
    let config =
        load_configuration(cli.config.as_deref(), ENV_PREFIX).error_context("Failed to load configuration.")?;
    info!(
        grouping = ?config.grouping(),
        layout = ?config.layout(),
        unify_numeric = config.unify_numeric(),
        error_policy = ?config.error_policy(),
        "Loaded configuration."
    );

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => {
            let file = File::open(path)
                .with_error_context(|| format!("Failed to open input file '{}'.", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let converter = Converter::new(config);
    let tables = if cli.families {
        let families = read_json_lines::<MetricFamily, _>(reader)?;
        info!(families = families.len(), "Read metric families.");
        converter.convert_families(&families)?
    } else {
        let measurements = read_json_lines::<Measurement, _>(reader)?;
        info!(measurements = measurements.len(), "Read measurements.");
        converter.convert(&measurements)?
    };

    info!(tables = tables.len(), "Converted input.");
    write_tables(&tables, cli.pretty)
}

fn write_tables(tables: &[Table], pretty: bool) -> Result<(), GenericError> {
    let mut stdout = io::stdout().lock();
    if pretty {
        serde_json::to_writer_pretty(&mut stdout, tables)?;
    } else {
        serde_json::to_writer(&mut stdout, tables)?;
    }
    writeln!(stdout)?;
    Ok(())
}

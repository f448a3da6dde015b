use std::path::{Path, PathBuf};

use clap::Parser;
use figment::{
    error::Kind,
    providers::{Env, Format as _, Yaml},
    Figment,
};
use snafu::{IntoError as _, Snafu};
use tessera_frame::ConverterConfiguration;

/// Prefix of the environment variables that override configuration file values.
pub const ENV_PREFIX: &str = "TESSERA_";

#[derive(Clone, Parser)]
#[command(about)]
pub struct Cli {
    /// Path to the converter configuration file.
    ///
    /// Values can be overridden with `TESSERA_`-prefixed environment variables, such as `TESSERA_LAYOUT=labels`.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Path to the input file.
    ///
    /// Input is read as JSON lines: one decoded measurement, or one metric family, per line. Reads from standard input
    /// if not set.
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Treat the input as metric families rather than measurements.
    #[arg(long)]
    pub families: bool,

    /// Pretty-print the output tables.
    #[arg(long)]
    pub pretty: bool,
}

/// A configuration error.
#[derive(Debug, Snafu)]
#[snafu(context(suffix(false)))]
pub enum ConfigurationError {
    /// The configuration file does not exist.
    #[snafu(display("Configuration file '{}' does not exist.", path.display()))]
    MissingFile { path: PathBuf },

    /// A required field was missing from the configuration.
    #[snafu(display("Missing field '{}' in configuration.", field))]
    MissingField { field: String },

    /// A field's value was not of the expected type.
    #[snafu(display(
        "Expected value for field '{}' to be '{}', got '{}' instead.",
        field,
        expected_ty,
        actual_ty
    ))]
    InvalidFieldType {
        field: String,
        expected_ty: String,
        actual_ty: String,
    },

    /// Any other configuration error.
    #[snafu(display("Failed to load configuration."))]
    Generic { source: figment::Error },
}

impl From<figment::Error> for ConfigurationError {
    fn from(e: figment::Error) -> Self {
        match e.kind {
            Kind::MissingField(field) => MissingField { field }.build(),
            Kind::InvalidType(actual_ty, expected_ty) => InvalidFieldType {
                field: e.path.join("."),
                expected_ty,
                actual_ty: actual_ty.to_string(),
            }
            .build(),
            _ => Generic.into_error(e),
        }
    }
}

/// Loads the converter configuration.
///
/// The configuration file, if any, is read first, and then environment variables with the given prefix are layered on
/// top. Every field has a default, so loading with neither a file nor any environment variables yields the default
/// configuration.
pub fn load_configuration(
    path: Option<&Path>, env_prefix: &str,
) -> Result<ConverterConfiguration, ConfigurationError> {
    let mut figment = Figment::new();

    if let Some(path) = path {
        if !path.is_file() {
            return MissingFile { path }.fail();
        }
        figment = figment.admerge(Yaml::file(path));
    }

    figment.admerge(Env::prefixed(env_prefix)).extract().map_err(Into::into)
}

//! Columnar table assembly for telemetry measurements.
//!
//! This crate turns already-decoded measurements into tables suited to time series visualization: one table per
//! measurement name (or per name and timestamp), holding a shared time axis and typed, nullable value columns. Three
//! layouts are available:
//!
//! - **wide**: every series (name and tag set) owns a contiguous block of columns, tagged with the series' tags
//! - **labels**: series share one column per field key, and tags are rendered into a `labels` column
//! - **fixed schema**: metric families (counters, gauges, summaries, histograms) become `time`, `label`, `value` tables
//!
//! The entry point is [`Converter`], configured through [`ConverterConfiguration`].
#![deny(warnings)]
#![deny(missing_docs)]

pub mod assembler;

mod coercion;
pub use self::coercion::{infer_field_type, Coercer, ConvertFn, ConverterRegistry};

mod column;
pub use self::column::Column;

mod config;
pub use self::config::{ConverterConfiguration, ErrorPolicy, GroupingMode, Layout};

mod converter;
pub use self::converter::Converter;

mod error;
pub use self::error::ConversionError;

mod table;
pub use self::table::Table;

mod types;
pub use self::types::{Cell, ColumnValues, FieldType, ItemType};

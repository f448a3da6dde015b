//! Decoded telemetry measurements.
//!
//! This crate holds the input side of Tessera: measurements as they look once an upstream decoder (line protocol
//! parser, exposition format decoder, and so on) is done with them. Nothing here knows how to parse a wire format, and
//! nothing here knows about tables.
//!
//! Two shapes of input exist:
//!
//! - [`Measurement`]: a name, a tag set, a timestamp, and one or more arbitrarily-typed fields. This is the shape
//!   produced by line-oriented protocols.
//! - [`MetricFamily`]: a named group of counter, gauge, summary, or histogram samples. This is the shape produced by
//!   exposition formats.
#![deny(warnings)]
#![deny(missing_docs)]

mod family;
pub use self::family::*;

mod measurement;
pub use self::measurement::*;

mod tags;
pub use self::tags::TagSet;

mod value;
pub use self::value::FieldValue;

/// A point in time, in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

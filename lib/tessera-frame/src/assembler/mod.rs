//! Table assemblers.
//!
//! An assembler consumes inputs one at a time and builds up the tables they belong to. Each assembler implements one
//! table layout; the [`Converter`][crate::Converter] picks one based on its configuration and feeds it a whole batch.
//!
//! Every assembler validates and coerces an entire input before touching any of its tables. An input that fails to
//! ingest therefore leaves the assembler exactly as it was, which is what allows the converter to skip bad inputs and
//! keep going.

use crate::{ConversionError, Table};

mod fixed;
pub use self::fixed::FixedSchemaAssembler;

mod labels;
pub use self::labels::LabelColumnAssembler;

mod wide;
pub use self::wide::{FieldInterval, WideColumnAssembler};

/// Builds tables out of a sequence of inputs.
pub trait FrameAssembler {
    /// Type of input consumed by the assembler.
    type Input;

    /// Ingests a single input.
    ///
    /// # Errors
    ///
    /// If any value of the input cannot be converted, an error is returned and the assembler's state is left
    /// unchanged.
    fn ingest(&mut self, input: &Self::Input) -> Result<(), ConversionError>;

    /// Consumes the assembler, returning its tables in the order their keys were first seen.
    fn finish(self) -> Vec<Table>;
}

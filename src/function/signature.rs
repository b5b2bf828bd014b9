//! Registration-time validation of a bound function's declared shape.

use crate::binding::FieldSchema;
use crate::error::ConfigurationError;
use crate::function::FailureKind;

/// How one parameter or return value of a bound function is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A structure whose fields carry binding tags.
    Structured(&'static [FieldSchema]),
    /// An error-capable value.
    Error(FailureKind),
    /// Anything else, named for diagnostics.
    Opaque(&'static str),
}

/// The declared shape of a bound function: an optional parameter and an
/// ordered list of return values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub input: Option<Slot>,
    pub returns: Vec<Slot>,
}

/// The admissible return shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// No return value.
    Nothing,
    /// A single structured output.
    Output(&'static [FieldSchema]),
    /// A single error-capable value.
    Failure(FailureKind),
    /// A structured output and an error-capable value, in that order.
    OutputOrFailure(&'static [FieldSchema], FailureKind),
}

/// A signature that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validated {
    /// Fields of the input structure, when the function takes one.
    pub input: Option<&'static [FieldSchema]>,
    pub shape: CallShape,
}

impl Signature {
    /// Accept the signature iff it has zero or one structured parameter and one
    /// of the admissible return shapes.
    pub fn validate(&self) -> Result<Validated, ConfigurationError> {
        let input = match self.input {
            None => None,
            Some(Slot::Structured(fields)) => Some(fields),
            Some(Slot::Error(_) | Slot::Opaque(_)) => {
                return Err(ConfigurationError::InvalidInterface)
            }
        };

        let shape = match self.returns.as_slice() {
            [] => CallShape::Nothing,
            [Slot::Structured(fields)] => CallShape::Output(*fields),
            [Slot::Error(kind)] => CallShape::Failure(*kind),
            [Slot::Structured(fields), Slot::Error(kind)] => {
                CallShape::OutputOrFailure(*fields, *kind)
            }
            _ => return Err(ConfigurationError::InvalidInterface),
        };

        Ok(Validated { input, shape })
    }
}

//! Binding descriptors compiled from `request`/`response` field tags, and
//! the conversions between wire values and declared field types.

mod input;
mod output;
mod tag;
mod value;

pub use input::InputBinding;
pub use output::OutputBinding;
pub use tag::{compile_inputs, compile_outputs, FieldSchema};
pub use value::{BindError, Bound, Emit, FromBound, IntoEmit, Json};

#[doc(hidden)]
pub use value::{emit_field, next_field};

//! Value layer: syntaxes, typed protocol variables and the conversion
//! between them and application-facing generic values (`serde_json::Value`).

pub mod bits;
pub mod convert;
pub mod syntax;
pub mod variable;

pub use bits::{bits_from_u16, bits_from_u32, bits_positions, bits_to_u32};
pub use convert::{default_generic, default_variable, to_generic, to_variable, ConversionError, ValueInput};
pub use syntax::Syntax;
pub use variable::Variable;

//! # Dialect compilation
//!
//! Turns a parsed [`DialectDefinition`] into a [`MessageRegistry`] of wire-accurate
//! [`CompiledMessage`] layouts. Parsing of dialect XML is out of scope: any loader that can
//! produce a [`DialectDefinition`] (or deserialize one with the `serde` feature) will do.

mod definition;
mod enums;
mod field;
mod message;
mod registry;
mod wire_type;

pub use definition::{DialectDefinition, FieldDescription, MessageDefinition};
pub use enums::{EnumDefinition, EnumEntry, Flag};
pub use field::{CompiledField, FieldCodec, FieldDefinition};
pub use message::CompiledMessage;
pub use registry::MessageRegistry;
pub use wire_type::WireType;

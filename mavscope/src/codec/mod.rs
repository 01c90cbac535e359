//! # Payload and frame codecs
//!
//! [`PayloadCodec`] translates between payload bytes and named [`Fields`]. [`FrameCodec`] bundles
//! it with frame scanning and packing for one dialect.

mod frame_codec;
mod payload;
mod value;

pub use frame_codec::{FrameCodec, FrameEnvelope};
pub use payload::PayloadCodec;
pub use value::{Fields, Scalar, Value};

//! # Basic imports

pub use crate::errors::{Error, Result};
pub use crate::errors::{CompileError, EncodeError, EncodeErrorKind, FrameError, PayloadError};

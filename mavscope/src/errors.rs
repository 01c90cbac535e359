//! # Mavscope errors
//!
//! Errors are split by the stage that raises them:
//!
//! * [`CompileError`] is raised once, while a dialect is compiled into a
//!   [`MessageRegistry`](crate::dialect::MessageRegistry). It is fatal for the dialect.
//! * [`PayloadError`] is raised per call by the payload codec. The registry is never affected.
//! * [`FrameError`] is raised while building or packing outgoing frames.
//!
//! CRC and signature failures of incoming frames are not errors. They are reported as a
//! [`ValidationOutcome`](crate::protocol::ValidationOutcome) carried by the decoded frame.

use crate::dialect::WireType;
use crate::protocol::{ComponentId, LinkId, MavLinkVersion, MessageId, SystemId};

/// Common result type returned by `mavscope` functions.
pub type Result<T> = core::result::Result<T, Error>;

/// All errors generated by `mavscope`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Dialect compilation error.
    #[error("dialect compilation error: {0}")]
    Compile(#[from] CompileError),
    /// Payload encoding or decoding error.
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),
    /// Frame building or packing error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

/// Errors raised while compiling a dialect definition.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// A base or extension field declares a type that is not a MAVLink wire type.
    #[error("message '{message}': field '{field}' has unsupported type '{type_name}'")]
    UnknownWireType {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
        /// Declared type string.
        type_name: String,
    },
    /// Array length in the type string can't be parsed or contradicts the declared length.
    #[error("message '{message}': field '{field}' has invalid array declaration '{type_name}'")]
    InvalidArrayLength {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
        /// Declared type string.
        type_name: String,
    },
    /// All fields together occupy zero bytes.
    #[error("message '{message}' (#{id}) has zero payload size")]
    EmptyPayload {
        /// Message name.
        message: String,
        /// Message `ID`.
        id: MessageId,
    },
    /// All fields together do not fit into a single frame.
    #[error("message '{message}' (#{id}) payload of {size} bytes exceeds 255 bytes")]
    PayloadTooLarge {
        /// Message name.
        message: String,
        /// Message `ID`.
        id: MessageId,
        /// Computed maximum payload size.
        size: usize,
    },
    /// Message `ID` does not fit into 24 bits.
    #[error("message '{message}' has id #{id} which does not fit into 24 bits")]
    MessageIdOutOfRange {
        /// Message name.
        message: String,
        /// Message `ID`.
        id: MessageId,
    },
    /// Two messages of a dialect share the same `ID`.
    #[error("message id #{id} is declared by both '{first}' and '{second}'")]
    DuplicateMessageId {
        /// Message `ID`.
        id: MessageId,
        /// Name of the message compiled first.
        first: String,
        /// Name of the conflicting message.
        second: String,
    },
}

/// Errors raised by the payload codec.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PayloadError {
    /// Message `ID` is not present in the registry.
    #[error("unknown message id #{0}")]
    UnknownMessage(MessageId),
    /// A supplied field value can't be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Payload ends before all base fields could be read.
    #[error("payload too short for '{message}': {actual} bytes, at least {required} required")]
    TooShort {
        /// Message name.
        message: String,
        /// Bytes required to read all base fields.
        required: usize,
        /// Bytes available.
        actual: usize,
    },
}

/// Field-level encoding error.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("can't encode field '{field}': {kind}")]
pub struct EncodeError {
    /// Field name.
    pub field: String,
    /// What went wrong.
    pub kind: EncodeErrorKind,
}

/// Kinds of [`EncodeError`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EncodeErrorKind {
    /// Value shape doesn't match the field (for example, text for a numeric field).
    #[error("expected {expected}, got {found}")]
    TypeMismatch {
        /// Expected value shape.
        expected: &'static str,
        /// Supplied value shape.
        found: &'static str,
    },
    /// Numeric value doesn't fit into the wire type.
    #[error("value {value} is out of range for {wire_type}")]
    OutOfRange {
        /// Supplied value rendered as text.
        value: String,
        /// Target wire type.
        wire_type: WireType,
    },
    /// Field references an enum that is not part of the dialect.
    #[error("enum '{0}' is not registered")]
    UnknownEnum(String),
    /// A sequence of flags was supplied for an enum that is not a bitmask.
    #[error("enum '{0}' is not a bitmask")]
    NotBitmask(String),
    /// Symbolic value is not an entry of the field's enum.
    #[error("'{entry}' is not an entry of enum '{enum_name}'")]
    UnknownEnumEntry {
        /// Enum name.
        enum_name: String,
        /// Supplied symbol.
        entry: String,
    },
}

/// Errors raised while building or packing outgoing frames.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Frame builder was finalized without a protocol version.
    #[error("MAVLink protocol version is not specified")]
    MissingVersion,
    /// Payload is longer than 255 bytes.
    #[error("payload of {0} bytes exceeds 255 bytes")]
    PayloadTooLarge(usize),
    /// Message `ID` doesn't fit into the header of the requested version.
    #[error("message id #{id} can't be represented in {version:?} frames")]
    MessageIdOutOfRange {
        /// Message `ID`.
        id: MessageId,
        /// Requested protocol version.
        version: MavLinkVersion,
    },
    /// Message `ID` is not present in the registry, so its CRC-extra is unknown.
    #[error("unknown message id #{0}")]
    UnknownMessage(MessageId),
    /// `MAVLink 1` frames can't carry signatures.
    #[error("MAVLink 1 frames can't be signed")]
    SignedV1,
    /// Frame is marked as signed but carries no signature block to take link `ID` and timestamp from.
    #[error("signed MAVLink 2 frame has no signature")]
    MissingSignature,
    /// Key provider has no key for the frame's system, component and link.
    #[error("no signing key for system #{system_id}, component #{component_id}, link #{link_id}")]
    SigningKeyUnavailable {
        /// System `ID`.
        system_id: SystemId,
        /// Component `ID`.
        component_id: ComponentId,
        /// Signature link `ID`.
        link_id: LinkId,
    },
}

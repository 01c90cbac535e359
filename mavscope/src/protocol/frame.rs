//! MAVLink frame.

use std::fmt::{Display, Formatter};

use crate::consts::{IFLAG_SIGNED, SIGNATURE_DIGEST_SIZE, SIGNATURE_SIZE};
use crate::errors::FrameError;
use crate::protocol::{Checksum, ComponentId, LinkId, MessageId, Sequence, SystemId};

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink protocol version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MavLinkVersion {
    /// `MAVLink 1`
    V1,
    /// `MAVLink 2`
    V2,
}

impl MavLinkVersion {
    /// Stable small integer for the version, used in packet fingerprints.
    #[inline]
    pub const fn ordinal(&self) -> u8 {
        match self {
            MavLinkVersion::V1 => 0,
            MavLinkVersion::V2 => 1,
        }
    }
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Result of validating a decoded frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationOutcome {
    /// Checksum matches and, for signed frames, the signature is valid.
    Ok,
    /// Checksum matches, and the frame is either unsigned or signatures can't be checked.
    Unsigned,
    /// Checksum mismatch.
    CrcFailed,
    /// Checksum matches, but the signature is invalid or no key is known for it.
    SignatureFailed,
    /// Both checksum and signature are wrong.
    ///
    /// Reserved for frames validated outside of [`Framer`](crate::protocol::Framer). The framer
    /// skips signature checks once the checksum fails and reports [`CrcFailed`](Self::CrcFailed).
    CrcAndSignatureFailed,
    /// Frame structure is broken.
    ///
    /// Reserved for frames assembled or validated by callers. The framer treats structurally
    /// impossible candidates as noise and never emits them.
    Malformed,
    /// Frame has not been validated yet.
    #[default]
    Unknown,
}

impl ValidationOutcome {
    /// Whether the frame can be trusted ([`Ok`](Self::Ok) or [`Unsigned`](Self::Unsigned)).
    #[inline]
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Ok | ValidationOutcome::Unsigned)
    }
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// `MAVLink 2` signature block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signature {
    /// Link `ID` the signing key belongs to.
    pub link_id: LinkId,
    /// 48-bit timestamp in 10 microsecond units since 2015-01-01.
    pub timestamp: u64,
    /// First 6 bytes of the SHA-256 digest.
    pub digest: [u8; SIGNATURE_DIGEST_SIZE],
}

impl Signature {
    /// Largest representable timestamp.
    pub const TIMESTAMP_MAX: u64 = (1 << 48) - 1;

    /// Creates signature without a digest. The digest is computed when the frame is packed.
    pub fn new(link_id: LinkId, timestamp: u64) -> Self {
        Self {
            link_id,
            timestamp: timestamp & Self::TIMESTAMP_MAX,
            digest: [0; SIGNATURE_DIGEST_SIZE],
        }
    }

    /// Parses a 13-byte signature block.
    pub fn from_bytes(bytes: &[u8; SIGNATURE_SIZE]) -> Self {
        let mut ts = [0u8; 8];
        ts[..6].copy_from_slice(&bytes[1..7]);
        let mut digest = [0u8; SIGNATURE_DIGEST_SIZE];
        digest.copy_from_slice(&bytes[7..SIGNATURE_SIZE]);

        Self {
            link_id: bytes[0],
            timestamp: u64::from_le_bytes(ts),
            digest,
        }
    }

    /// Serializes the signature block.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes[0] = self.link_id;
        bytes[1..7].copy_from_slice(&self.timestamp.to_le_bytes()[..6]);
        bytes[7..].copy_from_slice(&self.digest);
        bytes
    }
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink frame, either decoded from bytes or assembled for packing.
///
/// Use [`Frame::builder`] to assemble outgoing frames.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    /// Protocol version.
    pub version: MavLinkVersion,
    /// Packet sequence number.
    pub sequence: Sequence,
    /// Sender system `ID`.
    pub system_id: SystemId,
    /// Sender component `ID`.
    pub component_id: ComponentId,
    /// Message `ID`.
    pub message_id: MessageId,
    /// Payload bytes.
    pub payload: Vec<u8>,
    /// Frame checksum.
    pub checksum: Checksum,
    /// Whether the frame carries (or should carry) a signature.
    pub signed: bool,
    /// `MAVLink 2` incompatibility flags.
    pub incompat_flags: u8,
    /// `MAVLink 2` compatibility flags.
    pub compat_flags: u8,
    /// Signature block of signed `MAVLink 2` frames.
    pub signature: Option<Signature>,
    /// Validation result.
    pub outcome: ValidationOutcome,
}

impl Frame {
    /// Instantiates an empty [`FrameBuilder`].
    pub fn builder() -> FrameBuilder {
        FrameBuilder::default()
    }

    /// Payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the frame passed validation.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.outcome.is_valid()
    }
}

impl Display for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} #{} seq={} sys={} comp={} len={} {:?}",
            self.version,
            self.message_id,
            self.sequence,
            self.system_id,
            self.component_id,
            self.payload.len(),
            self.outcome
        )
    }
}

/// Builder for [`Frame`].
///
/// # Examples
///
/// ```rust
/// use mavscope::protocol::{Frame, MavLinkVersion};
///
/// let frame = Frame::builder()
///     .version(MavLinkVersion::V2)
///     .sequence(7)
///     .system_id(1)
///     .component_id(1)
///     .message_id(0)
///     .payload(&[0; 9])
///     .build()
///     .unwrap();
///
/// assert_eq!(frame.sequence, 7);
/// ```
#[derive(Clone, Debug, Default)]
pub struct FrameBuilder {
    version: Option<MavLinkVersion>,
    sequence: Sequence,
    system_id: SystemId,
    component_id: ComponentId,
    message_id: MessageId,
    payload: Vec<u8>,
    compat_flags: u8,
    incompat_flags: u8,
    signature: Option<Signature>,
}

impl FrameBuilder {
    /// Sets protocol version. Required.
    pub fn version(mut self, version: MavLinkVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Sets packet sequence number.
    pub fn sequence(mut self, sequence: Sequence) -> Self {
        self.sequence = sequence;
        self
    }

    /// Sets system `ID`.
    pub fn system_id(mut self, system_id: SystemId) -> Self {
        self.system_id = system_id;
        self
    }

    /// Sets component `ID`.
    pub fn component_id(mut self, component_id: ComponentId) -> Self {
        self.component_id = component_id;
        self
    }

    /// Sets message `ID`.
    pub fn message_id(mut self, message_id: MessageId) -> Self {
        self.message_id = message_id;
        self
    }

    /// Sets payload bytes.
    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    /// Sets `MAVLink 2` compatibility flags.
    pub fn compat_flags(mut self, flags: u8) -> Self {
        self.compat_flags = flags;
        self
    }

    /// Sets `MAVLink 2` incompatibility flags.
    ///
    /// The signing flag is managed by [`signature`](Self::signature).
    pub fn incompat_flags(mut self, flags: u8) -> Self {
        self.incompat_flags = flags & !IFLAG_SIGNED;
        self
    }

    /// Marks the frame as signed with the specified link `ID` and timestamp.
    pub fn signature(mut self, link_id: LinkId, timestamp: u64) -> Self {
        self.signature = Some(Signature::new(link_id, timestamp));
        self
    }

    /// Builds the frame.
    ///
    /// Fails with [`FrameError::MissingVersion`] if no version was set.
    pub fn build(self) -> Result<Frame, FrameError> {
        let version = self.version.ok_or(FrameError::MissingVersion)?;
        let signed = self.signature.is_some();
        let incompat_flags = if signed {
            self.incompat_flags | IFLAG_SIGNED
        } else {
            self.incompat_flags
        };

        Ok(Frame {
            version,
            sequence: self.sequence,
            system_id: self.system_id,
            component_id: self.component_id,
            message_id: self.message_id,
            payload: self.payload,
            checksum: 0,
            signed,
            incompat_flags,
            compat_flags: self.compat_flags,
            signature: self.signature,
            outcome: ValidationOutcome::Unknown,
        })
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////

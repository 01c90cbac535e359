//! MAVLink protocol entities: frames, checksums, signing, framing and packing.

mod crc;
mod frame;
mod framer;
mod packer;
pub mod signing;

pub use crc::Crc;
pub use frame::{Frame, FrameBuilder, MavLinkVersion, Signature, ValidationOutcome};
pub use framer::{FrameReader, Framer};
pub use packer::FramePacker;
pub use signing::{
    NoSigningKeys, SecretKey, SigningKeyMap, SigningKeyProvider, StaticSigningKey,
};

/// MAVLink message `ID` (24 bits for `MAVLink 2`, 8 bits for `MAVLink 1`).
pub type MessageId = u32;
/// MAVLink system `ID`.
pub type SystemId = u8;
/// MAVLink component `ID`.
pub type ComponentId = u8;
/// Packet sequence number.
pub type Sequence = u8;
/// Signature link `ID`.
pub type LinkId = u8;
/// CRC-extra byte of a message.
pub type CrcExtra = u8;
/// Frame checksum.
pub type Checksum = u16;

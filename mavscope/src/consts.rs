//! # Common constants
//!
//! Wire-format constants of the MAVLink protocol and defaults for stream health analysis.

use std::time::Duration;

/// `MAVLink 1` start-of-frame marker.
pub const STX_V1: u8 = 0xFE;
/// `MAVLink 2` start-of-frame marker.
pub const STX_V2: u8 = 0xFD;

/// `MAVLink 1` header size including the start-of-frame marker.
pub const HEADER_V1_SIZE: usize = 6;
/// `MAVLink 2` header size including the start-of-frame marker.
pub const HEADER_V2_SIZE: usize = 10;

/// Size of the frame checksum.
pub const CHECKSUM_SIZE: usize = 2;
/// Size of the `MAVLink 2` signature block.
pub const SIGNATURE_SIZE: usize = 13;
/// Size of the truncated SHA-256 digest within a signature block.
pub const SIGNATURE_DIGEST_SIZE: usize = 6;
/// Size of a `MAVLink 2` signing key.
pub const SIGNING_KEY_SIZE: usize = 32;

/// Maximum payload length of a single frame.
pub const PAYLOAD_MAX_SIZE: usize = 255;

/// `MAVLink 2` incompatibility flag marking signed frames.
pub const IFLAG_SIGNED: u8 = 0x01;

/// Largest message `ID` representable in a `MAVLink 1` header.
pub const MESSAGE_ID_V1_MAX: u32 = 0xFF;
/// Largest message `ID` representable in a `MAVLink 2` header.
pub const MESSAGE_ID_V2_MAX: u32 = 0xFF_FFFF;

/// Number of slots in the per-system sequence ring (one per sequence value).
pub const SEQUENCE_RING_SIZE: usize = 256;

/// Default maximum backward distance still treated as benign reordering.
pub const DEFAULT_REORDER_DISTANCE_WINDOW: u8 = 20;
/// Default time since the head within which a backward jump is treated as reordering.
pub const DEFAULT_REORDER_TIME_WINDOW: Duration = Duration::from_millis(500);
/// Default time window within which a repeated sequence is considered a duplicate.
pub const DEFAULT_DUPLICATE_TIME_WINDOW: Duration = Duration::from_secs(1);
/// Default backward distance from which a suspicious jump is raised as an alert.
pub const DEFAULT_SUSPICIOUS_BACKWARD_DISTANCE: u8 = 64;
/// Default window during which a primary stream is considered active.
pub const DEFAULT_MULTI_SOURCE_ACTIVE_WINDOW: Duration = Duration::from_secs(2);

/// Default idle time after which a whole system context is dropped.
pub const DEFAULT_SYSTEM_TTL: Duration = Duration::from_secs(10 * 60);
/// Default idle time after which a single stream is dropped from a system context.
pub const DEFAULT_SOURCE_TTL: Duration = Duration::from_secs(60);

/// Sequence range a head must lie in for a low sequence to look like a sender reboot.
pub(crate) const RESET_HEAD_RANGE: std::ops::RangeInclusive<u8> = 50..=200;
/// Highest sequence a rebooted sender is expected to report.
pub(crate) const RESET_MAX_NEW_SEQUENCE: u8 = 10;

//! CRC-16/MCRF4XX checksum as used by MAVLink (X.25 polynomial, no final XOR).

use crate::protocol::{Checksum, CrcExtra};

const INIT: u16 = 0xFFFF;

/// Incremental MAVLink checksum.
///
/// # Examples
///
/// ```rust
/// use mavscope::protocol::Crc;
///
/// let mut crc = Crc::new();
/// crc.update(b"123456789");
/// assert_eq!(crc.value(), 0x6F91);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Crc(u16);

impl Default for Crc {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc {
    /// Creates checksum in its initial state.
    #[inline]
    pub const fn new() -> Self {
        Self(INIT)
    }

    /// Folds a single byte into the checksum.
    #[inline]
    pub fn update_byte(&mut self, byte: u8) {
        let mut tmp = byte ^ (self.0 & 0xFF) as u8;
        tmp ^= tmp << 4;
        let tmp = tmp as u16;
        self.0 = (self.0 >> 8) ^ (tmp << 8) ^ (tmp << 3) ^ (tmp >> 4);
    }

    /// Folds bytes into the checksum.
    pub fn update(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.update_byte(*byte);
        }
    }

    /// Current checksum value.
    #[inline]
    pub fn value(&self) -> Checksum {
        self.0
    }

    /// Checksum of a frame: all bytes after the start marker up to the payload end, followed
    /// by the message CRC-extra.
    pub fn frame(bytes: &[u8], crc_extra: CrcExtra) -> Checksum {
        let mut crc = Crc::new();
        crc.update(bytes);
        crc.update_byte(crc_extra);
        crc.value()
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        let mut crc = Crc::new();
        crc.update(b"123456789");
        assert_eq!(crc.value(), 0x6F91);
    }

    #[test]
    fn incremental_equals_one_shot() {
        let mut split = Crc::new();
        split.update(b"1234");
        split.update(b"56789");

        let mut whole = Crc::default();
        whole.update(b"123456789");

        assert_eq!(split, whole);
    }

    #[test]
    fn every_flipped_byte_changes_frame_crc() {
        let bytes: Vec<u8> = (0u8..32).collect();
        let reference = Crc::frame(&bytes, 50);

        for i in 0..bytes.len() {
            let mut corrupted = bytes.clone();
            corrupted[i] ^= 0x01;
            assert_ne!(Crc::frame(&corrupted, 50), reference, "byte #{i}");
        }
        assert_ne!(Crc::frame(&bytes, 51), reference);
    }
}

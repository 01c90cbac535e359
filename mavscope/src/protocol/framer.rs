//! Frame scanning and validation over accumulating byte buffers.
//!
//! The scanner looks for `MAVLink 1` (`0xFE`) and `MAVLink 2` (`0xFD`) start markers. When a
//! candidate is incomplete, scanning stops and bytes from the candidate start are preserved for
//! the next call. Candidates that are structurally impossible (unknown message, payload shorter
//! than the message requires) are treated as noise: the scanner advances one byte and continues,
//! which guarantees resynchronization after corruption.

use std::sync::Arc;

use crate::consts::{
    CHECKSUM_SIZE, HEADER_V1_SIZE, HEADER_V2_SIZE, IFLAG_SIGNED, SIGNATURE_SIZE, STX_V1, STX_V2,
};
use crate::dialect::MessageRegistry;
use crate::protocol::signing::signature_digest;
use crate::protocol::{
    Crc, Frame, MavLinkVersion, MessageId, NoSigningKeys, Signature, SigningKeyProvider,
    ValidationOutcome,
};

/// Stateless frame decoder over a caller-owned buffer.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use mavscope::dialect::MessageRegistry;
/// use mavscope::protocol::Framer;
/// # use mavscope::dialect::DialectDefinition;
/// # let dialect = DialectDefinition::new("demo");
///
/// let registry = Arc::new(MessageRegistry::compile(&dialect).unwrap());
/// let framer = Framer::new(registry);
///
/// let mut buffer = vec![0x00, 0x01, 0xFD];
/// assert!(framer.try_decode(&mut buffer).is_none());
/// // Noise is discarded, the partial candidate is kept
/// assert_eq!(buffer, [0xFD]);
/// ```
#[derive(Clone)]
pub struct Framer {
    registry: Arc<MessageRegistry>,
    keys: Arc<dyn SigningKeyProvider>,
}

impl std::fmt::Debug for Framer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framer")
            .field("dialect", &self.registry.dialect_name())
            .field("validates_signatures", &self.keys.can_validate())
            .finish()
    }
}

impl Framer {
    /// Creates framer that doesn't validate signatures.
    pub fn new(registry: Arc<MessageRegistry>) -> Self {
        Self {
            registry,
            keys: Arc::new(NoSigningKeys),
        }
    }

    /// Sets signing key provider used to validate signed `MAVLink 2` frames.
    pub fn with_signing_keys(mut self, keys: Arc<dyn SigningKeyProvider>) -> Self {
        self.keys = keys;
        self
    }

    /// Message registry used for validation.
    pub fn registry(&self) -> &Arc<MessageRegistry> {
        &self.registry
    }

    /// Signing key provider.
    pub fn signing_keys(&self) -> &Arc<dyn SigningKeyProvider> {
        &self.keys
    }

    /// Attempts to decode at most one frame from the start of `buffer`.
    ///
    /// Consumed bytes (leading noise and the returned frame) are removed from `buffer`. When no
    /// complete frame is available, noise is removed and a partial candidate is kept.
    ///
    /// Frames with wrong checksums or signatures are returned as well. Check
    /// [`Frame::outcome`] before trusting them.
    pub fn try_decode(&self, buffer: &mut Vec<u8>) -> Option<Frame> {
        let mut scan = 0;

        let (consumed, frame) = loop {
            let Some(&stx) = buffer.get(scan) else {
                break (buffer.len(), None);
            };
            let version = match stx {
                STX_V1 => MavLinkVersion::V1,
                STX_V2 => MavLinkVersion::V2,
                _ => {
                    scan += 1;
                    continue;
                }
            };

            let Some(total) = candidate_len(version, &buffer[scan..]) else {
                break (scan, None);
            };
            if scan + total > buffer.len() {
                break (scan, None);
            }

            match self.decode_candidate(version, &buffer[scan..scan + total]) {
                Some(frame) => {
                    if scan > 0 {
                        log::trace!("[framer] skipped {scan} bytes of noise");
                    }
                    break (scan + total, Some(frame));
                }
                None => scan += 1,
            }
        };

        if frame.is_none() && consumed > 0 {
            log::trace!("[framer] discarded {consumed} bytes of noise");
        }
        buffer.drain(..consumed);
        frame
    }

    fn decode_candidate(&self, version: MavLinkVersion, bytes: &[u8]) -> Option<Frame> {
        let header = Header::parse(version, bytes);
        let payload_len = bytes[1] as usize;
        let header_size = header_size(version);

        let Some(min_payload_len) = self.registry.min_payload_size(version, header.message_id)
        else {
            log::trace!(
                "[framer] rejected {version:?} candidate: unknown message #{}",
                header.message_id
            );
            return None;
        };
        if payload_len < min_payload_len {
            log::trace!(
                "[framer] rejected {version:?} candidate #{}: payload {payload_len} < {min_payload_len}",
                header.message_id
            );
            return None;
        }
        let crc_extra = self.registry.crc_extra(header.message_id)?;

        let crc_start = header_size + payload_len;
        let crc_end = crc_start + CHECKSUM_SIZE;
        let checksum = u16::from_le_bytes([bytes[crc_start], bytes[crc_start + 1]]);
        let expected = Crc::frame(&bytes[1..crc_start], crc_extra);

        let signed = version == MavLinkVersion::V2 && header.incompat_flags & IFLAG_SIGNED != 0;
        let signature = if signed {
            let mut block = [0u8; SIGNATURE_SIZE];
            block.copy_from_slice(&bytes[crc_end..crc_end + SIGNATURE_SIZE]);
            Some(Signature::from_bytes(&block))
        } else {
            None
        };

        let outcome = if checksum != expected {
            log::debug!(
                "[framer] CRC mismatch for {version:?} #{} from {}:{}: {checksum:#06x} != {expected:#06x}",
                header.message_id,
                header.system_id,
                header.component_id,
            );
            ValidationOutcome::CrcFailed
        } else {
            match (version, &signature) {
                (MavLinkVersion::V1, _) => ValidationOutcome::Ok,
                (MavLinkVersion::V2, None) => ValidationOutcome::Unsigned,
                (MavLinkVersion::V2, Some(signature)) => {
                    self.validate_signature(&header, signature, &bytes[..crc_end])
                }
            }
        };

        Some(Frame {
            version,
            sequence: header.sequence,
            system_id: header.system_id,
            component_id: header.component_id,
            message_id: header.message_id,
            payload: bytes[header_size..crc_start].to_vec(),
            checksum,
            signed,
            incompat_flags: header.incompat_flags,
            compat_flags: header.compat_flags,
            signature,
            outcome,
        })
    }

    fn validate_signature(
        &self,
        header: &Header,
        signature: &Signature,
        signed_bytes: &[u8],
    ) -> ValidationOutcome {
        if !self.keys.can_validate() {
            return ValidationOutcome::Unsigned;
        }

        let Some(key) =
            self.keys
                .signing_key(header.system_id, header.component_id, signature.link_id)
        else {
            log::debug!(
                "[framer] no signing key for {}:{} link #{}",
                header.system_id,
                header.component_id,
                signature.link_id
            );
            return ValidationOutcome::SignatureFailed;
        };

        if signature_digest(signed_bytes, &key) == signature.digest {
            ValidationOutcome::Ok
        } else {
            log::debug!(
                "[framer] invalid signature for #{} from {}:{} link #{}",
                header.message_id,
                header.system_id,
                header.component_id,
                signature.link_id
            );
            ValidationOutcome::SignatureFailed
        }
    }
}

/// Frame reader that owns its accumulation buffer.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use mavscope::dialect::MessageRegistry;
/// use mavscope::protocol::{FrameReader, Framer};
/// # use mavscope::dialect::DialectDefinition;
/// # let dialect = DialectDefinition::new("demo");
///
/// let registry = Arc::new(MessageRegistry::compile(&dialect).unwrap());
/// let mut reader = FrameReader::new(Framer::new(registry));
///
/// let frames = reader.push(&[0x55, 0xAA]);
/// assert!(frames.is_empty());
/// assert_eq!(reader.buffered(), 0);
/// ```
#[derive(Debug)]
pub struct FrameReader {
    framer: Framer,
    buffer: Vec<u8>,
}

impl FrameReader {
    /// Creates reader with an empty buffer.
    pub fn new(framer: Framer) -> Self {
        Self {
            framer,
            buffer: Vec::new(),
        }
    }

    /// Appends bytes and extracts all complete frames.
    pub fn push(&mut self, data: &[u8]) -> Vec<Frame> {
        self.extend(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Appends bytes without decoding.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Decodes the next frame from buffered bytes, if any.
    pub fn next_frame(&mut self) -> Option<Frame> {
        self.framer.try_decode(&mut self.buffer)
    }

    /// Number of bytes waiting for more data.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drops buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Underlying framer.
    pub fn framer(&self) -> &Framer {
        &self.framer
    }
}

struct Header {
    incompat_flags: u8,
    compat_flags: u8,
    sequence: u8,
    system_id: u8,
    component_id: u8,
    message_id: MessageId,
}

impl Header {
    /// `bytes` must hold at least a complete header of the specified version.
    fn parse(version: MavLinkVersion, bytes: &[u8]) -> Self {
        match version {
            MavLinkVersion::V1 => Self {
                incompat_flags: 0,
                compat_flags: 0,
                sequence: bytes[2],
                system_id: bytes[3],
                component_id: bytes[4],
                message_id: bytes[5] as MessageId,
            },
            MavLinkVersion::V2 => Self {
                incompat_flags: bytes[2],
                compat_flags: bytes[3],
                sequence: bytes[4],
                system_id: bytes[5],
                component_id: bytes[6],
                message_id: u32::from_le_bytes([bytes[7], bytes[8], bytes[9], 0]),
            },
        }
    }
}

#[inline]
fn header_size(version: MavLinkVersion) -> usize {
    match version {
        MavLinkVersion::V1 => HEADER_V1_SIZE,
        MavLinkVersion::V2 => HEADER_V2_SIZE,
    }
}

/// Total candidate length, or [`None`] if the header itself is incomplete.
fn candidate_len(version: MavLinkVersion, bytes: &[u8]) -> Option<usize> {
    let header_size = header_size(version);
    if bytes.len() < header_size {
        return None;
    }

    let payload_len = bytes[1] as usize;
    let signature_len = match version {
        MavLinkVersion::V2 if bytes[2] & IFLAG_SIGNED != 0 => SIGNATURE_SIZE,
        _ => 0,
    };
    Some(header_size + payload_len + CHECKSUM_SIZE + signature_len)
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FramePacker, StaticSigningKey};
    use crate::utils::test::sample_registry;

    fn heartbeat(version: MavLinkVersion, sequence: u8) -> Frame {
        Frame::builder()
            .version(version)
            .sequence(sequence)
            .system_id(1)
            .component_id(1)
            .message_id(0)
            .payload(&[1, 2, 3, 4, 5, 6, 7, 8, 3])
            .build()
            .unwrap()
    }

    fn pack(packer: &FramePacker, mut frame: Frame) -> Vec<u8> {
        let mut out = Vec::new();
        packer.pack(&mut out, &mut frame).unwrap();
        out
    }

    #[test]
    fn skips_garbage_before_frame() {
        let registry = sample_registry();
        let packer = FramePacker::new(registry.clone());
        let framer = Framer::new(registry);

        // Leading junk includes a complete v1 candidate for an unknown message
        let mut buffer = vec![0x00, 0x13, 0xFE, 0x00, 0x00, 0x01, 0x01, 0xC8, 0x00, 0x00, 0x42];
        buffer.extend(pack(&packer, heartbeat(MavLinkVersion::V2, 5)));

        let frame = framer.try_decode(&mut buffer).unwrap();
        assert_eq!(frame.sequence, 5);
        assert_eq!(frame.outcome, ValidationOutcome::Unsigned);
        assert!(buffer.is_empty());
    }

    #[test]
    fn keeps_partial_frame() {
        let registry = sample_registry();
        let packer = FramePacker::new(registry.clone());
        let framer = Framer::new(registry);

        let bytes = pack(&packer, heartbeat(MavLinkVersion::V1, 9));
        let (head, tail) = bytes.split_at(7);

        let mut buffer = vec![0x11];
        buffer.extend_from_slice(head);
        assert!(framer.try_decode(&mut buffer).is_none());
        assert_eq!(buffer, head);

        buffer.extend_from_slice(tail);
        let frame = framer.try_decode(&mut buffer).unwrap();
        assert_eq!(frame.version, MavLinkVersion::V1);
        assert_eq!(frame.outcome, ValidationOutcome::Ok);
        assert!(buffer.is_empty());
    }

    #[test]
    fn returns_one_frame_per_call() {
        let registry = sample_registry();
        let packer = FramePacker::new(registry.clone());
        let framer = Framer::new(registry);

        let mut buffer = pack(&packer, heartbeat(MavLinkVersion::V2, 1));
        buffer.extend(pack(&packer, heartbeat(MavLinkVersion::V2, 2)));

        assert_eq!(framer.try_decode(&mut buffer).unwrap().sequence, 1);
        assert_eq!(framer.try_decode(&mut buffer).unwrap().sequence, 2);
        assert!(framer.try_decode(&mut buffer).is_none());
    }

    #[test]
    fn crc_failure_is_reported_not_skipped() {
        let registry = sample_registry();
        let packer = FramePacker::new(registry.clone());
        let framer = Framer::new(registry);

        let mut buffer = pack(&packer, heartbeat(MavLinkVersion::V2, 1));
        buffer[HEADER_V2_SIZE] ^= 0xFF;

        let frame = framer.try_decode(&mut buffer).unwrap();
        assert_eq!(frame.outcome, ValidationOutcome::CrcFailed);
        assert_eq!(frame.payload.len(), 9);
        assert!(buffer.is_empty());
    }

    #[test]
    fn unknown_message_is_noise() {
        let framer = Framer::new(sample_registry());
        // v1 header with an unknown message id and a zero-length payload
        let mut buffer = vec![0xFE, 0x00, 0x00, 0x01, 0x01, 0xC8, 0x00, 0x00];
        assert!(framer.try_decode(&mut buffer).is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn signed_frames() {
        let registry = sample_registry();
        let keys: Arc<dyn SigningKeyProvider> = Arc::new(StaticSigningKey::new("secret"));
        let packer = FramePacker::new(registry.clone()).with_signing_keys(keys.clone());

        let signed = Frame::builder()
            .version(MavLinkVersion::V2)
            .system_id(1)
            .component_id(1)
            .message_id(0)
            .payload(&[0; 9])
            .signature(7, 1_000)
            .build()
            .unwrap();
        let bytes = pack(&packer, signed);

        let validating = Framer::new(registry.clone()).with_signing_keys(keys);
        let frame = validating.try_decode(&mut bytes.clone()).unwrap();
        assert_eq!(frame.outcome, ValidationOutcome::Ok);
        assert_eq!(frame.signature.unwrap().link_id, 7);
        assert_eq!(frame.signature.unwrap().timestamp, 1_000);

        let not_validating = Framer::new(registry.clone());
        let frame = not_validating.try_decode(&mut bytes.clone()).unwrap();
        assert_eq!(frame.outcome, ValidationOutcome::Unsigned);

        let wrong_key = Framer::new(registry).with_signing_keys(Arc::new(StaticSigningKey::new("other")));
        let frame = wrong_key.try_decode(&mut bytes.clone()).unwrap();
        assert_eq!(frame.outcome, ValidationOutcome::SignatureFailed);
    }

    #[test]
    fn crc_is_checked_before_signature() {
        let registry = sample_registry();
        let keys: Arc<dyn SigningKeyProvider> = Arc::new(StaticSigningKey::new("secret"));
        let packer = FramePacker::new(registry.clone()).with_signing_keys(keys.clone());

        let signed = Frame::builder()
            .version(MavLinkVersion::V2)
            .system_id(1)
            .component_id(1)
            .message_id(0)
            .payload(&[1, 2, 3, 4, 5, 6, 7, 8, 3])
            .signature(7, 1_000)
            .build()
            .unwrap();
        let mut bytes = pack(&packer, signed);
        let crc_at = bytes.len() - SIGNATURE_SIZE - CHECKSUM_SIZE;
        bytes[crc_at] ^= 0xFF;

        let validating = Framer::new(registry.clone()).with_signing_keys(keys);
        let frame = validating.try_decode(&mut bytes.clone()).unwrap();
        assert_eq!(frame.outcome, ValidationOutcome::CrcFailed);
        assert_eq!(frame.payload, [1, 2, 3, 4, 5, 6, 7, 8, 3]);
        assert!(frame.signed);

        let wrong_key =
            Framer::new(registry).with_signing_keys(Arc::new(StaticSigningKey::new("other")));
        let frame = wrong_key.try_decode(&mut bytes.clone()).unwrap();
        assert_eq!(frame.outcome, ValidationOutcome::CrcFailed);
    }

    #[test]
    fn reader_accumulates_chunks() {
        let registry = sample_registry();
        let packer = FramePacker::new(registry.clone());
        let mut reader = FrameReader::new(Framer::new(registry));

        let mut stream = pack(&packer, heartbeat(MavLinkVersion::V2, 1));
        stream.extend(pack(&packer, heartbeat(MavLinkVersion::V1, 2)));

        let mut frames = Vec::new();
        for chunk in stream.chunks(5) {
            frames.extend(reader.push(chunk));
        }

        let sequences: Vec<u8> = frames.iter().map(|f| f.sequence).collect();
        assert_eq!(sequences, [1, 2]);
        assert_eq!(reader.buffered(), 0);
    }
}

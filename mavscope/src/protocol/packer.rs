//! Frame serialization.

use std::sync::Arc;

use crate::consts::{
    IFLAG_SIGNED, MESSAGE_ID_V1_MAX, MESSAGE_ID_V2_MAX, PAYLOAD_MAX_SIZE, STX_V1, STX_V2,
};
use crate::dialect::MessageRegistry;
use crate::errors::FrameError;
use crate::protocol::signing::{signature_digest, SecretKey};
use crate::protocol::{
    Crc, Frame, MavLinkVersion, NoSigningKeys, Signature, SigningKeyProvider, ValidationOutcome,
};

/// Serializes frames into bytes.
///
/// Checksums are always recomputed. Signed `MAVLink 2` frames get a fresh digest computed with
/// the key the provider returns for the frame's system, component and signature link.
#[derive(Clone)]
pub struct FramePacker {
    registry: Arc<MessageRegistry>,
    keys: Arc<dyn SigningKeyProvider>,
}

impl std::fmt::Debug for FramePacker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePacker")
            .field("dialect", &self.registry.dialect_name())
            .finish_non_exhaustive()
    }
}

impl FramePacker {
    /// Creates packer without signing keys. Such packer can't produce signed frames.
    pub fn new(registry: Arc<MessageRegistry>) -> Self {
        Self {
            registry,
            keys: Arc::new(NoSigningKeys),
        }
    }

    /// Sets signing key provider.
    pub fn with_signing_keys(mut self, keys: Arc<dyn SigningKeyProvider>) -> Self {
        self.keys = keys;
        self
    }

    /// Appends serialized `frame` to `out` and returns the number of bytes written.
    ///
    /// On success, the frame's checksum, flags, signature digest, and outcome are updated to
    /// match the written bytes. On failure, nothing is written.
    pub fn pack(&self, out: &mut Vec<u8>, frame: &mut Frame) -> Result<usize, FrameError> {
        let payload_len = frame.payload.len();
        if payload_len > PAYLOAD_MAX_SIZE {
            return Err(FrameError::PayloadTooLarge(payload_len));
        }

        let id_max = match frame.version {
            MavLinkVersion::V1 => MESSAGE_ID_V1_MAX,
            MavLinkVersion::V2 => MESSAGE_ID_V2_MAX,
        };
        if frame.message_id > id_max {
            return Err(FrameError::MessageIdOutOfRange {
                id: frame.message_id,
                version: frame.version,
            });
        }

        let crc_extra = self
            .registry
            .crc_extra(frame.message_id)
            .ok_or(FrameError::UnknownMessage(frame.message_id))?;

        let signing = match (frame.version, frame.signed) {
            (MavLinkVersion::V1, true) => return Err(FrameError::SignedV1),
            (MavLinkVersion::V2, true) => Some(self.signing_params(frame)?),
            (_, false) => None,
        };

        let start = out.len();
        match frame.version {
            MavLinkVersion::V1 => {
                out.extend_from_slice(&[
                    STX_V1,
                    payload_len as u8,
                    frame.sequence,
                    frame.system_id,
                    frame.component_id,
                    frame.message_id as u8,
                ]);
            }
            MavLinkVersion::V2 => {
                let incompat_flags = if signing.is_some() {
                    frame.incompat_flags | IFLAG_SIGNED
                } else {
                    frame.incompat_flags & !IFLAG_SIGNED
                };
                let id = frame.message_id.to_le_bytes();
                out.extend_from_slice(&[
                    STX_V2,
                    payload_len as u8,
                    incompat_flags,
                    frame.compat_flags,
                    frame.sequence,
                    frame.system_id,
                    frame.component_id,
                    id[0],
                    id[1],
                    id[2],
                ]);
                frame.incompat_flags = incompat_flags;
            }
        }
        out.extend_from_slice(&frame.payload);

        let checksum = Crc::frame(&out[start + 1..], crc_extra);
        out.extend_from_slice(&checksum.to_le_bytes());
        frame.checksum = checksum;

        frame.outcome = match signing {
            Some((mut signature, key)) => {
                signature.digest = signature_digest(&out[start..], &key);
                out.extend_from_slice(&signature.to_bytes());
                frame.signature = Some(signature);
                ValidationOutcome::Ok
            }
            None if frame.version == MavLinkVersion::V2 => ValidationOutcome::Unsigned,
            None => ValidationOutcome::Ok,
        };

        log::trace!("[packer] packed {frame}");
        Ok(out.len() - start)
    }

    fn signing_params(&self, frame: &Frame) -> Result<(Signature, SecretKey), FrameError> {
        let signature = frame.signature.ok_or(FrameError::MissingSignature)?;
        let key = self
            .keys
            .signing_key(frame.system_id, frame.component_id, signature.link_id)
            .ok_or(FrameError::SigningKeyUnavailable {
                system_id: frame.system_id,
                component_id: frame.component_id,
                link_id: signature.link_id,
            })?;
        Ok((signature, key))
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////

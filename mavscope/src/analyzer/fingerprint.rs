use crate::protocol::Frame;

const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 16_777_619;

/// Order-sensitive 32-bit FNV-1a hash over frame identity and payload.
///
/// Covers protocol version, system and component `ID`s, message `ID`, payload length and
/// payload bytes. Sequence number, checksum and signature are not included.
pub(crate) fn fingerprint(frame: &Frame) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    let mut feed = |value: u32| {
        hash = (hash ^ value).wrapping_mul(FNV_PRIME);
    };

    feed(frame.version.ordinal() as u32);
    feed(frame.system_id as u32);
    feed(frame.component_id as u32);
    feed(frame.message_id);
    feed(frame.payload.len() as u32);
    for byte in &frame.payload {
        feed(*byte as u32);
    }

    hash
}

use std::mem;
use std::time::Duration;

use crate::consts::SEQUENCE_RING_SIZE;
use crate::protocol::Sequence;

/// Last packet observed for a sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RingEntry {
    pub(crate) sequence: Sequence,
    pub(crate) fingerprint: u32,
    pub(crate) stream_id: String,
    pub(crate) last_seen: Duration,
}

/// Fixed ring with one slot per sequence number.
#[derive(Clone, Debug)]
pub(crate) struct SequenceRing {
    slots: Vec<Option<RingEntry>>,
}

impl Default for SequenceRing {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceRing {
    /// Creates a ring with all slots empty.
    pub(crate) fn new() -> Self {
        Self {
            slots: vec![None; SEQUENCE_RING_SIZE],
        }
    }

    /// Entry for a sequence number.
    #[inline]
    pub(crate) fn get(&self, sequence: Sequence) -> Option<&RingEntry> {
        self.slots[sequence as usize].as_ref()
    }

    /// Stores entry in the slot of its sequence number.
    ///
    /// Returns the entry that previously occupied the slot.
    pub(crate) fn put(&mut self, entry: RingEntry) -> Option<RingEntry> {
        mem::replace(&mut self.slots[entry.sequence as usize], Some(entry))
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sequence: Sequence, fingerprint: u32) -> RingEntry {
        RingEntry {
            sequence,
            fingerprint,
            stream_id: "udp".to_string(),
            last_seen: Duration::from_millis(sequence as u64),
        }
    }

    #[test]
    fn ring_basics() {
        let mut ring = SequenceRing::new();
        assert!(ring.get(0).is_none());

        assert!(ring.put(entry(0, 1)).is_none());
        assert!(ring.put(entry(255, 2)).is_none());

        let replaced = ring.put(entry(255, 3)).unwrap();
        assert_eq!(replaced.fingerprint, 2);
        assert_eq!(ring.get(255).unwrap().fingerprint, 3);
        assert_eq!(ring.get(0).unwrap().fingerprint, 1);
        assert!(ring.get(7).is_none());
    }
}

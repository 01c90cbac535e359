//! MAVLink [message signing](https://mavlink.io/en/guide/message_signing.html) primitives.
//!
//! Signing keys are looked up through an injectable [`SigningKeyProvider`]:
//!
//! * [`NoSigningKeys`] for unsigned-only traffic. Signed frames are accepted as
//!   [`Unsigned`](crate::protocol::ValidationOutcome::Unsigned).
//! * [`StaticSigningKey`] uses one key for every system, component and link.
//! * [`SigningKeyMap`] holds keys per (system, component, link).

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::RwLock;

use sha2::{Digest, Sha256};

use crate::consts::{SIGNATURE_DIGEST_SIZE, SIGNING_KEY_SIZE};
use crate::protocol::{ComponentId, LinkId, SystemId};

/// 32-byte `MAVLink 2` signing key.
///
/// Keys created from text are truncated or zero-padded to 32 bytes. The key content is never
/// printed by [`Debug`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SecretKey([u8; SIGNING_KEY_SIZE]);

impl SecretKey {
    /// Key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; SIGNING_KEY_SIZE] {
        &self.0
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(**redacted**)")
    }
}

impl From<[u8; SIGNING_KEY_SIZE]> for SecretKey {
    fn from(value: [u8; SIGNING_KEY_SIZE]) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for SecretKey {
    fn from(value: &[u8]) -> Self {
        let mut key = [0u8; SIGNING_KEY_SIZE];
        let n = value.len().min(SIGNING_KEY_SIZE);
        key[..n].copy_from_slice(&value[..n]);
        Self(key)
    }
}

impl From<&str> for SecretKey {
    fn from(value: &str) -> Self {
        Self::from(value.as_bytes())
    }
}

/// Source of signing keys for frame validation and packing.
pub trait SigningKeyProvider: Send + Sync {
    /// Whether this provider validates signatures at all.
    ///
    /// When `false`, signed frames with a correct checksum are reported as
    /// [`Unsigned`](crate::protocol::ValidationOutcome::Unsigned).
    fn can_validate(&self) -> bool {
        true
    }

    /// Key for a system, component and link.
    fn signing_key(
        &self,
        system_id: SystemId,
        component_id: ComponentId,
        link_id: LinkId,
    ) -> Option<SecretKey>;
}

/// Key provider that knows no keys and doesn't validate signatures.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSigningKeys;

impl SigningKeyProvider for NoSigningKeys {
    fn can_validate(&self) -> bool {
        false
    }

    fn signing_key(&self, _: SystemId, _: ComponentId, _: LinkId) -> Option<SecretKey> {
        None
    }
}

/// Key provider with a single key shared by all links.
#[derive(Clone, Debug)]
pub struct StaticSigningKey(SecretKey);

impl StaticSigningKey {
    /// Creates provider for a key.
    pub fn new(key: impl Into<SecretKey>) -> Self {
        Self(key.into())
    }
}

impl SigningKeyProvider for StaticSigningKey {
    fn signing_key(&self, _: SystemId, _: ComponentId, _: LinkId) -> Option<SecretKey> {
        Some(self.0)
    }
}

/// Key provider holding keys per (system, component, link).
///
/// Keys can be registered and removed while the provider is shared with framers.
///
/// # Examples
///
/// ```rust
/// use mavscope::protocol::{SigningKeyMap, SigningKeyProvider};
///
/// let keys = SigningKeyMap::new();
/// keys.register(1, 1, 0, "vehicle one");
///
/// assert!(keys.signing_key(1, 1, 0).is_some());
/// assert!(keys.signing_key(1, 1, 1).is_none());
/// ```
#[derive(Default)]
pub struct SigningKeyMap {
    keys: RwLock<HashMap<(SystemId, ComponentId, LinkId), SecretKey>>,
}

impl SigningKeyMap {
    /// Creates an empty key map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers key, replacing the previous one if present.
    pub fn register(
        &self,
        system_id: SystemId,
        component_id: ComponentId,
        link_id: LinkId,
        key: impl Into<SecretKey>,
    ) {
        match self.keys.write() {
            Ok(mut keys) => {
                keys.insert((system_id, component_id, link_id), key.into());
            }
            Err(err) => log::error!("[signing] can't register key, map is poisoned: {err}"),
        }
    }

    /// Removes key. Returns `true` if a key was registered.
    pub fn unregister(
        &self,
        system_id: SystemId,
        component_id: ComponentId,
        link_id: LinkId,
    ) -> bool {
        match self.keys.write() {
            Ok(mut keys) => keys.remove(&(system_id, component_id, link_id)).is_some(),
            Err(err) => {
                log::error!("[signing] can't unregister key, map is poisoned: {err}");
                false
            }
        }
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.keys.read().map(|keys| keys.len()).unwrap_or(0)
    }

    /// Whether no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Debug for SigningKeyMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKeyMap")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl SigningKeyProvider for SigningKeyMap {
    fn signing_key(
        &self,
        system_id: SystemId,
        component_id: ComponentId,
        link_id: LinkId,
    ) -> Option<SecretKey> {
        self.keys
            .read()
            .ok()
            .and_then(|keys| keys.get(&(system_id, component_id, link_id)).copied())
    }
}

/// Computes truncated signature digest.
///
/// `signed_bytes` covers the frame from the start marker through the checksum. The digest is the
/// first 6 bytes of `SHA-256(signed_bytes || key)`.
pub fn signature_digest(signed_bytes: &[u8], key: &SecretKey) -> [u8; SIGNATURE_DIGEST_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(signed_bytes);
    hasher.update(key.as_bytes());
    let hash = hasher.finalize();

    let mut digest = [0u8; SIGNATURE_DIGEST_SIZE];
    digest.copy_from_slice(&hash[..SIGNATURE_DIGEST_SIZE]);
    digest
}

///////////////////////////////////////////////////////////////////////////////
//                                  Tests                                    //
///////////////////////////////////////////////////////////////////////////////

use zeroize::Zeroize;

use crate::error::StoreError;

/// Lifecycle state of a key in the Key Ring. SDLS keys move forward through
/// three live states and then die; they don't rotate in place on a timer,
/// so the names here (`PreActive`/`Deactivated`/`Corrupted`) describe that
/// shape rather than a generic rotate/expire/revoke cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    PreActive,
    Active,
    Deactivated,
    Destroyed,
    Corrupted,
}

impl KeyState {
    /// Only `Active` keys may be used to encrypt or authenticate.
    pub fn can_encrypt(&self) -> bool {
        matches!(self, KeyState::Active)
    }

    /// `Active` keys verify; `Deactivated` keys may still verify traffic
    /// sent while they were active.
    pub fn can_decrypt(&self) -> bool {
        matches!(self, KeyState::Active | KeyState::Deactivated)
    }

    pub fn can_transition_to(&self, target: KeyState) -> bool {
        use KeyState::*;
        matches!(
            (self, target),
            (PreActive, Active)
                | (Active, Deactivated)
                | (Active, Corrupted)
                | (Deactivated, Destroyed)
                | (Deactivated, Corrupted)
                | (PreActive, Corrupted)
                | (Corrupted, Destroyed)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            KeyState::PreActive => "pre-active",
            KeyState::Active => "active",
            KeyState::Deactivated => "deactivated",
            KeyState::Destroyed => "destroyed",
            KeyState::Corrupted => "corrupted",
        }
    }
}

/// A 256-bit key slot in the Key Ring.
#[derive(Debug, Clone)]
pub struct Key {
    pub id: u16,
    pub value: [u8; 32],
    pub state: KeyState,
}

impl Key {
    pub fn new(id: u16, value: [u8; 32], state: KeyState) -> Self {
        Key { id, value, state }
    }

    pub fn transition(&mut self, target: KeyState) -> Result<(), StoreError> {
        if self.state.can_transition_to(target) {
            self.state = target;
            Ok(())
        } else {
            Err(StoreError::InvalidTransition {
                from: self.state.label(),
                to: target.label(),
            })
        }
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

/// Fixed-capacity key ring, indexed by key id, with room for at least 256
/// slots. Values never leave the ring except by reference, passed straight
/// into the Crypto Provider for the duration of one AEAD call.
pub const KEY_RING_CAPACITY: usize = 256;

pub struct KeyRing {
    slots: Box<[Option<Key>; KEY_RING_CAPACITY]>,
}

impl Default for KeyRing {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyRing {
    pub fn new() -> Self {
        KeyRing {
            slots: Box::new(std::array::from_fn(|_| None)),
        }
    }

    fn slot(id: u16) -> usize {
        id as usize % KEY_RING_CAPACITY
    }

    pub fn insert(&mut self, key: Key) {
        let slot = Self::slot(key.id);
        self.slots[slot] = Some(key);
    }

    pub fn get(&self, id: u16) -> Result<&Key, StoreError> {
        self.slots[Self::slot(id)]
            .as_ref()
            .filter(|k| k.id == id)
            .ok_or(StoreError::KeyNotFound { id })
    }

    pub fn get_mut(&mut self, id: u16) -> Result<&mut Key, StoreError> {
        let slot = Self::slot(id);
        self.slots[slot]
            .as_mut()
            .filter(|k| k.id == id)
            .ok_or(StoreError::KeyNotFound { id })
    }

    /// Requires the key to resolve and be `Active`; used before encrypt or
    /// authenticate calls.
    pub fn require_encrypt_key(&self, id: u16) -> Result<&Key, StoreError> {
        let key = self.get(id)?;
        if key.state.can_encrypt() {
            Ok(key)
        } else {
            Err(StoreError::KeyStateInvalid {
                id,
                state: key.state.label(),
            })
        }
    }

    /// Requires the key to resolve and be usable to verify (`Active` or
    /// `Deactivated`); used before decrypt/verify calls.
    pub fn require_decrypt_key(&self, id: u16) -> Result<&Key, StoreError> {
        let key = self.get(id)?;
        if key.state.can_decrypt() {
            Ok(key)
        } else {
            Err(StoreError::KeyStateInvalid {
                id,
                state: key.state.label(),
            })
        }
    }

    /// Test-scaffolding constructor mirroring the source's hardwired
    /// `ek_ring[0..=136]` demo provisioning. Index 136 is the slot the
    /// source's code meant to deactivate (see DESIGN.md): the source
    /// re-writes index 135's state a second time by mistake right after
    /// filling index 136's value, leaving 136's state untouched in the
    /// literal C. This loader follows the intent, not the typo.
    pub fn with_demo_keys() -> Self {
        let mut ring = KeyRing::new();

        for id in 0..=2u16 {
            ring.insert(Key::new(id, [0x11 ^ (id as u8); 32], KeyState::Active));
        }

        for id in 128..=134u16 {
            let state = if id == 132 {
                KeyState::PreActive
            } else if id == 134 {
                KeyState::Deactivated
            } else {
                KeyState::Active
            };
            ring.insert(Key::new(id, [0x22 ^ (id as u8); 32], state));
        }

        ring.insert(Key::new(135, [0u8; 32], KeyState::Deactivated));

        let demo_gcm_key: [u8; 32] = [
            0xff, 0x9f, 0x92, 0x84, 0xcf, 0x59, 0x9e, 0xac, 0x3b, 0x11, 0x99, 0x05, 0xa7, 0xd1,
            0x88, 0x51, 0xe7, 0xe3, 0x74, 0xcf, 0x63, 0xae, 0xa0, 0x43, 0x58, 0x58, 0x6b, 0x0f,
            0x75, 0x76, 0x70, 0xf9,
        ];
        ring.insert(Key::new(136, demo_gcm_key, KeyState::Deactivated));

        ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_keys_mark_136_deactivated() {
        let ring = KeyRing::with_demo_keys();
        assert_eq!(ring.get(136).unwrap().state, KeyState::Deactivated);
        assert_eq!(ring.get(135).unwrap().state, KeyState::Deactivated);
    }

    #[test]
    fn preactive_key_cannot_encrypt() {
        let ring = KeyRing::with_demo_keys();
        assert!(ring.require_encrypt_key(132).is_err());
    }

    #[test]
    fn active_transitions_to_deactivated_only() {
        let mut key = Key::new(1, [0u8; 32], KeyState::Active);
        assert!(key.transition(KeyState::Deactivated).is_ok());
        assert!(key.transition(KeyState::Active).is_err());
    }
}

use std::collections::HashMap;
use std::sync::RwLock;

use sdls_crypto::Gvcid;

use crate::error::StoreError;
use crate::sa::{SaState, SecurityAssociation};

/// Backend-agnostic SA persistence. CryptoLib dispatches through a
/// function-pointer struct (`SadbRoutineStruct`); here a trait plays that
/// role instead, with the in-memory and SQL variants passing the same
/// behavioral contract.
pub trait SaStore: Send + Sync {
    fn get_by_spi(&self, spi: u16) -> Result<SecurityAssociation, StoreError>;

    fn get_operational(&self, gvcid: &Gvcid) -> Result<SecurityAssociation, StoreError>;

    /// Returns the first SA (any state) matching `gvcid`, used for the
    /// `ignore_sa_state` debug path in the TC Apply Pipeline.
    fn get_any_for_gvcid(&self, gvcid: &Gvcid) -> Result<SecurityAssociation, StoreError>;

    /// Persists mutations to an existing SA. Pipelines only ever change
    /// `iv`/`arc` here; the SDLS PDU handler may change any field. Atomic
    /// per SA.
    fn save(&self, sa: &SecurityAssociation) -> Result<(), StoreError>;

    fn create(&self, spi: u16, gvcid: Gvcid) -> Result<(), StoreError>;

    fn delete(&self, spi: u16) -> Result<(), StoreError>;

    fn set_state(&self, spi: u16, new_state: SaState) -> Result<(), StoreError>;

    fn set_arsn(&self, spi: u16, arc: Vec<u8>) -> Result<(), StoreError>;

    fn set_arsnw(&self, spi: u16, arcw: u16) -> Result<(), StoreError>;

    fn rekey(&self, spi: u16, ekid: u16, akid: u16) -> Result<(), StoreError>;

    fn expire(&self, spi: u16) -> Result<(), StoreError>;
}

/// `spi -> SA` map backed by an `RwLock`. The SPI space is 16-bit but real
/// deployments hold O(10)-O(100) SAs, so `get_operational`'s linear scan is
/// acceptable.
#[derive(Default)]
pub struct InMemoryStore {
    sas: RwLock<HashMap<u16, SecurityAssociation>>,
    capacity: usize,
}

const DEFAULT_CAPACITY: usize = 4096;

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            sas: RwLock::new(HashMap::new()),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        InMemoryStore {
            sas: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    fn matches(sa: &SecurityAssociation, gvcid: &Gvcid) -> bool {
        sa.gvcid_tc.tfvn == gvcid.tfvn
            && sa.gvcid_tc.scid == gvcid.scid
            && sa.gvcid_tc.vcid == gvcid.vcid
            && sa.gvcid_tc.mapid == gvcid.mapid
    }
}

impl SaStore for InMemoryStore {
    fn get_by_spi(&self, spi: u16) -> Result<SecurityAssociation, StoreError> {
        let guard = self.sas.read().expect("sa store lock poisoned");
        guard.get(&spi).cloned().ok_or(StoreError::SaNotFound { spi })
    }

    fn get_operational(&self, gvcid: &Gvcid) -> Result<SecurityAssociation, StoreError> {
        let guard = self.sas.read().expect("sa store lock poisoned");
        guard
            .values()
            .find(|sa| sa.sa_state == SaState::Operational && Self::matches(sa, gvcid))
            .cloned()
            .ok_or(StoreError::NoOperationalSa)
    }

    fn get_any_for_gvcid(&self, gvcid: &Gvcid) -> Result<SecurityAssociation, StoreError> {
        let guard = self.sas.read().expect("sa store lock poisoned");
        guard
            .values()
            .find(|sa| Self::matches(sa, gvcid))
            .cloned()
            .ok_or(StoreError::NoOperationalSa)
    }

    fn save(&self, sa: &SecurityAssociation) -> Result<(), StoreError> {
        let mut guard = self.sas.write().expect("sa store lock poisoned");
        if !guard.contains_key(&sa.spi) {
            return Err(StoreError::SaNotFound { spi: sa.spi });
        }
        guard.insert(sa.spi, sa.clone());
        Ok(())
    }

    fn create(&self, spi: u16, gvcid: Gvcid) -> Result<(), StoreError> {
        let mut guard = self.sas.write().expect("sa store lock poisoned");
        if guard.contains_key(&spi) {
            return Err(StoreError::Duplicate { spi });
        }
        if guard.len() >= self.capacity {
            return Err(StoreError::StoreUnavailable("sa store at capacity".into()));
        }
        guard.insert(spi, SecurityAssociation::new_unkeyed(spi, gvcid));
        Ok(())
    }

    fn delete(&self, spi: u16) -> Result<(), StoreError> {
        let mut guard = self.sas.write().expect("sa store lock poisoned");
        guard.remove(&spi).map(|_| ()).ok_or(StoreError::SaNotFound { spi })
    }

    fn set_state(&self, spi: u16, new_state: SaState) -> Result<(), StoreError> {
        let mut guard = self.sas.write().expect("sa store lock poisoned");

        let target_gvcid = guard.get(&spi).ok_or(StoreError::SaNotFound { spi })?.gvcid_tc;

        if new_state == SaState::Operational {
            let collision = guard
                .values()
                .any(|other| other.spi != spi && other.sa_state == SaState::Operational && other.gvcid_tc == target_gvcid);
            if collision {
                return Err(StoreError::InvalidTransition {
                    from: "keyed",
                    to: "operational",
                });
            }
        }

        let sa = guard.get_mut(&spi).ok_or(StoreError::SaNotFound { spi })?;
        if new_state == SaState::Operational {
            sa.check_invariants()?;
        }
        sa.transition(new_state)
    }

    fn set_arsn(&self, spi: u16, arc: Vec<u8>) -> Result<(), StoreError> {
        let mut guard = self.sas.write().expect("sa store lock poisoned");
        let sa = guard.get_mut(&spi).ok_or(StoreError::SaNotFound { spi })?;
        sa.arc = arc;
        Ok(())
    }

    fn set_arsnw(&self, spi: u16, arcw: u16) -> Result<(), StoreError> {
        let mut guard = self.sas.write().expect("sa store lock poisoned");
        let sa = guard.get_mut(&spi).ok_or(StoreError::SaNotFound { spi })?;
        sa.arcw = arcw;
        Ok(())
    }

    fn rekey(&self, spi: u16, ekid: u16, akid: u16) -> Result<(), StoreError> {
        let mut guard = self.sas.write().expect("sa store lock poisoned");
        let sa = guard.get_mut(&spi).ok_or(StoreError::SaNotFound { spi })?;
        sa.ekid = ekid;
        sa.akid = akid;
        sa.check_invariants()?;
        sa.transition(SaState::Keyed)
    }

    fn expire(&self, spi: u16) -> Result<(), StoreError> {
        let mut guard = self.sas.write().expect("sa store lock poisoned");
        let sa = guard.get_mut(&spi).ok_or(StoreError::SaNotFound { spi })?;
        sa.transition(SaState::Unkeyed)?;
        sa.ekid = 0;
        sa.akid = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gvcid() -> Gvcid {
        Gvcid::new(0, 0x3FF, 0, None)
    }

    #[test]
    fn create_then_get() {
        let store = InMemoryStore::new();
        store.create(1, gvcid()).unwrap();
        let sa = store.get_by_spi(1).unwrap();
        assert_eq!(sa.spi, 1);
        assert_eq!(sa.sa_state, SaState::Unkeyed);
    }

    #[test]
    fn duplicate_create_rejected() {
        let store = InMemoryStore::new();
        store.create(1, gvcid()).unwrap();
        assert_eq!(
            store.create(1, gvcid()),
            Err(StoreError::Duplicate { spi: 1 })
        );
    }

    #[test]
    fn only_one_operational_per_gvcid() {
        let store = InMemoryStore::new();
        store.create(1, gvcid()).unwrap();
        store.create(2, gvcid()).unwrap();
        store.rekey(1, 130, 130).unwrap();
        store.rekey(2, 130, 130).unwrap();
        store.set_state(1, SaState::Operational).unwrap();
        assert!(store.set_state(2, SaState::Operational).is_err());
    }

    #[test]
    fn get_operational_finds_match() {
        let store = InMemoryStore::new();
        store.create(1, gvcid()).unwrap();
        store.rekey(1, 130, 130).unwrap();
        store.set_state(1, SaState::Operational).unwrap();
        let sa = store.get_operational(&gvcid()).unwrap();
        assert_eq!(sa.spi, 1);
    }
}

use std::collections::BTreeMap;

use crate::error::StoreError;

/// Per-(TFVN, SCID, VCID) record.
#[derive(Debug, Clone, Copy)]
pub struct ManagedParameter {
    pub tfvn: u8,
    pub scid: u16,
    pub vcid: u8,
    pub has_fecf: bool,
    pub has_segment_hdrs: bool,
}

/// Flat, ordered managed-parameter table. CryptoLib builds this as an
/// intrusive singly-linked list grown by tail recursion; a `BTreeMap` keyed
/// by the triple gives a flat container with uniqueness enforced on insert
/// in one step — no duplicate triple can ever be inserted silently, unlike
/// an append-only recursive insert.
#[derive(Debug, Default)]
pub struct ManagedParameterTable {
    entries: BTreeMap<(u8, u16, u8), ManagedParameter>,
}

impl ManagedParameterTable {
    pub fn new() -> Self {
        ManagedParameterTable {
            entries: BTreeMap::new(),
        }
    }

    pub fn add(
        &mut self,
        tfvn: u8,
        scid: u16,
        vcid: u8,
        has_fecf: bool,
        has_segment_hdrs: bool,
    ) -> Result<(), StoreError> {
        let key = (tfvn, scid, vcid);
        if self.entries.contains_key(&key) {
            return Err(StoreError::ManagedParamDuplicate);
        }
        self.entries.insert(
            key,
            ManagedParameter {
                tfvn,
                scid,
                vcid,
                has_fecf,
                has_segment_hdrs,
            },
        );
        Ok(())
    }

    pub fn get(&self, tfvn: u8, scid: u16, vcid: u8) -> Result<&ManagedParameter, StoreError> {
        self.entries
            .get(&(tfvn, scid, vcid))
            .ok_or(StoreError::ManagedParamNotFound)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_triple() {
        let mut table = ManagedParameterTable::new();
        table.add(0, 0x3FF, 0, true, false).unwrap();
        assert_eq!(
            table.add(0, 0x3FF, 0, false, false),
            Err(StoreError::ManagedParamDuplicate)
        );
    }

    #[test]
    fn missing_lookup_errors() {
        let table = ManagedParameterTable::new();
        assert_eq!(
            table.get(0, 1, 1).unwrap_err(),
            StoreError::ManagedParamNotFound
        );
    }
}

//! Write-buffering storage overlay.
//!
//! Claim side effects run against a [`StorageCache`] layered over the
//! contract store. Reads see the buffered writes; nothing reaches the
//! underlying store until [`PendingWrites::commit`] is called, so a failed
//! apply leaves no partial state behind.

use std::collections::BTreeMap;
use std::ops::Bound;

use cosmwasm_std::{Order, Record, Storage};

pub struct StorageCache<'a> {
    base: &'a dyn Storage,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> StorageCache<'a> {
    pub fn new(base: &'a dyn Storage) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    /// Detach the buffered writes from the borrowed base store.
    pub fn prepare(self) -> PendingWrites {
        PendingWrites {
            writes: self.writes,
        }
    }
}

impl Storage for StorageCache<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(value) => value.clone(),
            None => self.base.get(key),
        }
    }

    fn range<'b>(
        &'b self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Box<dyn Iterator<Item = Record> + 'b> {
        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                return Box::new(std::iter::empty());
            }
        }

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.base.range(start, end, Order::Ascending).collect();

        let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (
            start.map_or(Bound::Unbounded, Bound::Included),
            end.map_or(Bound::Unbounded, Bound::Excluded),
        );
        for (key, value) in self.writes.range::<[u8], _>(bounds) {
            match value {
                Some(value) => merged.insert(key.clone(), value.clone()),
                None => merged.remove(key),
            };
        }

        let mut records: Vec<Record> = merged.into_iter().collect();
        if order == Order::Descending {
            records.reverse();
        }
        Box::new(records.into_iter())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
    }

    fn remove(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }
}

/// Writes buffered by a [`StorageCache`], ready to be applied.
#[derive(Debug, Default)]
pub struct PendingWrites {
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl PendingWrites {
    pub fn commit(self, storage: &mut dyn Storage) {
        for (key, value) in self.writes {
            match value {
                Some(value) => storage.set(&key, &value),
                None => storage.remove(&key),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

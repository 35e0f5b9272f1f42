use std::collections::BTreeMap;

use crate::error::TxBuildError;
use crate::primitives::Redeemer;

/// An ordered key → redeemer map for one positional redeemer domain
/// (spend inputs, mint policies, reward credentials).
///
/// Keys sort by their canonical byte order, so iteration order equals the
/// order of the matching body container. Indices are not stored state: a
/// [`RedeemerMap::reindex`] pass derives every redeemer's index from its
/// key's position in the target container, which keeps the positional
/// invariant in one place no matter how mutators interleave.
#[derive(Debug, Clone)]
pub struct RedeemerMap<K: Ord + Clone> {
    entries: BTreeMap<K, Redeemer>,
}

impl<K: Ord + Clone> Default for RedeemerMap<K> {
    fn default() -> Self {
        Self { entries: BTreeMap::new() }
    }
}

impl<K: Ord + Clone> RedeemerMap<K> {
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Inserts a redeemer under `key`. An occupied key is refused with
    /// [`TxBuildError::DuplicatedKey`]; the caller decides whether that is
    /// fatal (re-minting a policy keeps its original redeemer).
    pub fn insert(&mut self, key: K, redeemer: Redeemer) -> Result<(), TxBuildError> {
        if self.entries.contains_key(&key) {
            return Err(TxBuildError::DuplicatedKey);
        }
        self.entries.insert(key, redeemer);
        self.assign_insertion_indices();
        Ok(())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&Redeemer> {
        self.entries.get(key)
    }

    /// Updates one redeemer's index; a miss is a silent no-op.
    pub fn update_index(&mut self, key: &K, index: u32) {
        if let Some(redeemer) = self.entries.get_mut(key) {
            redeemer.index = index;
        }
    }

    /// Key/redeemer pairs in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Redeemer)> {
        self.entries.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Redeemer> {
        self.entries.values_mut()
    }

    /// Re-derives every index from the key's position in the target
    /// container. `position_of` maps a key to its container position;
    /// a key with no position means the container and the map went out of
    /// sync, surfaced as [`TxBuildError::ElementNotFound`].
    pub fn reindex<F>(&mut self, position_of: F) -> Result<(), TxBuildError>
    where
        F: Fn(&K) -> Option<usize>,
    {
        for (key, redeemer) in self.entries.iter_mut() {
            let position = position_of(key).ok_or(TxBuildError::ElementNotFound)?;
            redeemer.index = position as u32;
        }
        Ok(())
    }

    /// After an insert the map itself is the only known ordering; indices
    /// default to the key's position here until the balancer reindexes
    /// against the real container.
    fn assign_insertion_indices(&mut self) {
        for (position, redeemer) in self.entries.values_mut().enumerate() {
            redeemer.index = position as u32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{Hash, Input, PlutusData, RedeemerTag};

    fn spend_redeemer(n: i64) -> Redeemer {
        Redeemer::new(RedeemerTag::Spend, PlutusData::int(n))
    }

    fn input(byte: u8, index: u64) -> Input {
        Input::new(Hash::new([byte; 32]), index)
    }

    #[test]
    fn inserts_resort_and_renumber() {
        let mut map = RedeemerMap::new();
        map.insert(input(9, 0), spend_redeemer(1)).unwrap();
        map.insert(input(1, 0), spend_redeemer(2)).unwrap();
        map.insert(input(5, 0), spend_redeemer(3)).unwrap();

        let indices: Vec<(u8, u32)> =
            map.iter().map(|(k, r)| (k.tx_id.0[0], r.index)).collect();
        assert_eq!(indices, vec![(1, 0), (5, 1), (9, 2)]);
    }

    #[test]
    fn duplicate_key_is_refused() {
        let mut map = RedeemerMap::new();
        map.insert(input(1, 0), spend_redeemer(1)).unwrap();
        assert_eq!(
            map.insert(input(1, 0), spend_redeemer(2)),
            Err(TxBuildError::DuplicatedKey)
        );
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn update_index_on_missing_key_is_a_no_op() {
        let mut map = RedeemerMap::new();
        map.insert(input(1, 0), spend_redeemer(1)).unwrap();
        map.update_index(&input(2, 0), 7);
        assert_eq!(map.get(&input(1, 0)).unwrap().index, 0);
    }

    #[test]
    fn reindex_follows_container_positions() {
        let mut map = RedeemerMap::new();
        map.insert(input(1, 0), spend_redeemer(1)).unwrap();
        map.insert(input(2, 0), spend_redeemer(2)).unwrap();

        // the container interleaves other inputs, shifting positions
        let container = [input(0, 0), input(1, 0), input(1, 5), input(2, 0)];
        map.reindex(|key| container.iter().position(|i| i == key)).unwrap();

        assert_eq!(map.get(&input(1, 0)).unwrap().index, 1);
        assert_eq!(map.get(&input(2, 0)).unwrap().index, 3);
    }

    #[test]
    fn reindex_surfaces_desync() {
        let mut map = RedeemerMap::new();
        map.insert(input(1, 0), spend_redeemer(1)).unwrap();
        let err = map.reindex(|_| None).unwrap_err();
        assert_eq!(err, TxBuildError::ElementNotFound);
    }
}

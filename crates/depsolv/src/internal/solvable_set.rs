use bitvec::vec::BitVec;

use crate::internal::arena::ArenaId;
use crate::internal::id::SolvableId;

/// A dense set of solvables, backing the per-solver package maps
/// (multiversion, dup, cleandeps, ...).
#[derive(Clone, Default)]
pub(crate) struct SolvableSet {
    bits: BitVec,
}

impl SolvableSet {
    pub(crate) fn new(solvable_count: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, solvable_count),
        }
    }

    pub(crate) fn insert(&mut self, id: SolvableId) {
        let index = id.to_usize();
        if index >= self.bits.len() {
            self.bits.resize(index + 1, false);
        }
        self.bits.set(index, true);
    }

    pub(crate) fn remove(&mut self, id: SolvableId) {
        let index = id.to_usize();
        if index < self.bits.len() {
            self.bits.set(index, false);
        }
    }

    pub(crate) fn contains(&self, id: SolvableId) -> bool {
        self.bits.get(id.to_usize()).map(|b| *b).unwrap_or(false)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.bits.iter_ones().map(SolvableId::from_usize)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_insert_and_grow() {
        let mut set = SolvableSet::new(4);
        set.insert(SolvableId::from_usize(2));
        set.insert(SolvableId::from_usize(9));
        assert!(set.contains(SolvableId::from_usize(2)));
        assert!(set.contains(SolvableId::from_usize(9)));
        assert!(!set.contains(SolvableId::from_usize(3)));
        assert_eq!(set.iter().count(), 2);

        set.remove(SolvableId::from_usize(2));
        assert!(!set.contains(SolvableId::from_usize(2)));
    }
}

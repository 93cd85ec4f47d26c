use std::cmp::Ordering;

use crate::internal::id::SolvableId;
use crate::internal::mapping::Mapping;

/// An assignment and the level it was made at, packed into one value:
///
/// - `0`: undecided
/// - `> 0`: level of the decision installing the solvable
/// - `< 0`: level of the decision forbidding the solvable
#[repr(transparent)]
#[derive(Copy, Clone)]
struct DecisionAndLevel(i64);

impl DecisionAndLevel {
    fn undecided() -> Self {
        DecisionAndLevel(0)
    }

    fn set(&mut self, value: bool, level: u32) {
        self.0 = if value {
            level as i64
        } else {
            -(level as i64)
        };
    }

    fn value(self) -> Option<bool> {
        match self.0.cmp(&0) {
            Ordering::Less => Some(false),
            Ordering::Equal => None,
            Ordering::Greater => Some(true),
        }
    }

    fn level(self) -> u32 {
        self.0.unsigned_abs() as u32
    }
}

/// The assignment state of every solvable.
pub(crate) struct DecisionMap {
    map: Mapping<SolvableId, DecisionAndLevel>,
}

impl DecisionMap {
    pub(crate) fn new(solvable_count: usize) -> Self {
        Self {
            map: Mapping::filled(solvable_count, DecisionAndLevel::undecided()),
        }
    }

    pub(crate) fn reset(&mut self, solvable: SolvableId) {
        self.map[solvable] = DecisionAndLevel::undecided();
    }

    pub(crate) fn reset_all(&mut self) {
        let count = self.map.len();
        self.map = Mapping::filled(count, DecisionAndLevel::undecided());
    }

    pub(crate) fn set(&mut self, solvable: SolvableId, value: bool, level: u32) {
        self.map[solvable].set(value, level);
    }

    pub(crate) fn level(&self, solvable: SolvableId) -> u32 {
        self.map[solvable].level()
    }

    pub(crate) fn value(&self, solvable: SolvableId) -> Option<bool> {
        self.map[solvable].value()
    }
}

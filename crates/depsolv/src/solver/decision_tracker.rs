use crate::internal::id::SolvableId;
use crate::solver::decision::Decision;
use crate::solver::decision_map::DecisionMap;

/// Tracks assignments in a log usable for backtracking, alongside a map for
/// value lookups. The first entry is always the system pseudo-solvable.
pub(crate) struct DecisionTracker {
    map: DecisionMap,
    stack: Vec<Decision>,
    propagate_index: usize,
}

impl DecisionTracker {
    pub(crate) fn new(solvable_count: usize) -> Self {
        Self {
            map: DecisionMap::new(solvable_count),
            stack: Vec::new(),
            propagate_index: 0,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.map.reset_all();
        self.stack.clear();
        self.propagate_index = 0;
    }

    pub(crate) fn map(&self) -> &DecisionMap {
        &self.map
    }

    pub(crate) fn assigned_value(&self, solvable: SolvableId) -> Option<bool> {
        self.map.value(solvable)
    }

    pub(crate) fn level(&self, solvable: SolvableId) -> u32 {
        self.map.level(solvable)
    }

    pub(crate) fn stack(&self) -> &[Decision] {
        &self.stack
    }

    /// Attempts to add a decision.
    ///
    /// Returns true if the solvable was undecided, false if it was already
    /// decided to the same value. Returns an error when the solvable was
    /// already decided to the opposite value (a conflict).
    pub(crate) fn try_add_decision(&mut self, decision: Decision, level: u32) -> Result<bool, ()> {
        match self.map.value(decision.solvable) {
            None => {
                self.map.set(decision.solvable, decision.value, level);
                self.stack.push(decision);
                Ok(true)
            }
            Some(value) if value == decision.value => Ok(false),
            _ => Err(()),
        }
    }

    /// Pops decisions until the top of the stack is at or below `level`.
    pub(crate) fn undo_until(&mut self, level: u32) {
        while let Some(decision) = self.stack.last() {
            if self.level(decision.solvable) <= level {
                break;
            }
            self.undo_last();
        }
    }

    /// Pops the latest decision; returns it together with the level of the
    /// new top of the stack.
    pub(crate) fn undo_last(&mut self) -> (Decision, u32) {
        let decision = self.stack.pop().expect("decision stack underflow");
        self.map.reset(decision.solvable);

        self.propagate_index = self.propagate_index.min(self.stack.len());

        let top = self
            .stack
            .last()
            .expect("the system seed must stay on the stack");
        (decision, self.map.level(top.solvable))
    }

    /// Returns the next decision unit propagation has not seen yet, marking
    /// it as propagated.
    pub(crate) fn next_unpropagated(&mut self) -> Option<Decision> {
        let decision = self.stack.get(self.propagate_index).copied()?;
        self.propagate_index += 1;
        Some(decision)
    }
}

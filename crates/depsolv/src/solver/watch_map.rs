use crate::internal::id::{RuleId, SolvableId};
use crate::internal::mapping::Mapping;
use crate::rules::Rule;

/// Maps each solvable to the head of the linked list of rules watching it.
/// The list is threaded through the rules' `next_watches` slots.
pub(crate) struct WatchMap {
    map: Mapping<SolvableId, RuleId>,
}

impl WatchMap {
    pub(crate) fn new() -> Self {
        Self {
            map: Mapping::empty(),
        }
    }

    pub(crate) fn initialize(&mut self, solvable_count: usize) {
        self.map = Mapping::filled(solvable_count, RuleId::null());
    }

    pub(crate) fn first_rule_watching(&self, solvable: SolvableId) -> RuleId {
        self.map[solvable]
    }

    /// Hooks both watches of a rule into the chains of their solvables.
    pub(crate) fn start_watching(&mut self, rule: &mut Rule, rule_id: RuleId) {
        for watch_index in 0..2 {
            let watched = rule.watched_literal(watch_index).solvable;
            rule.next_watches[watch_index] = self.map[watched];
            self.map[watched] = rule_id;
        }
    }

    /// Moves one watch of `rule` from `previous_watch` to the literal at
    /// `new_literal_index`, unlinking the rule from the old chain.
    pub(crate) fn update_watched(
        &mut self,
        predecessor: Option<&mut Rule>,
        rule: &mut Rule,
        rule_id: RuleId,
        watch_index: usize,
        previous_watch: SolvableId,
        new_literal_index: usize,
    ) {
        // Unlink from the chain that brought us here
        if let Some(predecessor) = predecessor {
            let slot = predecessor.watch_index_of(previous_watch);
            predecessor.next_watches[slot] = rule.next_watches[watch_index];
        } else {
            self.map[previous_watch] = rule.next_watches[watch_index];
        }

        // Hook into the new solvable's chain
        let new_watch = rule.literals[new_literal_index].solvable;
        rule.watches[watch_index] = new_literal_index;
        rule.next_watches[watch_index] = self.map[new_watch];
        self.map[new_watch] = rule_id;
    }
}

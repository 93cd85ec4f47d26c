use crate::internal::id::{RuleId, SolvableId};

/// Why an assignment was made.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Reason {
    /// The system pseudo-solvable, seeded at level 1.
    Seed,
    /// Forced by unit propagation of the rule.
    Forced(RuleId),
    /// A free decision taken while resolving the rule.
    Chosen(RuleId),
    /// Decided by the orphan phase, without a backing rule.
    Orphan,
}

impl Reason {
    pub(crate) fn rule(self) -> Option<RuleId> {
        match self {
            Reason::Forced(rule) | Reason::Chosen(rule) => Some(rule),
            Reason::Seed | Reason::Orphan => None,
        }
    }
}

/// An assignment to a solvable.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) struct Decision {
    pub solvable: SolvableId,
    pub value: bool,
    pub reason: Reason,
}

impl Decision {
    pub(crate) fn new(solvable: SolvableId, value: bool, reason: Reason) -> Self {
        Self {
            solvable,
            value,
            reason,
        }
    }
}

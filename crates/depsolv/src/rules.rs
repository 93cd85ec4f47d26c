//! Rules are the CNF clauses the SAT engine works on.
//!
//! A rule keeps its literals inline (the first literal is the canonical one
//! the rule was emitted for), watches two of them, and carries its class
//! inline instead of the range-membership encoding of the original design.
//! Disabled rules stay threaded on their watch lists; propagation skips
//! them, and re-enabling needs no re-hooking.

use std::fmt;

use crate::internal::id::{DepId, LearntId, RuleId, SolvableId};
use crate::pool::Pool;
use crate::solver::decision_map::DecisionMap;

/// A literal: a solvable, possibly negated.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub(crate) struct Literal {
    pub solvable: SolvableId,
    pub negate: bool,
}

impl Literal {
    pub(crate) fn positive(solvable: SolvableId) -> Self {
        Self {
            solvable,
            negate: false,
        }
    }

    pub(crate) fn negative(solvable: SolvableId) -> Self {
        Self {
            solvable,
            negate: true,
        }
    }

    /// The assignment that makes this literal true.
    pub(crate) fn satisfying_value(self) -> bool {
        !self.negate
    }

    /// Evaluates the literal under the current assignment; `None` when the
    /// solvable is undecided.
    pub(crate) fn eval(self, map: &DecisionMap) -> Option<bool> {
        map.value(self.solvable)
            .map(|value| if self.negate { !value } else { value })
    }
}

/// Why a package (rpm) rule exists; drives problem reporting.
#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) enum PkgRuleKind {
    /// The package can never be installed (disabled, wrong arch, ...).
    NotInstallable,
    /// A requirement has no providers at all.
    NothingProvides { dep: DepId },
    /// `¬s ∨ providers(dep)`
    Requires { dep: DepId },
    /// `¬s ∨ ¬with` from an explicit conflict; the weakened multiversion
    /// form carries the other versions as additional positive literals.
    Conflicts { with: SolvableId, dep: DepId },
    /// A self-conflict under `forbidselfconflicts`.
    SelfConflict { dep: DepId },
    /// `¬s ∨ ¬with` from an explicit obsolete.
    Obsoletes { with: SolvableId, dep: DepId },
    /// Same-name exclusion (implicit obsoletes).
    ImplicitObsoletes { with: SolvableId },
    /// An installed package's obsolete fires against `s`.
    InstalledObsoletes { with: SolvableId, dep: DepId },
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) struct PkgRule {
    pub solvable: SolvableId,
    pub kind: PkgRuleKind,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum BestOrigin {
    Job(usize),
    Installed(SolvableId),
}

/// The class of a rule. Construction order keeps the classes contiguous in
/// the rule store, so each class still occupies one id range.
#[derive(Clone, Debug)]
pub(crate) enum RuleClass {
    Pkg(PkgRule),
    /// `installed ∨ any replacement at all`; starts disabled, enabled when
    /// the update rule gets disabled.
    Feature { installed: SolvableId },
    /// `installed ∨ policy-allowed replacements`
    Update { installed: SolvableId },
    Job { index: usize },
    InfArch { solvable: SolvableId },
    Dup { solvable: SolvableId },
    Best { origin: BestOrigin },
    /// Weak duplicate of a pkg requires rule, restricted to the preferred
    /// providers.
    Choice { pkg_rule: RuleId },
    Learnt { id: LearntId },
}

impl RuleClass {
    /// Whether the problem layer may disable this rule to get rid of a
    /// conflict. Package rules state facts and are never disabled.
    pub(crate) fn is_disablable(&self) -> bool {
        matches!(
            self,
            RuleClass::Feature { .. }
                | RuleClass::Update { .. }
                | RuleClass::Job { .. }
                | RuleClass::InfArch { .. }
                | RuleClass::Dup { .. }
                | RuleClass::Best { .. }
                | RuleClass::Choice { .. }
        )
    }
}

pub(crate) struct Rule {
    pub literals: Vec<Literal>,
    /// Indices into `literals`; meaningful iff `has_watches()`.
    pub watches: [usize; 2],
    /// Links to the next rule watching the same solvable, one per watch.
    pub next_watches: [RuleId; 2],
    pub enabled: bool,
    /// A weak rule is silently disabled when it is involved in a conflict.
    pub weak: bool,
    pub class: RuleClass,
}

impl Rule {
    pub(crate) fn new(literals: Vec<Literal>, class: RuleClass) -> Self {
        debug_assert!(!literals.is_empty());
        Self {
            literals,
            watches: [0, 1],
            next_watches: [RuleId::null(), RuleId::null()],
            enabled: true,
            weak: false,
            class,
        }
    }

    pub(crate) fn is_assertion(&self) -> bool {
        self.literals.len() == 1
    }

    pub(crate) fn has_watches(&self) -> bool {
        self.literals.len() >= 2
    }

    pub(crate) fn watched_literal(&self, watch_index: usize) -> Literal {
        self.literals[self.watches[watch_index]]
    }

    /// Which watch slot is watching `solvable`.
    pub(crate) fn watch_index_of(&self, solvable: SolvableId) -> usize {
        if self.watched_literal(0).solvable == solvable {
            0
        } else {
            debug_assert_eq!(self.watched_literal(1).solvable, solvable);
            1
        }
    }

    pub(crate) fn next_watched_rule(&self, solvable: SolvableId) -> RuleId {
        self.next_watches[self.watch_index_of(solvable)]
    }

    /// Returns the watch slot whose literal just became false, if any.
    pub(crate) fn watch_turned_false(
        &self,
        solvable: SolvableId,
        map: &DecisionMap,
    ) -> Option<usize> {
        for watch_index in 0..2 {
            let lit = self.watched_literal(watch_index);
            if lit.solvable == solvable && lit.eval(map) == Some(false) {
                return Some(watch_index);
            }
        }
        None
    }

    /// The index of a literal that is not watched and does not evaluate to
    /// false, i.e. a candidate to re-hook a watch to.
    pub(crate) fn next_unwatched_literal(&self, map: &DecisionMap) -> Option<usize> {
        self.literals.iter().enumerate().position(|(i, lit)| {
            i != self.watches[0] && i != self.watches[1] && lit.eval(map).unwrap_or(true)
        })
    }

    pub(crate) fn is_satisfied(&self, map: &DecisionMap) -> bool {
        self.literals.iter().any(|lit| lit.eval(map) == Some(true))
    }

    /// Positive literals that are still undecided, in rule order. These are
    /// the install candidates the decision phases choose from.
    pub(crate) fn undecided_candidates(&self, map: &DecisionMap) -> Vec<SolvableId> {
        self.literals
            .iter()
            .filter(|lit| !lit.negate && lit.eval(map).is_none())
            .map(|lit| lit.solvable)
            .collect()
    }

    pub(crate) fn debug<'a>(&'a self, pool: &'a Pool) -> RuleDebug<'a> {
        RuleDebug { rule: self, pool }
    }
}

/// Sorts the freshly built package rules lexicographically on their literal
/// lists and drops duplicates. Must run before any rule id is handed out.
pub(crate) fn unify_pkg_rules(rules: &mut Vec<Rule>) {
    rules.sort_by(|a, b| a.literals.cmp(&b.literals));
    rules.dedup_by(|a, b| a.literals == b.literals);
}

pub(crate) struct RuleDebug<'a> {
    rule: &'a Rule,
    pool: &'a Pool,
}

impl fmt::Debug for RuleDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = match &self.rule.class {
            RuleClass::Pkg(p) => format!("pkg:{:?}", p.kind),
            RuleClass::Feature { .. } => "feature".to_string(),
            RuleClass::Update { .. } => "update".to_string(),
            RuleClass::Job { index } => format!("job {index}"),
            RuleClass::InfArch { .. } => "infarch".to_string(),
            RuleClass::Dup { .. } => "dup".to_string(),
            RuleClass::Best { .. } => "best".to_string(),
            RuleClass::Choice { .. } => "choice".to_string(),
            RuleClass::Learnt { .. } => "learnt".to_string(),
        };
        write!(f, "[{class}]")?;
        for lit in &self.rule.literals {
            write!(
                f,
                " {}{}",
                if lit.negate { "-" } else { "" },
                self.pool.display(lit.solvable)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::internal::arena::ArenaId;

    fn lit(idx: usize, negate: bool) -> Literal {
        Literal {
            solvable: SolvableId::from_usize(idx),
            negate,
        }
    }

    #[test]
    fn test_assertion_and_watches() {
        let assertion = Rule::new(
            vec![lit(3, true)],
            RuleClass::Pkg(PkgRule {
                solvable: SolvableId::from_usize(3),
                kind: PkgRuleKind::NotInstallable,
            }),
        );
        assert!(assertion.is_assertion());
        assert!(!assertion.has_watches());

        let binary = Rule::new(
            vec![lit(1, true), lit(2, false)],
            RuleClass::Job { index: 0 },
        );
        assert!(binary.has_watches());
        assert_eq!(binary.watched_literal(0), lit(1, true));
        assert_eq!(binary.watched_literal(1), lit(2, false));
        assert_eq!(binary.watch_index_of(SolvableId::from_usize(2)), 1);
    }

    #[test]
    fn test_unify_drops_duplicates() {
        let requires = |s: usize, c1: usize, c2: usize| {
            Rule::new(
                vec![lit(s, true), lit(c1, false), lit(c2, false)],
                RuleClass::Pkg(PkgRule {
                    solvable: SolvableId::from_usize(s),
                    kind: PkgRuleKind::Requires {
                        dep: DepId::from_usize(0),
                    },
                }),
            )
        };

        let mut rules = vec![requires(1, 2, 3), requires(4, 5, 6), requires(1, 2, 3)];
        unify_pkg_rules(&mut rules);
        assert_eq!(rules.len(), 2);
        assert!(rules.windows(2).all(|w| w[0].literals <= w[1].literals));
    }
}

//! Turns a consistent decision queue into install/erase/upgrade steps.

use crate::internal::id::SolvableId;
use crate::solver::Solver;

/// A single transaction step.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Step {
    /// Install a package that was not installed before.
    Install(SolvableId),
    /// Remove an installed package without replacement.
    Erase(SolvableId),
    /// Replace an installed package with another solvable.
    Upgrade {
        /// The installed package being replaced.
        from: SolvableId,
        /// The package standing in for it.
        to: SolvableId,
    },
}

/// The ordered steps a consistent solve amounts to. Erases of installed
/// packages that have a decided-in replacement (same name, or an
/// obsoleter) pair up into upgrades.
#[derive(Default, Debug)]
pub struct Transaction {
    /// The steps, in solvable-id order.
    pub steps: Vec<Step>,
}

impl Transaction {
    pub(crate) fn from_decisions(solver: &Solver) -> Self {
        let pool = solver.pool();
        let map = solver.decisions.map();

        let mut installs: Vec<SolvableId> = Vec::new();
        let mut erases: Vec<SolvableId> = Vec::new();
        for s in pool.solvables() {
            match map.value(s) {
                Some(true) if !pool.is_installed(s) => installs.push(s),
                Some(false) if pool.is_installed(s) => erases.push(s),
                _ => {}
            }
        }
        installs.sort_unstable();
        erases.sort_unstable();

        let mut steps = Vec::new();
        let mut paired: Vec<SolvableId> = Vec::new();
        for &erased in &erases {
            let name = pool.solvable(erased).name;
            let replacement = installs
                .iter()
                .copied()
                .filter(|p| !paired.contains(p))
                .find(|&p| pool.solvable(p).name == name || pool.obsoletes(p, erased));
            match replacement {
                Some(to) => {
                    paired.push(to);
                    steps.push(Step::Upgrade { from: erased, to });
                }
                None => steps.push(Step::Erase(erased)),
            }
        }
        for &p in &installs {
            if !paired.contains(&p) {
                steps.push(Step::Install(p));
            }
        }

        Self { steps }
    }

    /// Whether the transaction does nothing.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The packages newly installed, upgrades included.
    pub fn installs(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.steps.iter().filter_map(|step| match *step {
            Step::Install(s) => Some(s),
            Step::Upgrade { to, .. } => Some(to),
            Step::Erase(_) => None,
        })
    }

    /// The installed packages going away, upgrades included.
    pub fn erases(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.steps.iter().filter_map(|step| match *step {
            Step::Erase(s) => Some(s),
            Step::Upgrade { from, .. } => Some(from),
            Step::Install(_) => None,
        })
    }
}

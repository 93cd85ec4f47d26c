//! Cleandeps: which installed packages become collateral of the user's
//! erase/update jobs, and the related "unneeded packages" query.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::internal::id::SolvableId;
use crate::internal::solvable_set::SolvableSet;
use crate::job::{JobAction, JobQueue};
use crate::pool::Pool;
use crate::solver::Solver;

/// Computes the cleandeps map: installed packages that will become
/// unreferenced once the cleandeps jobs take effect.
///
/// Two phases over the installed set. The remove pass strips the
/// still-needed mark from everything reachable from the job targets via
/// requires/recommends (and from packages whose supplements no longer see
/// a needed package); the add-back pass re-marks everything reachable from
/// the remaining needed set. What stays stripped is collateral.
pub(crate) fn compute_cleandeps(
    pool: &Pool,
    jobs: &JobQueue,
    userinstalled: &SolvableSet,
) -> SolvableSet {
    let count = pool.solvable_count();
    let mut result = SolvableSet::new(count);
    let Some(installed) = pool.installed_repo() else {
        return result;
    };

    // Targets of the cleandeps jobs
    let mut targets: Vec<SolvableId> = Vec::new();
    for job in jobs.iter() {
        if !job.flags.cleandeps {
            continue;
        }
        if !matches!(job.action, JobAction::Erase | JobAction::Update) {
            continue;
        }
        for s in job.candidates(pool) {
            if pool.is_installed(s) && !targets.contains(&s) {
                targets.push(s);
            }
        }
    }
    if targets.is_empty() {
        return result;
    }

    let user = derive_userinstalled(pool, jobs, userinstalled);

    // Everything not addressed by a cleandeps job is initially marked as
    // staying; addressed packages leave regardless of who installed them
    let mut im = SolvableSet::new(count);
    for &s in pool.repo_solvables(installed) {
        if !targets.contains(&s) {
            im.insert(s);
        }
    }

    // Remove pass
    let mut stripped: Vec<SolvableId> = Vec::new();
    let mut queue = targets.clone();
    while let Some(t) = queue.pop() {
        let sv = pool.solvable(t);
        let deps: Vec<_> = sv
            .all_requires()
            .chain(sv.recommends.iter().copied())
            .collect();
        for dep in deps {
            for p in pool.providers(dep) {
                if !pool.is_installed(p) || !im.contains(p) || user.contains(p) {
                    continue;
                }
                im.remove(p);
                stripped.push(p);
                queue.push(p);
            }
        }
    }

    // Supplements that no longer see a needed package get stripped too
    loop {
        let mut changed = false;
        for &s in pool.repo_solvables(installed) {
            if !im.contains(s) || user.contains(s) {
                continue;
            }
            let supplements = &pool.solvable(s).supplements;
            if supplements.is_empty() {
                continue;
            }
            // Only packages whose supplements were satisfied by the
            // installed system and stop being satisfied are collateral
            let satisfied_before = supplements.iter().any(|&dep| {
                pool.providers(dep).iter().any(|&p| pool.is_installed(p))
            });
            let satisfied_now = supplements.iter().any(|&dep| {
                pool.providers(dep)
                    .iter()
                    .any(|&p| im.contains(p) && !targets.contains(&p))
            });
            if satisfied_before && !satisfied_now {
                im.remove(s);
                stripped.push(s);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // Add-back pass: forward closure of the needed set
    let mut queue: Vec<SolvableId> = im.iter().collect();
    while let Some(s) = queue.pop() {
        let sv = pool.solvable(s);
        let deps: Vec<_> = sv
            .all_requires()
            .chain(sv.recommends.iter().copied())
            .collect();
        for dep in deps {
            for p in pool.providers(dep) {
                if pool.is_installed(p) && !im.contains(p) && !targets.contains(&p) {
                    im.insert(p);
                    queue.push(p);
                }
            }
        }
    }

    for s in stripped {
        if !im.contains(s) {
            result.insert(s);
        }
    }
    result
}

/// The user-installed set: explicit `userinstalled` jobs, products and
/// patterns, and the targets of positive install jobs.
fn derive_userinstalled(
    pool: &Pool,
    jobs: &JobQueue,
    explicit: &SolvableSet,
) -> SolvableSet {
    let mut user = explicit.clone();
    let Some(installed) = pool.installed_repo() else {
        return user;
    };

    for &s in pool.repo_solvables(installed) {
        let name = pool.name_str(pool.solvable(s).name);
        if name.starts_with("product:")
            || name.starts_with("pattern:")
            || name.starts_with("application:")
        {
            user.insert(s);
        }
    }

    for job in jobs.iter() {
        if job.action != JobAction::Install {
            continue;
        }
        for s in job.candidates(pool) {
            if pool.is_installed(s) {
                user.insert(s);
            }
        }
    }

    user
}

impl Solver {
    /// Installed packages that nothing user-installed needs, directly or
    /// transitively, under the final decision map.
    ///
    /// With `filtered`, only the packages no other unneeded package
    /// depends on are reported (cycles count as one unit via SCC), so
    /// erasing the reported set is always safe to do first.
    pub fn unneeded(&self, filtered: bool) -> Vec<SolvableId> {
        let pool = &self.pool;
        let Some(installed) = pool.installed_repo() else {
            return Vec::new();
        };

        let user = derive_userinstalled(pool, &self.jobs, &self.userinstalled);
        let map = self.decisions.map();
        let still_installed: Vec<SolvableId> = pool
            .repo_solvables(installed)
            .iter()
            .copied()
            .filter(|&s| map.value(s) != Some(false))
            .collect();

        // Forward closure from the user-installed set
        let mut needed = SolvableSet::new(pool.solvable_count());
        let mut queue: Vec<SolvableId> = still_installed
            .iter()
            .copied()
            .filter(|&s| user.contains(s))
            .collect();
        for &s in &queue {
            needed.insert(s);
        }
        while let Some(s) = queue.pop() {
            let sv = pool.solvable(s);
            let deps: Vec<_> = sv
                .all_requires()
                .chain(sv.recommends.iter().copied())
                .chain(sv.supplements.iter().copied())
                .collect();
            for dep in deps {
                for p in pool.providers(dep) {
                    if still_installed.contains(&p) && !needed.contains(p) {
                        needed.insert(p);
                        queue.push(p);
                    }
                }
            }
        }

        let mut unneeded: Vec<SolvableId> = still_installed
            .iter()
            .copied()
            .filter(|&s| !needed.contains(s))
            .collect();
        unneeded.sort_unstable();
        if !filtered || unneeded.len() <= 1 {
            return unneeded;
        }

        // Keep only the packages whose SCC has no incoming dependency edge
        // from another unneeded package
        let mut graph: DiGraph<SolvableId, ()> = DiGraph::new();
        let mut node_of: HashMap<SolvableId, NodeIndex> = HashMap::new();
        for &s in &unneeded {
            node_of.insert(s, graph.add_node(s));
        }
        for &s in &unneeded {
            let sv = pool.solvable(s);
            let deps: Vec<_> = sv
                .all_requires()
                .chain(sv.recommends.iter().copied())
                .chain(sv.supplements.iter().copied())
                .collect();
            for dep in deps {
                for p in pool.providers(dep) {
                    if p != s {
                        if let Some(&target) = node_of.get(&p) {
                            graph.add_edge(node_of[&s], target, ());
                        }
                    }
                }
            }
        }

        let sccs = tarjan_scc(&graph);
        let mut component_of = vec![0usize; graph.node_count()];
        for (component, members) in sccs.iter().enumerate() {
            for &node in members {
                component_of[node.index()] = component;
            }
        }
        let mut has_incoming = vec![false; sccs.len()];
        for edge in graph.edge_indices() {
            let (from, to) = graph.edge_endpoints(edge).unwrap();
            if component_of[from.index()] != component_of[to.index()] {
                has_incoming[component_of[to.index()]] = true;
            }
        }

        unneeded
            .into_iter()
            .filter(|s| !has_incoming[component_of[node_of[s].index()]])
            .collect()
    }

    /// The cleandeps collateral of the current job queue.
    pub fn cleandeps(&self) -> Vec<SolvableId> {
        let mut result: Vec<SolvableId> = self.cleandepsmap.iter().collect();
        result.sort_unstable();
        result
    }
}

//! The packaging policy: deterministic pruning and ordering of candidate
//! queues, update-candidate discovery, and the illegal-change diagnosis.
//!
//! All tie-breaks fall back to the interned id so that the same pool and
//! job always produce the same transaction.

use std::cmp::Ordering;
use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::flags::SolverFlags;
use crate::internal::id::SolvableId;
use crate::pool::Pool;

/// Which pruners fire when filtering a candidate queue.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum PolicyMode {
    /// Narrowing the candidates of a rule to the ones worth deciding on.
    Choose,
    /// Narrowing recommends/best candidates; repo priorities do not apply.
    Recommend,
    /// Like recommend, for suggests.
    Suggest,
}

/// The replacement downgrades the installed package.
pub const ILLEGAL_DOWNGRADE: u8 = 1;
/// The replacement changes the architecture.
pub const ILLEGAL_ARCHCHANGE: u8 = 2;
/// The replacement changes the vendor.
pub const ILLEGAL_VENDORCHANGE: u8 = 4;
/// The replacement changes the package name.
pub const ILLEGAL_NAMECHANGE: u8 = 8;

/// Prunes `candidates` down to the ones the solver should consider, per the
/// given mode. Installed candidates are never pruned away.
pub fn filter_unwanted(
    pool: &Pool,
    candidates: &mut Vec<SolvableId>,
    mode: PolicyMode,
) {
    if candidates.len() <= 1 {
        return;
    }
    if mode == PolicyMode::Choose {
        prune_to_highest_prio(pool, candidates);
    }
    prune_to_best_arch(pool, candidates);
    prune_to_best_version(pool, candidates);
}

/// Keeps only candidates from the highest-priority repo among the
/// non-installed members; installed packages always stay.
pub fn prune_to_highest_prio(pool: &Pool, candidates: &mut Vec<SolvableId>) {
    let best = candidates
        .iter()
        .filter(|&&s| !pool.is_installed(s))
        .map(|&s| pool.repo_priority(pool.solvable(s).repo).0)
        .max();
    let Some(best) = best else { return };

    candidates.retain(|&s| {
        pool.is_installed(s) || pool.repo_priority(pool.solvable(s).repo).0 == best
    });
}

/// Keeps only candidates whose architecture scores as well as the best
/// candidate's; `noarch` and installed packages always stay.
pub fn prune_to_best_arch(pool: &Pool, candidates: &mut Vec<SolvableId>) {
    let best = candidates
        .iter()
        .filter(|&&s| !pool.is_noarch(pool.solvable(s).arch))
        .filter_map(|&s| pool.arch_score(pool.solvable(s).arch))
        .min();
    let Some(best) = best else { return };

    candidates.retain(|&s| {
        let arch = pool.solvable(s).arch;
        pool.is_installed(s)
            || pool.is_noarch(arch)
            || pool.arch_score(arch) == Some(best)
    });
}

/// Sorts by `(name, installed-first, subpriority, id)` and keeps, within
/// each name, only the highest EVR; then drops candidates obsoleted across
/// names.
pub fn prune_to_best_version(pool: &Pool, candidates: &mut Vec<SolvableId>) {
    candidates.sort_by(|&a, &b| {
        let sa = pool.solvable(a);
        let sb = pool.solvable(b);
        pool.name_str(sa.name)
            .cmp(pool.name_str(sb.name))
            .then_with(|| pool.is_installed(b).cmp(&pool.is_installed(a)))
            .then_with(|| {
                pool.repo_priority(sb.repo)
                    .1
                    .cmp(&pool.repo_priority(sa.repo).1)
            })
            .then_with(|| a.cmp(&b))
    });

    // Within a name, keep only the EVR maxima (several on a tie)
    let mut best_of_name: HashMap<_, SolvableId> = HashMap::new();
    for &s in candidates.iter() {
        let name = pool.solvable(s).name;
        match best_of_name.get(&name) {
            Some(&current)
                if pool.evrcmp_ids(pool.solvable(s).evr, pool.solvable(current).evr)
                    != Ordering::Greater => {}
            _ => {
                best_of_name.insert(name, s);
            }
        }
    }
    candidates.retain(|&s| {
        let best = best_of_name[&pool.solvable(s).name];
        pool.evrcmp_ids(pool.solvable(s).evr, pool.solvable(best).evr) == Ordering::Equal
    });

    if candidates.len() > 1 {
        prune_obsoleted(pool, candidates);
    }
}

/// Removes candidates obsoleted by other candidates with a different name.
/// Obsolete cycles are resolved with Tarjan SCC: a candidate survives iff
/// its strongly connected component has no incoming obsoletes edge.
pub fn prune_obsoleted(pool: &Pool, candidates: &mut Vec<SolvableId>) {
    let mut graph: DiGraph<SolvableId, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = candidates.iter().map(|&s| graph.add_node(s)).collect();

    let mut any_edge = false;
    for (i, &a) in candidates.iter().enumerate() {
        for (j, &b) in candidates.iter().enumerate() {
            if i == j || pool.solvable(a).name == pool.solvable(b).name {
                continue;
            }
            if pool.obsoletes(a, b) {
                graph.add_edge(nodes[i], nodes[j], ());
                any_edge = true;
            }
        }
    }
    if !any_edge {
        return;
    }

    let sccs = tarjan_scc(&graph);
    let mut component_of = vec![0usize; graph.node_count()];
    for (component, members) in sccs.iter().enumerate() {
        for &node in members {
            component_of[node.index()] = component;
        }
    }

    let mut obsoleted = vec![false; sccs.len()];
    for edge in graph.edge_indices() {
        let (from, to) = graph.edge_endpoints(edge).unwrap();
        if component_of[from.index()] != component_of[to.index()] {
            obsoleted[component_of[to.index()]] = true;
        }
    }

    let keep: Vec<bool> = nodes
        .iter()
        .map(|node| !obsoleted[component_of[node.index()]])
        .collect();
    let mut index = 0;
    candidates.retain(|_| {
        let kept = keep[index];
        index += 1;
        kept
    });
}

/// Two-pass filter: keep the candidates recommended by any of `sources`; if
/// none is, the queue is left alone. Installed candidates are never dropped.
pub fn prune_to_recommended(
    pool: &Pool,
    candidates: &mut Vec<SolvableId>,
    sources: &[SolvableId],
) {
    if candidates.len() <= 1 {
        return;
    }
    let recommended: Vec<SolvableId> = candidates
        .iter()
        .copied()
        .filter(|&c| {
            pool.is_installed(c)
                || sources.iter().any(|&src| {
                    pool.solvable(src)
                        .recommends
                        .iter()
                        .any(|&dep| pool.providers(dep).contains(&c))
                })
        })
        .collect();
    if !recommended.is_empty() && recommended.len() < candidates.len() {
        *candidates = recommended;
    }
}

pub fn prune_to_suggested(
    pool: &Pool,
    candidates: &mut Vec<SolvableId>,
    sources: &[SolvableId],
) {
    if candidates.len() <= 1 {
        return;
    }
    let suggested: Vec<SolvableId> = candidates
        .iter()
        .copied()
        .filter(|&c| {
            pool.is_installed(c)
                || sources.iter().any(|&src| {
                    pool.solvable(src)
                        .suggests
                        .iter()
                        .any(|&dep| pool.providers(dep).contains(&c))
                })
        })
        .collect();
    if !suggested.is_empty() && suggested.len() < candidates.len() {
        *candidates = suggested;
    }
}

/// Keeps candidates whose supplements are satisfied by `sources`.
pub fn prune_to_supplemented(
    pool: &Pool,
    candidates: &mut Vec<SolvableId>,
    sources: &[SolvableId],
) {
    if candidates.len() <= 1 {
        return;
    }
    let matching: Vec<SolvableId> = candidates
        .iter()
        .copied()
        .filter(|&c| {
            pool.is_installed(c)
                || pool
                    .solvable(c)
                    .supplements
                    .iter()
                    .any(|&dep| pool.providers(dep).iter().any(|p| sources.contains(p)))
        })
        .collect();
    if !matching.is_empty() && matching.len() < candidates.len() {
        *candidates = matching;
    }
}

/// The reasons `s2` may not legally replace `s1`, filtered down to the
/// changes the solver flags do not allow. Zero means the change is legal.
pub fn illegal_change(
    pool: &Pool,
    flags: &SolverFlags,
    s1: SolvableId,
    s2: SolvableId,
) -> u8 {
    let a = pool.solvable(s1);
    let b = pool.solvable(s2);
    let mut illegal = 0;

    if !flags.allow_downgrade
        && a.name == b.name
        && pool.evrcmp_ids(b.evr, a.evr) == Ordering::Less
    {
        illegal |= ILLEGAL_DOWNGRADE;
    }
    if !flags.allow_archchange
        && a.arch != b.arch
        && !pool.is_noarch(a.arch)
        && !pool.is_noarch(b.arch)
    {
        illegal |= ILLEGAL_ARCHCHANGE;
    }
    if !flags.allow_vendorchange && !pool.same_vendor(a.vendor, b.vendor) {
        illegal |= ILLEGAL_VENDORCHANGE;
    }
    if !flags.allow_namechange && a.name != b.name {
        illegal |= ILLEGAL_NAMECHANGE;
    }

    illegal
}

/// All candidates that may legitimately replace installed `s`.
///
/// With `allow_all`, every change is acceptable (the feature-rule variant);
/// otherwise the `allow*` flags decide. Unless `noupdateprovide` is set,
/// packages obsoleting `s` qualify through the obsolete index.
pub fn find_update_packages(
    pool: &Pool,
    flags: &SolverFlags,
    obsolete_index: &HashMap<SolvableId, Vec<SolvableId>>,
    s: SolvableId,
    allow_all: bool,
) -> Vec<SolvableId> {
    let mut result = Vec::new();
    let name = pool.solvable(s).name;

    for &p in pool.packages_with_name(name) {
        if p == s || !pool.installable(p) || pool.is_installed(p) {
            continue;
        }
        if allow_all || illegal_change(pool, flags, s, p) == 0 {
            result.push(p);
        }
    }

    if !flags.no_update_provide || allow_all {
        if let Some(obsoleters) = obsolete_index.get(&s) {
            for &p in obsoleters {
                if !pool.installable(p) || result.contains(&p) {
                    continue;
                }
                if allow_all || illegal_change(pool, flags, s, p) == 0 {
                    result.push(p);
                }
            }
        }
    }

    result.sort_unstable();
    result
}

/// For each installed solvable, the non-installed, differently-named
/// solvables that obsolete it.
pub fn create_obsolete_index(pool: &Pool) -> HashMap<SolvableId, Vec<SolvableId>> {
    let mut index: HashMap<SolvableId, Vec<SolvableId>> = HashMap::new();
    let Some(installed) = pool.installed_repo() else {
        return index;
    };

    for p in pool.solvables() {
        if pool.is_installed(p) {
            continue;
        }
        let sp = pool.solvable(p);
        for &obs in &sp.obsoletes {
            for &target in pool.repo_solvables(installed) {
                if pool.solvable(target).name == sp.name {
                    continue;
                }
                if pool.dep_matches_solvable_for_obsolete(obs, target) {
                    let entry = index.entry(target).or_default();
                    if !entry.contains(&p) {
                        entry.push(p);
                    }
                }
            }
        }
    }

    for list in index.values_mut() {
        list.sort_unstable();
    }
    index
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::internal::id::RepoId;

    fn setup() -> (Pool, RepoId, RepoId) {
        let mut pool = Pool::new();
        let installed = pool.add_repo("@System");
        let available = pool.add_repo("available");
        pool.set_installed_repo(installed);
        pool.set_arch("x86_64");
        (pool, installed, available)
    }

    #[test]
    fn test_prune_to_best_version() {
        let (mut pool, _, repo) = setup();
        let old = pool.add_solvable(repo, "a", "1-1", "x86_64");
        let new = pool.add_solvable(repo, "a", "2-1", "x86_64");
        let other = pool.add_solvable(repo, "b", "9-1", "x86_64");
        pool.create_whatprovides();

        let mut candidates = vec![old, new, other];
        prune_to_best_version(&pool, &mut candidates);
        assert_eq!(candidates, vec![new, other]);
    }

    #[test]
    fn test_prune_obsoleted_prefers_obsoleter() {
        let (mut pool, _, repo) = setup();
        let a = pool.add_solvable(repo, "a", "1-1", "x86_64");
        let b = pool.add_solvable(repo, "b", "1-1", "x86_64");
        let obs = pool.parse_dep("a");
        pool.solvable_mut(b).obsoletes.push(obs);
        pool.create_whatprovides();

        let mut candidates = vec![a, b];
        prune_obsoleted(&pool, &mut candidates);
        assert_eq!(candidates, vec![b]);
    }

    #[test]
    fn test_prune_obsoleted_keeps_cycles() {
        let (mut pool, _, repo) = setup();
        let a = pool.add_solvable(repo, "a", "1-1", "x86_64");
        let b = pool.add_solvable(repo, "b", "1-1", "x86_64");
        let obs_a = pool.parse_dep("a");
        let obs_b = pool.parse_dep("b");
        pool.solvable_mut(b).obsoletes.push(obs_a);
        pool.solvable_mut(a).obsoletes.push(obs_b);
        pool.create_whatprovides();

        let mut candidates = vec![a, b];
        prune_obsoleted(&pool, &mut candidates);
        assert_eq!(candidates, vec![a, b]);
    }

    #[test]
    fn test_illegal_change_bits() {
        let (mut pool, installed, repo) = setup();
        let s1 = pool.add_solvable(installed, "a", "2-1", "x86_64");
        let downgrade = pool.add_solvable(repo, "a", "1-1", "x86_64");
        let namechange = pool.add_solvable(repo, "a2", "3-1", "x86_64");
        pool.create_whatprovides();

        let flags = SolverFlags::default();
        assert_eq!(
            illegal_change(&pool, &flags, s1, downgrade),
            ILLEGAL_DOWNGRADE
        );
        // namechange is allowed by default
        assert_eq!(illegal_change(&pool, &flags, s1, namechange), 0);

        let mut strict = SolverFlags::default();
        strict.allow_namechange = false;
        assert_eq!(
            illegal_change(&pool, &strict, s1, namechange),
            ILLEGAL_NAMECHANGE
        );
    }

    #[test]
    fn test_find_update_packages_via_obsoletes() {
        let (mut pool, installed, repo) = setup();
        let s = pool.add_solvable(installed, "a", "1-1", "x86_64");
        let successor = pool.add_solvable(repo, "a2", "2-1", "x86_64");
        let obs = pool.parse_dep("a");
        let prv = pool.parse_dep("a = 2-1");
        pool.solvable_mut(successor).obsoletes.push(obs);
        pool.solvable_mut(successor).provides.push(prv);
        pool.create_whatprovides();

        let flags = SolverFlags::default();
        let index = create_obsolete_index(&pool);
        let updates = find_update_packages(&pool, &flags, &index, s, false);
        assert_eq!(updates, vec![successor]);
    }
}

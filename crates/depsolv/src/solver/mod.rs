//! The CDCL engine: watched-literal unit propagation, first-UIP conflict
//! analysis, learned rules, backtracking, and the package-policy decision
//! phases layered on top.
//!
//! The algorithm follows the classic MiniSat structure; the data layout
//! (rules identified by index, watch chains threaded through the rules)
//! follows the libsolv family of solvers.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::flags::{SolverFlag, SolverFlags};
use crate::internal::arena::ArenaId;
use crate::internal::id::{LearntId, RuleId, SolvableId};
use crate::internal::solvable_set::SolvableSet;
use crate::job::{JobAction, JobQueue, JobTarget};
use crate::policy;
use crate::pool::Pool;
use crate::problems::{Problem, Solution};
use crate::rules::{Literal, Rule, RuleClass};
use crate::transaction::Transaction;

use decision::{Decision, Reason};
use decision_tracker::DecisionTracker;
use watch_map::WatchMap;

mod builder;
pub(crate) mod decision;
pub(crate) mod decision_map;
mod decision_tracker;
mod watch_map;

/// End indices of the rule classes in the rule store. Classes are built in
/// a fixed order, so `[0, pkg_end)` are the pkg rules, `[pkg_end,
/// feature_end)` the feature rules, and so on; learnt rules occupy
/// everything from `choice_end`.
#[derive(Copy, Clone, Default, Debug)]
pub(crate) struct RuleRanges {
    pub pkg_end: usize,
    pub feature_end: usize,
    pub update_end: usize,
    pub job_end: usize,
    pub infarch_end: usize,
    pub dup_end: usize,
    pub best_end: usize,
    pub choice_end: usize,
}

impl RuleRanges {
    fn job_rules(&self) -> std::ops::Range<usize> {
        self.update_end..self.job_end
    }
}

/// A saved choice point: the alternatives that were policy-equivalent when
/// a decision was taken. Used by the minimization step to re-take a better
/// alternative at a lower level.
struct Branch {
    alternatives: Vec<SolvableId>,
    taken: usize,
    level: u32,
    why: Option<RuleId>,
}

enum Step {
    Level(u32),
    Restart,
    Hopeless,
}

/// Drives the solving process. Owns the pool (read-only during a solve)
/// and all per-solve scratch state; a solver is single-threaded and
/// non-reentrant, but independent solvers may run in parallel on their own
/// pools.
pub struct Solver {
    pub(crate) pool: Pool,
    pub(crate) flags: SolverFlags,

    pub(crate) rules: Vec<Rule>,
    pub(crate) ranges: RuleRanges,
    pub(crate) rule_assertions: Vec<RuleId>,
    watches: WatchMap,

    pub(crate) decisions: DecisionTracker,
    pub(crate) learnt_why: Vec<Vec<RuleId>>,
    branches: Vec<Branch>,

    pub(crate) jobs: JobQueue,
    pub(crate) multiversion: SolvableSet,
    updatemap: SolvableSet,
    updatemap_all: bool,
    pub(crate) fixmap: SolvableSet,
    pub(crate) fixmap_all: bool,
    dupmap: SolvableSet,
    dupinvolved: SolvableSet,
    dup_all: bool,
    droporphaned: SolvableSet,
    droporphaned_all: bool,
    bestupdatemap: SolvableSet,
    pub(crate) userinstalled: SolvableSet,
    pub(crate) cleandepsmap: SolvableSet,
    cleandeps_mistakes: Vec<SolvableId>,

    pub(crate) feature_rule_of: HashMap<SolvableId, RuleId>,
    pub(crate) update_rule_of: HashMap<SolvableId, RuleId>,
    pub(crate) obsolete_index: HashMap<SolvableId, Vec<SolvableId>>,

    pub(crate) problems: Vec<Problem>,
    pub(crate) solutions_cache: HashMap<usize, Vec<Solution>>,
    pub(crate) orphaned: Vec<SolvableId>,

    solution_callback: Option<Box<dyn FnMut(&Transaction) -> bool>>,
}

impl Solver {
    /// Creates a solver owning the given pool. The whatprovides index must
    /// already have been created.
    pub fn new(pool: Pool) -> Self {
        let solvable_count = pool.solvable_count();
        Self {
            pool,
            flags: SolverFlags::default(),
            rules: Vec::new(),
            ranges: RuleRanges::default(),
            rule_assertions: Vec::new(),
            watches: WatchMap::new(),
            decisions: DecisionTracker::new(solvable_count),
            learnt_why: Vec::new(),
            branches: Vec::new(),
            jobs: JobQueue::new(),
            multiversion: SolvableSet::new(solvable_count),
            updatemap: SolvableSet::new(solvable_count),
            updatemap_all: false,
            fixmap: SolvableSet::new(solvable_count),
            fixmap_all: false,
            dupmap: SolvableSet::new(solvable_count),
            dupinvolved: SolvableSet::new(solvable_count),
            dup_all: false,
            droporphaned: SolvableSet::new(solvable_count),
            droporphaned_all: false,
            bestupdatemap: SolvableSet::new(solvable_count),
            userinstalled: SolvableSet::new(solvable_count),
            cleandepsmap: SolvableSet::new(solvable_count),
            cleandeps_mistakes: Vec::new(),
            feature_rule_of: HashMap::new(),
            update_rule_of: HashMap::new(),
            obsolete_index: HashMap::new(),
            problems: Vec::new(),
            solutions_cache: HashMap::new(),
            orphaned: Vec::new(),
            solution_callback: None,
        }
    }

    /// Installs a hook invoked whenever a complete, consistent assignment
    /// is found. Returning `true` makes the solver flip the newest open
    /// branch and search for the next solution; the last assignment wins.
    pub fn set_solution_callback(
        &mut self,
        callback: Box<dyn FnMut(&Transaction) -> bool>,
    ) {
        self.solution_callback = Some(callback);
    }

    /// The pool the solver operates on.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Consumes the solver, handing the pool back.
    pub fn into_pool(self) -> Pool {
        self.pool
    }

    /// Sets a solver flag, returning the previous value.
    pub fn set_flag(&mut self, flag: SolverFlag, value: bool) -> bool {
        let field = self.flags.field(flag);
        std::mem::replace(field, value)
    }

    /// Gets the current value of a solver flag.
    pub fn get_flag(&self, flag: SolverFlag) -> bool {
        self.flags.get(flag)
    }

    /// Solves the job queue and returns the number of problems found; zero
    /// means the decision queue holds a consistent transaction.
    pub fn solve(&mut self, jobs: &JobQueue) -> usize {
        assert!(
            self.pool.whatprovides_ready(),
            "pool_createwhatprovides must run before solving"
        );

        self.jobs = jobs.clone();
        self.problems.clear();
        self.solutions_cache.clear();
        self.learnt_why.clear();
        self.branches.clear();
        self.cleandeps_mistakes.clear();
        self.decisions = DecisionTracker::new(self.pool.solvable_count());

        self.setup_job_maps();
        self.cleandepsmap = crate::cleandeps::compute_cleandeps(
            &self.pool,
            &self.jobs,
            &self.userinstalled,
        );

        self.build_rules();
        self.disable_policy_rules();
        self.make_watches();

        self.run_sat(true, !self.flags.ignore_recommended);

        tracing::info!(
            problems = self.problems.len(),
            decisions = self.decisions.stack().len(),
            "solve finished"
        );
        self.problems.len()
    }

    /// The transaction the final decision queue amounts to. Only meaningful
    /// when [`Solver::solve`] reported zero problems.
    pub fn transaction(&self) -> Transaction {
        Transaction::from_decisions(self)
    }

    /// Installed packages that have no replacement under a global
    /// distupgrade.
    pub fn orphaned(&self) -> &[SolvableId] {
        &self.orphaned
    }

    /// Packages recommended / suggested by the result set but not part of
    /// it, in id order.
    pub fn recommendations(&self) -> (Vec<SolvableId>, Vec<SolvableId>) {
        let map = self.decisions.map();
        let mut recommended = Vec::new();
        let mut suggested = Vec::new();
        for s in self.pool.solvables() {
            if map.value(s) != Some(true) {
                continue;
            }
            let sv = self.pool.solvable(s);
            for &dep in &sv.recommends {
                for p in self.pool.providers(dep) {
                    if map.value(p) != Some(true) && self.pool.installable(p) {
                        recommended.push(p);
                    }
                }
            }
            for &dep in &sv.suggests {
                for p in self.pool.providers(dep) {
                    if map.value(p) != Some(true) && self.pool.installable(p) {
                        suggested.push(p);
                    }
                }
            }
        }
        recommended.sort_unstable();
        recommended.dedup();
        suggested.sort_unstable();
        suggested.dedup();
        (recommended, suggested)
    }

    // ---- job maps --------------------------------------------------------

    fn setup_job_maps(&mut self) {
        let count = self.pool.solvable_count();
        self.multiversion = SolvableSet::new(count);
        self.updatemap = SolvableSet::new(count);
        self.updatemap_all = false;
        self.fixmap = SolvableSet::new(count);
        self.fixmap_all = false;
        self.dupmap = SolvableSet::new(count);
        self.dupinvolved = SolvableSet::new(count);
        self.dup_all = false;
        self.droporphaned = SolvableSet::new(count);
        self.droporphaned_all = false;
        self.bestupdatemap = SolvableSet::new(count);
        self.userinstalled = SolvableSet::new(count);

        let jobs = self.jobs.clone();
        for job in jobs.iter() {
            match job.action {
                JobAction::Update => {
                    if matches!(job.target, JobTarget::All) {
                        self.updatemap_all = true;
                    }
                    for s in job.candidates(&self.pool) {
                        if self.pool.is_installed(s) {
                            self.updatemap.insert(s);
                            if job.flags.forcebest {
                                self.bestupdatemap.insert(s);
                            }
                        }
                    }
                }
                JobAction::Verify => {
                    if matches!(job.target, JobTarget::All) {
                        self.fixmap_all = true;
                    }
                    for s in job.candidates(&self.pool) {
                        if self.pool.is_installed(s) {
                            self.fixmap.insert(s);
                        }
                    }
                }
                JobAction::Multiversion => {
                    for s in job.candidates(&self.pool) {
                        self.multiversion.insert(s);
                    }
                }
                JobAction::DistUpgrade => match &job.target {
                    JobTarget::All => {
                        self.dup_all = true;
                        for s in self.pool.solvables().collect::<Vec<_>>() {
                            if !self.pool.is_installed(s) && self.pool.installable(s) {
                                self.dupmap.insert(s);
                            }
                        }
                    }
                    JobTarget::Repo(repo) => {
                        for &s in &self.pool.repo_solvables(*repo).to_vec() {
                            self.dupmap.insert(s);
                            self.mark_dup_involved(s);
                        }
                    }
                    _ => {
                        for s in job.candidates(&self.pool) {
                            self.dupmap.insert(s);
                            self.mark_dup_involved(s);
                        }
                    }
                },
                JobAction::DropOrphaned => {
                    if matches!(job.target, JobTarget::All) {
                        self.droporphaned_all = true;
                    }
                    for s in job.candidates(&self.pool) {
                        if self.pool.is_installed(s) {
                            self.droporphaned.insert(s);
                        }
                    }
                }
                JobAction::UserInstalled => {
                    for s in job.candidates(&self.pool) {
                        if self.pool.is_installed(s) {
                            self.userinstalled.insert(s);
                        }
                    }
                }
                JobAction::Install
                | JobAction::Erase
                | JobAction::Lock
                | JobAction::Noop => {}
            }
        }
    }

    /// Marks the installed packages sharing a name with a dup target (and
    /// the target itself) as involved in the distupgrade.
    fn mark_dup_involved(&mut self, target: SolvableId) {
        self.dupinvolved.insert(target);
        let name = self.pool.solvable(target).name;
        for &p in &self.pool.packages_with_name(name).to_vec() {
            if self.pool.is_installed(p) {
                self.dupinvolved.insert(p);
            }
        }
    }

    /// Update/feature rules of packages scheduled for removal (erase job
    /// targets, cleandeps collateral, distupgrade leftovers) are disabled
    /// up front so that keeping them installed is not asserted.
    fn disable_policy_rules(&mut self) {
        let mut to_disable: Vec<SolvableId> = Vec::new();

        let jobs = self.jobs.clone();
        for job in jobs.iter() {
            if job.action != JobAction::Erase {
                continue;
            }
            for s in job.candidates(&self.pool) {
                if self.pool.is_installed(s) {
                    to_disable.push(s);
                }
            }
        }
        to_disable.extend(self.cleandepsmap.iter());

        for s in to_disable {
            if let Some(&rid) = self.update_rule_of.get(&s) {
                self.rules[rid.index()].enabled = false;
            }
            if let Some(&rid) = self.feature_rule_of.get(&s) {
                self.rules[rid.index()].enabled = false;
            }
        }
    }

    pub(crate) fn make_watches(&mut self) {
        self.watches.initialize(self.pool.solvable_count());
        for (index, rule) in self.rules.iter_mut().enumerate() {
            if rule.has_watches() {
                self.watches.start_watching(rule, RuleId::new(index));
            }
        }
    }

    // ---- rule enabling ---------------------------------------------------

    /// Disables a rule the way the problem layer does: disabling one rule
    /// of a job disables all of the job's rules, and disabling an update
    /// rule enables the paired feature rule (giving the solver more
    /// freedom).
    pub(crate) fn disable_problem_rule(&mut self, rid: RuleId) {
        match self.rules[rid.index()].class.clone() {
            RuleClass::Job { index } => {
                for r in self.ranges.job_rules() {
                    if matches!(self.rules[r].class, RuleClass::Job { index: i } if i == index) {
                        self.rules[r].enabled = false;
                    }
                }
            }
            RuleClass::Update { installed } => {
                self.rules[rid.index()].enabled = false;
                if let Some(&feature) = self.feature_rule_of.get(&installed) {
                    self.rules[feature.index()].enabled = true;
                }
            }
            _ => {
                self.rules[rid.index()].enabled = false;
            }
        }
    }

    pub(crate) fn enable_problem_rule(&mut self, rid: RuleId) {
        match self.rules[rid.index()].class.clone() {
            RuleClass::Job { index } => {
                for r in self.ranges.job_rules() {
                    if matches!(self.rules[r].class, RuleClass::Job { index: i } if i == index) {
                        self.rules[r].enabled = true;
                    }
                }
            }
            RuleClass::Update { installed } => {
                self.rules[rid.index()].enabled = true;
                if let Some(&feature) = self.feature_rule_of.get(&installed) {
                    self.rules[feature.index()].enabled = false;
                }
            }
            _ => {
                self.rules[rid.index()].enabled = true;
            }
        }
    }

    // ---- the SAT loop ----------------------------------------------------

    pub(crate) fn run_sat(&mut self, disable_rules: bool, do_weak: bool) {
        let mut restarts = 0usize;
        'restart: loop {
            restarts += 1;
            if restarts > self.rules.len() + 64 {
                tracing::error!("giving up after too many restarts");
                return;
            }
            self.branches.clear();

            if !self.make_rule_decisions(disable_rules) {
                return;
            }

            let mut level = 1;
            if let Err(conflict) = self.propagate(level) {
                if self.analyze_unsolvable(conflict, disable_rules) {
                    continue 'restart;
                }
                return;
            }

            let mut minimization_steps = 0usize;
            'main: loop {
                // Phase: resolve job rules in order
                for rid in self.ranges.job_rules() {
                    let rule = &self.rules[rid];
                    if !rule.enabled
                        || rule.is_assertion()
                        || rule.is_satisfied(self.decisions.map())
                    {
                        continue;
                    }
                    let mut candidates = rule.undecided_candidates(self.decisions.map());
                    if candidates.is_empty() {
                        continue;
                    }
                    policy::filter_unwanted(&self.pool, &mut candidates, policy::PolicyMode::Choose);
                    match self.decide(level, &candidates, Some(RuleId::new(rid)), disable_rules) {
                        Step::Level(l) => {
                            level = l;
                            continue 'main;
                        }
                        Step::Restart => continue 'restart,
                        Step::Hopeless => return,
                    }
                }

                // Phase: decide installed packages, updates first
                if self.pool.installed_repo().is_some() {
                    match self.decide_installed(level, disable_rules) {
                        Some(Step::Level(l)) => {
                            level = l;
                            continue 'main;
                        }
                        Some(Step::Restart) => continue 'restart,
                        Some(Step::Hopeless) => return,
                        None => {}
                    }
                }

                // Phase: any remaining unresolved rule
                for rid in 0..self.rules.len() {
                    let rule = &self.rules[rid];
                    if !rule.enabled
                        || rule.is_assertion()
                        || rule.is_satisfied(self.decisions.map())
                    {
                        continue;
                    }
                    let mut candidates = rule.undecided_candidates(self.decisions.map());
                    if candidates.is_empty() {
                        continue;
                    }
                    policy::filter_unwanted(&self.pool, &mut candidates, policy::PolicyMode::Choose);
                    match self.decide(level, &candidates, Some(RuleId::new(rid)), disable_rules) {
                        Step::Level(l) => {
                            level = l;
                            continue 'main;
                        }
                        Step::Restart => continue 'restart,
                        Step::Hopeless => return,
                    }
                }

                // Phase: cleandeps leftovers become erasures
                for s in self.cleandepsmap.iter().collect::<Vec<_>>() {
                    if self.decisions.assigned_value(s).is_some() {
                        continue;
                    }
                    tracing::debug!("cleandeps erase {}", self.pool.display(s));
                    match self.set_propagate_learn(level, s, false, None, disable_rules) {
                        Step::Level(l) => {
                            level = l;
                            continue 'main;
                        }
                        Step::Restart => continue 'restart,
                        Step::Hopeless => return,
                    }
                }

                // Phase: weak dependencies
                if do_weak {
                    if let Some(candidates) = self.next_weak_candidates() {
                        match self.decide(level, &candidates, None, disable_rules) {
                            Step::Level(l) => {
                                level = l;
                                continue 'main;
                            }
                            Step::Restart => continue 'restart,
                            Step::Hopeless => return,
                        }
                    }
                }

                // Phase: orphans under a global distupgrade
                for s in self.orphaned.clone() {
                    if self.decisions.assigned_value(s).is_some() {
                        continue;
                    }
                    let drop = self.droporphaned_all || self.droporphaned.contains(s);
                    match self.set_propagate_learn(level, s, !drop, None, disable_rules) {
                        Step::Level(l) => {
                            level = l;
                            continue 'main;
                        }
                        Step::Restart => continue 'restart,
                        Step::Hopeless => return,
                    }
                }

                // Phase: recover from cleandeps mistakes
                if self.check_cleandeps_mistakes() {
                    continue 'restart;
                }

                // Phase: minimization over the open branches
                let mut minimized = false;
                for bi in (0..self.branches.len()).rev() {
                    if minimization_steps > 1000 {
                        break;
                    }
                    let branch_level = self.branches[bi].level;
                    let why = self.branches[bi].why;
                    let alternatives = self.branches[bi].alternatives.clone();
                    let taken = self.branches[bi].taken;
                    for (ai, &alt) in alternatives.iter().enumerate() {
                        if ai == taken {
                            continue;
                        }
                        if self.decisions.assigned_value(alt) != Some(true)
                            || self.decisions.level(alt) <= branch_level + 1
                        {
                            continue;
                        }
                        minimization_steps += 1;
                        tracing::debug!(
                            "minimize: retaking {} at level {}",
                            self.pool.display(alt),
                            branch_level + 1
                        );
                        self.decisions.undo_until(branch_level);
                        self.branches.truncate(bi + 1);
                        self.branches[bi].taken = ai;
                        match self.set_propagate_learn(branch_level, alt, true, why, disable_rules)
                        {
                            Step::Level(l) => {
                                level = l;
                                minimized = true;
                            }
                            Step::Restart => continue 'restart,
                            Step::Hopeless => return,
                        }
                        break;
                    }
                    if minimized {
                        break;
                    }
                }
                if minimized {
                    continue 'main;
                }

                // Phase: a complete assignment; the callback may ask for
                // the next one
                if self.solution_callback.is_some() {
                    let mut callback = self.solution_callback.take().unwrap();
                    let keep_searching = callback(&Transaction::from_decisions(self));
                    self.solution_callback = Some(callback);
                    if keep_searching {
                        match self.flip_newest_branch(disable_rules) {
                            Some(Step::Level(l)) => {
                                level = l;
                                continue 'main;
                            }
                            Some(Step::Restart) => continue 'restart,
                            Some(Step::Hopeless) => return,
                            None => {}
                        }
                    }
                }

                break 'main;
            }

            return;
        }
    }

    /// Reverts to the newest branch frame with an untried alternative and
    /// takes it. Returns `None` when the search space is exhausted.
    fn flip_newest_branch(&mut self, disable_rules: bool) -> Option<Step> {
        for bi in (0..self.branches.len()).rev() {
            while self.branches[bi].taken + 1 < self.branches[bi].alternatives.len() {
                let next = self.branches[bi].taken + 1;
                self.branches[bi].taken = next;
                let branch_level = self.branches[bi].level;
                let why = self.branches[bi].why;
                let alternative = self.branches[bi].alternatives[next];

                self.decisions.undo_until(branch_level);
                if self.decisions.assigned_value(alternative).is_some() {
                    // Forced either way below the branch; not a real choice
                    continue;
                }
                self.branches.truncate(bi + 1);
                return Some(self.set_propagate_learn(
                    branch_level,
                    alternative,
                    true,
                    why,
                    disable_rules,
                ));
            }
        }
        None
    }

    /// Decides the first of `candidates` at a fresh level, saving the rest
    /// as an open branch.
    fn decide(
        &mut self,
        level: u32,
        candidates: &[SolvableId],
        why: Option<RuleId>,
        disable_rules: bool,
    ) -> Step {
        debug_assert!(!candidates.is_empty());
        let chosen = candidates[0];
        if candidates.len() > 1 {
            self.branches.push(Branch {
                alternatives: candidates.to_vec(),
                taken: 0,
                level,
                why,
            });
        }
        self.set_propagate_learn(level, chosen, true, why, disable_rules)
    }

    /// Two passes over the installed packages: first the update targets,
    /// then keep-installed for everything still undecided. Packages whose
    /// update and feature rules are both disabled are somebody else's
    /// responsibility (erase jobs, cleandeps, dup).
    fn decide_installed(&mut self, level: u32, disable_rules: bool) -> Option<Step> {
        let installed = self.pool.installed_repo()?;
        let members = self.pool.repo_solvables(installed).to_vec();

        for pass in 0..2 {
            for &s in &members {
                if self.decisions.assigned_value(s).is_some() {
                    continue;
                }
                let update_target = self.updatemap_all || self.updatemap.contains(s);
                if pass == 0 && !update_target {
                    continue;
                }

                let rid = self
                    .update_rule_of
                    .get(&s)
                    .filter(|&&r| self.rules[r.index()].enabled)
                    .or_else(|| {
                        self.feature_rule_of
                            .get(&s)
                            .filter(|&&r| self.rules[r.index()].enabled)
                    })
                    .copied();
                let Some(rid) = rid else { continue };

                if pass == 0 {
                    let rule = &self.rules[rid.index()];
                    if rule.is_satisfied(self.decisions.map()) {
                        continue;
                    }
                    let mut candidates = rule.undecided_candidates(self.decisions.map());
                    if candidates.is_empty() {
                        continue;
                    }
                    policy::filter_unwanted(&self.pool, &mut candidates, policy::PolicyMode::Choose);
                    return Some(self.decide(level, &candidates, Some(rid), disable_rules));
                }

                // Keep the installed package
                return Some(self.set_propagate_learn(level, s, true, Some(rid), disable_rules));
            }
        }
        None
    }

    /// The next group of weak-dependency candidates to install: providers
    /// of unsatisfied recommends of the result set, plus packages whose
    /// supplements are satisfied, policy-filtered per name. Returns the
    /// best name group or `None` when the weak phase is done.
    fn next_weak_candidates(&self) -> Option<Vec<SolvableId>> {
        let map = self.decisions.map();
        let mut candidates: Vec<SolvableId> = Vec::new();

        // Recommends of the (newly) installed packages
        for s in self.pool.solvables() {
            if map.value(s) != Some(true) {
                continue;
            }
            if !self.flags.add_already_recommended && self.pool.is_installed(s) {
                continue;
            }
            for &dep in &self.pool.solvable(s).recommends {
                let providers = self.pool.providers(dep);
                if providers.iter().any(|&p| map.value(p) == Some(true)) {
                    continue;
                }
                for p in providers {
                    if map.value(p).is_none() && self.pool.installable(p) {
                        candidates.push(p);
                    }
                }
            }
        }

        // Supplements of undecided candidates
        for s in self.pool.solvables() {
            if map.value(s).is_some() || !self.pool.installable(s) {
                continue;
            }
            if !self.flags.add_already_recommended && self.pool.is_installed(s) {
                continue;
            }
            let triggered = self.pool.solvable(s).supplements.iter().any(|&dep| {
                self.pool
                    .providers(dep)
                    .iter()
                    .any(|&p| map.value(p) == Some(true))
            });
            if triggered {
                candidates.push(s);
            }
        }

        // A candidate obsoleted by the result set would conflict right away
        candidates.retain(|&p| {
            !self.pool.solvables().any(|q| {
                map.value(q) == Some(true)
                    && q != p
                    && (self.pool.solvable(q).name == self.pool.solvable(p).name
                        || self.pool.obsoletes(q, p))
            })
        });

        candidates.sort_unstable();
        candidates.dedup();
        if candidates.is_empty() {
            return None;
        }

        // Handle one name group per iteration, best name first
        let first_name = candidates
            .iter()
            .map(|&p| self.pool.solvable(p).name)
            .sorted_by(|&a, &b| self.pool.name_str(a).cmp(self.pool.name_str(b)))
            .next()
            .unwrap();
        let mut group: Vec<SolvableId> = candidates
            .into_iter()
            .filter(|&p| self.pool.solvable(p).name == first_name)
            .collect();

        // Prefer the alternatives that the result set also recommends,
        // suggests or supplements, then apply the usual pruning
        let result_set: Vec<SolvableId> = self
            .pool
            .solvables()
            .filter(|&q| map.value(q) == Some(true))
            .collect();
        policy::prune_to_recommended(&self.pool, &mut group, &result_set);
        policy::prune_to_suggested(&self.pool, &mut group, &result_set);
        policy::prune_to_supplemented(&self.pool, &mut group, &result_set);
        policy::filter_unwanted(&self.pool, &mut group, policy::PolicyMode::Recommend);
        Some(group)
    }

    /// An installed package erased as cleandeps collateral although its
    /// feature rule is satisfied while its update rule is not was taken by
    /// the update path; add it back and redo the solve.
    fn check_cleandeps_mistakes(&mut self) -> bool {
        let mut mistakes = Vec::new();
        for s in self.cleandepsmap.iter().collect::<Vec<_>>() {
            if self.decisions.assigned_value(s) != Some(false) {
                continue;
            }
            let feature_satisfied = self
                .feature_rule_of
                .get(&s)
                .map(|&r| self.rules[r.index()].is_satisfied(self.decisions.map()))
                .unwrap_or(false);
            let update_satisfied = self
                .update_rule_of
                .get(&s)
                .map(|&r| self.rules[r.index()].is_satisfied(self.decisions.map()))
                .unwrap_or(false);
            if feature_satisfied && !update_satisfied {
                mistakes.push(s);
            }
        }
        if mistakes.is_empty() {
            return false;
        }
        for &s in &mistakes {
            tracing::info!("cleandeps mistake, keeping {}", self.pool.display(s));
            self.cleandepsmap.remove(s);
            self.cleandeps_mistakes.push(s);
            // The package is back to normal keep-installed handling
            if let Some(&rid) = self.update_rule_of.get(&s) {
                self.rules[rid.index()].enabled = true;
            }
        }
        true
    }

    // ---- assertions ------------------------------------------------------

    /// Seeds the decision queue with the system solvable and applies every
    /// assertion rule at level 1, strong rules first, then weak ones. A
    /// weak conflict silently disables its rule; a strong conflict records
    /// a problem, disables the involved disablable rules and restarts the
    /// pass. Returns false when solving cannot continue.
    fn make_rule_decisions(&mut self, disable_rules: bool) -> bool {
        'restart: loop {
            self.decisions.clear();
            self.decisions
                .try_add_decision(
                    Decision::new(SolvableId::system(), true, Reason::Seed),
                    1,
                )
                .expect("fresh decision queue");

            for weak_pass in [false, true] {
                for ai in 0..self.rule_assertions.len() {
                    let rid = self.rule_assertions[ai];
                    let rule = &self.rules[rid.index()];
                    if !rule.enabled || rule.weak != weak_pass || !rule.is_assertion() {
                        continue;
                    }
                    let literal = rule.literals[0];
                    let decision = Decision::new(
                        literal.solvable,
                        literal.satisfying_value(),
                        Reason::Forced(rid),
                    );
                    match self.decisions.try_add_decision(decision, 1) {
                        Ok(_) => {}
                        Err(()) => {
                            if self.rules[rid.index()].weak {
                                tracing::debug!(
                                    "conflicting weak assertion {:?} disabled",
                                    self.rules[rid.index()].debug(&self.pool)
                                );
                                self.rules[rid.index()].enabled = false;
                                self.disable_dependent_learnt_rules();
                                continue;
                            }
                            if !self.handle_assertion_conflict(rid, literal, disable_rules) {
                                return false;
                            }
                            continue 'restart;
                        }
                    }
                }
            }

            return true;
        }
    }

    /// Records the problem for two contradicting assertions and disables
    /// what can be disabled. Returns false when nothing could be disabled
    /// (the problem stands and solving stops).
    fn handle_assertion_conflict(
        &mut self,
        rid: RuleId,
        literal: Literal,
        disable_rules: bool,
    ) -> bool {
        let other = self
            .decisions
            .stack()
            .iter()
            .find(|d| d.solvable == literal.solvable)
            .and_then(|d| d.reason.rule());

        // A weak counterpart yields silently
        if let Some(other) = other {
            if self.rules[other.index()].weak {
                tracing::debug!(
                    "conflicting weak assertion {:?} disabled",
                    self.rules[other.index()].debug(&self.pool)
                );
                self.rules[other.index()].enabled = false;
                self.disable_dependent_learnt_rules();
                return true;
            }
        }

        let mut rules = vec![rid];
        if let Some(other) = other {
            rules.push(other);
        }
        tracing::info!(
            "assertion conflict on {}: {:?}",
            self.pool.display(literal.solvable),
            self.rules[rid.index()].debug(&self.pool)
        );

        let proof = rules.clone();
        self.record_problem(proof, rules.clone());

        if !disable_rules {
            return false;
        }
        let mut disabled_any = false;
        for r in rules {
            if self.rules[r.index()].class.is_disablable() && self.rules[r.index()].enabled {
                self.disable_problem_rule(r);
                disabled_any = true;
            }
        }
        if disabled_any {
            self.disable_dependent_learnt_rules();
        }
        disabled_any
    }

    fn record_problem(&mut self, proof: Vec<RuleId>, rules: Vec<RuleId>) -> usize {
        let mut key: Vec<RuleId> = rules.clone();
        key.sort_unstable();
        key.dedup();
        for (index, problem) in self.problems.iter().enumerate() {
            let mut existing: Vec<RuleId> = problem.rules.clone();
            existing.sort_unstable();
            existing.dedup();
            if existing == key {
                return index;
            }
        }
        self.problems.push(Problem { proof, rules });
        self.problems.len() - 1
    }

    // ---- propagation -----------------------------------------------------

    /// Unit propagation: walk the watch chains of every freshly decided
    /// solvable, re-hooking watches or forcing assignments. Returns the
    /// violated rule on conflict.
    pub(crate) fn propagate(&mut self, level: u32) -> Result<(), RuleId> {
        while let Some(decision) = self.decisions.next_unpropagated() {
            let pkg = decision.solvable;

            let mut old_predecessor_rule_id: Option<RuleId>;
            let mut predecessor_rule_id: Option<RuleId> = None;
            let mut rule_id = self.watches.first_rule_watching(pkg);
            while !rule_id.is_null() {
                debug_assert_ne!(predecessor_rule_id, Some(rule_id), "cycle in watch chain");

                // Get mutable access to the rule and its predecessor in the
                // chain; the predecessor is needed when we unhook the rule
                let (predecessor, rule) = if let Some(prev_id) = predecessor_rule_id {
                    if prev_id < rule_id {
                        let (prev, current) = self.rules.split_at_mut(rule_id.index());
                        (Some(&mut prev[prev_id.index()]), &mut current[0])
                    } else {
                        let (current, prev) = self.rules.split_at_mut(prev_id.index());
                        (Some(&mut prev[0]), &mut current[rule_id.index()])
                    }
                } else {
                    (None, &mut self.rules[rule_id.index()])
                };

                old_predecessor_rule_id = predecessor_rule_id;
                predecessor_rule_id = Some(rule_id);
                let this_rule_id = rule_id;
                rule_id = rule.next_watched_rule(pkg);

                if !rule.enabled {
                    continue;
                }

                let Some(watch_index) = rule.watch_turned_false(pkg, self.decisions.map())
                else {
                    continue;
                };

                let other_watch = rule.watched_literal(1 - watch_index);
                if other_watch.eval(self.decisions.map()) == Some(true) {
                    // Rule is satisfied, nothing to do
                    continue;
                }

                if let Some(new_index) = rule.next_unwatched_literal(self.decisions.map()) {
                    self.watches.update_watched(
                        predecessor,
                        rule,
                        this_rule_id,
                        watch_index,
                        pkg,
                        new_index,
                    );
                    // The current rule left this chain; its predecessor is
                    // the predecessor of the next rule
                    predecessor_rule_id = old_predecessor_rule_id;
                } else {
                    // The rule is unit on the other watch
                    let decided = self
                        .decisions
                        .try_add_decision(
                            Decision::new(
                                other_watch.solvable,
                                other_watch.satisfying_value(),
                                Reason::Forced(this_rule_id),
                            ),
                            level,
                        )
                        .map_err(|()| this_rule_id)?;

                    if decided {
                        tracing::trace!(
                            "propagate {} = {}",
                            self.pool.display(other_watch.solvable),
                            other_watch.satisfying_value()
                        );
                    }
                }
            }
        }

        Ok(())
    }

    // ---- learning --------------------------------------------------------

    /// Executes one set-propagate-learn round: decide `solvable = value` at
    /// a fresh level, propagate, and on conflict learn and backjump until
    /// propagation succeeds. Conflicts at level 1 are unsolvable and go
    /// through [`Solver::analyze_unsolvable`].
    fn set_propagate_learn(
        &mut self,
        mut level: u32,
        solvable: SolvableId,
        value: bool,
        why: Option<RuleId>,
        disable_rules: bool,
    ) -> Step {
        level += 1;
        let reason = match why {
            Some(rule) => Reason::Chosen(rule),
            None => Reason::Orphan,
        };
        tracing::debug!(
            "level {level}: decide {} = {value}",
            self.pool.display(solvable)
        );
        self.decisions
            .try_add_decision(Decision::new(solvable, value, reason), level)
            .expect("caller picked an undecided solvable");

        loop {
            let conflict = match self.propagate(level) {
                Ok(()) => return Step::Level(level),
                Err(conflict) => conflict,
            };

            if level == 1 {
                if self.analyze_unsolvable(conflict, disable_rules) {
                    return Step::Restart;
                }
                return Step::Hopeless;
            }

            tracing::debug!(
                "conflict in {:?}",
                self.rules[conflict.index()].debug(&self.pool)
            );

            let (new_level, learnt_rule, literal) = self.analyze(level, conflict);
            level = new_level;

            // The learnt rule is unit: assign it right away
            self.decisions
                .try_add_decision(
                    Decision::new(
                        literal.solvable,
                        literal.satisfying_value(),
                        Reason::Forced(learnt_rule),
                    ),
                    level,
                )
                .expect("the UIP literal is undecided after backjumping");
        }
    }

    /// First-UIP conflict analysis. Walks the decision queue backwards
    /// from the conflict, resolving reasons until a unique implication
    /// point at the conflict level remains. Returns the backjump level,
    /// the id of the learnt rule and the asserting literal.
    fn analyze(&mut self, mut level: u32, mut rule_id: RuleId) -> (u32, RuleId, Literal) {
        let mut seen: HashSet<SolvableId> = HashSet::new();
        let mut causes_at_current_level = 0u32;
        let mut learnt: Vec<Literal> = Vec::new();
        let mut learnt_why: Vec<RuleId> = Vec::new();
        let mut back_track_to = 0;

        let mut conflicting_solvable = SolvableId::system();
        let mut conflicting_value = true;
        let mut first_iteration = true;
        loop {
            learnt_why.push(rule_id);

            for literal in self.rules[rule_id.index()].literals.clone() {
                if !first_iteration && literal.solvable == conflicting_solvable {
                    // We want the causes of the conflict, not the propagated
                    // assignment itself
                    continue;
                }
                if !seen.insert(literal.solvable) {
                    continue;
                }

                let decision_level = self.decisions.level(literal.solvable);
                if decision_level == level {
                    causes_at_current_level += 1;
                } else {
                    let learnt_literal = Literal {
                        solvable: literal.solvable,
                        negate: self
                            .decisions
                            .assigned_value(literal.solvable)
                            .expect("the literal of a conflict cause is decided"),
                    };
                    learnt.push(learnt_literal);
                    back_track_to = back_track_to.max(decision_level);
                }
            }
            first_iteration = false;

            // Find the next seen literal on the decision stack
            loop {
                let (last_decision, last_level) = self.decisions.undo_last();
                conflicting_solvable = last_decision.solvable;
                conflicting_value = last_decision.value;
                level = last_level;
                if seen.contains(&last_decision.solvable) {
                    rule_id = last_decision
                        .reason
                        .rule()
                        .unwrap_or(RuleId::null());
                    break;
                }
            }

            causes_at_current_level = causes_at_current_level.saturating_sub(1);
            if causes_at_current_level == 0 {
                break;
            }
            debug_assert!(
                !rule_id.is_null(),
                "intermediate conflict causes are always propagated"
            );
        }

        let uip = Literal {
            solvable: conflicting_solvable,
            negate: conflicting_value,
        };
        learnt.push(uip);

        // Store the learnt rule. The UIP is the first watch; the second is
        // the literal decided at the highest remaining level.
        let learnt_id = LearntId::from_usize(self.learnt_why.len());
        self.learnt_why.push(learnt_why);
        let mut rule = Rule::new(learnt.clone(), RuleClass::Learnt { id: learnt_id });
        if rule.has_watches() {
            let uip_index = rule.literals.len() - 1;
            let highest_index = rule
                .literals
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != uip_index)
                .max_by_key(|(_, lit)| self.decisions.level(lit.solvable))
                .map(|(i, _)| i)
                .unwrap();
            rule.watches = [uip_index, highest_index];
        }

        let new_rule_id = RuleId::new(self.rules.len());
        if rule.has_watches() {
            self.watches.start_watching(&mut rule, new_rule_id);
        } else {
            self.rule_assertions.push(new_rule_id);
        }
        self.rules.push(rule);

        tracing::debug!(
            "learnt rule {}",
            learnt.iter().format_with(" | ", |lit, f| f(&format_args!(
                "{}{}",
                if lit.negate { "-" } else { "" },
                self.pool.display(lit.solvable)
            )))
        );

        let target_level = back_track_to.max(1);
        self.decisions.undo_until(target_level);

        (target_level, new_rule_id, uip)
    }

    /// A conflict at level 1 means the problem is unsolvable as-is. Walk
    /// the implication graph, collect the involved rules as a proof, and
    /// either silently disable the latest weak rule, or record a problem
    /// and disable its disablable rules. Returns true when solving should
    /// restart, false when it is hopeless.
    pub(crate) fn analyze_unsolvable(&mut self, conflict: RuleId, disable_rules: bool) -> bool {
        let mut involved: HashSet<SolvableId> = HashSet::new();
        let mut seen_rules: HashSet<RuleId> = HashSet::new();
        let mut proof: Vec<RuleId> = Vec::new();
        let mut problem_rules: Vec<RuleId> = Vec::new();
        let mut last_weak: Option<RuleId> = None;

        self.collect_unsolvable_rule(
            conflict,
            &mut seen_rules,
            &mut proof,
            &mut problem_rules,
            &mut last_weak,
        );
        for literal in &self.rules[conflict.index()].literals {
            involved.insert(literal.solvable);
        }

        let stack: Vec<Decision> = self.decisions.stack().to_vec();
        for decision in stack.iter().rev() {
            if decision.reason == Reason::Seed {
                continue;
            }
            if !involved.contains(&decision.solvable) {
                continue;
            }
            let Some(why) = decision.reason.rule() else {
                continue;
            };
            self.collect_unsolvable_rule(
                why,
                &mut seen_rules,
                &mut proof,
                &mut problem_rules,
                &mut last_weak,
            );
            for literal in self.rules[why.index()].literals.clone() {
                if literal.solvable != decision.solvable {
                    involved.insert(literal.solvable);
                }
            }
        }

        if let Some(weak) = last_weak {
            tracing::info!(
                "disabling weak {:?} to resolve the conflict",
                self.rules[weak.index()].debug(&self.pool)
            );
            self.rules[weak.index()].enabled = false;
            self.disable_dependent_learnt_rules();
            return true;
        }

        let index = self.record_problem(proof, problem_rules.clone());
        tracing::info!(problem = index, rules = problem_rules.len(), "unsolvable");

        if !disable_rules {
            return false;
        }
        let mut disabled_any = false;
        for rid in problem_rules {
            if self.rules[rid.index()].class.is_disablable() && self.rules[rid.index()].enabled {
                self.disable_problem_rule(rid);
                disabled_any = true;
            }
        }
        if disabled_any {
            self.disable_dependent_learnt_rules();
        }
        disabled_any
    }

    /// A learnt rule is only a valid entailment while every rule it was
    /// derived from is enabled; disabling rules invalidates the dependent
    /// learnt rules. Learnt rules only reference earlier rules, so one
    /// in-order pass reaches the fixed point.
    fn disable_dependent_learnt_rules(&mut self) {
        for index in self.ranges.choice_end..self.rules.len() {
            let RuleClass::Learnt { id } = self.rules[index].class else {
                continue;
            };
            if !self.rules[index].enabled {
                continue;
            }
            let invalid = self.learnt_why[id.to_usize()]
                .iter()
                .any(|why| !self.rules[why.index()].enabled);
            if invalid {
                self.rules[index].enabled = false;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn decisions_for_test(&self) -> &DecisionTracker {
        &self.decisions
    }

    /// Adds a rule to the proof and problem sets; learnt rules are not
    /// user-relevant, so their causes are reported instead.
    fn collect_unsolvable_rule(
        &self,
        rule_id: RuleId,
        seen: &mut HashSet<RuleId>,
        proof: &mut Vec<RuleId>,
        problem: &mut Vec<RuleId>,
        last_weak: &mut Option<RuleId>,
    ) {
        if !seen.insert(rule_id) {
            return;
        }
        let rule = &self.rules[rule_id.index()];
        if let RuleClass::Learnt { id } = rule.class {
            for &cause in &self.learnt_why[id.to_usize()] {
                self.collect_unsolvable_rule(cause, seen, proof, problem, last_weak);
            }
            return;
        }
        if rule.weak && rule.enabled {
            *last_weak = Some(match *last_weak {
                Some(prev) => prev.max(rule_id),
                None => rule_id,
            });
        }
        proof.push(rule_id);
        if !problem.contains(&rule_id) {
            problem.push(rule_id);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::internal::id::RepoId;
    use crate::job::Job;
    use crate::transaction::Step;

    struct Setup {
        pool: Pool,
        installed: RepoId,
        available: RepoId,
    }

    fn setup() -> Setup {
        let mut pool = Pool::new();
        let installed = pool.add_repo("@System");
        let available = pool.add_repo("available");
        pool.set_installed_repo(installed);
        pool.set_arch("x86_64");
        Setup {
            pool,
            installed,
            available,
        }
    }

    fn pkg(pool: &mut Pool, repo: RepoId, name: &str, evr: &str, deps: &[&str]) -> SolvableId {
        let s = pool.add_solvable(repo, name, evr, "x86_64");
        for dep in deps {
            let dep = pool.parse_dep(dep);
            pool.solvable_mut(s).requires.push(dep);
        }
        s
    }

    fn install_job(pool: &mut Pool, name: &str) -> JobQueue {
        let mut jobs = JobQueue::new();
        let dep = pool.parse_dep(name);
        jobs.push(Job::new(JobAction::Install, JobTarget::Name(dep)));
        jobs
    }

    #[test]
    fn test_unit_propagation() {
        let mut s = setup();
        let a = pkg(&mut s.pool, s.available, "a", "1-1", &["b"]);
        let b = pkg(&mut s.pool, s.available, "b", "1-1", &[]);
        s.pool.create_whatprovides();
        let jobs = install_job(&mut s.pool, "a");

        let mut solver = Solver::new(s.pool);
        assert_eq!(solver.solve(&jobs), 0);
        assert_eq!(solver.decisions.assigned_value(a), Some(true));
        assert_eq!(solver.decisions.assigned_value(b), Some(true));
    }

    #[test]
    fn test_backtracking_finds_compatible_versions() {
        // a pulls the newest c; b insists on the old one, so the solver
        // must back off the first choice
        let mut s = setup();
        let _a = pkg(&mut s.pool, s.available, "a", "1-1", &["c"]);
        let _b = pkg(&mut s.pool, s.available, "b", "1-1", &["c < 2"]);
        let c1 = pkg(&mut s.pool, s.available, "c", "1-1", &[]);
        let _c2 = pkg(&mut s.pool, s.available, "c", "2-1", &[]);
        s.pool.create_whatprovides();

        let mut jobs = install_job(&mut s.pool, "a");
        let dep = s.pool.parse_dep("b");
        jobs.push(Job::new(JobAction::Install, JobTarget::Name(dep)));

        let mut solver = Solver::new(s.pool);
        assert_eq!(solver.solve(&jobs), 0);
        assert_eq!(solver.decisions.assigned_value(c1), Some(true));
    }

    #[test]
    fn test_erase_and_keep() {
        let mut s = setup();
        let gone = pkg(&mut s.pool, s.installed, "gone", "1-1", &[]);
        let kept = pkg(&mut s.pool, s.installed, "kept", "1-1", &[]);
        s.pool.create_whatprovides();

        let mut jobs = JobQueue::new();
        let dep = s.pool.parse_dep("gone");
        jobs.push(Job::new(JobAction::Erase, JobTarget::Name(dep)));

        let mut solver = Solver::new(s.pool);
        assert_eq!(solver.solve(&jobs), 0);
        let tx = solver.transaction();
        assert_eq!(tx.steps, vec![Step::Erase(gone)]);
        assert_eq!(solver.decisions.assigned_value(kept), Some(true));
    }

    #[test]
    fn test_update_job_takes_newest() {
        let mut s = setup();
        let old = pkg(&mut s.pool, s.installed, "a", "1-1", &[]);
        let new = pkg(&mut s.pool, s.available, "a", "2-1", &[]);
        s.pool.create_whatprovides();

        let mut jobs = JobQueue::new();
        let dep = s.pool.parse_dep("a");
        jobs.push(Job::new(JobAction::Update, JobTarget::Name(dep)));

        let mut solver = Solver::new(s.pool);
        assert_eq!(solver.solve(&jobs), 0);
        assert_eq!(
            solver.transaction().steps,
            vec![Step::Upgrade { from: old, to: new }]
        );
    }

    #[test]
    fn test_downgrade_needs_flag() {
        let mut s = setup();
        let _installed = pkg(&mut s.pool, s.installed, "a", "2-1", &[]);
        let older = pkg(&mut s.pool, s.available, "a", "1-1", &[]);
        s.pool.create_whatprovides();

        let mut jobs = JobQueue::new();
        let dep = s.pool.parse_dep("a");
        jobs.push(Job::new(JobAction::Update, JobTarget::Name(dep)));

        let mut solver = Solver::new(s.pool);
        assert_eq!(solver.solve(&jobs), 0);
        // Without allowdowngrade the update rule never offers the older one
        assert_ne!(solver.decisions.assigned_value(older), Some(true));
    }

    #[test]
    fn test_weak_phase_installs_recommends() {
        let mut s = setup();
        let a = pkg(&mut s.pool, s.available, "a", "1-1", &[]);
        let dep = s.pool.parse_dep("extra");
        s.pool.solvable_mut(a).recommends.push(dep);
        let extra = pkg(&mut s.pool, s.available, "extra", "1-1", &[]);
        s.pool.create_whatprovides();
        let jobs = install_job(&mut s.pool, "a");

        let mut solver = Solver::new(s.pool);
        assert_eq!(solver.solve(&jobs), 0);
        assert_eq!(solver.decisions.assigned_value(extra), Some(true));

        // The weak phase is skipped entirely under ignorerecommended
        let pool = solver.into_pool();
        let mut solver = Solver::new(pool);
        solver.set_flag(SolverFlag::IgnoreRecommended, true);
        assert_eq!(solver.solve(&jobs), 0);
        assert_eq!(solver.decisions.assigned_value(extra), None);
    }

    #[test]
    fn test_supplements_trigger_installation() {
        let mut s = setup();
        let _base = pkg(&mut s.pool, s.installed, "base", "1-1", &[]);
        let addon = pkg(&mut s.pool, s.available, "addon", "1-1", &[]);
        let sup = s.pool.parse_dep("trigger");
        s.pool.solvable_mut(addon).supplements.push(sup);
        let trigger = pkg(&mut s.pool, s.available, "trigger", "1-1", &[]);
        s.pool.create_whatprovides();
        let jobs = install_job(&mut s.pool, "trigger");

        let mut solver = Solver::new(s.pool);
        assert_eq!(solver.solve(&jobs), 0);
        assert_eq!(solver.decisions.assigned_value(trigger), Some(true));
        assert_eq!(solver.decisions.assigned_value(addon), Some(true));
    }

    #[test]
    fn test_decision_map_matches_stack() {
        let mut s = setup();
        let _a = pkg(&mut s.pool, s.available, "a", "1-1", &["b", "c"]);
        let _b = pkg(&mut s.pool, s.available, "b", "1-1", &["c"]);
        let _c = pkg(&mut s.pool, s.available, "c", "1-1", &[]);
        s.pool.create_whatprovides();
        let jobs = install_job(&mut s.pool, "a");

        let mut solver = Solver::new(s.pool);
        assert_eq!(solver.solve(&jobs), 0);

        let tracker = solver.decisions_for_test();
        for decision in tracker.stack() {
            assert_eq!(
                tracker.map().value(decision.solvable),
                Some(decision.value)
            );
            assert!(tracker.map().level(decision.solvable) >= 1);
        }
    }

    #[test]
    fn test_lock_pins_installed_version() {
        let mut s = setup();
        let old = pkg(&mut s.pool, s.installed, "a", "1-1", &[]);
        let new = pkg(&mut s.pool, s.available, "a", "2-1", &[]);
        s.pool.create_whatprovides();

        let mut jobs = JobQueue::new();
        let dep = s.pool.parse_dep("a");
        jobs.push(Job::new(JobAction::Update, JobTarget::Name(dep)));
        jobs.push(Job::new(JobAction::Lock, JobTarget::Solvable(old)));

        let mut solver = Solver::new(s.pool);
        assert_eq!(solver.solve(&jobs), 0);
        assert_eq!(solver.decisions.assigned_value(old), Some(true));
        assert_ne!(solver.decisions.assigned_value(new), Some(true));
    }

    #[test]
    fn test_solution_callback_enumerates_branches() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut s = setup();
        let b = pkg(&mut s.pool, s.available, "b", "1-1", &[]);
        let c = pkg(&mut s.pool, s.available, "c", "1-1", &[]);
        let virt = s.pool.parse_dep("virt");
        s.pool.solvable_mut(b).provides.push(virt);
        s.pool.solvable_mut(c).provides.push(virt);
        s.pool.create_whatprovides();

        let mut jobs = JobQueue::new();
        jobs.push(Job::new(JobAction::Install, JobTarget::Provides(virt)));

        let mut solver = Solver::new(s.pool);
        let hits = Rc::new(Cell::new(0usize));
        let seen = hits.clone();
        solver.set_solution_callback(Box::new(move |_| {
            seen.set(seen.get() + 1);
            seen.get() < 2
        }));

        assert_eq!(solver.solve(&jobs), 0);
        assert_eq!(hits.get(), 2);
        // The search moved on to the second alternative
        assert_eq!(solver.decisions.assigned_value(c), Some(true));
        assert_ne!(solver.decisions.assigned_value(b), Some(true));
    }

    #[test]
    fn test_weak_job_yields_silently() {
        let mut s = setup();
        let _a = pkg(&mut s.pool, s.available, "a", "1-1", &["missing"]);
        s.pool.create_whatprovides();

        let mut jobs = JobQueue::new();
        let dep = s.pool.parse_dep("a");
        let mut job = Job::new(JobAction::Install, JobTarget::Name(dep));
        job.flags.weak = true;
        jobs.push(job);

        let mut solver = Solver::new(s.pool);
        assert_eq!(solver.solve(&jobs), 0);
        assert!(solver.transaction().is_empty());
    }
}

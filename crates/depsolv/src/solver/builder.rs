//! Rule emission: turns package metadata and the job queue into the rule
//! store, in strict class order (pkg, feature, update, job, infarch, dup,
//! best, choice). Each sub-builder is idempotent given the same inputs.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::internal::id::{RuleId, SolvableId};
use crate::job::{Job, JobAction};
use crate::policy;
use crate::rules::{
    unify_pkg_rules, BestOrigin, Literal, PkgRule, PkgRuleKind, Rule, RuleClass,
};
use crate::solver::Solver;

impl Solver {
    /// Builds every rule for the current job queue. Called once per solve,
    /// after the job maps have been populated.
    pub(crate) fn build_rules(&mut self) {
        self.rules.clear();
        self.rule_assertions.clear();
        self.feature_rule_of.clear();
        self.update_rule_of.clear();
        self.orphaned.clear();

        self.obsolete_index = policy::create_obsolete_index(&self.pool);

        self.add_pkg_rules();
        self.ranges.pkg_end = self.rules.len();

        self.add_feature_and_update_rules();
        self.add_job_rules();
        self.ranges.job_end = self.rules.len();

        self.add_infarch_rules();
        self.ranges.infarch_end = self.rules.len();

        self.add_dup_rules();
        self.ranges.dup_end = self.rules.len();

        self.add_best_rules();
        self.ranges.best_end = self.rules.len();

        self.add_choice_rules();
        self.ranges.choice_end = self.rules.len();

        self.collect_assertions();

        tracing::debug!(
            pkg = self.ranges.pkg_end,
            total = self.rules.len(),
            "rules built"
        );
    }

    fn push_rule(&mut self, rule: Rule) -> RuleId {
        let id = RuleId::new(self.rules.len());
        self.rules.push(rule);
        id
    }

    fn collect_assertions(&mut self) {
        self.rule_assertions = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_assertion())
            .map(|(i, _)| RuleId::new(i))
            .collect();
    }

    // ---- pkg rules -------------------------------------------------------

    /// Emits the dependency rules for every solvable reachable from the
    /// installed set and the job targets, breadth-first, then unifies them.
    fn add_pkg_rules(&mut self) {
        let mut queue: VecDeque<SolvableId> = VecDeque::new();
        let mut visited: HashSet<SolvableId> = HashSet::new();

        if let Some(installed) = self.pool.installed_repo() {
            for &s in self.pool.repo_solvables(installed) {
                if visited.insert(s) {
                    queue.push_back(s);
                }
            }
        }
        for job in self.jobs.clone().iter() {
            if !matches!(
                job.action,
                JobAction::Install | JobAction::Update | JobAction::DistUpgrade
            ) {
                continue;
            }
            for s in job.candidates(&self.pool) {
                if visited.insert(s) {
                    queue.push_back(s);
                }
            }
        }

        // Update candidates of installed packages get rules too; they are
        // referenced by the feature/update rules built later
        if let Some(installed) = self.pool.installed_repo() {
            for &s in &self.pool.repo_solvables(installed).to_vec() {
                let updates = policy::find_update_packages(
                    &self.pool,
                    &self.flags,
                    &self.obsolete_index,
                    s,
                    true,
                );
                for p in updates {
                    if visited.insert(p) {
                        queue.push_back(p);
                    }
                }
            }
        }
        for s in self.dupmap.iter().collect::<Vec<_>>() {
            if visited.insert(s) {
                queue.push_back(s);
            }
        }

        let mut rules: Vec<Rule> = Vec::new();
        loop {
            while let Some(s) = queue.pop_front() {
                self.add_pkg_rules_for_solvable(s, &mut rules, &mut |p| {
                    if visited.insert(p) {
                        queue.push_back(p);
                    }
                });
            }

            // Weak closure: pull in not-yet-visited packages whose
            // supplements are satisfiable from the visited set
            let mut grew = false;
            for s in self.pool.solvables().collect::<Vec<_>>() {
                if visited.contains(&s) || !self.pool.installable(s) {
                    continue;
                }
                let supplements = self.pool.solvable(s).supplements.clone();
                let triggered = supplements.iter().any(|&dep| {
                    self.pool
                        .providers(dep)
                        .iter()
                        .any(|p| visited.contains(p))
                });
                if triggered {
                    visited.insert(s);
                    queue.push_back(s);
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        unify_pkg_rules(&mut rules);
        self.rules = rules;
    }

    fn add_pkg_rules_for_solvable(
        &self,
        s: SolvableId,
        rules: &mut Vec<Rule>,
        enqueue: &mut dyn FnMut(SolvableId),
    ) {
        let pool = &self.pool;

        if !pool.installable(s) {
            rules.push(Rule::new(
                vec![Literal::negative(s)],
                RuleClass::Pkg(PkgRule {
                    solvable: s,
                    kind: PkgRuleKind::NotInstallable,
                }),
            ));
            return;
        }

        let installed = pool.is_installed(s);
        let dontfix = installed && !self.fixmap_all && !self.fixmap.contains(s);

        // Requires
        let requires: Vec<_> = pool.solvable(s).all_requires().collect();
        for dep in requires {
            let providers = pool.providers(dep);

            if dontfix && !providers.iter().any(|&p| pool.is_installed(p)) {
                // Previously broken requirement of an installed package
                continue;
            }

            if providers.is_empty() {
                rules.push(Rule::new(
                    vec![Literal::negative(s)],
                    RuleClass::Pkg(PkgRule {
                        solvable: s,
                        kind: PkgRuleKind::NothingProvides { dep },
                    }),
                ));
                continue;
            }
            if providers.contains(&s) {
                // The package provides the requirement itself; the rule
                // would be a tautology
                continue;
            }

            let mut literals = vec![Literal::negative(s)];
            for &p in &providers {
                literals.push(Literal::positive(p));
                enqueue(p);
            }
            rules.push(Rule::new(
                literals,
                RuleClass::Pkg(PkgRule {
                    solvable: s,
                    kind: PkgRuleKind::Requires { dep },
                }),
            ));
        }

        // Conflicts
        let conflicts: Vec<_> = pool.solvable(s).conflicts.clone();
        for dep in conflicts {
            for p in pool.providers(dep) {
                if p == s {
                    if pool.flags.forbid_self_conflicts {
                        rules.push(Rule::new(
                            vec![Literal::negative(s)],
                            RuleClass::Pkg(PkgRule {
                                solvable: s,
                                kind: PkgRuleKind::SelfConflict { dep },
                            }),
                        ));
                    }
                    continue;
                }
                if dontfix && pool.is_installed(p) {
                    // Conflict between two installed packages is not our
                    // problem to fix
                    continue;
                }

                let mut literals = vec![Literal::negative(s), Literal::negative(p)];
                if self.multiversion.contains(p) {
                    // Weakened patch conflict: another version of p that
                    // does not match the conflict may coexist
                    let matched = pool.providers(dep);
                    for &other in pool.packages_with_name(pool.solvable(p).name) {
                        if other != p
                            && other != s
                            && !matched.contains(&other)
                            && pool.installable(other)
                        {
                            literals.push(Literal::positive(other));
                            enqueue(other);
                        }
                    }
                }
                rules.push(Rule::new(
                    literals,
                    RuleClass::Pkg(PkgRule {
                        solvable: s,
                        kind: PkgRuleKind::Conflicts { with: p, dep },
                    }),
                ));
            }
        }

        if !installed {
            // Explicit obsoletes
            let obsoletes: Vec<_> = pool.solvable(s).obsoletes.clone();
            for dep in obsoletes {
                for p in pool.solvables().collect::<Vec<_>>() {
                    if p == s || pool.solvable(p).name == pool.solvable(s).name {
                        continue;
                    }
                    if !pool.dep_matches_solvable_for_obsolete(dep, p) {
                        continue;
                    }
                    if self.multiversion.contains(p) && !self.flags.keep_explicit_obsoletes {
                        continue;
                    }
                    rules.push(Rule::new(
                        vec![Literal::negative(s), Literal::negative(p)],
                        RuleClass::Pkg(PkgRule {
                            solvable: s,
                            kind: PkgRuleKind::Obsoletes { with: p, dep },
                        }),
                    ));
                }
            }

            // Implicit same-name obsoletes
            let name = pool.solvable(s).name;
            let same_name: Vec<SolvableId> = if pool.flags.implicit_obsolete_uses_provides {
                pool.providers_of_name(name).to_vec()
            } else {
                pool.packages_with_name(name).to_vec()
            };
            for p in same_name {
                if p == s {
                    continue;
                }
                if self.multiversion.contains(s) || self.multiversion.contains(p) {
                    continue;
                }
                let (a, b) = if s < p { (s, p) } else { (p, s) };
                rules.push(Rule::new(
                    vec![Literal::negative(a), Literal::negative(b)],
                    RuleClass::Pkg(PkgRule {
                        solvable: a,
                        kind: PkgRuleKind::ImplicitObsoletes { with: b },
                    }),
                ));
            }
        } else if !dontfix && !pool.flags.no_installed_obsoletes {
            // Obsoletes of an installed package under repair
            let obsoletes: Vec<_> = pool.solvable(s).obsoletes.clone();
            for dep in obsoletes {
                for p in pool.solvables().collect::<Vec<_>>() {
                    if p == s || pool.solvable(p).name == pool.solvable(s).name {
                        continue;
                    }
                    if pool.dep_matches_solvable_for_obsolete(dep, p) {
                        rules.push(Rule::new(
                            vec![Literal::negative(s), Literal::negative(p)],
                            RuleClass::Pkg(PkgRule {
                                solvable: s,
                                kind: PkgRuleKind::InstalledObsoletes { with: p, dep },
                            }),
                        ));
                    }
                }
            }
        }

        // Weak relations only enlarge the frontier
        let weak_deps: Vec<_> = {
            let sv = pool.solvable(s);
            sv.recommends
                .iter()
                .chain(sv.suggests.iter())
                .copied()
                .collect()
        };
        for dep in weak_deps {
            for p in pool.providers(dep) {
                enqueue(p);
            }
        }
    }

    // ---- feature & update rules -----------------------------------------

    /// One feature rule and one update rule per installed solvable. The
    /// feature rule allows any replacement and starts disabled; it gets
    /// enabled when the update rule is disabled by the problem layer. An
    /// update rule identical to its feature rule replaces it entirely.
    fn add_feature_and_update_rules(&mut self) {
        let installed: Vec<SolvableId> = match self.pool.installed_repo() {
            Some(repo) => self.pool.repo_solvables(repo).to_vec(),
            None => {
                self.ranges.feature_end = self.rules.len();
                self.ranges.update_end = self.rules.len();
                return;
            }
        };

        let mut feature_lits: HashMap<SolvableId, Vec<Literal>> = HashMap::new();
        let mut update_lits: HashMap<SolvableId, Vec<Literal>> = HashMap::new();
        for &s in &installed {
            let all =
                policy::find_update_packages(&self.pool, &self.flags, &self.obsolete_index, s, true);

            let update = if self.dup_all || self.dupinvolved.contains(s) {
                self.dup_update_literals(s, &all)
            } else {
                let allowed = policy::find_update_packages(
                    &self.pool,
                    &self.flags,
                    &self.obsolete_index,
                    s,
                    false,
                );
                let mut lits = vec![Literal::positive(s)];
                lits.extend(allowed.into_iter().map(Literal::positive));
                lits
            };
            update_lits.insert(s, update);

            let mut flits = vec![Literal::positive(s)];
            flits.extend(all.into_iter().map(Literal::positive));
            feature_lits.insert(s, flits);
        }

        let weak = self.flags.allow_uninstall;

        // Feature rules first: their range precedes the update range
        for &s in &installed {
            let flits = &feature_lits[&s];
            if flits == &update_lits[&s] {
                // Identical to the update rule; zeroed to save work
                continue;
            }
            let mut rule = Rule::new(flits.clone(), RuleClass::Feature { installed: s });
            rule.enabled = false;
            rule.weak = weak;
            let id = self.push_rule(rule);
            self.feature_rule_of.insert(s, id);
        }
        self.ranges.feature_end = self.rules.len();

        for &s in &installed {
            let literals = update_lits.remove(&s).unwrap();
            if literals.is_empty() {
                // Distupgrade leftover with no replacement: the orphan
                // phase takes care of it
                continue;
            }
            let mut rule = Rule::new(literals, RuleClass::Update { installed: s });
            rule.weak = weak;
            let id = self.push_rule(rule);
            self.update_rule_of.insert(s, id);
        }
        self.ranges.update_end = self.rules.len();
    }

    /// The update-rule literals of a package involved in a distupgrade:
    /// only dup-map members may stand in for it, and the package itself
    /// only stays a candidate when the dup map covers it. No candidates at
    /// all means the orphan phase decides; candidates barred by policy
    /// only mean the package is kept, which the dup rule then contests.
    fn dup_update_literals(&self, s: SolvableId, all_updates: &[SolvableId]) -> Vec<Literal> {
        let in_dup = self.dupmap.contains(s)
            || self.dupmap.iter().any(|t| self.pool.identical(s, t));

        let name = self.pool.solvable(s).name;
        let mut targets: Vec<SolvableId> = all_updates
            .iter()
            .copied()
            .filter(|&p| self.dupmap.contains(p))
            .filter(|&p| {
                self.flags.allow_namechange || self.pool.solvable(p).name == name
            })
            .collect();

        if targets.is_empty() && !in_dup {
            let any_replacement = all_updates.iter().any(|&p| self.dupmap.contains(p));
            return if any_replacement {
                vec![Literal::positive(s)]
            } else {
                Vec::new()
            };
        }

        let mut literals = Vec::new();
        if in_dup {
            literals.push(Literal::positive(s));
        }
        literals.extend(targets.drain(..).map(Literal::positive));
        literals
    }

    // ---- job rules -------------------------------------------------------

    fn add_job_rules(&mut self) {
        let jobs = self.jobs.clone();
        for (index, job) in jobs.iter().enumerate() {
            match job.action {
                JobAction::Install => self.add_install_job_rule(index, job),
                JobAction::Erase => self.add_erase_job_rules(index, job),
                JobAction::Lock => self.add_lock_job_rules(index, job),
                // The remaining actions only populate solver maps
                _ => {}
            }
        }
    }

    fn add_install_job_rule(&mut self, index: usize, job: &Job) {
        let candidates: Vec<SolvableId> = job
            .candidates(&self.pool)
            .into_iter()
            .filter(|&s| self.pool.installable(s))
            .collect();

        if candidates.is_empty() {
            if job.flags.weak {
                return;
            }
            // Unsatisfiable marker: conflicts with the system seed and
            // surfaces as a problem naming this job
            let mut rule = Rule::new(
                vec![Literal::negative(SolvableId::system())],
                RuleClass::Job { index },
            );
            rule.weak = false;
            self.push_rule(rule);
            return;
        }

        let literals = candidates.into_iter().map(Literal::positive).collect();
        let mut rule = Rule::new(literals, RuleClass::Job { index });
        rule.weak = job.flags.weak;
        self.push_rule(rule);
    }

    fn add_erase_job_rules(&mut self, index: usize, job: &Job) {
        // Forbid every matched candidate, installed or not
        let candidates = job.candidates(&self.pool);
        for s in candidates {
            let mut rule = Rule::new(
                vec![Literal::negative(s)],
                RuleClass::Job { index },
            );
            rule.weak = job.flags.weak;
            self.push_rule(rule);
        }
    }

    fn add_lock_job_rules(&mut self, index: usize, job: &Job) {
        for s in job.candidates(&self.pool) {
            let literal = if self.pool.is_installed(s) {
                Literal::positive(s)
            } else {
                Literal::negative(s)
            };
            let mut rule = Rule::new(vec![literal], RuleClass::Job { index });
            rule.weak = job.flags.weak;
            self.push_rule(rule);
        }
    }

    // ---- infarch rules ---------------------------------------------------

    /// For names available in several architectures, forbid the candidates
    /// whose architecture scores strictly worse than the best one, keeping
    /// installed packages and their architectures.
    fn add_infarch_rules(&mut self) {
        if self.flags.no_infarch_check {
            return;
        }

        let mut by_name: HashMap<_, Vec<SolvableId>> = HashMap::new();
        for s in self.pool.solvables() {
            if self.pool.installable(s) {
                by_name.entry(self.pool.solvable(s).name).or_default().push(s);
            }
        }

        let mut names: Vec<_> = by_name.keys().copied().collect();
        names.sort_by(|&a, &b| self.pool.name_str(a).cmp(self.pool.name_str(b)));

        for name in names {
            let candidates = &by_name[&name];
            let scored: Vec<(SolvableId, u32)> = candidates
                .iter()
                .filter(|&&s| !self.pool.is_noarch(self.pool.solvable(s).arch))
                .filter_map(|&s| {
                    self.pool
                        .arch_score(self.pool.solvable(s).arch)
                        .map(|score| (s, score))
                })
                .collect();
            let distinct: HashSet<u32> = scored.iter().map(|&(_, score)| score).collect();
            if distinct.len() < 2 {
                continue;
            }
            let best = *distinct.iter().min().unwrap();

            // Architectures used by installed packages stay allowed
            let allowed: HashSet<_> = candidates
                .iter()
                .filter(|&&s| self.pool.is_installed(s))
                .map(|&s| self.pool.solvable(s).arch)
                .collect();

            for &(s, score) in &scored {
                if score > best
                    && !self.pool.is_installed(s)
                    && !allowed.contains(&self.pool.solvable(s).arch)
                {
                    self.push_rule(Rule::new(
                        vec![Literal::negative(s)],
                        RuleClass::InfArch { solvable: s },
                    ));
                }
            }
        }
    }

    // ---- dup rules -------------------------------------------------------

    /// Populates `dupmap`/`dupinvolved` from the distupgrade jobs and
    /// forces replacement of involved installed packages that have no
    /// identical counterpart in the target set. Installed packages without
    /// any replacement become orphans.
    fn add_dup_rules(&mut self) {
        if !self.dup_all && self.dupmap.is_empty() {
            return;
        }
        let Some(installed) = self.pool.installed_repo() else {
            return;
        };

        let members = self.pool.repo_solvables(installed).to_vec();
        for s in members {
            if !self.dup_all && !self.dupinvolved.contains(s) {
                continue;
            }
            if self.dupmap.contains(s) {
                continue;
            }

            let name = self.pool.solvable(s).name;
            let identical = self
                .dupmap
                .iter()
                .any(|t| self.pool.identical(s, t));
            if identical {
                continue;
            }

            let replacement_exists = self.dupmap.iter().any(|t| {
                self.pool.solvable(t).name == name || self.pool.obsoletes(t, s)
            });
            if replacement_exists {
                self.push_rule(Rule::new(
                    vec![Literal::negative(s)],
                    RuleClass::Dup { solvable: s },
                ));
            } else {
                self.orphaned.push(s);
            }
        }
        self.orphaned.sort_unstable();
    }

    // ---- best rules ------------------------------------------------------

    fn add_best_rules(&mut self) {
        let jobs = self.jobs.clone();
        for (index, job) in jobs.iter().enumerate() {
            if job.action != JobAction::Install || !job.flags.forcebest {
                continue;
            }
            let mut candidates: Vec<SolvableId> = job
                .candidates(&self.pool)
                .into_iter()
                .filter(|&s| self.pool.installable(s))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            policy::filter_unwanted(&self.pool, &mut candidates, policy::PolicyMode::Recommend);
            let literals = candidates.into_iter().map(Literal::positive).collect();
            self.push_rule(Rule::new(
                literals,
                RuleClass::Best {
                    origin: BestOrigin::Job(index),
                },
            ));
        }

        let best_installed: Vec<SolvableId> = self.bestupdatemap.iter().collect();
        for s in best_installed {
            let base = if self.flags.best_obey_policy {
                self.update_rule_of.get(&s)
            } else {
                self.feature_rule_of.get(&s).or(self.update_rule_of.get(&s))
            };
            let Some(&base) = base else { continue };

            let mut candidates: Vec<SolvableId> = self.rules[base.index()]
                .literals
                .iter()
                .filter(|lit| !lit.negate)
                .map(|lit| lit.solvable)
                .collect();
            policy::filter_unwanted(&self.pool, &mut candidates, policy::PolicyMode::Recommend);
            if candidates.is_empty() {
                continue;
            }
            let literals = candidates.into_iter().map(Literal::positive).collect();
            self.push_rule(Rule::new(
                literals,
                RuleClass::Best {
                    origin: BestOrigin::Installed(s),
                },
            ));
        }
    }

    // ---- choice rules ----------------------------------------------------

    /// For each pkg requires rule, emit a weak duplicate holding only the
    /// providers that do not push aside an installed package also named by
    /// the rule. Dropping the duplicate on conflict is silent.
    fn add_choice_rules(&mut self) {
        if self.pool.installed_repo().is_none() {
            return;
        }

        let mut new_rules = Vec::new();
        for rid in 0..self.ranges.pkg_end {
            let rule = &self.rules[rid];
            if !matches!(
                rule.class,
                RuleClass::Pkg(PkgRule {
                    kind: PkgRuleKind::Requires { .. },
                    ..
                })
            ) {
                continue;
            }
            let positives: Vec<SolvableId> = rule
                .literals
                .iter()
                .filter(|lit| !lit.negate)
                .map(|lit| lit.solvable)
                .collect();
            if positives.len() < 2 {
                continue;
            }

            let installed_named: Vec<SolvableId> = positives
                .iter()
                .copied()
                .filter(|&p| self.pool.is_installed(p))
                .collect();
            if installed_named.is_empty() {
                continue;
            }

            let preferred: Vec<SolvableId> = positives
                .iter()
                .copied()
                .filter(|&p| {
                    if self.pool.is_installed(p) {
                        return true;
                    }
                    // Drop candidates that would replace one of the
                    // installed providers of the same rule
                    !installed_named.iter().any(|&q| {
                        self.pool.solvable(p).name == self.pool.solvable(q).name
                            || self.pool.obsoletes(p, q)
                    })
                })
                .collect();

            if preferred.is_empty() || preferred.len() == positives.len() {
                continue;
            }

            let negative = rule.literals[0];
            debug_assert!(negative.negate);
            let mut literals = vec![negative];
            literals.extend(preferred.into_iter().map(Literal::positive));
            let mut choice = Rule::new(
                literals,
                RuleClass::Choice {
                    pkg_rule: RuleId::new(rid),
                },
            );
            choice.weak = true;
            new_rules.push(choice);
        }

        for rule in new_rules {
            self.push_rule(rule);
        }
    }
}

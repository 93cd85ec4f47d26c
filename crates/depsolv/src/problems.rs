//! Problems and solutions: when a solve is unsolvable, each problem holds
//! the rules of one unsolvable core, and each solution describes the
//! minimal set of job relaxations that would make the system solvable.

use std::collections::HashSet;
use std::fmt;

use crate::internal::id::{RuleId, SolvableId};
use crate::job::{Job, JobAction, JobQueue, JobTarget};
use crate::policy;
use crate::rules::{BestOrigin, PkgRule, PkgRuleKind, RuleClass};
use crate::solver::Solver;

/// One unsolvable core: the rules whose conjunction cannot be satisfied,
/// plus the proof rules leading there.
#[derive(Clone, Debug)]
pub struct Problem {
    /// Every rule involved in deriving the conflict, learnt rules expanded
    /// to their causes.
    pub(crate) proof: Vec<RuleId>,
    /// The deduplicated problem rule set shown to the user.
    pub(crate) rules: Vec<RuleId>,
}

/// One way out of a problem: apply all elements, re-solve, and the problem
/// disappears.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Solution {
    /// The job relaxations making up this solution.
    pub elements: Vec<SolutionElement>,
}

/// A single user-actionable relaxation.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum SolutionElement {
    /// Drop the job at the given queue index.
    DeleteJob {
        /// Index into the job queue passed to solve.
        job: usize,
    },
    /// Keep/install the package although its architecture is inferior.
    AllowInfArch {
        /// The package the infarch rule forbade.
        solvable: SolvableId,
    },
    /// Keep the package although the distupgrade repos do not contain it.
    AllowDistUpgradeKeep {
        /// The installed package the dup rule forced out.
        solvable: SolvableId,
    },
    /// Accept a candidate that is not among the best ones.
    AllowBest {
        /// The installed package whose best-update requirement is lifted,
        /// when the best rule came from an installed package.
        solvable: Option<SolvableId>,
        /// The job whose forcebest flag is lifted, when it came from a job.
        job: Option<usize>,
    },
    /// Replace the installed package, accepting the listed illegal changes.
    Replace {
        /// The installed package to replace.
        installed: SolvableId,
        /// Its replacement.
        replacement: SolvableId,
        /// `policy::ILLEGAL_*` bits describing what the replacement does.
        illegal: u8,
    },
    /// Erase the installed package.
    Erase {
        /// The installed package to remove.
        solvable: SolvableId,
    },
}

impl Solver {
    /// The problems of the last solve.
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// The number of problems of the last solve.
    pub fn problem_count(&self) -> usize {
        self.problems.len()
    }

    /// Picks the single rule that best explains the problem, favoring
    /// requirement assertions, then conflicts, then job assertions, then
    /// requires of installed packages, then other package rules, and only
    /// then update/job rules.
    pub fn find_problem_rule(&self, problem: usize) -> Option<RuleId> {
        let problem = self.problems.get(problem)?;
        problem
            .rules
            .iter()
            .copied()
            .min_by_key(|&rid| {
                let rule = &self.rules[rid.index()];
                let class_rank = match &rule.class {
                    RuleClass::Pkg(PkgRule { kind, solvable }) => match kind {
                        PkgRuleKind::NothingProvides { .. } | PkgRuleKind::NotInstallable => 0,
                        PkgRuleKind::Requires { .. } => {
                            if self.pool.is_installed(*solvable) {
                                3
                            } else {
                                4
                            }
                        }
                        _ => 5,
                    },
                    RuleClass::Job { .. } if rule.is_assertion() => 2,
                    RuleClass::Job { .. } => 6,
                    RuleClass::Update { .. } | RuleClass::Feature { .. } => 7,
                    RuleClass::InfArch { .. } | RuleClass::Dup { .. } => 8,
                    _ => 9,
                };
                (class_rank, rid)
            })
    }

    /// Every non-learnt rule involved in the problem's proof, deduplicated.
    pub fn find_all_problem_rules(&self, problem: usize) -> Vec<RuleId> {
        let Some(problem) = self.problems.get(problem) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        problem
            .proof
            .iter()
            .copied()
            .filter(|&rid| seen.insert(rid))
            .collect()
    }

    /// A short human-readable description of a rule, for problem reports.
    pub fn describe_rule(&self, rid: RuleId) -> String {
        let pool = &self.pool;
        let rule = &self.rules[rid.index()];
        match &rule.class {
            RuleClass::Pkg(PkgRule { solvable, kind }) => match kind {
                PkgRuleKind::NotInstallable => {
                    format!("package {} is not installable", pool.display(*solvable))
                }
                PkgRuleKind::NothingProvides { dep } => format!(
                    "nothing provides {} needed by {}",
                    pool.dep_str(*dep),
                    pool.display(*solvable)
                ),
                PkgRuleKind::Requires { dep } => format!(
                    "package {} requires {}, but none of the providers can be installed",
                    pool.display(*solvable),
                    pool.dep_str(*dep)
                ),
                PkgRuleKind::Conflicts { with, dep } => format!(
                    "package {} conflicts with {} provided by {}",
                    pool.display(*solvable),
                    pool.dep_str(*dep),
                    pool.display(*with)
                ),
                PkgRuleKind::SelfConflict { dep } => format!(
                    "package {} conflicts with {} provided by itself",
                    pool.display(*solvable),
                    pool.dep_str(*dep)
                ),
                PkgRuleKind::Obsoletes { with, dep } => format!(
                    "package {} obsoletes {} provided by {}",
                    pool.display(*solvable),
                    pool.dep_str(*dep),
                    pool.display(*with)
                ),
                PkgRuleKind::ImplicitObsoletes { with } => format!(
                    "package {} implicitly obsoletes {}",
                    pool.display(*solvable),
                    pool.display(*with)
                ),
                PkgRuleKind::InstalledObsoletes { with, dep } => format!(
                    "installed package {} obsoletes {} provided by {}",
                    pool.display(*solvable),
                    pool.dep_str(*dep),
                    pool.display(*with)
                ),
            },
            RuleClass::Feature { installed } | RuleClass::Update { installed } => format!(
                "problem with installed package {}",
                pool.display(*installed)
            ),
            RuleClass::Job { index } => match self.jobs.get(*index) {
                Some(job) => format!("conflicting requests: {}", self.describe_job(job)),
                None => "conflicting requests".to_string(),
            },
            RuleClass::InfArch { solvable } => format!(
                "{} has inferior architecture",
                pool.display(*solvable)
            ),
            RuleClass::Dup { solvable } => format!(
                "installed package {} not kept by the distupgrade",
                pool.display(*solvable)
            ),
            RuleClass::Best { origin } => match origin {
                BestOrigin::Job(index) => match self.jobs.get(*index) {
                    Some(job) => format!(
                        "cannot install the best candidate for {}",
                        self.describe_job(job)
                    ),
                    None => "cannot install the best candidate".to_string(),
                },
                BestOrigin::Installed(s) => format!(
                    "cannot install the best update candidate for {}",
                    pool.display(*s)
                ),
            },
            RuleClass::Choice { pkg_rule } => self.describe_rule(*pkg_rule),
            RuleClass::Learnt { .. } => "learnt rule".to_string(),
        }
    }

    /// Renders a job the way the testcase format writes it.
    pub fn describe_job(&self, job: &Job) -> String {
        let what = match &job.target {
            JobTarget::Solvable(s) => format!("pkg {}", self.pool.display(*s)),
            JobTarget::Name(dep) => format!("name {}", self.pool.dep_str(*dep)),
            JobTarget::Provides(dep) => format!("provides {}", self.pool.dep_str(*dep)),
            JobTarget::OneOf(ids) => format!(
                "oneof {}",
                ids.iter()
                    .map(|&s| self.pool.display(s).to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
            JobTarget::Repo(repo) => format!("repo {}", self.pool.repo_name(*repo)),
            JobTarget::All => "all packages".to_string(),
        };
        format!("{} {}", job.action.name(), what)
    }

    /// The solutions for a problem, refined on demand and cached. The
    /// solver state is restored afterwards, so the decision queue of the
    /// original solve stays valid.
    pub fn solutions(&mut self, problem: usize) -> Vec<Solution> {
        if let Some(cached) = self.solutions_cache.get(&problem) {
            return cached.clone();
        }
        if problem >= self.problems.len() {
            return Vec::new();
        }

        let saved_problems = std::mem::take(&mut self.problems);
        // Learnt rules entail the original enablement; refinement toggles
        // rules, so they are dropped and re-learnt as needed
        let learnt_floor = self.ranges.choice_end;
        let enablement: Vec<bool> = self.rules[..learnt_floor]
            .iter()
            .map(|r| r.enabled)
            .collect();

        let problem_rules = saved_problems[problem].rules.clone();
        let mut solutions = self.refine_all(&enablement, &problem_rules, false);
        if solutions.is_empty() {
            solutions = self.refine_all(&enablement, &problem_rules, true);
        }
        solutions.dedup();

        // Restore the solver to its post-solve state and recompute the
        // decision queue of the original solve
        self.reset_rules_for_refinement(&enablement, learnt_floor);
        self.problems = saved_problems;
        let expected = self.problems.len();
        self.run_sat(false, !self.flags.ignore_recommended);
        self.problems.truncate(expected);

        self.solutions_cache.insert(problem, solutions.clone());
        solutions
    }

    /// Drops learnt rules and restores the recorded enablement.
    fn reset_rules_for_refinement(&mut self, enablement: &[bool], learnt_floor: usize) {
        self.rules.truncate(learnt_floor);
        self.rule_assertions.retain(|rid| rid.index() < learnt_floor);
        self.learnt_why.clear();
        for (index, &enabled) in enablement.iter().enumerate() {
            self.rules[index].enabled = enabled;
        }
        self.make_watches();
    }

    fn refine_all(
        &mut self,
        enablement: &[bool],
        problem_rules: &[RuleId],
        essential_ok: bool,
    ) -> Vec<Solution> {
        let mut solutions = Vec::new();
        for &sug in problem_rules {
            if !self.rules[sug.index()].class.is_disablable() {
                continue;
            }
            if !essential_ok {
                if let RuleClass::Job { index } = self.rules[sug.index()].class {
                    if self
                        .jobs
                        .get(index)
                        .map(|j| j.flags.essential)
                        .unwrap_or(false)
                    {
                        continue;
                    }
                }
            }

            if let Some(refined) = self.refine_suggestion(enablement, problem_rules, sug) {
                let elements = self.convert_refined(&refined);
                if !elements.is_empty() {
                    let solution = Solution { elements };
                    if !solutions.contains(&solution) {
                        solutions.push(solution);
                    }
                }
            }
        }
        solutions
    }

    /// Tries to turn the violation of `sug` into a full solution: keep
    /// `sug` disabled, re-enable the problem's other rules, and solve. Any
    /// fresh conflict contributes its disablable rules to the refinement
    /// (they get disabled too) until the system solves; the refined set is
    /// the solution. Returns `None` when even that does not solve.
    fn refine_suggestion(
        &mut self,
        enablement: &[bool],
        problem_rules: &[RuleId],
        sug: RuleId,
    ) -> Option<Vec<RuleId>> {
        let learnt_floor = self.ranges.choice_end;
        let mut refined = vec![sug];

        let mut result = None;
        let max_rounds = problem_rules.len() + learnt_floor + 1;
        for _ in 0..max_rounds {
            // Fresh start: no learnt rules, recorded enablement, the
            // problem's rules enabled again except the refined set
            self.reset_rules_for_refinement(enablement, learnt_floor);
            for &rid in problem_rules {
                self.enable_problem_rule(rid);
            }
            for &rid in refined.clone().iter() {
                self.disable_problem_rule(rid);
            }

            let base = self.problems.len();
            self.run_sat(false, !self.flags.ignore_recommended);
            let fresh: Vec<Problem> = self.problems.split_off(base);

            let Some(first) = fresh.first() else {
                // Solvable with the refined set disabled: we are done
                result = Some(refined.clone());
                break;
            };

            let candidates: Vec<RuleId> = first
                .rules
                .iter()
                .copied()
                .filter(|&r| {
                    !refined.contains(&r) && self.rules[r.index()].class.is_disablable()
                })
                .collect();
            if candidates.is_empty() {
                // Nothing left to relax; violating sug does not help
                break;
            }
            refined.extend(candidates);
        }

        result
    }

    /// Maps the refined rules into user-actionable elements, evaluated
    /// against the decision map of the successful refinement run.
    fn convert_refined(&self, refined: &[RuleId]) -> Vec<SolutionElement> {
        let mut elements = Vec::new();
        for &rid in refined {
            match self.rules[rid.index()].class.clone() {
                RuleClass::Job { index } => {
                    let element = SolutionElement::DeleteJob { job: index };
                    if !elements.contains(&element) {
                        elements.push(element);
                    }
                }
                RuleClass::InfArch { solvable } => {
                    elements.push(SolutionElement::AllowInfArch { solvable });
                }
                RuleClass::Dup { solvable } => {
                    elements.push(SolutionElement::AllowDistUpgradeKeep { solvable });
                }
                RuleClass::Best { origin } => {
                    let (solvable, job) = match origin {
                        BestOrigin::Installed(s) => (Some(s), None),
                        BestOrigin::Job(j) => (None, Some(j)),
                    };
                    elements.push(SolutionElement::AllowBest { solvable, job });
                }
                RuleClass::Update { installed } | RuleClass::Feature { installed } => {
                    let replacement = self.replacement_for(installed);
                    match replacement {
                        // Still installed: relaxing the rule needed no action
                        Some(replacement) if replacement == installed => {}
                        Some(replacement) => {
                            let illegal = policy::illegal_change(
                                &self.pool,
                                &self.flags,
                                installed,
                                replacement,
                            );
                            elements.push(SolutionElement::Replace {
                                installed,
                                replacement,
                                illegal,
                            });
                        }
                        None => elements.push(SolutionElement::Erase { solvable: installed }),
                    }
                }
                RuleClass::Choice { .. } | RuleClass::Pkg(_) | RuleClass::Learnt { .. } => {}
            }
        }
        elements
    }

    /// The decided-true package that stands in for the installed one, if
    /// any: same name, or an obsoleter.
    fn replacement_for(&self, installed: SolvableId) -> Option<SolvableId> {
        let map = self.decisions.map();
        if map.value(installed) == Some(true) {
            return Some(installed);
        }
        let name = self.pool.solvable(installed).name;
        self.pool
            .solvables()
            .filter(|&p| p != installed && map.value(p) == Some(true))
            .find(|&p| self.pool.solvable(p).name == name || self.pool.obsoletes(p, installed))
    }

    /// Applies a solution by rewriting the job queue: deleted jobs become
    /// noops, replacements/erasures become targeted jobs the solver will
    /// honor on the next solve.
    pub fn take_solution(&mut self, solution: &Solution, jobs: &mut JobQueue) {
        for element in &solution.elements {
            match element {
                SolutionElement::DeleteJob { job } => {
                    if let Some(entry) = jobs.jobs.get_mut(*job) {
                        entry.action = JobAction::Noop;
                    }
                }
                SolutionElement::AllowInfArch { solvable } => {
                    let mut job =
                        Job::new(JobAction::Install, JobTarget::Solvable(*solvable));
                    job.flags.weak = true;
                    jobs.push(job);
                }
                SolutionElement::AllowDistUpgradeKeep { solvable } => {
                    jobs.push(Job::new(JobAction::Lock, JobTarget::Solvable(*solvable)));
                }
                SolutionElement::AllowBest { job, .. } => {
                    if let Some(index) = job {
                        if let Some(entry) = jobs.jobs.get_mut(*index) {
                            entry.flags.forcebest = false;
                        }
                    }
                }
                SolutionElement::Replace {
                    installed,
                    replacement,
                    ..
                } => {
                    jobs.push(Job::new(
                        JobAction::Install,
                        JobTarget::Solvable(*replacement),
                    ));
                    jobs.push(Job::new(JobAction::Erase, JobTarget::Solvable(*installed)));
                }
                SolutionElement::Erase { solvable } => {
                    jobs.push(Job::new(JobAction::Erase, JobTarget::Solvable(*solvable)));
                }
            }
        }
    }

    /// Renders a solution element for result output.
    pub fn describe_solution_element(&self, element: &SolutionElement) -> String {
        match element {
            SolutionElement::DeleteJob { job } => match self.jobs.get(*job) {
                Some(j) => format!("deljob {}", self.describe_job(j)),
                None => format!("deljob {job}"),
            },
            SolutionElement::AllowInfArch { solvable } => {
                format!("allow {} despite its architecture", self.pool.display(*solvable))
            }
            SolutionElement::AllowDistUpgradeKeep { solvable } => {
                format!("keep obsolete {}", self.pool.display(*solvable))
            }
            SolutionElement::AllowBest { solvable, job } => match (solvable, job) {
                (Some(s), _) => format!("accept a non-best update for {}", self.pool.display(*s)),
                (None, Some(j)) => format!("drop the best requirement of job {j}"),
                _ => "drop a best requirement".to_string(),
            },
            SolutionElement::Replace {
                installed,
                replacement,
                illegal,
            } => {
                let mut text = format!(
                    "replace {} with {}",
                    self.pool.display(*installed),
                    self.pool.display(*replacement)
                );
                if illegal & policy::ILLEGAL_DOWNGRADE != 0 {
                    text.push_str(" (downgrade)");
                }
                if illegal & policy::ILLEGAL_ARCHCHANGE != 0 {
                    text.push_str(" (arch change)");
                }
                if illegal & policy::ILLEGAL_VENDORCHANGE != 0 {
                    text.push_str(" (vendor change)");
                }
                if illegal & policy::ILLEGAL_NAMECHANGE != 0 {
                    text.push_str(" (name change)");
                }
                text
            }
            SolutionElement::Erase { solvable } => {
                format!("erase {}", self.pool.display(*solvable))
            }
        }
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} element(s)", self.elements.len())
    }
}

//! The job queue a caller hands to [`crate::Solver::solve`].

use crate::internal::id::{DepId, RepoId, SolvableId};
use crate::pool::Pool;

/// What a job asks the solver to do.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum JobAction {
    Noop,
    Install,
    Erase,
    Update,
    /// Re-check (and repair) the dependencies of matched installed packages.
    Verify,
    /// Mark the matched packages as multiversion: several EVRs of the name
    /// may coexist.
    Multiversion,
    /// Pin the matched packages to their current state.
    Lock,
    DistUpgrade,
    DropOrphaned,
    /// Mark the matched installed packages as user-installed (cleandeps
    /// keeps them).
    UserInstalled,
}

impl JobAction {
    pub fn name(self) -> &'static str {
        match self {
            JobAction::Noop => "noop",
            JobAction::Install => "install",
            JobAction::Erase => "erase",
            JobAction::Update => "update",
            JobAction::Verify => "verify",
            JobAction::Multiversion => "multiversion",
            JobAction::Lock => "lock",
            JobAction::DistUpgrade => "distupgrade",
            JobAction::DropOrphaned => "droporphaned",
            JobAction::UserInstalled => "userinstalled",
        }
    }

    pub fn from_name(name: &str) -> Option<JobAction> {
        Some(match name {
            "noop" => JobAction::Noop,
            "install" => JobAction::Install,
            "erase" => JobAction::Erase,
            "update" => JobAction::Update,
            "verify" => JobAction::Verify,
            "multiversion" => JobAction::Multiversion,
            "lock" => JobAction::Lock,
            "distupgrade" => JobAction::DistUpgrade,
            "droporphaned" => JobAction::DropOrphaned,
            "userinstalled" => JobAction::UserInstalled,
            _ => return None,
        })
    }
}

/// What a job applies to.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum JobTarget {
    /// One concrete solvable.
    Solvable(SolvableId),
    /// All solvables whose *name* matches the dep.
    Name(DepId),
    /// All solvables *providing* the dep.
    Provides(DepId),
    /// An explicit candidate set; the job is satisfied by any one of them.
    OneOf(Vec<SolvableId>),
    /// Every solvable of a repo.
    Repo(RepoId),
    /// Every solvable.
    All,
}

/// Modifiers attached to a job.
#[derive(Copy, Clone, Default, Eq, PartialEq, Debug)]
pub struct JobFlags {
    /// A weak job is silently dropped when it conflicts.
    pub weak: bool,
    /// An essential job is only offered for removal by the problem layer as
    /// a last resort.
    pub essential: bool,
    /// Erase/update collateral: also drop dependencies that become unneeded.
    pub cleandeps: bool,
    /// Only the best candidates satisfy the job.
    pub forcebest: bool,
    /// The job names concrete targets rather than a state wish.
    pub targeted: bool,
}

/// One entry of the job queue.
#[derive(Clone, Debug)]
pub struct Job {
    pub action: JobAction,
    pub target: JobTarget,
    pub flags: JobFlags,
}

impl Job {
    pub fn new(action: JobAction, target: JobTarget) -> Self {
        Self {
            action,
            target,
            flags: JobFlags::default(),
        }
    }

    pub fn with_flags(action: JobAction, target: JobTarget, flags: JobFlags) -> Self {
        Self {
            action,
            target,
            flags,
        }
    }

    /// The solvables the job's target matches. For name targets this is
    /// restricted to providers that actually carry the name.
    pub(crate) fn candidates(&self, pool: &Pool) -> Vec<SolvableId> {
        match &self.target {
            JobTarget::Solvable(s) => vec![*s],
            JobTarget::Name(dep) => {
                let name = pool.dep(*dep).name();
                pool.providers(*dep)
                    .into_iter()
                    .filter(|&s| Some(pool.solvable(s).name) == name)
                    .collect()
            }
            JobTarget::Provides(dep) => pool.providers(*dep),
            JobTarget::OneOf(ids) => ids.clone(),
            JobTarget::Repo(repo) => pool.repo_solvables(*repo).to_vec(),
            JobTarget::All => pool.solvables().collect(),
        }
    }
}

/// An ordered list of jobs. Order matters: job rules are resolved in queue
/// order, and problems refer to jobs by their index.
#[derive(Clone, Default, Debug)]
pub struct JobQueue {
    pub(crate) jobs: Vec<Job>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: Job) {
        self.jobs.push(job);
    }

    pub fn remove(&mut self, index: usize) {
        self.jobs.remove(index);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Job> {
        self.jobs.get(index)
    }
}

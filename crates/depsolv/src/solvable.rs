use std::fmt::{Display, Formatter};

use crate::internal::id::{ArchId, DepId, EvrId, NameId, RepoId, VendorId};
use crate::pool::Pool;

/// A candidate package: installed, available, or the system pseudo-solvable.
///
/// The dependency fields hold interned relation ids; weak relations
/// (recommends and friends) influence selection but never constrain
/// solvability.
pub struct Solvable {
    pub name: NameId,
    pub evr: EvrId,
    pub arch: ArchId,
    pub vendor: Option<VendorId>,
    pub repo: RepoId,

    pub requires: Vec<DepId>,
    /// Requirements after the prereq marker; treated like `requires` by the
    /// rule builder but kept apart for the writer.
    pub prereqs: Vec<DepId>,
    pub provides: Vec<DepId>,
    pub obsoletes: Vec<DepId>,
    pub conflicts: Vec<DepId>,
    pub recommends: Vec<DepId>,
    pub suggests: Vec<DepId>,
    pub supplements: Vec<DepId>,
    pub enhances: Vec<DepId>,

    /// Build timestamp, carried for the testcase writer.
    pub build_time: Option<u64>,
    /// A disabled solvable is never installable.
    pub enabled: bool,
}

impl Solvable {
    pub(crate) fn new(
        repo: RepoId,
        name: NameId,
        evr: EvrId,
        arch: ArchId,
    ) -> Self {
        Self {
            name,
            evr,
            arch,
            vendor: None,
            repo,
            requires: Vec::new(),
            prereqs: Vec::new(),
            provides: Vec::new(),
            obsoletes: Vec::new(),
            conflicts: Vec::new(),
            recommends: Vec::new(),
            suggests: Vec::new(),
            supplements: Vec::new(),
            enhances: Vec::new(),
            build_time: None,
            enabled: true,
        }
    }

    /// All hard requirements, prereqs included.
    pub(crate) fn all_requires(&self) -> impl Iterator<Item = DepId> + '_ {
        self.requires.iter().chain(self.prereqs.iter()).copied()
    }
}

/// Renders a solvable as `name-evr.arch`, the form used in traces, problem
/// texts and testcase results.
pub struct SolvableDisplay<'pool> {
    pub(crate) pool: &'pool Pool,
    pub(crate) solvable: &'pool Solvable,
}

impl Display for SolvableDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}.{}",
            self.pool.name_str(self.solvable.name),
            self.pool.evr_str(self.solvable.evr),
            self.pool.arch_str(self.solvable.arch),
        )
    }
}

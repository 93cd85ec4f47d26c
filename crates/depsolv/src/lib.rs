//! A SAT-based package dependency resolver.
//!
//! Given a pool of package candidates, a set of installed packages and a
//! job queue (install this, erase that, upgrade, distupgrade, ...),
//! `depsolv` computes a consistent transaction, or — when there is none —
//! a set of *problems*, each with *solutions* describing the minimal job
//! relaxations that would make the system solvable.
//!
//! The engine is a CDCL solver (conflict-driven clause learning, masterly
//! explained in the [MiniSat paper](http://minisat.se/downloads/MiniSat.pdf))
//! with the rule layout of the libsolv family: package metadata compiles
//! into classed rules over solvable literals, a watched-literal engine
//! solves them, and a policy layer steers the free decisions toward the
//! newest version, the best architecture, the same vendor and installed
//! package retention.
//!
//! ```
//! use depsolv::{Job, JobAction, JobQueue, JobTarget, Pool, Solver};
//!
//! let mut pool = Pool::new();
//! let repo = pool.add_repo("available");
//! let a = pool.add_solvable(repo, "a", "1-1", "x86_64");
//! let dep = pool.parse_dep("b");
//! pool.solvable_mut(a).requires.push(dep);
//! pool.add_solvable(repo, "b", "1-1", "x86_64");
//! pool.set_arch("x86_64");
//! pool.create_whatprovides();
//!
//! let mut jobs = JobQueue::new();
//! let name = pool.parse_dep("a");
//! jobs.push(Job::new(JobAction::Install, JobTarget::Name(name)));
//!
//! let mut solver = Solver::new(pool);
//! assert_eq!(solver.solve(&jobs), 0);
//! assert_eq!(solver.transaction().steps.len(), 2);
//! ```

mod cleandeps;
mod dep;
pub mod evr;
mod flags;
mod internal;
mod job;
pub mod policy;
mod pool;
mod problems;
mod rules;
pub mod selection;
mod solvable;
mod solver;
pub mod testcase;
mod transaction;

pub use dep::{Dep, RelOp};
pub use flags::{PoolFlag, PoolFlags, SolverFlag, SolverFlags};
pub use internal::id::{
    ArchId, DepId, EvrId, NameId, RepoId, RuleId, SolvableId, VendorId,
};
pub use job::{Job, JobAction, JobFlags, JobQueue, JobTarget};
pub use pool::{NamespaceHandler, Pool, VendorCheck};
pub use problems::{Problem, Solution, SolutionElement};
pub use selection::{make_selection, Selection, SelectionError, SelectionFlags};
pub use solvable::{Solvable, SolvableDisplay};
pub use solver::Solver;
pub use transaction::{Step, Transaction};

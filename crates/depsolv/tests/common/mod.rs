#![allow(dead_code)]

use depsolv::{Pool, RepoId, SolvableId};

/// A pool with an installed repo and an available repo, x86_64 policy.
pub struct Fixture {
    pub pool: Pool,
    pub installed: RepoId,
    pub available: RepoId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut pool = Pool::new();
        let installed = pool.add_repo("@System");
        let available = pool.add_repo("available");
        pool.set_installed_repo(installed);
        pool.set_arch("x86_64");
        Self {
            pool,
            installed,
            available,
        }
    }

    pub fn installed_pkg(&mut self, name: &str, evr: &str) -> SolvableId {
        self.pool.add_solvable(self.installed, name, evr, "x86_64")
    }

    pub fn available_pkg(&mut self, name: &str, evr: &str) -> SolvableId {
        self.pool.add_solvable(self.available, name, evr, "x86_64")
    }

    pub fn requires(&mut self, s: SolvableId, dep: &str) {
        let dep = self.pool.parse_dep(dep);
        self.pool.solvable_mut(s).requires.push(dep);
    }

    pub fn provides(&mut self, s: SolvableId, dep: &str) {
        let dep = self.pool.parse_dep(dep);
        self.pool.solvable_mut(s).provides.push(dep);
    }

    pub fn conflicts(&mut self, s: SolvableId, dep: &str) {
        let dep = self.pool.parse_dep(dep);
        self.pool.solvable_mut(s).conflicts.push(dep);
    }

    pub fn obsoletes(&mut self, s: SolvableId, dep: &str) {
        let dep = self.pool.parse_dep(dep);
        self.pool.solvable_mut(s).obsoletes.push(dep);
    }

    pub fn recommends(&mut self, s: SolvableId, dep: &str) {
        let dep = self.pool.parse_dep(dep);
        self.pool.solvable_mut(s).recommends.push(dep);
    }

    pub fn supplements(&mut self, s: SolvableId, dep: &str) {
        let dep = self.pool.parse_dep(dep);
        self.pool.solvable_mut(s).supplements.push(dep);
    }

    pub fn ready(&mut self) {
        self.pool.create_whatprovides();
    }
}

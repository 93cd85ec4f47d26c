//! The pool interns every identifier the solver works with (names, EVRs,
//! architectures, vendors, structured relations) and owns the solvables and
//! the whatprovides index. It is read-only while a solver runs.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::dep::{Dep, RelOp};
use crate::evr;
use crate::flags::{PoolFlag, PoolFlags};
use crate::internal::arena::Arena;
use crate::internal::id::{ArchId, DepId, EvrId, NameId, RepoId, SolvableId, VendorId};
use crate::internal::mapping::Mapping;
use crate::solvable::{Solvable, SolvableDisplay};

/// Resolves namespace dependencies (`ns(arg)`), e.g. `splitprovides` or
/// host-probed capabilities. Implementations must be pure: the same call
/// always yields the same answer for the lifetime of the pool.
pub trait NamespaceHandler {
    /// Returns the solvables providing `ns(arg)`.
    fn providers(&self, pool: &Pool, ns: NameId, arg: EvrId) -> Vec<SolvableId>;
}

/// The default handler: no namespace resolves to anything.
struct NoNamespaces;

impl NamespaceHandler for NoNamespaces {
    fn providers(&self, _pool: &Pool, _ns: NameId, _arg: EvrId) -> Vec<SolvableId> {
        Vec::new()
    }
}

/// Custom vendor comparison, consulted before the vendor class tables.
/// Implementations must be pure and reentrant.
pub trait VendorCheck {
    fn same_vendor(&self, pool: &Pool, a: VendorId, b: VendorId) -> bool;
}

pub(crate) struct RepoData {
    pub name: String,
    pub priority: i32,
    pub subpriority: i32,
    pub solvables: Vec<SolvableId>,
}

/// A pool of package candidates plus the id spaces they live in.
pub struct Pool {
    pub(crate) solvables: Arena<SolvableId, Solvable>,
    pub(crate) repos: Arena<RepoId, RepoData>,
    installed: Option<RepoId>,

    names: Arena<NameId, String>,
    names_to_ids: HashMap<String, NameId>,
    evrs: Arena<EvrId, String>,
    evrs_to_ids: HashMap<String, EvrId>,
    arches: Arena<ArchId, String>,
    arches_to_ids: HashMap<String, ArchId>,
    vendors: Arena<VendorId, String>,
    vendors_to_ids: HashMap<String, VendorId>,
    deps: Arena<DepId, Dep>,
    deps_to_ids: HashMap<Dep, DepId>,

    /// Position of each arch in the active arch policy; lower is better.
    /// Arches absent from the policy are not installable (except noarch).
    arch_scores: HashMap<ArchId, u32>,
    noarch: Option<ArchId>,
    arch_set: bool,
    configured_arch: Option<String>,

    vendor_classes: Vec<Vec<VendorId>>,
    vendor_check: Option<Box<dyn VendorCheck>>,

    pub(crate) flags: PoolFlags,

    namespaces: Box<dyn NamespaceHandler>,

    /// name -> solvables carrying that name
    packages_by_name: Mapping<NameId, Vec<SolvableId>>,
    /// name -> solvables whose name or explicit provides mention it
    providers_by_name: Mapping<NameId, Vec<SolvableId>>,
    whatprovides_ready: bool,
    whatprovides_cache: RefCell<HashMap<DepId, Vec<SolvableId>>>,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    pub fn new() -> Self {
        let mut pool = Self {
            solvables: Arena::new(),
            repos: Arena::new(),
            installed: None,
            names: Arena::new(),
            names_to_ids: HashMap::new(),
            evrs: Arena::new(),
            evrs_to_ids: HashMap::new(),
            arches: Arena::new(),
            arches_to_ids: HashMap::new(),
            vendors: Arena::new(),
            vendors_to_ids: HashMap::new(),
            deps: Arena::new(),
            deps_to_ids: HashMap::new(),
            arch_scores: HashMap::new(),
            noarch: None,
            arch_set: false,
            configured_arch: None,
            vendor_classes: Vec::new(),
            vendor_check: None,
            flags: PoolFlags::default(),
            namespaces: Box::new(NoNamespaces),
            packages_by_name: Mapping::empty(),
            providers_by_name: Mapping::empty(),
            whatprovides_ready: false,
            whatprovides_cache: RefCell::new(HashMap::new()),
        };

        // Solvable 0 is the system pseudo-solvable
        let system_repo = pool.add_repo("@system-pseudo");
        let name = pool.intern_name("system:system");
        let evr = pool.intern_evr("0");
        let arch = pool.intern_arch("noarch");
        let system = pool
            .solvables
            .alloc(Solvable::new(system_repo, name, evr, arch));
        pool.repos[system_repo].solvables.push(system);
        debug_assert!(system.is_system());

        pool
    }

    // ---- repos -----------------------------------------------------------

    pub fn add_repo(&mut self, name: &str) -> RepoId {
        self.repos.alloc(RepoData {
            name: name.to_string(),
            priority: 0,
            subpriority: 0,
            solvables: Vec::new(),
        })
    }

    pub fn set_repo_priority(&mut self, repo: RepoId, priority: i32, subpriority: i32) {
        self.repos[repo].priority = priority;
        self.repos[repo].subpriority = subpriority;
    }

    pub fn repo_name(&self, repo: RepoId) -> &str {
        &self.repos[repo].name
    }

    pub fn repo_priority(&self, repo: RepoId) -> (i32, i32) {
        (self.repos[repo].priority, self.repos[repo].subpriority)
    }

    pub fn find_repo(&self, name: &str) -> Option<RepoId> {
        self.repos.iter().find(|(_, r)| r.name == name).map(|(id, _)| id)
    }

    pub fn repo_solvables(&self, repo: RepoId) -> &[SolvableId] {
        &self.repos[repo].solvables
    }

    pub fn repos(&self) -> impl Iterator<Item = RepoId> + '_ {
        // Repo 0 backs the system pseudo-solvable and is not user-visible
        self.repos.ids().skip(1)
    }

    /// Marks a repo as holding the installed packages.
    pub fn set_installed_repo(&mut self, repo: RepoId) {
        self.installed = Some(repo);
    }

    pub fn installed_repo(&self) -> Option<RepoId> {
        self.installed
    }

    pub fn is_installed(&self, solvable: SolvableId) -> bool {
        solvable.is_system()
            || Some(self.solvables[solvable].repo) == self.installed
    }

    // ---- interning -------------------------------------------------------

    pub fn intern_name(&mut self, name: &str) -> NameId {
        match self.names_to_ids.entry(name.to_string()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id = self.names.alloc(entry.key().clone());
                entry.insert(id);
                id
            }
        }
    }

    pub fn lookup_name(&self, name: &str) -> Option<NameId> {
        self.names_to_ids.get(name).copied()
    }

    pub fn name_str(&self, id: NameId) -> &str {
        &self.names[id]
    }

    pub fn intern_evr(&mut self, evr: &str) -> EvrId {
        match self.evrs_to_ids.entry(evr.to_string()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id = self.evrs.alloc(entry.key().clone());
                entry.insert(id);
                id
            }
        }
    }

    pub fn evr_str(&self, id: EvrId) -> &str {
        &self.evrs[id]
    }

    pub fn intern_arch(&mut self, arch: &str) -> ArchId {
        match self.arches_to_ids.entry(arch.to_string()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id = self.arches.alloc(entry.key().clone());
                entry.insert(id);
                id
            }
        }
    }

    pub fn arch_str(&self, id: ArchId) -> &str {
        &self.arches[id]
    }

    pub fn lookup_arch(&self, arch: &str) -> Option<ArchId> {
        self.arches_to_ids.get(arch).copied()
    }

    /// All interned names with their strings, in id order.
    pub fn names(&self) -> impl Iterator<Item = (NameId, &str)> {
        self.names.iter().map(|(id, s)| (id, s.as_str()))
    }

    pub fn intern_vendor(&mut self, vendor: &str) -> VendorId {
        match self.vendors_to_ids.entry(vendor.to_string()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id = self.vendors.alloc(entry.key().clone());
                entry.insert(id);
                id
            }
        }
    }

    pub fn vendor_str(&self, id: VendorId) -> &str {
        &self.vendors[id]
    }

    pub fn intern_dep(&mut self, dep: Dep) -> DepId {
        match self.deps_to_ids.entry(dep) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id = self.deps.alloc(entry.key().clone());
                entry.insert(id);
                id
            }
        }
    }

    pub fn dep(&self, id: DepId) -> &Dep {
        &self.deps[id]
    }

    /// Interns a dependency given in the textual `name [op evr]` form used
    /// by the testcase format. `&` joins two relations, namespace deps are
    /// written `ns(arg)`.
    pub fn parse_dep(&mut self, text: &str) -> DepId {
        let text = text.trim();
        if let Some((left, right)) = split_infix(text, " & ") {
            let l = self.parse_dep(&left);
            let r = self.parse_dep(&right);
            return self.intern_dep(Dep::And(l, r));
        }
        if let Some((left, right)) = split_infix(text, " | ") {
            let l = self.parse_dep(&left);
            let r = self.parse_dep(&right);
            return self.intern_dep(Dep::Or(l, r));
        }

        let mut parts = text.split_whitespace();
        let name_part = parts.next().unwrap_or("");
        let op = parts.next().and_then(RelOp::parse);
        let evr_part = parts.next();

        if op.is_none() {
            if let Some((ns, arg)) = parse_namespace_call(name_part) {
                let ns = self.intern_name(ns);
                let arg = self.intern_evr(arg);
                return self.intern_dep(Dep::Namespace { ns, arg });
            }
        }

        let name = self.intern_name(name_part);
        match (op, evr_part) {
            (Some(op), Some(evr)) => {
                let evr = self.intern_evr(evr);
                self.intern_dep(Dep::Rel { name, op, evr })
            }
            _ => self.intern_dep(Dep::Name(name)),
        }
    }

    /// Renders a dep back into the textual form accepted by [`Pool::parse_dep`].
    pub fn dep_str(&self, id: DepId) -> String {
        match self.dep(id) {
            Dep::Name(name) => self.name_str(*name).to_string(),
            Dep::Rel { name, op, evr } => format!(
                "{} {} {}",
                self.name_str(*name),
                op,
                self.evr_str(*evr)
            ),
            Dep::And(l, r) => format!("{} & {}", self.dep_str(*l), self.dep_str(*r)),
            Dep::Or(l, r) => format!("{} | {}", self.dep_str(*l), self.dep_str(*r)),
            Dep::Arch(d, arch) => format!("{}.{}", self.dep_str(*d), self.arch_str(*arch)),
            Dep::Namespace { ns, arg } => {
                format!("{}({})", self.name_str(*ns), self.evr_str(*arg))
            }
        }
    }

    // ---- configuration ---------------------------------------------------

    pub fn set_flag(&mut self, flag: PoolFlag, value: bool) -> bool {
        let field = self.flags.field(flag);
        std::mem::replace(field, value)
    }

    pub fn flags(&self) -> &PoolFlags {
        &self.flags
    }

    pub fn set_namespace_handler(&mut self, handler: Box<dyn NamespaceHandler>) {
        self.namespaces = handler;
    }

    /// Configures the architecture policy. The best architecture comes
    /// first; packages whose arch is absent from the list (and is not
    /// `noarch` or `src`) are not installable.
    pub fn set_arch(&mut self, arch: &str) {
        let policy: Vec<&str> = match arch {
            "x86_64" => vec!["x86_64", "i686", "i586", "i486", "i386"],
            "i686" => vec!["i686", "i586", "i486", "i386"],
            "i586" => vec!["i586", "i486", "i386"],
            "aarch64" => vec!["aarch64", "armv7hl", "armv7l"],
            other => vec![other],
        };

        self.arch_scores.clear();
        for (score, name) in policy.into_iter().enumerate() {
            let id = self.intern_arch(name);
            self.arch_scores.insert(id, score as u32);
        }
        self.noarch = Some(self.intern_arch("noarch"));
        self.arch_set = true;
        self.configured_arch = Some(arch.to_string());
    }

    /// The arch `set_arch` was called with, if any.
    pub fn configured_arch(&self) -> Option<&str> {
        self.configured_arch.as_deref()
    }

    /// The position of an arch in the policy list; `None` for unknown
    /// arches, `Some(0)` is best. `noarch` reports the best score.
    pub(crate) fn arch_score(&self, arch: ArchId) -> Option<u32> {
        if !self.arch_set || Some(arch) == self.noarch {
            return Some(0);
        }
        self.arch_scores.get(&arch).copied()
    }

    pub(crate) fn is_noarch(&self, arch: ArchId) -> bool {
        Some(arch) == self.noarch || !self.arch_set
    }

    /// Registers a set of vendors considered interchangeable.
    pub fn add_vendor_class(&mut self, vendors: &[&str]) {
        let class = vendors.iter().map(|v| self.intern_vendor(v)).collect();
        self.vendor_classes.push(class);
    }

    pub(crate) fn vendor_classes(&self) -> &[Vec<VendorId>] {
        &self.vendor_classes
    }

    pub fn set_vendor_check(&mut self, check: Box<dyn VendorCheck>) {
        self.vendor_check = Some(check);
    }

    pub fn same_vendor(&self, a: Option<VendorId>, b: Option<VendorId>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                if let Some(check) = &self.vendor_check {
                    return check.same_vendor(self, a, b);
                }
                a == b
                    || self
                        .vendor_classes
                        .iter()
                        .any(|class| class.contains(&a) && class.contains(&b))
            }
            _ => false,
        }
    }

    // ---- solvables -------------------------------------------------------

    pub fn add_solvable(&mut self, repo: RepoId, name: &str, evr: &str, arch: &str) -> SolvableId {
        let name = self.intern_name(name);
        let evr = self.intern_evr(evr);
        let arch = self.intern_arch(arch);
        let id = self.solvables.alloc(Solvable::new(repo, name, evr, arch));
        self.repos[repo].solvables.push(id);
        self.whatprovides_ready = false;
        id
    }

    pub fn solvable(&self, id: SolvableId) -> &Solvable {
        &self.solvables[id]
    }

    pub fn solvable_mut(&mut self, id: SolvableId) -> &mut Solvable {
        self.whatprovides_ready = false;
        &mut self.solvables[id]
    }

    pub fn solvable_count(&self) -> usize {
        self.solvables.len()
    }

    pub fn solvables(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.solvables.ids().filter(|id| !id.is_system())
    }

    pub fn display(&self, id: SolvableId) -> SolvableDisplay<'_> {
        SolvableDisplay {
            pool: self,
            solvable: &self.solvables[id],
        }
    }

    /// A solvable is installable if it is enabled, not a source package,
    /// and its architecture is allowed by the arch policy. Installed
    /// packages are always installable.
    pub fn installable(&self, id: SolvableId) -> bool {
        let s = &self.solvables[id];
        if !s.enabled {
            return false;
        }
        if self.is_installed(id) {
            return true;
        }
        let arch = self.arch_str(s.arch);
        if arch == "src" || arch == "nosrc" {
            return false;
        }
        self.arch_score(s.arch).is_some()
    }

    // ---- whatprovides ----------------------------------------------------

    /// Builds the whatprovides index. Must be called after all solvables
    /// and their dependency lists have been added; the index is immutable
    /// afterwards and solvers rely on that.
    pub fn create_whatprovides(&mut self) {
        let name_count = self.names.len();
        let mut packages: Mapping<NameId, Vec<SolvableId>> =
            Mapping::filled(name_count, Vec::new());
        let mut providers: Mapping<NameId, Vec<SolvableId>> =
            Mapping::filled(name_count, Vec::new());

        for (id, s) in self.solvables.iter() {
            if id.is_system() {
                continue;
            }
            packages[s.name].push(id);
            providers[s.name].push(id);
            for &dep in &s.provides {
                if let Some(name) = self.deps[dep].name() {
                    let list = &mut providers[name];
                    if list.last() != Some(&id) && !list.contains(&id) {
                        list.push(id);
                    }
                }
            }
        }

        self.packages_by_name = packages;
        self.providers_by_name = providers;
        self.whatprovides_cache.borrow_mut().clear();
        self.whatprovides_ready = true;
    }

    pub(crate) fn whatprovides_ready(&self) -> bool {
        self.whatprovides_ready
    }

    /// All solvables carrying the given name.
    pub fn packages_with_name(&self, name: NameId) -> &[SolvableId] {
        self.packages_by_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All solvables whose name or explicit provides mention the name.
    pub fn providers_of_name(&self, name: NameId) -> &[SolvableId] {
        self.providers_by_name
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The solvables providing the dependency, in id order. Memoized; the
    /// whatprovides index must have been created.
    pub fn providers(&self, dep: DepId) -> Vec<SolvableId> {
        debug_assert!(self.whatprovides_ready, "create_whatprovides not called");
        if let Some(cached) = self.whatprovides_cache.borrow().get(&dep) {
            return cached.clone();
        }
        let computed = self.compute_providers(dep);
        self.whatprovides_cache
            .borrow_mut()
            .insert(dep, computed.clone());
        computed
    }

    fn compute_providers(&self, dep: DepId) -> Vec<SolvableId> {
        match self.deps[dep].clone() {
            Dep::Name(name) => self
                .providers_by_name
                .get(name)
                .map(Vec::clone)
                .unwrap_or_default(),
            Dep::Rel { name, op, evr } => {
                let mut result = Vec::new();
                if let Some(candidates) = self.providers_by_name.get(name) {
                    for &candidate in candidates {
                        if self.solvable_matches_rel(candidate, name, op, evr) {
                            result.push(candidate);
                        }
                    }
                }
                result
            }
            Dep::And(l, r) => {
                let right = self.compute_providers(r);
                self.compute_providers(l)
                    .into_iter()
                    .filter(|s| right.contains(s))
                    .collect()
            }
            Dep::Or(l, r) => {
                let mut result = self.compute_providers(l);
                for s in self.compute_providers(r) {
                    if !result.contains(&s) {
                        result.push(s);
                    }
                }
                result.sort_unstable();
                result
            }
            Dep::Arch(inner, arch) => self
                .compute_providers(inner)
                .into_iter()
                .filter(|&s| self.solvables[s].arch == arch)
                .collect(),
            Dep::Namespace { ns, arg } => {
                let mut result = self.namespaces.providers(self, ns, arg);
                result.sort_unstable();
                result.dedup();
                result
            }
        }
    }

    /// Whether `candidate` provides `name op evr`, either through its own
    /// name/EVR or through an explicit provides entry.
    fn solvable_matches_rel(
        &self,
        candidate: SolvableId,
        name: NameId,
        op: RelOp,
        evr: EvrId,
    ) -> bool {
        let s = &self.solvables[candidate];

        // Implicit self-provide: name = evr
        if s.name == name && self.intersect_rel(RelOp::EQ, s.evr, op, evr) {
            return true;
        }

        for &prv in &s.provides {
            match self.deps[prv] {
                Dep::Name(pname) if pname == name => {
                    // An unversioned provide matches any requirement
                    return true;
                }
                Dep::Rel {
                    name: pname,
                    op: pop,
                    evr: pevr,
                } if pname == name => {
                    if self.intersect_rel(pop, pevr, op, evr) {
                        return true;
                    }
                }
                _ => {}
            }
        }

        false
    }

    /// Whether the ranges `op_a evr_a` and `op_b evr_b` intersect.
    pub(crate) fn intersect_rel(&self, op_a: RelOp, evr_a: EvrId, op_b: RelOp, evr_b: EvrId) -> bool {
        match self.evrcmp_ids(evr_a, evr_b) {
            Ordering::Equal => {
                (op_a.has_lt() && op_b.has_lt())
                    || (op_a.has_eq() && op_b.has_eq())
                    || (op_a.has_gt() && op_b.has_gt())
            }
            Ordering::Less => op_a.has_gt() || op_b.has_lt(),
            Ordering::Greater => op_a.has_lt() || op_b.has_gt(),
        }
    }

    /// Compares two interned EVRs, honoring the `promoteepoch` pool flag:
    /// when the left side carries an epoch and the right side does not, the
    /// right side inherits it before comparison.
    pub fn evrcmp_ids(&self, a: EvrId, b: EvrId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let sa = &self.evrs[a];
        let sb = &self.evrs[b];
        if self.flags.promote_epoch {
            let ea = evr::split(sa);
            let eb = evr::split(sb);
            if !ea.epoch.is_empty() && eb.epoch.is_empty() {
                return evr::vercmp(ea.version, eb.version).then_with(|| {
                    if ea.release.is_empty() || eb.release.is_empty() {
                        Ordering::Equal
                    } else {
                        evr::vercmp(ea.release, eb.release)
                    }
                });
            }
        }
        evr::evrcmp(sa, sb, true)
    }

    /// Whether two solvables have the same name, EVR and arch.
    pub(crate) fn identical(&self, a: SolvableId, b: SolvableId) -> bool {
        let sa = &self.solvables[a];
        let sb = &self.solvables[b];
        sa.name == sb.name
            && sa.arch == sb.arch
            && self.evrcmp_ids(sa.evr, sb.evr) == Ordering::Equal
    }

    /// Whether `a` obsoletes `b` through an explicit obsoletes entry.
    /// Obsoletes match names only, unless `obsoleteusesprovides` is set.
    pub(crate) fn obsoletes(&self, a: SolvableId, b: SolvableId) -> bool {
        let sa = &self.solvables[a];
        for &obs in &sa.obsoletes {
            if self.dep_matches_solvable_for_obsolete(obs, b) {
                return true;
            }
        }
        false
    }

    /// Obsoletes matching: against the target's name/EVR, or against its
    /// provides when `obsoleteusesprovides` is active.
    pub(crate) fn dep_matches_solvable_for_obsolete(&self, dep: DepId, target: SolvableId) -> bool {
        if self.flags.obsolete_uses_provides {
            return self.providers(dep).contains(&target);
        }
        let s = &self.solvables[target];
        match self.deps[dep] {
            Dep::Name(name) => s.name == name,
            Dep::Rel { name, op, evr } => {
                s.name == name && self.intersect_rel(RelOp::EQ, s.evr, op, evr)
            }
            _ => self.providers(dep).contains(&target),
        }
    }
}

fn split_infix(text: &str, sep: &str) -> Option<(String, String)> {
    text.find(sep)
        .map(|pos| (text[..pos].to_string(), text[pos + sep.len()..].to_string()))
}

fn parse_namespace_call(text: &str) -> Option<(&str, &str)> {
    let open = text.find('(')?;
    let close = text.rfind(')')?;
    if close != text.len() - 1 || open == 0 {
        return None;
    }
    Some((&text[..open], &text[open + 1..close]))
}

#[cfg(test)]
mod test {
    use super::*;

    fn pool_with(packages: &[(&str, &str, &str)]) -> (Pool, RepoId) {
        let mut pool = Pool::new();
        let repo = pool.add_repo("test");
        for (name, evr, arch) in packages {
            pool.add_solvable(repo, name, evr, arch);
        }
        pool.set_arch("x86_64");
        pool.create_whatprovides();
        (pool, repo)
    }

    #[test]
    fn test_name_providers() {
        let (mut pool, _) = pool_with(&[("a", "1-1", "x86_64"), ("a", "2-1", "x86_64")]);
        let dep = pool.parse_dep("a");
        assert_eq!(pool.providers(dep).len(), 2);

        let dep = pool.parse_dep("a >= 2");
        assert_eq!(pool.providers(dep).len(), 1);

        let dep = pool.parse_dep("b");
        assert!(pool.providers(dep).is_empty());
    }

    #[test]
    fn test_explicit_provides() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("test");
        let s = pool.add_solvable(repo, "a", "1-1", "noarch");
        let prv = pool.parse_dep("virt = 2");
        pool.solvable_mut(s).provides.push(prv);
        pool.set_arch("x86_64");
        pool.create_whatprovides();

        let hit = pool.parse_dep("virt >= 1");
        assert_eq!(pool.providers(hit), vec![s]);
        let miss = pool.parse_dep("virt > 2");
        assert!(pool.providers(miss).is_empty());
    }

    #[test]
    fn test_rel_parsing_roundtrip() {
        let mut pool = Pool::new();
        let dep = pool.parse_dep("libfoo >= 1:2.0-3");
        assert_eq!(pool.dep_str(dep), "libfoo >= 1:2.0-3");
        let dep = pool.parse_dep("a & b");
        assert_eq!(pool.dep_str(dep), "a & b");
        let dep = pool.parse_dep("installed(flag)");
        assert_eq!(pool.dep_str(dep), "installed(flag)");
    }

    #[test]
    fn test_arch_policy() {
        let (pool, _) = pool_with(&[("a", "1-1", "x86_64"), ("b", "1-1", "s390x")]);
        let a = pool.solvables.ids().nth(1).unwrap();
        let b = pool.solvables.ids().nth(2).unwrap();
        assert!(pool.installable(a));
        assert!(!pool.installable(b));
    }
}

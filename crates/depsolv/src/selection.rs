//! Turns a user-supplied pattern string into job targets.
//!
//! Matching precedence: absolute paths hit the filelist, relation
//! characters split the pattern into `name(.arch) op evr`, then plain or
//! glob name/provides matching with an optional `.arch` suffix, and
//! finally the canonical `name-evr[.arch]` form.

use glob::{MatchOptions, Pattern};
use thiserror::Error;

use crate::dep::{Dep, RelOp};
use crate::internal::id::{NameId, SolvableId};
use crate::job::{Job, JobAction, JobFlags, JobTarget};
use crate::pool::Pool;

/// What a selection may match on and how.
#[derive(Copy, Clone, Default, Debug)]
#[allow(missing_docs)]
pub struct SelectionFlags {
    pub name: bool,
    pub provides: bool,
    pub filelist: bool,
    pub canon: bool,
    pub dotarch: bool,
    pub rel: bool,
    pub installed_only: bool,
    pub glob: bool,
    pub flat: bool,
    pub nocase: bool,
    pub source_only: bool,
    pub with_source: bool,
}

impl SelectionFlags {
    /// The usual lookup: names and provides, with relations, globs,
    /// `.arch` suffixes and canonical forms.
    pub fn default_lookup() -> Self {
        Self {
            name: true,
            provides: true,
            filelist: true,
            canon: true,
            dotarch: true,
            rel: true,
            glob: true,
            ..Self::default()
        }
    }
}

/// Errors for unusable selection input. These are soft: the caller keeps
/// its pool and may retry with another pattern.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The glob pattern did not parse.
    #[error("bad glob pattern: {0}")]
    BadGlob(#[from] glob::PatternError),
    /// The relation operator was not recognized.
    #[error("bad relation operator {0:?}")]
    BadRelOp(String),
    /// Nothing matched the pattern.
    #[error("nothing matches {0:?}")]
    NoMatch(String),
}

/// The outcome of a selection: job targets, to be combined with an action.
#[derive(Debug, Default)]
pub struct Selection {
    /// The matched targets, one per matched name (or a single `OneOf`
    /// under `flat`).
    pub targets: Vec<JobTarget>,
}

impl Selection {
    /// Combines the selection with a job action.
    pub fn to_jobs(&self, action: JobAction, flags: JobFlags) -> Vec<Job> {
        self.targets
            .iter()
            .map(|target| Job::with_flags(action, target.clone(), flags))
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Matches `pattern` against the pool per `flags`.
pub fn make_selection(
    pool: &mut Pool,
    pattern: &str,
    flags: &SelectionFlags,
) -> Result<Selection, SelectionError> {
    let pattern = pattern.trim();

    if flags.filelist && pattern.starts_with('/') {
        let selection = select_filelist(pool, pattern, flags)?;
        if !selection.is_empty() {
            return Ok(flatten(pool, selection, flags));
        }
        return Err(SelectionError::NoMatch(pattern.to_string()));
    }

    if flags.rel && pattern.contains(['<', '=', '>']) {
        let selection = select_relation(pool, pattern, flags)?;
        if !selection.is_empty() {
            return Ok(flatten(pool, selection, flags));
        }
        return Err(SelectionError::NoMatch(pattern.to_string()));
    }

    let mut selection = select_name_or_provides(pool, pattern, flags)?;
    if selection.is_empty() && flags.canon {
        selection = select_canon(pool, pattern, flags)?;
    }
    if selection.is_empty() {
        return Err(SelectionError::NoMatch(pattern.to_string()));
    }
    Ok(flatten(pool, selection, flags))
}

fn flatten(pool: &mut Pool, selection: Selection, flags: &SelectionFlags) -> Selection {
    if !flags.flat || selection.targets.len() <= 1 {
        return selection;
    }
    let mut ids: Vec<SolvableId> = Vec::new();
    for target in &selection.targets {
        let job = Job::new(JobAction::Noop, target.clone());
        for s in job.candidates(pool) {
            if !ids.contains(&s) {
                ids.push(s);
            }
        }
    }
    ids.sort_unstable();
    Selection {
        targets: vec![JobTarget::OneOf(ids)],
    }
}

fn matcher(pattern: &str, flags: &SelectionFlags) -> Result<Option<Pattern>, SelectionError> {
    if flags.glob && pattern.contains(['*', '?', '[']) {
        Ok(Some(Pattern::new(pattern)?))
    } else {
        Ok(None)
    }
}

fn name_matches(name: &str, pattern: &str, glob: &Option<Pattern>, flags: &SelectionFlags) -> bool {
    match glob {
        Some(glob) => glob.matches_with(
            name,
            MatchOptions {
                case_sensitive: !flags.nocase,
                ..MatchOptions::new()
            },
        ),
        None => {
            if flags.nocase {
                name.eq_ignore_ascii_case(pattern)
            } else {
                name == pattern
            }
        }
    }
}

/// Whether a solvable passes the installed/source restrictions.
fn solvable_allowed(pool: &Pool, s: SolvableId, flags: &SelectionFlags) -> bool {
    if flags.installed_only && !pool.is_installed(s) {
        return false;
    }
    let arch = pool.arch_str(pool.solvable(s).arch);
    let is_source = arch == "src" || arch == "nosrc";
    if flags.source_only {
        return is_source;
    }
    if is_source && !flags.with_source {
        return false;
    }
    true
}

fn select_filelist(
    pool: &mut Pool,
    pattern: &str,
    flags: &SelectionFlags,
) -> Result<Selection, SelectionError> {
    let glob = matcher(pattern, flags)?;
    // File provides are plain name deps that look like absolute paths
    let mut matched_names: Vec<NameId> = Vec::new();
    for (id, name) in pool.names() {
        if name.starts_with('/') && name_matches(name, pattern, &glob, flags) {
            matched_names.push(id);
        }
    }

    let mut targets = Vec::new();
    for name in matched_names {
        let has_providers = pool
            .providers_of_name(name)
            .iter()
            .any(|&s| solvable_allowed(pool, s, flags));
        if has_providers {
            let dep = pool.intern_dep(Dep::Name(name));
            targets.push(JobTarget::Provides(dep));
        }
    }
    Ok(Selection { targets })
}

fn select_relation(
    pool: &mut Pool,
    pattern: &str,
    flags: &SelectionFlags,
) -> Result<Selection, SelectionError> {
    let rel_start = pattern
        .find(['<', '=', '>'])
        .expect("caller checked for a relation character");
    let (left, rest) = pattern.split_at(rel_start);
    let op_len = rest
        .bytes()
        .take_while(|b| matches!(b, b'<' | b'=' | b'>'))
        .count();
    let (op_str, evr) = rest.split_at(op_len);
    let op = RelOp::parse(op_str.trim())
        .ok_or_else(|| SelectionError::BadRelOp(op_str.to_string()))?;
    let left = left.trim();
    let evr = evr.trim();

    let mut base_flags = *flags;
    base_flags.rel = false;
    let base = select_name_or_provides(pool, left, &base_flags)?;

    let mut targets = Vec::new();
    for target in base.targets {
        if let Some(filtered) = filter_evr(pool, &target, op, evr) {
            targets.push(filtered);
        }
    }
    Ok(Selection { targets })
}

/// Rebuilds a name/provides target with the relation attached, promoting
/// the epoch when all matching candidates agree on one.
fn filter_evr(pool: &mut Pool, target: &JobTarget, op: RelOp, evr: &str) -> Option<JobTarget> {
    let (dep, is_name) = match target {
        JobTarget::Name(dep) => (*dep, true),
        JobTarget::Provides(dep) => (*dep, false),
        _ => return None,
    };
    let name = pool.dep(dep).name()?;

    let evr = if evr.contains(':') {
        evr.to_string()
    } else {
        // Epoch promotion: if every candidate carries the same epoch,
        // comparisons use it implicitly
        let mut epochs: Vec<String> = Vec::new();
        for &s in pool.packages_with_name(name) {
            let candidate_evr = pool.evr_str(pool.solvable(s).evr);
            let epoch = crate::evr::split(candidate_evr).epoch;
            if !epoch.is_empty() && !epochs.contains(&epoch.to_string()) {
                epochs.push(epoch.to_string());
            }
        }
        match epochs.as_slice() {
            [single] => format!("{single}:{evr}"),
            _ => evr.to_string(),
        }
    };

    let evr = pool.intern_evr(&evr);
    let rel = pool.intern_dep(Dep::Rel { name, op, evr });
    Some(if is_name {
        JobTarget::Name(rel)
    } else {
        JobTarget::Provides(rel)
    })
}

fn select_name_or_provides(
    pool: &mut Pool,
    pattern: &str,
    flags: &SelectionFlags,
) -> Result<Selection, SelectionError> {
    let mut selection = select_name_or_provides_exact(pool, pattern, flags)?;
    if selection.is_empty() && flags.dotarch {
        if let Some(dot) = pattern.rfind('.') {
            let (base, arch) = (&pattern[..dot], &pattern[dot + 1..]);
            if let Some(arch_id) = pool.lookup_arch(arch) {
                let inner = select_name_or_provides_exact(pool, base, flags)?;
                let mut targets = Vec::new();
                for target in inner.targets {
                    let (dep, is_name) = match target {
                        JobTarget::Name(dep) => (dep, true),
                        JobTarget::Provides(dep) => (dep, false),
                        _ => continue,
                    };
                    let arched = pool.intern_dep(Dep::Arch(dep, arch_id));
                    targets.push(if is_name {
                        JobTarget::Name(arched)
                    } else {
                        JobTarget::Provides(arched)
                    });
                }
                selection = Selection { targets };
            }
        }
    }
    Ok(selection)
}

fn select_name_or_provides_exact(
    pool: &mut Pool,
    pattern: &str,
    flags: &SelectionFlags,
) -> Result<Selection, SelectionError> {
    let glob = matcher(pattern, flags)?;

    if flags.name {
        let matched: Vec<NameId> = pool
            .names()
            .filter(|(_, name)| name_matches(name, pattern, &glob, flags))
            .map(|(id, _)| id)
            .collect();
        let mut targets = Vec::new();
        for name in matched {
            let usable = pool
                .packages_with_name(name)
                .iter()
                .any(|&s| solvable_allowed(pool, s, flags));
            if usable {
                let dep = pool.intern_dep(Dep::Name(name));
                targets.push(JobTarget::Name(dep));
            }
        }
        if !targets.is_empty() {
            return Ok(Selection { targets });
        }
    }

    if flags.provides {
        let matched: Vec<NameId> = pool
            .names()
            .filter(|(_, name)| name_matches(name, pattern, &glob, flags))
            .map(|(id, _)| id)
            .collect();
        let mut targets = Vec::new();
        for name in matched {
            let usable = pool
                .providers_of_name(name)
                .iter()
                .any(|&s| solvable_allowed(pool, s, flags));
            if usable {
                let dep = pool.intern_dep(Dep::Name(name));
                targets.push(JobTarget::Provides(dep));
            }
        }
        if !targets.is_empty() {
            return Ok(Selection { targets });
        }
    }

    Ok(Selection::default())
}

/// Canonical `name-evr[.arch]` matching: try every `-` from the right as
/// the name/EVR split.
fn select_canon(
    pool: &mut Pool,
    pattern: &str,
    flags: &SelectionFlags,
) -> Result<Selection, SelectionError> {
    let mut split_points: Vec<usize> = pattern
        .char_indices()
        .filter(|&(_, c)| c == '-')
        .map(|(i, _)| i)
        .collect();
    split_points.reverse();

    for split in split_points {
        let (name_part, evr_part) = (&pattern[..split], &pattern[split + 1..]);
        if evr_part.is_empty() || !evr_part.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }

        // Optional trailing .arch
        let (evr, arch) = match evr_part.rfind('.') {
            Some(dot) if flags.dotarch => {
                let maybe_arch = &evr_part[dot + 1..];
                match pool.lookup_arch(maybe_arch) {
                    Some(arch) => (&evr_part[..dot], Some(arch)),
                    None => (evr_part, None),
                }
            }
            _ => (evr_part, None),
        };

        let mut base_flags = *flags;
        base_flags.canon = false;
        base_flags.dotarch = false;
        let base = select_name_or_provides_exact(pool, name_part, &base_flags)?;
        if base.is_empty() {
            continue;
        }

        let mut targets = Vec::new();
        for target in base.targets {
            let Some(filtered) = filter_evr(pool, &target, RelOp::EQ, evr) else {
                continue;
            };
            let filtered = match (filtered, arch) {
                (JobTarget::Name(dep), Some(arch)) => {
                    let arched = pool.intern_dep(Dep::Arch(dep, arch));
                    JobTarget::Name(arched)
                }
                (JobTarget::Provides(dep), Some(arch)) => {
                    let arched = pool.intern_dep(Dep::Arch(dep, arch));
                    JobTarget::Provides(arched)
                }
                (other, _) => other,
            };
            targets.push(filtered);
        }
        if !targets.is_empty() {
            return Ok(Selection { targets });
        }
    }

    Ok(Selection::default())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::internal::id::RepoId;

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
    fn test_select_by_name() {
        let (mut pool, _) = pool_with(&[("foo", "1-1", "x86_64"), ("bar", "1-1", "x86_64")]);
        let selection =
            make_selection(&mut pool, "foo", &SelectionFlags::default_lookup()).unwrap();
        assert_eq!(selection.targets.len(), 1);
        assert!(matches!(selection.targets[0], JobTarget::Name(_)));
    }

    #[test]
    fn test_select_glob() {
        let (mut pool, _) = pool_with(&[
            ("foo", "1-1", "x86_64"),
            ("foobar", "1-1", "x86_64"),
            ("bar", "1-1", "x86_64"),
        ]);
        let selection =
            make_selection(&mut pool, "foo*", &SelectionFlags::default_lookup()).unwrap();
        assert_eq!(selection.targets.len(), 2);
    }

    #[test]
    fn test_select_relation() {
        let (mut pool, _) = pool_with(&[("foo", "1-1", "x86_64"), ("foo", "2-1", "x86_64")]);
        let selection =
            make_selection(&mut pool, "foo >= 2", &SelectionFlags::default_lookup()).unwrap();
        assert_eq!(selection.targets.len(), 1);
        let JobTarget::Name(dep) = &selection.targets[0] else {
            panic!("expected a name target");
        };
        assert_eq!(pool.dep_str(*dep), "foo >= 2");
    }

    #[test]
    fn test_select_canon() {
        let (mut pool, _) = pool_with(&[("foo-devel", "1.0-1", "x86_64")]);
        let selection = make_selection(
            &mut pool,
            "foo-devel-1.0-1.x86_64",
            &SelectionFlags::default_lookup(),
        )
        .unwrap();
        assert_eq!(selection.targets.len(), 1);
    }

    #[test]
    fn test_select_filelist() {
        let mut pool = Pool::new();
        let repo = pool.add_repo("test");
        let s = pool.add_solvable(repo, "tool", "1-1", "x86_64");
        let file = pool.parse_dep("/usr/bin/tool");
        pool.solvable_mut(s).provides.push(file);
        pool.set_arch("x86_64");
        pool.create_whatprovides();

        let selection =
            make_selection(&mut pool, "/usr/bin/tool", &SelectionFlags::default_lookup()).unwrap();
        assert_eq!(selection.targets.len(), 1);
        assert!(matches!(selection.targets[0], JobTarget::Provides(_)));
    }

    #[test]
    fn test_no_match_is_soft() {
        let (mut pool, _) = pool_with(&[("foo", "1-1", "x86_64")]);
        let result = make_selection(&mut pool, "nosuch", &SelectionFlags::default_lookup());
        assert!(matches!(result, Err(SelectionError::NoMatch(_))));
    }

    #[test]
    fn test_epoch_promotion() {
        let (mut pool, _) = pool_with(&[("foo", "3:1-1", "x86_64"), ("foo", "3:2-1", "x86_64")]);
        let selection =
            make_selection(&mut pool, "foo = 2-1", &SelectionFlags::default_lookup()).unwrap();
        let JobTarget::Name(dep) = &selection.targets[0] else {
            panic!("expected a name target");
        };
        assert_eq!(pool.dep_str(*dep), "foo = 3:2-1");
    }
}

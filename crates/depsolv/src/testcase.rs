//! The textual testcase format: a self-contained description of a pool, a
//! job queue and the expected solver result, used by the conformance
//! suite. `read_str` consumes it, `write_string` emits it, and round-trips
//! must reproduce the same solver behavior byte for byte.
//!
//! ```text
//! repo available 99 testtags <inline>
//! #>=Ver: 2.0
//! #>=Pkg: a 1 1 x86_64
//! #>+Req:
//! #>b
//! #>-Req:
//! system x86_64 rpm @System
//! solverflags allowdowngrade !allownamechange
//! job install name a [weak]
//! result transaction,problems <inline>
//! #>install a-1-1.x86_64
//! nextjob
//! ```

use std::collections::HashMap;
use std::fmt::Write as _;

use thiserror::Error;

use crate::flags::{PoolFlag, SolverFlag};
use crate::internal::id::{EvrId, NameId, RepoId, SolvableId};
use crate::job::{Job, JobAction, JobFlags, JobQueue, JobTarget};
use crate::pool::{NamespaceHandler, Pool};
use crate::solver::Solver;

/// Which sections a `result` line asks for.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
#[allow(missing_docs)]
pub struct ResultFlags {
    pub transaction: bool,
    pub problems: bool,
    pub orphaned: bool,
    pub recommended: bool,
    pub unneeded: bool,
}

impl ResultFlags {
    const NAMES: &'static [(&'static str, fn(&mut ResultFlags) -> &mut bool)] = &[
        ("transaction", |f| &mut f.transaction),
        ("problems", |f| &mut f.problems),
        ("orphaned", |f| &mut f.orphaned),
        ("recommended", |f| &mut f.recommended),
        ("unneeded", |f| &mut f.unneeded),
    ];

    fn parse(text: &str) -> ResultFlags {
        let mut flags = ResultFlags::default();
        for token in text.split(',') {
            let token = token.trim();
            match Self::NAMES.iter().find(|(name, _)| *name == token) {
                Some((_, field)) => *field(&mut flags) = true,
                None => tracing::error!("unknown result flag {token:?}"),
            }
        }
        flags
    }

    fn to_wire(self) -> String {
        let mut names = Vec::new();
        let mut copy = self;
        for (name, field) in Self::NAMES {
            if *field(&mut copy) {
                names.push(*name);
            }
        }
        names.join(",")
    }
}

/// One `job ... result ...` block of a testcase.
#[derive(Debug, Default)]
pub struct TestcaseRun {
    /// The job queue of this run.
    pub jobs: JobQueue,
    /// Which result sections the testcase expects.
    pub result_flags: ResultFlags,
    /// The expected `solver_result` output, one line per entry.
    pub expected_result: String,
}

/// A parsed testcase: the pool plus one or more solver runs.
pub struct Testcase {
    /// The pool with all repos and solvables loaded.
    pub pool: Pool,
    /// Solver flags to apply before each run.
    pub solver_flags: Vec<(SolverFlag, bool)>,
    /// The runs, separated by `nextjob` in the file.
    pub runs: Vec<TestcaseRun>,
}

/// Parse errors that make the testcase unusable. Malformed single lines
/// (unknown flags, bad jobs) are reported through the log and skipped, per
/// the usual soft-error policy.
#[derive(Debug, Error)]
pub enum ParseTestcaseError {
    /// A repo line could not be parsed.
    #[error("malformed repo line: {0}")]
    BadRepoLine(String),
    /// A package block referenced before `=Ver`.
    #[error("missing =Ver header in testtags data")]
    MissingVersion,
    /// A dependency line appeared outside a `+Tag`/`-Tag` block.
    #[error("dependency data outside a block: {0}")]
    StrayDependency(String),
}

struct TableNamespaces {
    entries: HashMap<(NameId, EvrId), Vec<SolvableId>>,
}

impl NamespaceHandler for TableNamespaces {
    fn providers(&self, _pool: &Pool, ns: NameId, arg: EvrId) -> Vec<SolvableId> {
        self.entries.get(&(ns, arg)).cloned().unwrap_or_default()
    }
}

/// Reads a testcase from its textual form.
pub fn read_str(text: &str) -> Result<Testcase, ParseTestcaseError> {
    let mut pool = Pool::new();
    let mut solver_flags = Vec::new();
    let mut runs: Vec<TestcaseRun> = Vec::new();
    let mut current = TestcaseRun::default();
    let mut namespaces: HashMap<(NameId, EvrId), Vec<SolvableId>> = HashMap::new();
    let mut whatprovides_done = false;

    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') && !line.starts_with("#>") {
            continue;
        }
        let mut words = line.split_whitespace();
        let Some(keyword) = words.next() else { continue };

        match keyword {
            "repo" => {
                let name = words
                    .next()
                    .ok_or_else(|| ParseTestcaseError::BadRepoLine(line.to_string()))?;
                let prio = words.next().unwrap_or("0");
                let (priority, subpriority) = match prio.split_once('.') {
                    Some((p, s)) => (
                        p.parse().unwrap_or(0),
                        s.parse().unwrap_or(0),
                    ),
                    None => (prio.parse().unwrap_or(0), 0),
                };
                let repo = pool.add_repo(name);
                pool.set_repo_priority(repo, priority, subpriority);

                // Inline testtags payload follows as #> lines
                let mut payload = String::new();
                while let Some(next) = lines.peek() {
                    if let Some(rest) = next.strip_prefix("#>") {
                        payload.push_str(rest);
                        payload.push('\n');
                        lines.next();
                    } else {
                        break;
                    }
                }
                parse_testtags(&mut pool, repo, &payload)?;
            }
            "system" => {
                if let Some(arch) = words.next() {
                    if arch != "unset" {
                        pool.set_arch(arch);
                    }
                }
                let _disttype = words.next();
                if let Some(repo_name) = words.next() {
                    match pool.find_repo(repo_name) {
                        Some(repo) => pool.set_installed_repo(repo),
                        None => tracing::error!("unknown installed repo {repo_name:?}"),
                    }
                }
            }
            "poolflags" => {
                for token in words {
                    let (value, name) = match token.strip_prefix('!') {
                        Some(name) => (false, name),
                        None => (true, token),
                    };
                    match PoolFlag::from_name(name) {
                        Some(flag) => {
                            pool.set_flag(flag, value);
                        }
                        None => tracing::error!("unknown pool flag {name:?}"),
                    }
                }
            }
            "solverflags" => {
                for token in words {
                    let (value, name) = match token.strip_prefix('!') {
                        Some(name) => (false, name),
                        None => (true, token),
                    };
                    match SolverFlag::from_name(name) {
                        Some(flag) => solver_flags.push((flag, value)),
                        None => tracing::error!("unknown solver flag {name:?}"),
                    }
                }
            }
            "vendorclass" => {
                let vendors: Vec<&str> = words.collect();
                pool.add_vendor_class(&vendors);
            }
            "namespace" => {
                // namespace <ns>(<evr>) <solvid>...
                if !whatprovides_done {
                    pool.create_whatprovides();
                    whatprovides_done = true;
                }
                let Some(call) = words.next() else { continue };
                let Some((ns, arg)) = call
                    .strip_suffix(')')
                    .and_then(|c| c.split_once('('))
                else {
                    tracing::error!("malformed namespace line {line:?}");
                    continue;
                };
                let ns = pool.intern_name(ns);
                let arg = pool.intern_evr(arg);
                let mut ids = Vec::new();
                for word in words {
                    match find_solvable(&pool, word) {
                        Some(s) => ids.push(s),
                        None => tracing::error!("unknown solvable {word:?}"),
                    }
                }
                namespaces.insert((ns, arg), ids);
            }
            "job" => {
                if !whatprovides_done {
                    pool.create_whatprovides();
                    whatprovides_done = true;
                }
                match parse_job(&mut pool, line) {
                    Some(job) => current.jobs.push(job),
                    None => tracing::error!("skipping malformed job line {line:?}"),
                }
            }
            "result" => {
                current.result_flags = ResultFlags::parse(words.next().unwrap_or(""));
                let _source = words.next();
                let mut expected = String::new();
                while let Some(next) = lines.peek() {
                    if let Some(rest) = next.strip_prefix("#>") {
                        expected.push_str(rest);
                        expected.push('\n');
                        lines.next();
                    } else {
                        break;
                    }
                }
                current.expected_result = expected;
            }
            "nextjob" => {
                runs.push(std::mem::take(&mut current));
            }
            other => {
                tracing::error!("unknown testcase keyword {other:?}");
            }
        }
    }

    if !current.jobs.is_empty()
        || !current.expected_result.is_empty()
        || current.result_flags != ResultFlags::default()
    {
        runs.push(current);
    }

    if !pool.whatprovides_ready() {
        pool.create_whatprovides();
    }
    if !namespaces.is_empty() {
        pool.set_namespace_handler(Box::new(TableNamespaces {
            entries: namespaces,
        }));
    }

    Ok(Testcase {
        pool,
        solver_flags,
        runs,
    })
}

/// Parses the `=Ver`/`=Pkg` solvable records of one repo.
fn parse_testtags(
    pool: &mut Pool,
    repo: RepoId,
    payload: &str,
) -> Result<(), ParseTestcaseError> {
    let mut saw_version = false;
    let mut current: Option<SolvableId> = None;
    let mut block: Option<String> = None;

    for line in payload.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("=Ver:") {
            let _ = rest.trim();
            saw_version = true;
            continue;
        }
        if !saw_version {
            return Err(ParseTestcaseError::MissingVersion);
        }

        if let Some(rest) = line.strip_prefix("=Pkg:") {
            let mut parts = rest.split_whitespace();
            let name = parts.next().unwrap_or("");
            let version = parts.next().unwrap_or("");
            let release = parts.next().unwrap_or("-");
            let arch = parts.next().unwrap_or("noarch");
            let evr = if release == "-" {
                version.to_string()
            } else {
                format!("{version}-{release}")
            };
            current = Some(pool.add_solvable(repo, name, &evr, arch));
            block = None;
            continue;
        }
        if let Some(rest) = line.strip_prefix("=Vnd:") {
            if let Some(s) = current {
                let vendor = pool.intern_vendor(rest.trim());
                pool.solvable_mut(s).vendor = Some(vendor);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("=Tim:") {
            if let Some(s) = current {
                pool.solvable_mut(s).build_time = rest.trim().parse().ok();
            }
            continue;
        }
        if let Some(tag) = line.strip_prefix('+') {
            block = Some(tag.trim_end_matches(':').to_string());
            continue;
        }
        if let Some(tag) = line.strip_prefix('-') {
            let closing = tag.trim_end_matches(':');
            if block.as_deref() == Some(closing) {
                block = None;
            }
            continue;
        }

        let Some(block_name) = &block else {
            return Err(ParseTestcaseError::StrayDependency(line.to_string()));
        };
        let Some(s) = current else {
            return Err(ParseTestcaseError::StrayDependency(line.to_string()));
        };
        let dep = pool.parse_dep(line);
        let solvable = pool.solvable_mut(s);
        match block_name.as_str() {
            "Req" => solvable.requires.push(dep),
            "Prq" => solvable.prereqs.push(dep),
            "Prv" => solvable.provides.push(dep),
            "Obs" => solvable.obsoletes.push(dep),
            "Con" => solvable.conflicts.push(dep),
            "Rec" => solvable.recommends.push(dep),
            "Sup" => solvable.supplements.push(dep),
            "Sug" => solvable.suggests.push(dep),
            "Enh" => solvable.enhances.push(dep),
            other => tracing::error!("unknown dependency block {other:?}"),
        }
    }

    Ok(())
}

/// Finds a solvable by its `name-evr.arch` display form.
pub fn find_solvable(pool: &Pool, text: &str) -> Option<SolvableId> {
    pool.solvables()
        .find(|&s| pool.display(s).to_string() == text)
}

/// Parses a `job` line: `job <action> <selector> <what> [[flag,...]]`.
fn parse_job(pool: &mut Pool, line: &str) -> Option<Job> {
    let mut rest = line.strip_prefix("job")?.trim().to_string();

    let mut flags = JobFlags::default();
    if rest.ends_with(']') {
        if let Some(open) = rest.rfind('[') {
            for token in rest[open + 1..rest.len() - 1].split(',') {
                match token.trim() {
                    "weak" => flags.weak = true,
                    "essential" => flags.essential = true,
                    "cleandeps" => flags.cleandeps = true,
                    "forcebest" => flags.forcebest = true,
                    "targeted" => flags.targeted = true,
                    "" => {}
                    other => tracing::error!("unknown job flag {other:?}"),
                }
            }
            rest.truncate(open);
        }
    }

    let mut words = rest.split_whitespace();
    let action = JobAction::from_name(words.next()?)?;
    let selector = words.next()?;
    let what = words.collect::<Vec<_>>().join(" ");

    let target = match selector {
        "pkg" => JobTarget::Solvable(find_solvable(pool, &what)?),
        "name" => JobTarget::Name(pool.parse_dep(&what)),
        "provides" => JobTarget::Provides(pool.parse_dep(&what)),
        "oneof" => {
            let mut ids = Vec::new();
            for token in what.split_whitespace() {
                ids.push(find_solvable(pool, token)?);
            }
            JobTarget::OneOf(ids)
        }
        "repo" => JobTarget::Repo(pool.find_repo(&what)?),
        "all" => JobTarget::All,
        other => {
            tracing::error!("unknown job selector {other:?}");
            return None;
        }
    };

    Some(Job::with_flags(action, target, flags))
}

// ---- writing -------------------------------------------------------------

/// Writes a self-contained testcase for the solver's pool, flags and job
/// queue, including the result of the last solve.
pub fn write_string(solver: &mut Solver, result_flags: ResultFlags) -> String {
    let mut out = String::new();

    for repo in solver.pool().repos().collect::<Vec<_>>() {
        let pool = solver.pool();
        let (priority, subpriority) = pool.repo_priority(repo);
        let prio = if subpriority != 0 {
            format!("{priority}.{subpriority}")
        } else {
            format!("{priority}")
        };
        let _ = writeln!(out, "repo {} {} testtags <inline>", pool.repo_name(repo), prio);
        write_testtags(pool, repo, &mut out);
    }

    let pool = solver.pool();
    let system_arch = pool
        .configured_arch()
        .unwrap_or("unset")
        .to_string();
    match pool.installed_repo() {
        Some(repo) => {
            let _ = writeln!(out, "system {} rpm {}", system_arch, pool.repo_name(repo));
        }
        None => {
            let _ = writeln!(out, "system {system_arch} rpm");
        }
    }

    let pool_flag_tokens: Vec<String> = PoolFlag::ALL
        .iter()
        .filter(|&&flag| pool.flags().get(flag))
        .map(|flag| flag.name().to_string())
        .collect();
    if !pool_flag_tokens.is_empty() {
        let _ = writeln!(out, "poolflags {}", pool_flag_tokens.join(" "));
    }

    for class in pool.vendor_classes() {
        let names: Vec<&str> = class.iter().map(|&v| pool.vendor_str(v)).collect();
        if !names.is_empty() {
            let _ = writeln!(out, "vendorclass {}", names.join(" "));
        }
    }

    let solver_flag_tokens: Vec<String> = SolverFlag::ALL
        .iter()
        .filter(|&&flag| solver.get_flag(flag) != flag.default_value())
        .map(|flag| {
            if flag.default_value() {
                format!("!{}", flag.name())
            } else {
                flag.name().to_string()
            }
        })
        .collect();
    if !solver_flag_tokens.is_empty() {
        let _ = writeln!(out, "solverflags {}", solver_flag_tokens.join(" "));
    }

    let jobs = solver.jobs.clone();
    for job in jobs.iter() {
        let _ = writeln!(out, "{}", job_to_wire(solver, job));
    }

    let result = solver_result(solver, result_flags);
    let _ = writeln!(out, "result {} <inline>", result_flags.to_wire());
    for line in result.lines() {
        let _ = writeln!(out, "#>{line}");
    }
    let _ = writeln!(out, "nextjob");

    out
}

fn job_to_wire(solver: &Solver, job: &Job) -> String {
    let pool = solver.pool();
    let what = match &job.target {
        JobTarget::Solvable(s) => format!("pkg {}", pool.display(*s)),
        JobTarget::Name(dep) => format!("name {}", pool.dep_str(*dep)),
        JobTarget::Provides(dep) => format!("provides {}", pool.dep_str(*dep)),
        JobTarget::OneOf(ids) => format!(
            "oneof {}",
            ids.iter()
                .map(|&s| pool.display(s).to_string())
                .collect::<Vec<_>>()
                .join(" ")
        ),
        JobTarget::Repo(repo) => format!("repo {}", pool.repo_name(*repo)),
        JobTarget::All => "all packages".to_string(),
    };

    let mut flag_tokens = Vec::new();
    if job.flags.weak {
        flag_tokens.push("weak");
    }
    if job.flags.essential {
        flag_tokens.push("essential");
    }
    if job.flags.cleandeps {
        flag_tokens.push("cleandeps");
    }
    if job.flags.forcebest {
        flag_tokens.push("forcebest");
    }
    if job.flags.targeted {
        flag_tokens.push("targeted");
    }

    if flag_tokens.is_empty() {
        format!("job {} {}", job.action.name(), what)
    } else {
        format!(
            "job {} {} [{}]",
            job.action.name(),
            what,
            flag_tokens.join(",")
        )
    }
}

fn write_testtags(pool: &Pool, repo: RepoId, out: &mut String) {
    let _ = writeln!(out, "#>=Ver: 2.0");
    for &s in pool.repo_solvables(repo) {
        let sv = pool.solvable(s);
        let evr = pool.evr_str(sv.evr);
        let (version, release) = match evr.rfind('-') {
            Some(pos) => (&evr[..pos], &evr[pos + 1..]),
            None => (evr, "-"),
        };
        let _ = writeln!(
            out,
            "#>=Pkg: {} {} {} {}",
            pool.name_str(sv.name),
            version,
            release,
            pool.arch_str(sv.arch)
        );

        let blocks: &[(&str, &Vec<_>)] = &[
            ("Req", &sv.requires),
            ("Prq", &sv.prereqs),
            ("Prv", &sv.provides),
            ("Obs", &sv.obsoletes),
            ("Con", &sv.conflicts),
            ("Rec", &sv.recommends),
            ("Sup", &sv.supplements),
            ("Sug", &sv.suggests),
            ("Enh", &sv.enhances),
        ];
        for (tag, deps) in blocks {
            if deps.is_empty() {
                continue;
            }
            let _ = writeln!(out, "#>+{tag}:");
            for &dep in deps.iter() {
                let _ = writeln!(out, "#>{}", pool.dep_str(dep));
            }
            let _ = writeln!(out, "#>-{tag}:");
        }
        if let Some(vendor) = sv.vendor {
            let _ = writeln!(out, "#>=Vnd: {}", pool.vendor_str(vendor));
        }
        if let Some(time) = sv.build_time {
            let _ = writeln!(out, "#>=Tim: {time}");
        }
    }
}

/// Renders the deterministic result of the last solve: same pool, same
/// jobs, byte-identical output.
pub fn solver_result(solver: &mut Solver, flags: ResultFlags) -> String {
    let mut out = String::new();

    if flags.transaction {
        let transaction = solver.transaction();
        let pool = solver.pool();
        let mut lines: Vec<String> = Vec::new();
        for step in &transaction.steps {
            lines.push(match *step {
                crate::transaction::Step::Install(s) => {
                    format!("install {}", pool.display(s))
                }
                crate::transaction::Step::Erase(s) => format!("erase {}", pool.display(s)),
                crate::transaction::Step::Upgrade { from, to } => {
                    format!("upgrade {} {}", pool.display(from), pool.display(to))
                }
            });
        }
        lines.sort();
        for line in lines {
            let _ = writeln!(out, "{line}");
        }
    }

    if flags.problems {
        for problem in 0..solver.problem_count() {
            let info = match solver.find_problem_rule(problem) {
                Some(rule) => solver.describe_rule(rule),
                None => "unknown problem".to_string(),
            };
            let _ = writeln!(out, "problem {} info {}", problem + 1, info);
            for (si, solution) in solver.solutions(problem).iter().enumerate() {
                for element in &solution.elements {
                    let _ = writeln!(
                        out,
                        "problem {} solution {} {}",
                        problem + 1,
                        si + 1,
                        solver.describe_solution_element(element)
                    );
                }
            }
        }
    }

    if flags.orphaned {
        for &s in solver.orphaned() {
            let _ = writeln!(out, "orphaned {}", solver.pool().display(s));
        }
    }

    if flags.recommended {
        let (recommended, suggested) = solver.recommendations();
        for s in recommended {
            let _ = writeln!(out, "recommended {}", solver.pool().display(s));
        }
        for s in suggested {
            let _ = writeln!(out, "suggested {}", solver.pool().display(s));
        }
    }

    if flags.unneeded {
        for s in solver.unneeded(true) {
            let _ = writeln!(out, "unneeded {}", solver.pool().display(s));
        }
    }

    out
}

#[cfg(test)]
mod test {
    use super::*;

    const SIMPLE: &str = "\
repo available 99 testtags <inline>
#>=Ver: 2.0
#>=Pkg: a 1 1 x86_64
#>+Req:
#>b
#>-Req:
#>=Pkg: b 1 1 x86_64
system x86_64 rpm
job install name a
result transaction <inline>
#>install a-1-1.x86_64
#>install b-1-1.x86_64
nextjob
";

    #[test]
    fn test_read_simple() {
        let testcase = read_str(SIMPLE).unwrap();
        assert_eq!(testcase.runs.len(), 1);
        assert_eq!(testcase.runs[0].jobs.len(), 1);
        assert!(testcase.runs[0].result_flags.transaction);
        assert_eq!(
            testcase.runs[0].expected_result,
            "install a-1-1.x86_64\ninstall b-1-1.x86_64\n"
        );
        // Two solvables plus the system pseudo-solvable
        assert_eq!(testcase.pool.solvable_count(), 3);
    }

    #[test]
    fn test_solve_matches_expectation() {
        let testcase = read_str(SIMPLE).unwrap();
        let mut solver = Solver::new(testcase.pool);
        let run = &testcase.runs[0];
        assert_eq!(solver.solve(&run.jobs), 0);
        assert_eq!(
            solver_result(&mut solver, run.result_flags),
            run.expected_result
        );
    }

    #[test]
    fn test_write_read_round_trip() {
        let testcase = read_str(SIMPLE).unwrap();
        let run_flags = testcase.runs[0].result_flags;
        let mut solver = Solver::new(testcase.pool);
        solver.solve(&testcase.runs[0].jobs);
        let written = write_string(&mut solver, run_flags);

        let reread = read_str(&written).unwrap();
        let mut solver2 = Solver::new(reread.pool);
        for &(flag, value) in &reread.solver_flags {
            solver2.set_flag(flag, value);
        }
        solver2.solve(&reread.runs[0].jobs);
        let result2 = solver_result(&mut solver2, reread.runs[0].result_flags);
        assert_eq!(result2, reread.runs[0].expected_result);
    }
}

//! End-to-end solver scenarios covering install, distupgrade, unsolvable
//! cores with solutions, multiversion patches, cleandeps and update
//! alternatives.

mod common;

use common::Fixture;
use depsolv::{
    Job, JobAction, JobFlags, JobQueue, JobTarget, SolutionElement, Solver, SolverFlag, Step,
};

#[test]
#[tracing_test::traced_test]
fn trivial_install_pulls_dependencies() {
    let mut f = Fixture::new();
    let a = f.available_pkg("A", "1-1");
    f.requires(a, "B");
    let b = f.available_pkg("B", "1-1");
    f.ready();

    let mut jobs = JobQueue::new();
    let name = f.pool.parse_dep("A");
    jobs.push(Job::new(JobAction::Install, JobTarget::Name(name)));

    let mut solver = Solver::new(f.pool);
    assert_eq!(solver.solve(&jobs), 0);

    let tx = solver.transaction();
    let mut installs: Vec<_> = tx.installs().collect();
    installs.sort();
    assert_eq!(installs, vec![a, b]);
    assert_eq!(tx.erases().count(), 0);
    assert!(logs_contain("solve finished"));
}

#[test]
fn distupgrade_follows_obsoletes() {
    let mut f = Fixture::new();
    let a1 = f.installed_pkg("A", "1-1");
    let a2 = f.available_pkg("A2", "2-1");
    f.obsoletes(a2, "A");
    f.provides(a2, "A = 2-1");
    f.ready();

    let mut jobs = JobQueue::new();
    jobs.push(Job::new(JobAction::DistUpgrade, JobTarget::All));

    let mut solver = Solver::new(f.pool);
    assert_eq!(solver.solve(&jobs), 0);

    let tx = solver.transaction();
    assert_eq!(tx.steps, vec![Step::Upgrade { from: a1, to: a2 }]);
}

#[test]
fn distupgrade_refuses_name_change_when_disallowed() {
    let mut f = Fixture::new();
    let _a1 = f.installed_pkg("A", "1-1");
    let a2 = f.available_pkg("A2", "2-1");
    f.obsoletes(a2, "A");
    f.provides(a2, "A = 2-1");
    f.ready();

    let mut jobs = JobQueue::new();
    jobs.push(Job::new(JobAction::DistUpgrade, JobTarget::All));

    let mut solver = Solver::new(f.pool);
    solver.set_flag(SolverFlag::AllowNameChange, false);
    assert_eq!(solver.solve(&jobs), 1);

    // The installed package stays put
    let tx = solver.transaction();
    assert!(tx.is_empty(), "unexpected steps: {:?}", tx.steps);

    let solutions = solver.solutions(0);
    assert!(!solutions.is_empty());
    // One way out is replacing A with A2 despite the name change
    assert!(solutions.iter().any(|s| {
        s.elements.iter().any(|e| {
            matches!(
                e,
                SolutionElement::Replace { replacement, .. } if *replacement == a2
            )
        })
    }));
}

#[test]
fn unsolvable_requires_offers_job_removal() {
    let mut f = Fixture::new();
    let a = f.available_pkg("A", "1-1");
    f.requires(a, "B >= 2");
    let _b = f.installed_pkg("B", "1-1");
    f.ready();

    let mut jobs = JobQueue::new();
    let name = f.pool.parse_dep("A");
    jobs.push(Job::new(JobAction::Install, JobTarget::Name(name)));

    let mut solver = Solver::new(f.pool);
    assert_eq!(solver.solve(&jobs), 1);

    let rule = solver.find_problem_rule(0).unwrap();
    let info = solver.describe_rule(rule);
    insta::assert_snapshot!(info, @"nothing provides B >= 2 needed by A-1-1.x86_64");

    let solutions = solver.solutions(0);
    assert!(solutions
        .iter()
        .any(|s| s.elements.contains(&SolutionElement::DeleteJob { job: 0 })));
    // The old B never shows up as a downgrade suggestion here
    assert!(!solutions.iter().any(|s| s
        .elements
        .iter()
        .any(|e| matches!(e, SolutionElement::Replace { .. }))));
}

#[test]
fn multiversion_patch_conflict_installs_both_versions() {
    let mut f = Fixture::new();
    let a1 = f.installed_pkg("A", "1-1");
    let a2 = f.available_pkg("A", "2-1");
    let patch = f.available_pkg("patch:P", "1-1");
    f.conflicts(patch, "A < 2");
    f.ready();

    let mut jobs = JobQueue::new();
    let a_name = f.pool.parse_dep("A");
    jobs.push(Job::new(JobAction::Multiversion, JobTarget::Name(a_name)));
    let p_name = f.pool.parse_dep("patch:P");
    jobs.push(Job::new(JobAction::Install, JobTarget::Name(p_name)));

    let mut solver = Solver::new(f.pool);
    assert_eq!(solver.solve(&jobs), 0);

    let tx = solver.transaction();
    let mut installs: Vec<_> = tx.installs().collect();
    installs.sort();
    assert_eq!(installs, vec![a2, patch]);
    // The old version stays installed next to the new one
    assert_eq!(tx.erases().count(), 0);
    let _ = a1;
}

#[test]
fn cleandeps_erase_collects_the_chain() {
    let mut f = Fixture::new();
    let u = f.installed_pkg("U", "1-1");
    f.requires(u, "L");
    let l = f.installed_pkg("L", "1-1");
    f.requires(l, "X");
    let x = f.installed_pkg("X", "1-1");
    f.ready();

    let mut jobs = JobQueue::new();
    let user = f.pool.parse_dep("U");
    jobs.push(Job::new(
        JobAction::UserInstalled,
        JobTarget::Name(user),
    ));
    let target = f.pool.parse_dep("U");
    jobs.push(Job::with_flags(
        JobAction::Erase,
        JobTarget::Name(target),
        JobFlags {
            cleandeps: true,
            ..JobFlags::default()
        },
    ));

    let mut solver = Solver::new(f.pool);
    assert_eq!(solver.solve(&jobs), 0);

    assert_eq!(solver.cleandeps(), vec![l, x]);
    let tx = solver.transaction();
    let mut erased: Vec<_> = tx.erases().collect();
    erased.sort();
    assert_eq!(erased, vec![u, l, x]);
}

#[test]
fn update_prefers_unblocked_alternative() {
    let mut f = Fixture::new();
    let a1 = f.installed_pkg("A", "1-1");
    let d = f.installed_pkg("D", "1-1");
    let a2 = f.available_pkg("A", "2-1");
    f.requires(a2, "virt");
    let b = f.available_pkg("B", "2-1");
    f.provides(b, "virt");
    let c = f.available_pkg("C", "1-1");
    f.provides(c, "virt");
    f.conflicts(c, "D");
    f.ready();

    let mut jobs = JobQueue::new();
    let name = f.pool.parse_dep("A");
    jobs.push(Job::new(JobAction::Update, JobTarget::Name(name)));

    let mut solver = Solver::new(f.pool);
    assert_eq!(solver.solve(&jobs), 0);

    let tx = solver.transaction();
    assert!(tx.steps.contains(&Step::Upgrade { from: a1, to: a2 }));
    assert!(tx.installs().any(|s| s == b));
    assert!(!tx.installs().any(|s| s == c));
    let _ = d;
}

#[test]
fn solve_is_deterministic() {
    for _ in 0..2 {
        let run = || {
            let mut f = Fixture::new();
            let a = f.available_pkg("A", "1-1");
            f.requires(a, "B");
            let b1 = f.available_pkg("B", "1-1");
            let b2 = f.available_pkg("B", "2-1");
            f.recommends(b2, "C");
            let _c = f.available_pkg("C", "1-1");
            f.ready();

            let mut jobs = JobQueue::new();
            let name = f.pool.parse_dep("A");
            jobs.push(Job::new(JobAction::Install, JobTarget::Name(name)));

            let mut solver = Solver::new(f.pool);
            solver.solve(&jobs);
            let _ = (b1, b2);
            format!("{:?}", solver.transaction().steps)
        };
        assert_eq!(run(), run());
    }
}

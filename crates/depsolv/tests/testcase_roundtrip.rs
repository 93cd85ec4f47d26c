//! The testcase text format is the conformance interface: reading back a
//! written testcase must reproduce the same solver behavior, and repeated
//! solves must render byte-identical results.

use depsolv::testcase::{self, ResultFlags};
use depsolv::Solver;

const CASE: &str = "\
repo system 99 testtags <inline>
#>=Ver: 2.0
#>=Pkg: libfoo 1.0 1 x86_64
#>=Pkg: app 1.0 1 x86_64
#>+Req:
#>libfoo
#>-Req:
repo available 99 testtags <inline>
#>=Ver: 2.0
#>=Pkg: libfoo 2.0 1 x86_64
#>=Pkg: app 2.0 1 x86_64
#>+Req:
#>libfoo >= 2.0
#>-Req:
#>=Pkg: tool 1.0 1 x86_64
#>+Req:
#>app >= 2.0
#>-Req:
system x86_64 rpm system
job install name tool
result transaction <inline>
#>install tool-1.0-1.x86_64
#>upgrade app-1.0-1.x86_64 app-2.0-1.x86_64
#>upgrade libfoo-1.0-1.x86_64 libfoo-2.0-1.x86_64
nextjob
";

fn solve_case(text: &str) -> (Solver, String, String) {
    let case = testcase::read_str(text).expect("testcase parses");
    let run = &case.runs[0];
    let mut solver = Solver::new(case.pool);
    for &(flag, value) in &case.solver_flags {
        solver.set_flag(flag, value);
    }
    solver.solve(&run.jobs);
    let result = testcase::solver_result(&mut solver, run.result_flags);
    (solver, result, run.expected_result.clone())
}

#[test]
fn expected_result_matches() {
    let (_, result, expected) = solve_case(CASE);
    assert_eq!(result, expected);
}

#[test]
fn write_then_read_reproduces_the_result() {
    let (mut solver, result, _) = solve_case(CASE);
    let written = testcase::write_string(&mut solver, ResultFlags {
        transaction: true,
        ..ResultFlags::default()
    });

    let (_, reread_result, reread_expected) = solve_case(&written);
    assert_eq!(reread_result, result);
    assert_eq!(reread_result, reread_expected);
}

#[test]
fn repeated_solves_render_identically() {
    let (_, first, _) = solve_case(CASE);
    let (_, second, _) = solve_case(CASE);
    assert_eq!(first, second);
}

#[test]
fn unsolvable_case_reports_problems_section() {
    let case = "\
repo available 99 testtags <inline>
#>=Ver: 2.0
#>=Pkg: app 1.0 1 x86_64
#>+Req:
#>missing
#>-Req:
system x86_64 rpm
job install name app
result transaction,problems <inline>
nextjob
";
    let parsed = testcase::read_str(case).expect("testcase parses");
    let mut solver = Solver::new(parsed.pool);
    assert_eq!(solver.solve(&parsed.runs[0].jobs), 1);

    let rendered = testcase::solver_result(&mut solver, parsed.runs[0].result_flags);
    assert!(
        rendered.contains("problem 1 info nothing provides missing needed by app-1.0-1.x86_64"),
        "unexpected result: {rendered}"
    );
    assert!(rendered.contains("problem 1 solution 1 deljob install name app"));
}

use crate::{Constraint, Solver, SolverError, Variable};

fn var(id: &str) -> Variable {
    Variable::new(id)
}

fn mandatory(id: &str) -> Variable {
    Variable::new(id).with_constraint(Constraint::Mandatory)
}

fn solve(variables: Vec<Variable>) -> Result<Vec<String>, SolverError> {
    let solution = Solver::new(variables)?.solve()?;
    Ok(solution.selected().map(|id| id.to_string()).collect())
}

// ============================================================================
// Basic selection
// ============================================================================

#[test]
fn test_empty_problem() {
    assert_eq!(solve(vec![]).unwrap(), Vec::<String>::new());
}

#[test]
fn test_unconstrained_variables_are_not_selected() {
    assert_eq!(solve(vec![var("a"), var("b")]).unwrap(), Vec::<String>::new());
}

#[test]
fn test_mandatory_is_selected() {
    assert_eq!(solve(vec![mandatory("a"), var("b")]).unwrap(), vec!["a"]);
}

#[test]
fn test_dependency_prefers_first_candidate() {
    let result = solve(vec![
        mandatory("app").with_constraint(Constraint::dependency(["lib-3", "lib-2", "lib-1"])),
        var("lib-1"),
        var("lib-2"),
        var("lib-3"),
    ])
    .unwrap();
    assert_eq!(result, vec!["app", "lib-3"]);
}

#[test]
fn test_dependency_skips_prohibited_candidate() {
    let result = solve(vec![
        mandatory("app").with_constraint(Constraint::dependency(["lib-2", "lib-1"])),
        var("lib-1"),
        var("lib-2").with_constraint(Constraint::Prohibited),
    ])
    .unwrap();
    assert_eq!(result, vec!["app", "lib-1"]);
}

#[test]
fn test_transitive_dependencies() {
    let result = solve(vec![
        mandatory("app").with_constraint(Constraint::dependency(["a"])),
        var("a").with_constraint(Constraint::dependency(["b-2", "b-1"])),
        var("b-1"),
        var("b-2").with_constraint(Constraint::dependency(["c"])),
        var("c"),
    ])
    .unwrap();
    assert_eq!(result, vec!["app", "a", "b-2", "c"]);
}

// ============================================================================
// Backtracking
// ============================================================================

#[test]
fn test_backtracks_when_preferred_candidate_fails_later() {
    // b-2 needs c-2, which conflicts with d; d is mandatory
    let result = solve(vec![
        mandatory("app").with_constraint(Constraint::dependency(["b-2", "b-1"])),
        mandatory("d"),
        var("b-1"),
        var("b-2").with_constraint(Constraint::dependency(["c-2"])),
        var("c-2").with_constraint(Constraint::conflict("d")),
    ])
    .unwrap();
    assert_eq!(result, vec!["app", "d", "b-1"]);
}

#[test]
fn test_at_most_forces_shared_choice() {
    // Two requesters of the same package must agree on one version
    let result = solve(vec![
        mandatory("x").with_constraint(Constraint::dependency(["p-2", "p-1"])),
        mandatory("y").with_constraint(Constraint::dependency(["p-1"])),
        var("p-1"),
        var("p-2"),
        var("p uniqueness").with_constraint(Constraint::at_most(1, ["p-1", "p-2"])),
    ])
    .unwrap();
    assert_eq!(result, vec!["x", "y", "p-1"]);
}

// ============================================================================
// Unsatisfiable problems
// ============================================================================

#[test]
fn test_mandatory_and_prohibited() {
    let err = solve(vec![mandatory("a").with_constraint(Constraint::Prohibited)]).unwrap_err();
    assert!(err.is_unsatisfiable());
    assert_eq!(
        err.to_string(),
        "constraints not satisfiable: a is mandatory, a is prohibited"
    );
}

#[test]
fn test_dependency_without_candidates() {
    let err = solve(vec![mandatory("a").with_constraint(Constraint::dependency(Vec::<&str>::new()))])
        .unwrap_err();
    assert!(err.is_unsatisfiable());
    assert!(err
        .to_string()
        .contains("a has a dependency without any candidates to satisfy it"));
}

#[test]
fn test_uniqueness_prevents_two_versions() {
    let err = solve(vec![
        mandatory("x").with_constraint(Constraint::dependency(["p-2"])),
        mandatory("y").with_constraint(Constraint::dependency(["p-1"])),
        var("p-1"),
        var("p-2"),
        var("p uniqueness").with_constraint(Constraint::at_most(1, ["p-1", "p-2"])),
    ])
    .unwrap_err();

    let SolverError::NotSatisfiable(problem) = &err else {
        panic!("expected unsatisfiable, got {:?}", err);
    };
    let described: Vec<String> = problem.constraints().iter().map(|c| c.to_string()).collect();
    assert_eq!(
        described,
        vec![
            "x is mandatory",
            "x requires at least one of p-2",
            "y is mandatory",
            "y requires at least one of p-1",
            "p uniqueness permits at most 1 of p-1, p-2",
        ]
    );
}

#[test]
fn test_conflict_between_mandatory_variables() {
    let err = solve(vec![mandatory("a").with_constraint(Constraint::conflict("b")), mandatory("b")])
        .unwrap_err();
    assert!(err.is_unsatisfiable());
    assert!(err.to_string().contains("a conflicts with b"));
}

#[test]
fn test_unsatisfiable_after_exhausting_alternatives() {
    let err = solve(vec![
        mandatory("app").with_constraint(Constraint::dependency(["b-2", "b-1"])),
        var("b-1").with_constraint(Constraint::Prohibited),
        var("b-2").with_constraint(Constraint::dependency(["c"])),
        var("c").with_constraint(Constraint::Prohibited),
    ])
    .unwrap_err();
    assert!(err.is_unsatisfiable());
}

// ============================================================================
// Malformed problems and limits
// ============================================================================

#[test]
fn test_duplicate_identifier() {
    let err = Solver::new(vec![var("a"), var("a")]).unwrap_err();
    assert!(matches!(err, SolverError::DuplicateIdentifier(ref id) if id.as_str() == "a"));
    assert!(!err.is_unsatisfiable());
}

#[test]
fn test_unknown_identifier() {
    let err = Solver::new(vec![var("a").with_constraint(Constraint::dependency(["missing"]))]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "variable \"a\" references unknown variable \"missing\""
    );
}

#[test]
fn test_iteration_limit() {
    let err = Solver::new(vec![
        mandatory("app").with_constraint(Constraint::dependency(["b-2", "b-1"])),
        var("b-1"),
        var("b-2"),
    ])
    .unwrap()
    .with_max_iterations(1)
    .solve()
    .unwrap_err();
    assert!(matches!(err, SolverError::IterationLimit(1)));
    assert!(!err.is_unsatisfiable());
}

#[test]
fn test_deterministic() {
    let build = || {
        vec![
            mandatory("x").with_constraint(Constraint::dependency(["p-3", "p-2", "p-1"])),
            mandatory("y").with_constraint(Constraint::dependency(["p-2", "p-1"])),
            var("p-1"),
            var("p-2"),
            var("p-3"),
            var("u").with_constraint(Constraint::at_most(1, ["p-1", "p-2", "p-3"])),
        ]
    };
    let first = solve(build()).unwrap();
    for _ in 0..5 {
        assert_eq!(solve(build()).unwrap(), first);
    }
    assert_eq!(first, vec!["x", "y", "p-2"]);
}

use indexmap::{IndexMap, IndexSet};

use crate::constraint::Constraint;
use crate::decisions::{Decisions, VariableId};
use crate::error::SolverError;
use crate::problem::{AppliedConstraint, NotSatisfiable};
use crate::rule::{Literal, Rule, RuleState, RuleType};
use crate::variable::{Identifier, Variable};

const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// Selected variables of a satisfying assignment, in problem order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Solution {
    selected: IndexSet<Identifier>,
}

impl Solution {
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn selected(&self) -> impl Iterator<Item = &Identifier> {
        self.selected.iter()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// A branch point: the candidates of one dependency, tried in order
#[derive(Debug)]
struct Branch {
    level: u32,
    alternatives: Vec<Literal>,
    next: usize,
}

/// Preference-ordered solver over a fixed list of variables
#[derive(Debug)]
pub struct Solver {
    variables: Vec<Variable>,
    rules: Vec<Rule>,
    /// Dependency rule ids per variable (index = VariableId), in constraint order
    dependency_rules: Vec<Vec<u32>>,
    max_iterations: usize,
}

impl Solver {
    /// Validate the problem and compile its constraints into rules
    pub fn new(variables: Vec<Variable>) -> Result<Self, SolverError> {
        let mut index: IndexMap<Identifier, VariableId> = IndexMap::with_capacity(variables.len());
        for (i, variable) in variables.iter().enumerate() {
            if index.insert(variable.id().clone(), (i + 1) as VariableId).is_some() {
                return Err(SolverError::DuplicateIdentifier(variable.id().clone()));
            }
        }

        let lookup = |variable: &Variable, reference: &Identifier| -> Result<VariableId, SolverError> {
            index
                .get(reference)
                .copied()
                .ok_or_else(|| SolverError::UnknownIdentifier {
                    variable: variable.id().clone(),
                    reference: reference.clone(),
                })
        };

        let mut rules = Vec::new();
        let mut dependency_rules = vec![Vec::new(); variables.len() + 1];
        for (i, variable) in variables.iter().enumerate() {
            let subject = (i + 1) as VariableId;
            let s = subject as Literal;
            for (c, constraint) in variable.constraints().iter().enumerate() {
                let id = rules.len() as u32;
                let origin = (subject, c);
                let rule = match constraint {
                    Constraint::Mandatory => Rule::clause(id, RuleType::Mandatory, origin, vec![s]),
                    Constraint::Prohibited => Rule::clause(id, RuleType::Prohibited, origin, vec![-s]),
                    Constraint::Dependency(ids) => {
                        let mut literals = vec![-s];
                        for target in ids {
                            literals.push(lookup(variable, target)? as Literal);
                        }
                        dependency_rules[subject as usize].push(id);
                        Rule::clause(id, RuleType::Dependency, origin, literals)
                    }
                    Constraint::Conflict(other) => {
                        let other = lookup(variable, other)? as Literal;
                        Rule::clause(id, RuleType::Conflict, origin, vec![-s, -other])
                    }
                    Constraint::AtMost(n, ids) => {
                        let targets = ids
                            .iter()
                            .map(|target| lookup(variable, target))
                            .collect::<Result<Vec<_>, _>>()?;
                        Rule::at_most(id, origin, *n, targets)
                    }
                };
                rules.push(rule);
            }
        }

        log::debug!("solver: {} variables, {} rules", variables.len(), rules.len());

        Ok(Self {
            variables,
            rules,
            dependency_rules,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        })
    }

    /// Bound the number of search steps before giving up with
    /// [`SolverError::IterationLimit`]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Search for the preferred satisfying assignment
    pub fn solve(&self) -> Result<Solution, SolverError> {
        let mut decisions = Decisions::with_capacity(self.variables.len());
        let mut branches: Vec<Branch> = Vec::new();
        let mut involved: IndexSet<u32> = IndexSet::new();
        let mut iterations = 0usize;

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(SolverError::IterationLimit(self.max_iterations));
            }

            if let Some(conflict) = self.propagate(&mut decisions) {
                self.collect_reasons(conflict, &decisions, &mut involved);
                if !self.backtrack(&mut decisions, &mut branches) {
                    return Err(SolverError::NotSatisfiable(self.explain(&involved)));
                }
                continue;
            }

            match self.next_branch(&decisions) {
                Some(alternatives) => {
                    decisions.increment_level();
                    let level = decisions.level();
                    let first = alternatives[0];
                    log::debug!(
                        "solver: level {} choosing {} of {} candidates",
                        level,
                        self.name(first),
                        alternatives.len()
                    );
                    branches.push(Branch {
                        level,
                        alternatives,
                        next: 1,
                    });
                    decisions.decide(first, None);
                }
                None => return Ok(self.solution(&decisions)),
            }
        }
    }

    /// Apply implied decisions until a fixpoint; returns the id of a
    /// conflicting rule, if any
    fn propagate(&self, decisions: &mut Decisions) -> Option<u32> {
        loop {
            let mut changed = false;
            for rule in &self.rules {
                match rule.evaluate(decisions) {
                    RuleState::Satisfied | RuleState::Open => {}
                    RuleState::Conflict => return Some(rule.id()),
                    RuleState::Implies(literals) => {
                        for literal in literals {
                            if !decisions.decide(literal, Some(rule.id())) {
                                return Some(rule.id());
                            }
                        }
                        changed = true;
                    }
                }
            }
            if !changed {
                return None;
            }
        }
    }

    /// Move to the next untried alternative, unwinding exhausted branches.
    /// Returns false when no branch is left.
    fn backtrack(&self, decisions: &mut Decisions, branches: &mut Vec<Branch>) -> bool {
        while let Some(branch) = branches.last_mut() {
            if branch.next < branch.alternatives.len() {
                let literal = branch.alternatives[branch.next];
                branch.next += 1;
                decisions.revert_to_level(branch.level - 1);
                decisions.increment_level();
                log::debug!("solver: backtracking to level {}, trying {}", branch.level, self.name(literal));
                decisions.decide(literal, None);
                return true;
            }
            branches.pop();
        }
        false
    }

    /// First unresolved dependency of a selected variable, as the list of
    /// its undecided candidates in preference order
    fn next_branch(&self, decisions: &Decisions) -> Option<Vec<Literal>> {
        for variable in decisions.selected_in_order() {
            for &rule_id in &self.dependency_rules[variable as usize] {
                let rule = &self.rules[rule_id as usize];
                if rule.evaluate(decisions) != RuleState::Open {
                    continue;
                }
                let alternatives: Vec<Literal> = rule
                    .literals()
                    .iter()
                    .copied()
                    .filter(|&l| l > 0 && decisions.undecided(l))
                    .collect();
                if !alternatives.is_empty() {
                    return Some(alternatives);
                }
            }
        }
        None
    }

    /// Record the conflicting rule and the rules that forced the decisions it
    /// depends on
    fn collect_reasons(&self, rule_id: u32, decisions: &Decisions, involved: &mut IndexSet<u32>) {
        let mut pending = vec![rule_id];
        while let Some(id) = pending.pop() {
            if !involved.insert(id) {
                continue;
            }
            for &literal in self.rules[id as usize].literals() {
                if let Some(reason) = decisions.decision_rule(literal) {
                    pending.push(reason);
                }
            }
            // the subject of a rule is part of its story even when it is
            // not one of the rule's own literals
            let (subject, _) = self.rules[id as usize].origin();
            if let Some(reason) = decisions.decision_rule(subject as Literal) {
                pending.push(reason);
            }
        }
    }

    fn explain(&self, involved: &IndexSet<u32>) -> NotSatisfiable {
        let mut ids: Vec<u32> = involved.iter().copied().collect();
        ids.sort_unstable();
        NotSatisfiable::new(
            ids.into_iter()
                .map(|id| {
                    let (subject, c) = self.rules[id as usize].origin();
                    let variable = &self.variables[(subject - 1) as usize];
                    AppliedConstraint {
                        variable: variable.id().clone(),
                        constraint: variable.constraints()[c].clone(),
                    }
                })
                .collect(),
        )
    }

    fn solution(&self, decisions: &Decisions) -> Solution {
        Solution {
            selected: self
                .variables
                .iter()
                .enumerate()
                .filter(|(i, _)| decisions.selected((i + 1) as VariableId))
                .map(|(_, v)| v.id().clone())
                .collect(),
        }
    }

    fn name(&self, literal: Literal) -> &str {
        self.variables
            .get(literal.unsigned_abs() as usize - 1)
            .map(|v| v.id().as_str())
            .unwrap_or("?")
    }
}

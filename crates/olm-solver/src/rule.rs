use crate::decisions::{Decisions, VariableId};

/// A literal in SAT terms: positive means "selected", negative means "not selected".
/// The magnitude is the 1-based [`VariableId`].
pub type Literal = i32;

/// The constraint kind a rule was generated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    Mandatory,
    Prohibited,
    Dependency,
    Conflict,
    AtMost,
}

/// Compiled form of one constraint.
///
/// Clause rules are disjunctions of literals and are satisfied when at least
/// one literal holds. Cardinality rules bound how many of their variables
/// may be selected.
#[derive(Debug, Clone)]
pub struct Rule {
    id: u32,
    rule_type: RuleType,
    /// Subject variable and index of the originating constraint on it
    origin: (VariableId, usize),
    literals: Vec<Literal>,
    /// Cardinality bound; `None` for clause rules
    at_most: Option<usize>,
}

/// Evaluation of a rule against the current decisions
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RuleState {
    Satisfied,
    /// Not yet decided either way, more than one way to satisfy it
    Open,
    /// These undecided literals must now hold
    Implies(Vec<Literal>),
    Conflict,
}

impl Rule {
    /// Clause rule from literals; duplicate literals are dropped
    pub(crate) fn clause(id: u32, rule_type: RuleType, origin: (VariableId, usize), literals: Vec<Literal>) -> Self {
        let mut deduped: Vec<Literal> = Vec::with_capacity(literals.len());
        for literal in literals {
            if !deduped.contains(&literal) {
                deduped.push(literal);
            }
        }
        Self {
            id,
            rule_type,
            origin,
            literals: deduped,
            at_most: None,
        }
    }

    /// Cardinality rule over variables; duplicates are dropped
    pub(crate) fn at_most(id: u32, origin: (VariableId, usize), n: usize, variables: Vec<VariableId>) -> Self {
        let mut literals: Vec<Literal> = Vec::with_capacity(variables.len());
        for variable in variables {
            let literal = variable as Literal;
            if !literals.contains(&literal) {
                literals.push(literal);
            }
        }
        Self {
            id,
            rule_type: RuleType::AtMost,
            origin,
            literals,
            at_most: Some(n),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub(crate) fn origin(&self) -> (VariableId, usize) {
        self.origin
    }

    pub(crate) fn evaluate(&self, decisions: &Decisions) -> RuleState {
        match self.at_most {
            None => self.evaluate_clause(decisions),
            Some(n) => self.evaluate_cardinality(n, decisions),
        }
    }

    fn evaluate_clause(&self, decisions: &Decisions) -> RuleState {
        let mut undecided = Vec::new();
        for &literal in &self.literals {
            if decisions.satisfied(literal) {
                return RuleState::Satisfied;
            }
            if !decisions.conflict(literal) {
                undecided.push(literal);
            }
        }
        match undecided.len() {
            0 => RuleState::Conflict,
            1 => RuleState::Implies(undecided),
            _ => RuleState::Open,
        }
    }

    fn evaluate_cardinality(&self, n: usize, decisions: &Decisions) -> RuleState {
        let selected = self.literals.iter().filter(|&&l| decisions.satisfied(l)).count();
        if selected > n {
            return RuleState::Conflict;
        }
        let undecided: Vec<Literal> = self
            .literals
            .iter()
            .filter(|&&l| decisions.undecided(l))
            .map(|&l| -l)
            .collect();
        if undecided.is_empty() {
            RuleState::Satisfied
        } else if selected == n {
            RuleState::Implies(undecided)
        } else {
            RuleState::Open
        }
    }
}

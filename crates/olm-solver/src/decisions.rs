use crate::rule::Literal;

/// 1-based index of a variable in the problem
pub type VariableId = u32;

/// Tracks decisions made during solving.
///
/// Each decision records:
/// - Whether a variable is selected (+) or not selected (-)
/// - At what decision level it was decided
/// - Which rule caused the decision (`None` for branch decisions)
///
/// The decision_map stores: 0 = undecided, >0 = selected at level N-1, <0 = not selected at level N-1
#[derive(Debug, Default)]
pub struct Decisions {
    decision_map: Vec<i32>,
    /// Decisions in the order they were made [(literal, rule_id)]
    decision_queue: Vec<(Literal, Option<u32>)>,
    level: u32,
}

impl Decisions {
    /// Create a new decisions tracker sized for `variables` variables
    pub fn with_capacity(variables: usize) -> Self {
        Self {
            decision_map: vec![0; variables + 1],
            decision_queue: Vec::with_capacity(variables),
            level: 0,
        }
    }

    #[inline]
    fn slot(&self, literal: Literal) -> i32 {
        self.decision_map
            .get(literal.unsigned_abs() as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Get the current decision level
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Increment the decision level
    #[inline]
    pub fn increment_level(&mut self) {
        self.level += 1;
    }

    /// Make a decision at the current level
    ///
    /// Returns false if this conflicts with an existing decision
    pub fn decide(&mut self, literal: Literal, rule_id: Option<u32>) -> bool {
        let id = literal.unsigned_abs() as usize;
        if id >= self.decision_map.len() {
            self.decision_map.resize(id + 1, 0);
        }

        let existing = self.decision_map[id];
        if existing != 0 {
            return (existing > 0) == (literal > 0);
        }

        // Store level+1 so that level 0 doesn't become 0 (which means undecided)
        let level_value = (self.level + 1) as i32;
        self.decision_map[id] = if literal > 0 { level_value } else { -level_value };
        self.decision_queue.push((literal, rule_id));
        true
    }

    /// Check if a literal is satisfied by current decisions
    #[inline]
    pub fn satisfied(&self, literal: Literal) -> bool {
        let decision = self.slot(literal);
        decision != 0 && (decision > 0) == (literal > 0)
    }

    /// Check if a literal conflicts with current decisions
    #[inline]
    pub fn conflict(&self, literal: Literal) -> bool {
        let decision = self.slot(literal);
        decision != 0 && (decision > 0) != (literal > 0)
    }

    /// Check if the literal's variable is undecided
    #[inline]
    pub fn undecided(&self, literal: Literal) -> bool {
        self.slot(literal) == 0
    }

    /// Check if a variable was decided to be selected
    #[inline]
    pub fn selected(&self, variable: VariableId) -> bool {
        self.slot(variable as Literal) > 0
    }

    /// Get the rule that caused the decision on this literal's variable
    pub fn decision_rule(&self, literal: Literal) -> Option<u32> {
        let variable = literal.unsigned_abs();
        self.decision_queue
            .iter()
            .find(|(l, _)| l.unsigned_abs() == variable)
            .and_then(|&(_, rule_id)| rule_id)
    }

    /// Revert all decisions at levels > target_level
    pub fn revert_to_level(&mut self, target_level: u32) {
        let target = (target_level + 1) as i32;

        for decision in &mut self.decision_map {
            if *decision != 0 && decision.abs() > target {
                *decision = 0;
            }
        }

        let decision_map = &self.decision_map;
        self.decision_queue
            .retain(|(literal, _)| decision_map[literal.unsigned_abs() as usize] != 0);

        self.level = target_level;
    }

    /// Get the decision queue
    pub fn queue(&self) -> &[(Literal, Option<u32>)] {
        &self.decision_queue
    }

    /// Variables decided to be selected, in decision order
    pub fn selected_in_order(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.decision_queue
            .iter()
            .filter(|(literal, _)| *literal > 0)
            .map(|(literal, _)| literal.unsigned_abs())
    }

    pub fn len(&self) -> usize {
        self.decision_queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decision_queue.is_empty()
    }
}

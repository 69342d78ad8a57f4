use crate::variable::Identifier;

/// A restriction attached to a variable (the "subject")
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// The subject must be selected
    Mandatory,
    /// The subject must not be selected
    Prohibited,
    /// If the subject is selected, at least one of these must be too.
    /// Earlier entries are preferred.
    Dependency(Vec<Identifier>),
    /// The subject and this variable are never both selected
    Conflict(Identifier),
    /// At most `n` of these are selected, regardless of the subject
    AtMost(usize, Vec<Identifier>),
}

impl Constraint {
    /// Dependency on the given identifiers, in preference order
    pub fn dependency<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Identifier>,
    {
        Constraint::Dependency(ids.into_iter().map(Into::into).collect())
    }

    /// Cardinality constraint over the given identifiers
    pub fn at_most<I, S>(n: usize, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Identifier>,
    {
        Constraint::AtMost(n, ids.into_iter().map(Into::into).collect())
    }

    pub fn conflict(id: impl Into<Identifier>) -> Self {
        Constraint::Conflict(id.into())
    }

    /// Identifiers referenced by this constraint, besides the subject
    pub fn references(&self) -> &[Identifier] {
        match self {
            Constraint::Mandatory | Constraint::Prohibited => &[],
            Constraint::Dependency(ids) | Constraint::AtMost(_, ids) => ids,
            Constraint::Conflict(id) => std::slice::from_ref(id),
        }
    }

    /// Human readable description of this constraint applied to `subject`
    pub fn describe(&self, subject: &Identifier) -> String {
        match self {
            Constraint::Mandatory => format!("{} is mandatory", subject),
            Constraint::Prohibited => format!("{} is prohibited", subject),
            Constraint::Dependency(ids) if ids.is_empty() => {
                format!("{} has a dependency without any candidates to satisfy it", subject)
            }
            Constraint::Dependency(ids) => {
                format!("{} requires at least one of {}", subject, join(ids))
            }
            Constraint::Conflict(id) => format!("{} conflicts with {}", subject, id),
            Constraint::AtMost(n, ids) => {
                format!("{} permits at most {} of {}", subject, n, join(ids))
            }
        }
    }
}

fn join(ids: &[Identifier]) -> String {
    ids.iter().map(Identifier::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let subject = Identifier::from("a");
        assert_eq!(Constraint::Mandatory.describe(&subject), "a is mandatory");
        assert_eq!(Constraint::Prohibited.describe(&subject), "a is prohibited");
        assert_eq!(
            Constraint::dependency(["b", "c"]).describe(&subject),
            "a requires at least one of b, c"
        );
        assert_eq!(
            Constraint::dependency(Vec::<&str>::new()).describe(&subject),
            "a has a dependency without any candidates to satisfy it"
        );
        assert_eq!(Constraint::conflict("b").describe(&subject), "a conflicts with b");
        assert_eq!(
            Constraint::at_most(1, ["b", "c"]).describe(&subject),
            "a permits at most 1 of b, c"
        );
    }

    #[test]
    fn test_references() {
        assert!(Constraint::Mandatory.references().is_empty());
        assert_eq!(Constraint::conflict("b").references(), &[Identifier::from("b")]);
        assert_eq!(Constraint::at_most(1, ["b", "c"]).references().len(), 2);
    }
}

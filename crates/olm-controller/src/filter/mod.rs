//! Predicate and sort pipeline for narrowing candidate bundles.
//!
//! Predicates are pure functions and compose with [`and`] and [`or`].
//! Filtering against predicates nothing satisfies yields an empty
//! result.

mod predicates;
pub mod sort;

pub use predicates::{
    in_channel, in_version_range, legacy_successors, replaces, semver_successors, skip_range_covers, skips,
    with_package_name, with_version,
};

use std::sync::Arc;

/// A pure test over an item
pub type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Logical AND; an empty list matches everything
pub fn and<T: 'static>(predicates: Vec<Predicate<T>>) -> Predicate<T> {
    Box::new(move |item| predicates.iter().all(|p| p(item)))
}

/// Logical OR; an empty list matches nothing
pub fn or<T: 'static>(predicates: Vec<Predicate<T>>) -> Predicate<T> {
    Box::new(move |item| predicates.iter().any(|p| p(item)))
}

/// Items satisfying the predicate, in input order
pub fn filter<T>(items: &[Arc<T>], predicate: &Predicate<T>) -> Vec<Arc<T>> {
    items.iter().filter(|item| predicate(item)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn even() -> Predicate<u32> {
        Box::new(|n| n % 2 == 0)
    }

    fn greater_than(x: u32) -> Predicate<u32> {
        Box::new(move |n| *n > x)
    }

    fn items() -> Vec<Arc<u32>> {
        (1..=6).map(Arc::new).collect()
    }

    fn values(items: Vec<Arc<u32>>) -> Vec<u32> {
        items.into_iter().map(|n| *n).collect()
    }

    #[test]
    fn test_and() {
        let p = and(vec![even(), greater_than(2)]);
        assert_eq!(values(filter(&items(), &p)), vec![4, 6]);
        assert_eq!(values(filter(&items(), &and(vec![]))).len(), 6);
    }

    #[test]
    fn test_or() {
        let p = or(vec![even(), greater_than(4)]);
        assert_eq!(values(filter(&items(), &p)), vec![2, 4, 5, 6]);
        assert!(filter(&items(), &or(vec![])).is_empty());
    }

    #[test]
    fn test_unsatisfiable_predicates_yield_empty() {
        let odd: Predicate<u32> = Box::new(|n| n % 2 == 1);
        let p = and(vec![even(), odd]);
        assert!(filter(&items(), &p).is_empty());
    }
}

//! Specification pattern for composable business rules
//!
//! Specifications are predicate objects combined with boolean logic
//! (`and`, `or`, `not`). Composites short-circuit, and a missing entity
//! never satisfies a specification.

use std::sync::Arc;

/// Core specification trait for business rules
pub trait Specification<T>: Send + Sync {
    /// Check if the entity satisfies this specification
    fn is_satisfied_by(&self, entity: &T) -> bool;

    /// Check an optional entity; `None` is never satisfied
    fn evaluate(&self, entity: Option<&T>) -> bool {
        entity.is_some_and(|e| self.is_satisfied_by(e))
    }

    /// Combine with another specification using AND
    fn and<S: Specification<T> + 'static>(self, other: S) -> AndSpecification<T>
    where
        Self: Sized + 'static,
    {
        AndSpecification {
            left: Arc::new(self),
            right: Arc::new(other),
        }
    }

    /// Combine with another specification using OR
    fn or<S: Specification<T> + 'static>(self, other: S) -> OrSpecification<T>
    where
        Self: Sized + 'static,
    {
        OrSpecification {
            left: Arc::new(self),
            right: Arc::new(other),
        }
    }

    /// Negate this specification
    fn not(self) -> NotSpecification<T>
    where
        Self: Sized + 'static,
    {
        NotSpecification {
            spec: Arc::new(self),
        }
    }
}

/// AND composite specification
pub struct AndSpecification<T> {
    left: Arc<dyn Specification<T>>,
    right: Arc<dyn Specification<T>>,
}

impl<T> Specification<T> for AndSpecification<T>
where
    T: Send + Sync,
{
    fn is_satisfied_by(&self, entity: &T) -> bool {
        self.left.is_satisfied_by(entity) && self.right.is_satisfied_by(entity)
    }
}

/// OR composite specification
pub struct OrSpecification<T> {
    left: Arc<dyn Specification<T>>,
    right: Arc<dyn Specification<T>>,
}

impl<T> Specification<T> for OrSpecification<T>
where
    T: Send + Sync,
{
    fn is_satisfied_by(&self, entity: &T) -> bool {
        self.left.is_satisfied_by(entity) || self.right.is_satisfied_by(entity)
    }
}

/// NOT specification wrapper
pub struct NotSpecification<T> {
    spec: Arc<dyn Specification<T>>,
}

impl<T> Specification<T> for NotSpecification<T>
where
    T: Send + Sync,
{
    fn is_satisfied_by(&self, entity: &T) -> bool {
        !self.spec.is_satisfied_by(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::domain::graph::{Edge, EdgeOptions, EdgeType, NodeId};

    fn edge(weight: f64, edge_type: EdgeType) -> Edge {
        Edge::with_options(
            NodeId::new(),
            NodeId::new(),
            EdgeOptions::new(edge_type).with_weight(weight),
        )
        .unwrap()
    }

    struct HeavySpec;

    impl Specification<Edge> for HeavySpec {
        fn is_satisfied_by(&self, edge: &Edge) -> bool {
            edge.weight >= 0.5
        }
    }

    struct StrongSpec;

    impl Specification<Edge> for StrongSpec {
        fn is_satisfied_by(&self, edge: &Edge) -> bool {
            edge.edge_type == EdgeType::Strong
        }
    }

    struct CountingSpec(Arc<AtomicUsize>);

    impl Specification<Edge> for CountingSpec {
        fn is_satisfied_by(&self, _edge: &Edge) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[test]
    fn test_and_or_not() {
        let heavy_strong = edge(0.9, EdgeType::Strong);
        let light_strong = edge(0.1, EdgeType::Strong);
        let light_weak = edge(0.1, EdgeType::Weak);

        let both = HeavySpec.and(StrongSpec);
        assert!(both.is_satisfied_by(&heavy_strong));
        assert!(!both.is_satisfied_by(&light_strong));

        let either = HeavySpec.or(StrongSpec);
        assert!(either.is_satisfied_by(&light_strong));
        assert!(!either.is_satisfied_by(&light_weak));

        let light = HeavySpec.not();
        assert!(light.is_satisfied_by(&light_weak));
    }

    #[test]
    fn test_missing_entity_never_satisfies() {
        assert!(!HeavySpec.evaluate(None));
        assert!(!HeavySpec.not().evaluate(None));
        assert!(HeavySpec.not().evaluate(Some(&edge(0.1, EdgeType::Weak))));
    }

    #[test]
    fn test_composites_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let light = edge(0.1, EdgeType::Weak);

        let and = HeavySpec.and(CountingSpec(calls.clone()));
        assert!(!and.is_satisfied_by(&light));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let or = HeavySpec.not().or(CountingSpec(calls.clone()));
        assert!(or.is_satisfied_by(&light));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

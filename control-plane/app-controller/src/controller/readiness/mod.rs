//! Per-kind readiness classification of component objects.

pub mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use kube::core::DynamicObject;

use super::group_kind::normalize;
use crate::crd::{ComponentStatus, GroupKind};

pub trait ReadinessPredicate: Send + Sync {
    fn status(&self, obj: &DynamicObject) -> ComponentStatus;
}

impl<F> ReadinessPredicate for F
where
    F: Fn(&DynamicObject) -> ComponentStatus + Send + Sync,
{
    fn status(&self, obj: &DynamicObject) -> ComponentStatus {
        self(obj)
    }
}

/// Maps a component kind to its readiness predicate. Kinds without a
/// registered predicate are classified by the fallback, which treats
/// existence as readiness.
#[derive(Clone)]
pub struct ReadinessRegistry {
    predicates: HashMap<GroupKind, Arc<dyn ReadinessPredicate>>,
    fallback: Arc<dyn ReadinessPredicate>,
}

fn exists_is_ready(_: &DynamicObject) -> ComponentStatus {
    ComponentStatus::Ready
}

impl ReadinessRegistry {
    pub fn empty() -> Self {
        Self {
            predicates: HashMap::new(),
            fallback: Arc::new(exists_is_ready),
        }
    }

    pub fn register<P>(&mut self, gk: GroupKind, predicate: P) -> &mut Self
    where
        P: ReadinessPredicate + 'static,
    {
        self.predicates.insert(normalize(&gk), Arc::new(predicate));
        self
    }

    pub fn with<P>(mut self, gk: GroupKind, predicate: P) -> Self
    where
        P: ReadinessPredicate + 'static,
    {
        self.register(gk, predicate);
        self
    }

    pub fn set_fallback<P>(&mut self, predicate: P)
    where
        P: ReadinessPredicate + 'static,
    {
        self.fallback = Arc::new(predicate);
    }

    pub fn contains(&self, gk: &GroupKind) -> bool {
        self.predicates.contains_key(&normalize(gk))
    }

    pub fn status_of(&self, gk: &GroupKind, obj: &DynamicObject) -> ComponentStatus {
        match self.predicates.get(&normalize(gk)) {
            Some(p) => p.status(obj),
            None => self.fallback.status(obj),
        }
    }
}

impl Default for ReadinessRegistry {
    /// Registry with the built-in workload, core and policy predicates.
    fn default() -> Self {
        let mut registry = Self::empty();
        builtin::register_all(&mut registry);
        registry
    }
}

impl fmt::Debug for ReadinessRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.predicates.keys().map(|gk| gk.to_string()).collect();
        kinds.sort();
        f.debug_struct("ReadinessRegistry")
            .field("kinds", &kinds)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod builtin_tests;

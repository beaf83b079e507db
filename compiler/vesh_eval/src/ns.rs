//! Namespaces: shared name-to-variable maps.
//!
//! A frame's local scope, the scope a closure captured, the builtin scope
//! and a module's exported names are all [`Ns`] values. Cloning an `Ns`
//! clones the handle, not the map: every clone sees the same entries, and
//! because entries are [`Variable`] handles, the same cells.
//!
//! Parallel pipeline stages may share a namespace. The map itself is
//! guarded, but a read-modify-write on a single variable from two stages is
//! not atomic; stages that share a captured variable race on it.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::variable::Variable;

#[derive(Clone, Default)]
pub struct Ns(Arc<RwLock<FxHashMap<String, Variable>>>);

impl Ns {
    pub fn new() -> Self {
        Ns::default()
    }

    pub fn get(&self, name: &str) -> Option<Variable> {
        self.0.read().get(name).cloned()
    }

    /// Bind `name`, replacing any previous binding.
    pub fn insert(&self, name: impl Into<String>, variable: Variable) {
        self.0.write().insert(name.into(), variable);
    }

    pub fn remove(&self, name: &str) -> Option<Variable> {
        self.0.write().remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.read().contains_key(name)
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.0.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Whether both handles refer to the same map.
    pub fn ptr_eq(&self, other: &Ns) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// A new namespace holding the entries of `outer`, then of `inner`
    /// (which win on conflicts). The cells are shared, the map is not.
    pub fn overlay(outer: &Ns, inner: &Ns) -> Ns {
        let mut map = outer.0.read().clone();
        for (name, variable) in inner.0.read().iter() {
            map.insert(name.clone(), variable.clone());
        }
        Ns(Arc::new(RwLock::new(map)))
    }
}

impl fmt::Debug for Ns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

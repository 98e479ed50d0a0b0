//! An associative container in which mutations are rolled back at the end of each scope.
//!
//! The [ScopedMap] type wraps a hash map with begin-scope/end-scope semantics:
//! all insertions performed after a [begin_scope](ScopedMap::begin_scope) call are
//! rolled back by the matching [end_scope](ScopedMap::end_scope) call.
//! Values shadowed inside a scope reappear when the scope ends.
//!
//! This is the container behind lexically scoped macro definitions: entering a
//! `{`-group begins a scope, leaving it ends the scope and discards all
//! definitions made inside the group.
//!
//! # Examples
//!
//! The basic associative methods are the same as the standard hash map.
//! ```
//! # use doccraft_stdext::collections::scopedmap::ScopedMap;
//! let mut colors = ScopedMap::default();
//! colors.insert("mint", "ginger");
//! assert_eq!(colors.get(&"mint"), Some(&"ginger"));
//! ```
//!
//! The scoping methods are the main addition.
//! ```
//! # use doccraft_stdext::collections::scopedmap::ScopedMap;
//! let mut colors = ScopedMap::default();
//!
//! // Insert a value, shadow it inside a scope, and end the scope to restore it.
//! colors.insert("paganini", "black");
//! colors.begin_scope();
//! colors.insert("paganini", "gray");
//! assert_eq!(colors.get(&"paganini"), Some(&"gray"));
//! assert_eq!(colors.end_scope(), Ok(()));
//! assert_eq!(colors.get(&"paganini"), Some(&"black"));
//!
//! // A value first inserted inside a scope disappears when the scope ends.
//! colors.begin_scope();
//! colors.insert("mint", "ginger");
//! assert_eq!(colors.end_scope(), Ok(()));
//! assert_eq!(colors.get(&"mint"), None);
//! ```
//!
//! The `end_scope` method returns an error if there is no scope to end.
//! ```
//! # use doccraft_stdext::collections::scopedmap::{ScopedMap, NoScopeToEndError};
//! let mut colors = ScopedMap::<String, String>::default();
//! assert_eq!(colors.end_scope(), Err(NoScopeToEndError{}));
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

/// A hash map with scope semantics.
///
/// See the module docs for more information.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScopedMap<K, V> {
    values: HashMap<K, V>,

    // The save stack does not contain the outermost scope as no cleanup
    // there is needed.
    #[cfg_attr(
        feature = "serde",
        serde(bound(
            deserialize = "K: Eq + Hash + serde::Deserialize<'de>, V: serde::Deserialize<'de>"
        ))
    )]
    save_stack: Vec<HashMap<K, EndOfScopeAction<V>>>,
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum EndOfScopeAction<V> {
    Revert(V),
    Delete,
}

/// Error returned if there is no scope to end when [ScopedMap::end_scope] is invoked.
#[derive(Debug, PartialEq, Eq)]
pub struct NoScopeToEndError;

impl<K: Eq + Hash + Clone, V> ScopedMap<K, V> {
    /// Inserts the key, value pair in the current scope.
    ///
    /// Returns true if a value was already visible at the key.
    pub fn insert(&mut self, key: K, mut val: V) -> bool {
        match (self.values.get_mut(&key), self.save_stack.last_mut()) {
            (None, None) => {
                self.values.insert(key, val);
                false
            }
            (None, Some(save)) => {
                save.insert(key.clone(), EndOfScopeAction::Delete);
                self.values.insert(key, val);
                false
            }
            (Some(val_ref), None) => {
                *val_ref = val;
                true
            }
            (Some(val_ref), Some(save)) => {
                std::mem::swap(&mut val, val_ref);
                // Only the first shadowing inside a scope records a revert:
                // the end-of-scope action restores the value from before the scope.
                if let Entry::Vacant(vac) = save.entry(key) {
                    vac.insert(EndOfScopeAction::Revert(val));
                }
                true
            }
        }
    }

    /// Retrieves the value visible at the provided key.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    /// Returns whether a value is visible at the provided key.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    /// Begins a new scope.
    pub fn begin_scope(&mut self) {
        // `HashMap::new()` does not allocate, so an unused scope is cheap.
        self.save_stack.push(HashMap::new());
    }

    /// Attempts to end the current scope. Returns an error if there is no scope to end.
    pub fn end_scope(&mut self) -> Result<(), NoScopeToEndError> {
        match self.save_stack.pop() {
            None => Err(NoScopeToEndError {}),
            Some(save) => {
                for (key, action) in save.into_iter() {
                    match action {
                        EndOfScopeAction::Delete => {
                            self.values.remove(&key);
                        }
                        EndOfScopeAction::Revert(old_val) => {
                            self.values.insert(key, old_val);
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// Ends every open scope, restoring the outermost values.
    pub fn end_all_scopes(&mut self) {
        while self.end_scope().is_ok() {}
    }

    /// The current scope depth; zero when only the outermost scope is open.
    pub fn scope_depth(&self) -> usize {
        self.save_stack.len()
    }

    /// Iterate over all (key, value) tuples that are currently visible.
    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, K, V> {
        self.values.iter()
    }

    /// Returns the number of visible elements in the map.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the map has no visible elements.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> Default for ScopedMap<K, V> {
    fn default() -> Self {
        Self {
            values: Default::default(),
            save_stack: Default::default(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> FromIterator<(K, V)> for ScopedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map: Self = Default::default();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_after_scoped_insert() {
        let mut map = ScopedMap::default();
        map.begin_scope();
        map.insert(3, 5);
        assert_eq!(map.end_scope(), Ok(()));
        assert_eq!(map.get(&3), None);
        map.insert(3, 4);
        assert_eq!(map.get(&3), Some(&4));
    }

    #[test]
    fn double_shadow_restores_original() {
        let mut map = ScopedMap::default();
        map.insert("k", 1);
        map.begin_scope();
        map.insert("k", 2);
        map.insert("k", 3);
        assert_eq!(map.get(&"k"), Some(&3));
        assert_eq!(map.end_scope(), Ok(()));
        assert_eq!(map.get(&"k"), Some(&1));
    }

    #[test]
    fn nested_scopes() {
        let mut map = ScopedMap::default();
        map.insert("k", 1);
        map.begin_scope();
        map.insert("k", 2);
        map.begin_scope();
        map.insert("k", 3);
        assert_eq!(map.get(&"k"), Some(&3));
        assert_eq!(map.end_scope(), Ok(()));
        assert_eq!(map.get(&"k"), Some(&2));
        assert_eq!(map.end_scope(), Ok(()));
        assert_eq!(map.get(&"k"), Some(&1));
    }

    #[test]
    fn end_all_scopes_unwinds_everything() {
        let mut map = ScopedMap::default();
        map.insert("k", 1);
        map.begin_scope();
        map.begin_scope();
        map.insert("k", 3);
        map.end_all_scopes();
        assert_eq!(map.scope_depth(), 0);
        assert_eq!(map.get(&"k"), Some(&1));
    }

    #[test]
    fn outermost_insert_is_permanent() {
        let mut map = ScopedMap::default();
        map.insert("k", 1);
        map.insert("k", 2);
        assert_eq!(map.get(&"k"), Some(&2));
        assert_eq!(map.end_scope(), Err(NoScopeToEndError {}));
    }
}

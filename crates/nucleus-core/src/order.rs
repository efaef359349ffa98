//! Lenient topological ordering.
//!
//! Both the code generator (ABI entries) and the runtime binder (constant
//! aliases) need to place declarations after everything they reference, yet
//! must still make progress when the input contains a cycle. The ordering
//! here never fails: when no remaining item is ready, the rest is flushed in
//! declaration order.
//!
//! # Examples
//!
//! ```
//! use nucleus_core::order::lenient_topological_order;
//!
//! let items = vec![
//!     ("Line", vec!["Point"]),
//!     ("Point", vec![]),
//! ];
//! let sorted = lenient_topological_order(&items);
//! assert_eq!(sorted.order, vec!["Point", "Line"]);
//! assert!(sorted.flushed.is_empty());
//! ```

use std::collections::HashSet;
use std::hash::Hash;

/// Result of [`lenient_topological_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologicalOrder<K> {
    /// Every input key, each exactly once.
    pub order: Vec<K>,
    /// Keys appended after a stall, in declaration order. Empty when the
    /// dependency graph was acyclic.
    pub flushed: Vec<K>,
}

impl<K> TopologicalOrder<K> {
    /// Returns `true` if part of the order came from a stall flush.
    #[must_use]
    pub fn had_stall(&self) -> bool {
        !self.flushed.is_empty()
    }
}

/// Orders `items` so that each key follows the keys it depends on.
///
/// `items` pairs each key with its dependencies, in declaration order. Keys
/// are expected to be unique. Dependencies naming keys outside the item set
/// are treated as already satisfied, and self-dependencies are ignored.
///
/// Each sweep walks the pending items in encounter order and emits every item
/// whose dependencies have all been emitted; an emitted key counts immediately,
/// so later items in the same sweep can see it. A sweep that emits nothing
/// flushes all pending items in their original order and ends the sort.
///
/// # Examples
///
/// ```
/// use nucleus_core::order::lenient_topological_order;
///
/// // A and B depend on each other; C depends on A.
/// let items = vec![
///     ("A", vec!["B"]),
///     ("B", vec!["A"]),
///     ("C", vec!["A"]),
///     ("D", vec![]),
/// ];
/// let sorted = lenient_topological_order(&items);
/// assert_eq!(sorted.order, vec!["D", "A", "B", "C"]);
/// assert_eq!(sorted.flushed, vec!["A", "B", "C"]);
/// ```
#[must_use]
pub fn lenient_topological_order<K>(items: &[(K, Vec<K>)]) -> TopologicalOrder<K>
where
    K: Clone + Eq + Hash,
{
    let known: HashSet<&K> = items.iter().map(|(key, _)| key).collect();
    let mut emitted: HashSet<K> = HashSet::with_capacity(items.len());
    let mut order = Vec::with_capacity(items.len());
    let mut pending: Vec<usize> = (0..items.len()).collect();

    while !pending.is_empty() {
        let before = pending.len();

        pending.retain(|&index| {
            let (key, deps) = &items[index];
            let ready = deps
                .iter()
                .all(|dep| dep == key || !known.contains(dep) || emitted.contains(dep));
            if ready {
                emitted.insert(key.clone());
                order.push(key.clone());
            }
            !ready
        });

        if pending.len() == before {
            let flushed: Vec<K> = pending.iter().map(|&index| items[index].0.clone()).collect();
            tracing::warn!(
                remaining = flushed.len(),
                "dependency stall, flushing remaining items in declaration order"
            );
            order.extend(flushed.iter().cloned());
            return TopologicalOrder { order, flushed };
        }
    }

    TopologicalOrder {
        order,
        flushed: Vec::new(),
    }
}

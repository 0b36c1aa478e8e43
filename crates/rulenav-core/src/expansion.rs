#![forbid(unsafe_code)]

//! Per-node expansion state.
//!
//! Maps rule ids to an explicit expanded flag. An id with no entry is
//! "not yet decided" and reads as collapsed. Entries are only ever added
//! or flipped, never removed, so a collapse chosen by the user survives
//! reloads of the hierarchy.

use std::collections::HashMap;

/// Expanded/collapsed flags keyed by rule id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    entries: HashMap<String, bool>,
}

impl ExpansionState {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is expanded. Unknown ids are collapsed.
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> bool {
        self.entries.get(id).copied().unwrap_or(false)
    }

    /// Whether an explicit entry exists for `id`.
    #[must_use]
    pub fn is_decided(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Record an explicit flag for `id`.
    pub fn set(&mut self, id: impl Into<String>, expanded: bool) {
        self.entries.insert(id.into(), expanded);
    }

    /// Mark `id` expanded.
    pub fn expand(&mut self, id: impl Into<String>) {
        self.set(id, true);
    }

    /// Flip the flag for `id` and return the new value.
    ///
    /// An absent entry counts as collapsed, so the first toggle expands.
    pub fn toggle(&mut self, id: &str) -> bool {
        let next = !self.get(id);
        self.entries.insert(id.to_owned(), next);
        next
    }

    /// Expand `root_id` only if the store holds no entries yet.
    ///
    /// Returns `true` when the seed was applied.
    pub fn seed_if_empty(&mut self, root_id: &str) -> bool {
        if !self.entries.is_empty() || root_id.is_empty() {
            return false;
        }
        self.entries.insert(root_id.to_owned(), true);
        true
    }

    /// Number of explicit entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate explicit entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.entries.iter().map(|(id, &expanded)| (id.as_str(), expanded))
    }

    /// Ids currently expanded, sorted for stable output.
    #[must_use]
    pub fn expanded_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, expanded)| **expanded)
            .map(|(id, _)| id.as_str())
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for ExpansionState {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(id, e)| (id.into(), e)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_id_reads_collapsed() {
        let state = ExpansionState::new();
        assert!(!state.get("anything"));
        assert!(!state.is_decided("anything"));
    }

    #[test]
    fn first_toggle_expands() {
        let mut state = ExpansionState::new();
        assert!(state.toggle("a"));
        assert!(state.get("a"));
    }

    #[test]
    fn toggle_twice_restores_value() {
        let mut state = ExpansionState::new();
        state.set("a", true);
        state.toggle("a");
        state.toggle("a");
        assert!(state.get("a"));
    }

    #[test]
    fn toggle_keeps_explicit_false() {
        let mut state = ExpansionState::new();
        state.toggle("a");
        state.toggle("a");
        assert!(state.is_decided("a"));
        assert!(!state.get("a"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn seed_applies_only_when_empty() {
        let mut state = ExpansionState::new();
        assert!(state.seed_if_empty("root"));
        assert_eq!(state.expanded_ids(), vec!["root"]);
        assert!(!state.seed_if_empty("other"));
        assert!(!state.get("other"));
    }

    #[test]
    fn seed_is_skipped_after_user_collapse() {
        let mut state = ExpansionState::new();
        state.set("root", false);
        assert!(!state.seed_if_empty("root"));
        assert!(!state.get("root"));
    }

    #[test]
    fn seed_ignores_empty_root_id() {
        let mut state = ExpansionState::new();
        assert!(!state.seed_if_empty(""));
        assert!(state.is_empty());
    }

    #[test]
    fn expanded_ids_are_sorted_and_filtered() {
        let state: ExpansionState = [("b", true), ("a", true), ("c", false)]
            .into_iter()
            .collect();
        assert_eq!(state.expanded_ids(), vec!["a", "b"]);
        assert_eq!(state.iter().count(), 3);
    }
}

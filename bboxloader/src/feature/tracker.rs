//! Feature detail tracker.
//!
//! Keeps, for every feature id, the level it is displayed at and the
//! renderables displayed for it. A feature only ever moves to a strictly
//! more detailed level:
//!
//! ```text
//! Untracked ──► TrackedAtLevel(L) ──► TrackedAtLevel(L' > L)
//!                      │
//!                      └── upgrade at L'' <= L: no-op
//! ```
//!
//! This rule is what makes out-of-order fetch completion safe. A coarse
//! result arriving after a fine one is simply rejected.

use std::collections::{BTreeMap, HashMap};

use super::FeatureId;
use crate::level::LevelId;
use crate::render::RenderTarget;

/// Per-feature record of the displayed detail level.
#[derive(Debug, Clone)]
pub struct FeatureDetailTracker<R> {
    /// feature id -> level it is displayed at
    current_levels: HashMap<FeatureId, LevelId>,
    /// level -> feature id -> renderables displayed for it
    by_level: BTreeMap<LevelId, HashMap<FeatureId, Vec<R>>>,
}

impl<R> Default for FeatureDetailTracker<R> {
    fn default() -> Self {
        Self {
            current_levels: HashMap::new(),
            by_level: BTreeMap::new(),
        }
    }
}

impl<R> FeatureDetailTracker<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an upgrade of `id` to `level` would be applied.
    pub fn accepts(&self, level: LevelId, id: &FeatureId) -> bool {
        self.current_levels
            .get(id)
            .map_or(true, |current| *current < level)
    }

    /// Display `representations` for `id` at `level` if that is an upgrade.
    ///
    /// On acceptance the new renderables are added to `target` first, then the
    /// renderables of the previous level (if any) are removed, so the feature
    /// is never missing from the target. A rejected upgrade leaves the target
    /// untouched and drops `representations`.
    ///
    /// Returns whether the upgrade was applied.
    pub fn upgrade<T>(
        &mut self,
        target: &mut T,
        level: LevelId,
        id: FeatureId,
        representations: Vec<R>,
    ) -> bool
    where
        T: RenderTarget<Renderable = R>,
    {
        if !self.accepts(level, &id) {
            return false;
        }

        for renderable in &representations {
            target.add_renderable(renderable);
        }

        let previous = self.current_levels.insert(id.clone(), level);
        self.by_level
            .entry(level)
            .or_default()
            .insert(id.clone(), representations);

        if let Some(old_level) = previous {
            if let Some(old) = self.take(old_level, &id) {
                for renderable in &old {
                    target.remove_renderable(renderable);
                }
            }
        }

        true
    }

    /// Level `id` is displayed at.
    pub fn level_of(&self, id: &FeatureId) -> Option<LevelId> {
        self.current_levels.get(id).copied()
    }

    /// Renderables displayed for `id`.
    pub fn representations(&self, id: &FeatureId) -> Option<&[R]> {
        let level = self.current_levels.get(id)?;
        self.by_level
            .get(level)
            .and_then(|features| features.get(id))
            .map(Vec::as_slice)
    }

    /// Ids displayed at `level` or more detailed, sorted.
    pub fn ids_at_or_above(&self, level: LevelId) -> Vec<FeatureId> {
        let mut ids: Vec<FeatureId> = self
            .by_level
            .range(level..)
            .flat_map(|(_, features)| features.keys().cloned())
            .collect();
        ids.sort();
        ids
    }

    /// Number of features displayed at exactly `level`.
    pub fn count_at_level(&self, level: LevelId) -> usize {
        self.by_level.get(&level).map_or(0, HashMap::len)
    }

    pub fn len(&self) -> usize {
        self.current_levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current_levels.is_empty()
    }

    /// Remove every tracked renderable from `target` and forget all features.
    ///
    /// Returns the number of features dropped.
    pub fn clear<T>(&mut self, target: &mut T) -> usize
    where
        T: RenderTarget<Renderable = R>,
    {
        let dropped = self.current_levels.len();
        for features in std::mem::take(&mut self.by_level).into_values() {
            for renderable in features.values().flatten() {
                target.remove_renderable(renderable);
            }
        }
        self.current_levels.clear();
        dropped
    }

    fn take(&mut self, level: LevelId, id: &FeatureId) -> Option<Vec<R>> {
        let features = self.by_level.get_mut(&level)?;
        let removed = features.remove(id);
        if features.is_empty() {
            self.by_level.remove(&level);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemoryTarget;

    const L0: LevelId = LevelId(0);
    const L1: LevelId = LevelId(1);
    const L2: LevelId = LevelId(2);

    fn id(s: &str) -> FeatureId {
        FeatureId::from(s)
    }

    #[test]
    fn test_upgrade_replaces_coarse_representation() {
        let mut tracker = FeatureDetailTracker::new();
        let mut target = MemoryTarget::new();

        assert!(tracker.upgrade(&mut target, L0, id("f1"), vec!["A"]));
        assert!(tracker.upgrade(&mut target, L1, id("f1"), vec!["B"]));

        assert_eq!(tracker.level_of(&id("f1")), Some(L1));
        assert_eq!(target.active(), &["B"]);
        assert_eq!(tracker.representations(&id("f1")), Some(&["B"][..]));
        assert_eq!(tracker.count_at_level(L0), 0);
    }

    #[test]
    fn test_coarser_upgrade_is_rejected() {
        let mut tracker = FeatureDetailTracker::new();
        let mut target = MemoryTarget::new();

        assert!(tracker.upgrade(&mut target, L1, id("f1"), vec!["B"]));
        assert!(!tracker.upgrade(&mut target, L0, id("f1"), vec!["A"]));

        assert_eq!(tracker.level_of(&id("f1")), Some(L1));
        assert_eq!(target.active(), &["B"]);
        assert_eq!(target.added(), 1);
        assert_eq!(target.removed(), 0);
    }

    #[test]
    fn test_equal_level_resubmission_is_noop() {
        let mut tracker = FeatureDetailTracker::new();
        let mut target = MemoryTarget::new();

        assert!(tracker.upgrade(&mut target, L1, id("f1"), vec!["B"]));
        assert!(!tracker.upgrade(&mut target, L1, id("f1"), vec!["B"]));

        assert_eq!(target.len(), 1);
    }

    #[test]
    fn test_multiple_representations_swap_together() {
        let mut tracker = FeatureDetailTracker::new();
        let mut target = MemoryTarget::new();

        tracker.upgrade(&mut target, L0, id("f1"), vec!["a1", "a2"]);
        tracker.upgrade(&mut target, L2, id("f1"), vec!["c1", "c2", "c3"]);

        assert_eq!(target.active(), &["c1", "c2", "c3"]);
        assert_eq!(target.removed(), 2);
    }

    #[test]
    fn test_new_representation_added_before_old_removed() {
        #[derive(Default)]
        struct Journal(Vec<String>);

        impl RenderTarget for Journal {
            type Renderable = &'static str;
            type Geometry = ();

            fn add_renderable(&mut self, r: &&'static str) {
                self.0.push(format!("add {}", r));
            }

            fn remove_renderable(&mut self, r: &&'static str) {
                self.0.push(format!("remove {}", r));
            }
        }

        let mut tracker = FeatureDetailTracker::new();
        let mut journal = Journal::default();
        tracker.upgrade(&mut journal, L0, id("f1"), vec!["A"]);
        tracker.upgrade(&mut journal, L1, id("f1"), vec!["B"]);

        assert_eq!(journal.0, vec!["add A", "add B", "remove A"]);
    }

    #[test]
    fn test_ids_at_or_above() {
        let mut tracker = FeatureDetailTracker::new();
        let mut target = MemoryTarget::new();

        tracker.upgrade(&mut target, L0, id("c"), vec![1]);
        tracker.upgrade(&mut target, L1, id("b"), vec![2]);
        tracker.upgrade(&mut target, L2, id("a"), vec![3]);

        assert_eq!(tracker.ids_at_or_above(L1), vec![id("a"), id("b")]);
        assert_eq!(tracker.ids_at_or_above(L0).len(), 3);
        assert!(tracker.ids_at_or_above(LevelId(3)).is_empty());
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut tracker = FeatureDetailTracker::new();
        let mut target = MemoryTarget::new();

        tracker.upgrade(&mut target, L0, id("f1"), vec![1, 2]);
        tracker.upgrade(&mut target, L1, id("f2"), vec![3]);

        assert_eq!(tracker.clear(&mut target), 2);
        assert!(tracker.is_empty());
        assert!(target.is_empty());
        assert!(tracker.accepts(L0, &id("f1")));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_accepted_levels_strictly_increase(
                levels in proptest::collection::vec(0u32..5, 1..40)
            ) {
                let mut tracker = FeatureDetailTracker::new();
                let mut target = MemoryTarget::new();
                let mut highest: Option<u32> = None;

                for (step, level) in levels.into_iter().enumerate() {
                    let before = target.active().to_vec();
                    let accepted = tracker.upgrade(
                        &mut target,
                        LevelId(level),
                        id("f"),
                        vec![(level, step)],
                    );

                    let expected = highest.map_or(true, |h| level > h);
                    prop_assert_eq!(accepted, expected);

                    if accepted {
                        highest = Some(level);
                        prop_assert_eq!(target.active(), &[(level, step)][..]);
                    } else {
                        prop_assert_eq!(target.active(), &before[..]);
                    }
                }

                prop_assert_eq!(tracker.len(), 1);
                prop_assert_eq!(target.len(), 1);
            }
        }
    }
}

//! # Dependency manager
//!
//! Reverse index from assets to the component instances built from them.
//! A scene view registers a record whenever it (re)initializes a component
//! and drops it when the component goes away, so an asset change can reach
//! exactly the affected components.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::ids::{AssetId, ComponentId, ObjectId};

/// Assets one component instance was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDependency {
    pub component_id: ComponentId,
    pub object_id: ObjectId,
    pub asset_ids: BTreeSet<AssetId>,
}

#[derive(Debug, Default)]
pub struct DependencyManager {
    records: HashMap<ComponentId, ComponentDependency>,
}

impl DependencyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the assets of a component, replacing any earlier record
    pub fn register_dependency(
        &mut self,
        component_id: ComponentId,
        object_id: ObjectId,
        asset_ids: impl IntoIterator<Item = AssetId>,
    ) {
        let record = ComponentDependency {
            component_id: component_id.clone(),
            object_id,
            asset_ids: asset_ids.into_iter().collect(),
        };
        self.records.insert(component_id, record);
    }

    /// Unknown components are a no-op
    pub fn unregister_dependency(&mut self, component_id: &ComponentId) -> Option<ComponentDependency> {
        let removed = self.records.remove(component_id);
        if removed.is_none() {
            debug!(
                "[DependencyManager] unregister of unknown component {}",
                component_id
            );
        }
        removed
    }

    pub fn dependencies_of(&self, component_id: &ComponentId) -> Option<&ComponentDependency> {
        self.records.get(component_id)
    }

    /// Every component whose assets intersect `asset_ids`, each at most once.
    ///
    /// Ordered by the first matching input id, then by component id, so a
    /// cascade reinitializes components in a reproducible order. The caller
    /// passes the already-expanded transitive set.
    pub fn get_all_dependents_for_asset_ids(&self, asset_ids: &[AssetId]) -> Vec<ComponentDependency> {
        let mut seen: HashSet<&ComponentId> = HashSet::new();
        let mut dependents = Vec::new();

        for asset_id in asset_ids {
            let mut matches: Vec<&ComponentDependency> = self
                .records
                .values()
                .filter(|record| record.asset_ids.contains(asset_id))
                .filter(|record| !seen.contains(&record.component_id))
                .collect();
            matches.sort_by(|a, b| a.component_id.cmp(&b.component_id));

            for record in matches {
                seen.insert(&record.component_id);
                dependents.push(record.clone());
            }
        }

        dependents
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<AssetId> {
        values.iter().map(|v| AssetId::new(*v)).collect()
    }

    fn manager() -> DependencyManager {
        let mut manager = DependencyManager::new();
        manager.register_dependency("c3".into(), "o1".into(), ids(&["mesh", "material"]));
        manager.register_dependency("c1".into(), "o1".into(), ids(&["material"]));
        manager.register_dependency("c2".into(), "o2".into(), ids(&["other"]));
        manager
    }

    fn component_ids(deps: &[ComponentDependency]) -> Vec<&str> {
        deps.iter().map(|d| d.component_id.as_str()).collect()
    }

    #[test]
    fn test_dependents_are_unique_and_ordered() {
        let manager = manager();
        let deps = manager.get_all_dependents_for_asset_ids(&ids(&["material", "mesh"]));
        assert_eq!(component_ids(&deps), vec!["c1", "c3"]);

        let deps = manager.get_all_dependents_for_asset_ids(&ids(&["mesh", "material"]));
        assert_eq!(component_ids(&deps), vec!["c3", "c1"]);
    }

    #[test]
    fn test_unrelated_assets_match_nothing() {
        let manager = manager();
        assert!(manager.get_all_dependents_for_asset_ids(&ids(&["texture"])).is_empty());
        assert!(manager.get_all_dependents_for_asset_ids(&[]).is_empty());
    }

    #[test]
    fn test_register_replaces_record() {
        let mut manager = manager();
        manager.register_dependency("c3".into(), "o1".into(), ids(&["texture"]));
        assert_eq!(manager.len(), 3);

        let deps = manager.get_all_dependents_for_asset_ids(&ids(&["mesh"]));
        assert!(deps.is_empty());
        let record = manager.dependencies_of(&"c3".into()).unwrap();
        assert_eq!(record.asset_ids.len(), 1);
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let mut manager = manager();
        assert!(manager.unregister_dependency(&"missing".into()).is_none());
        assert!(manager.unregister_dependency(&"c1".into()).is_some());
        assert_eq!(manager.len(), 2);

        manager.clear();
        assert!(manager.is_empty());
    }
}

//! # Asset-change cascade
//!
//! When an asset changes, every component instance built from it (or from
//! anything depending on it) is destroyed and recreated from its definition.
//!
//! ```text
//! AssetChange(A) → {A} ∪ dependents(A) → DependencyManager → [components]
//!                                                              │
//!                     for each: destroy → unregister → recreate → register
//! ```
//!
//! Each component is reinitialized on its own; a failure is reported and the
//! rest of the batch still runs.

use futures::future::LocalBoxFuture;
use tracing::{debug, info, warn};

use crate::assets::{AssetChange, AssetChangeKind};
use crate::dependency::{ComponentDependency, DependencyManager};
use crate::errors::{EditorError, EditorResult};
use crate::ids::{AssetId, ComponentId, ObjectId};

/// A surface whose runtime holds components built from assets
pub trait CascadeTarget {
    fn dependency_manager(&self) -> &DependencyManager;

    /// Tear down and rebuild one component instance from its definition
    fn reinitialize_dependent<'a>(
        &'a mut self,
        dependency: &'a ComponentDependency,
    ) -> LocalBoxFuture<'a, EditorResult<()>>;
}

#[derive(Debug)]
pub struct CascadeFailure {
    pub component_id: ComponentId,
    pub object_id: ObjectId,
    pub error: EditorError,
}

#[derive(Debug, Default)]
pub struct CascadeReport {
    /// The changed asset and its dependents, as queried
    pub affected_assets: Vec<AssetId>,
    pub reinitialized: Vec<ComponentId>,
    pub failures: Vec<CascadeFailure>,
}

impl CascadeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reinitialize every component affected by `change`.
///
/// Created and renamed assets reach no existing instance and are skipped.
pub async fn cascade_asset_change<T: CascadeTarget + ?Sized>(
    target: &mut T,
    change: &AssetChange,
) -> CascadeReport {
    let mut report = CascadeReport::default();

    match change.kind {
        AssetChangeKind::Modified | AssetChangeKind::Deleted => {}
        AssetChangeKind::Created | AssetChangeKind::Renamed { .. } => {
            debug!("[Cascade] {} {:?}, nothing to reinitialize", change.asset_id, change.kind);
            return report;
        }
    }

    report.affected_assets = change.affected_asset_ids();
    let dependents = target
        .dependency_manager()
        .get_all_dependents_for_asset_ids(&report.affected_assets);

    for dependency in &dependents {
        match target.reinitialize_dependent(dependency).await {
            Ok(()) => report.reinitialized.push(dependency.component_id.clone()),
            Err(error) => {
                warn!(
                    "[Cascade] failed to reinitialize {} on {}: {}",
                    dependency.component_id, dependency.object_id, error
                );
                report.failures.push(CascadeFailure {
                    component_id: dependency.component_id.clone(),
                    object_id: dependency.object_id.clone(),
                    error,
                });
            }
        }
    }

    info!(
        "[Cascade] {}: {} reinitialized, {} failed",
        change.asset_id,
        report.reinitialized.len(),
        report.failures.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RuntimeError;
    use futures::future::{self, FutureExt};

    #[derive(Default)]
    struct Recorder {
        dependencies: DependencyManager,
        rebuilt: Vec<ComponentId>,
        broken: Option<ComponentId>,
    }

    impl CascadeTarget for Recorder {
        fn dependency_manager(&self) -> &DependencyManager {
            &self.dependencies
        }

        fn reinitialize_dependent<'a>(
            &'a mut self,
            dependency: &'a ComponentDependency,
        ) -> LocalBoxFuture<'a, EditorResult<()>> {
            let result = if self.broken.as_ref() == Some(&dependency.component_id) {
                Err(RuntimeError::Engine("boom".to_string()).into())
            } else {
                self.rebuilt.push(dependency.component_id.clone());
                Ok(())
            };
            future::ready(result).boxed_local()
        }
    }

    fn recorder() -> Recorder {
        let mut target = Recorder::default();
        target
            .dependencies
            .register_dependency("c1".into(), "o1".into(), [AssetId::new("mesh")]);
        target
            .dependencies
            .register_dependency("c2".into(), "o2".into(), [AssetId::new("material")]);
        target
            .dependencies
            .register_dependency("c3".into(), "o3".into(), [AssetId::new("unrelated")]);
        target
    }

    #[tokio::test]
    async fn test_reinitializes_exact_dependents() {
        let mut target = recorder();
        let change = AssetChange::new(AssetId::new("material"), AssetChangeKind::Modified)
            .with_dependents(vec![AssetId::new("mesh")]);

        let report = cascade_asset_change(&mut target, &change).await;
        assert!(report.is_clean());
        assert_eq!(target.rebuilt, vec![ComponentId::new("c2"), ComponentId::new("c1")]);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let mut target = recorder();
        target.broken = Some(ComponentId::new("c2"));
        let change = AssetChange::new(AssetId::new("material"), AssetChangeKind::Deleted)
            .with_dependents(vec![AssetId::new("mesh")]);

        let report = cascade_asset_change(&mut target, &change).await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].component_id.as_str(), "c2");
        assert_eq!(report.reinitialized, vec![ComponentId::new("c1")]);
    }

    #[tokio::test]
    async fn test_created_and_renamed_are_skipped() {
        let mut target = recorder();
        let created = AssetChange::new(AssetId::new("mesh"), AssetChangeKind::Created);
        let renamed = AssetChange::new(
            AssetId::new("mesh"),
            AssetChangeKind::Renamed {
                old_path: "a.glb".into(),
                new_path: "b.glb".into(),
            },
        );

        assert!(cascade_asset_change(&mut target, &created).await.reinitialized.is_empty());
        assert!(cascade_asset_change(&mut target, &renamed).await.reinitialized.is_empty());
        assert!(target.rebuilt.is_empty());
    }
}

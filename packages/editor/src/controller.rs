//! # Mutation controller
//!
//! Process-wide routing of undo/redo. Every editing surface registers its
//! mutator here; the one whose surface has focus is active and receives the
//! global undo/redo commands.

use std::any::Any;
use std::collections::HashMap;

use futures::future::{FutureExt, LocalBoxFuture};
use tracing::{debug, info};

use crate::document::{MutationDomain, PersistOutcome};
use crate::errors::{EditorError, EditorResult};
use crate::ids::{MutationId, MutationIds, SurfaceId};
use crate::mutator::Mutator;

/// Domain-erased view of a [`Mutator`]
pub trait SurfaceMutator: Any {
    fn latest_mutation_id(&self) -> Option<MutationId>;

    fn pending_continuous(&self) -> Option<MutationId>;

    fn abandon_continuous(&mut self) -> Option<MutationId>;

    fn undo(&mut self) -> LocalBoxFuture<'_, EditorResult<bool>>;

    fn redo(&mut self) -> LocalBoxFuture<'_, EditorResult<bool>>;

    fn persist_changes(&mut self) -> LocalBoxFuture<'_, EditorResult<PersistOutcome>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<D: MutationDomain> SurfaceMutator for Mutator<D> {
    fn latest_mutation_id(&self) -> Option<MutationId> {
        Mutator::latest_mutation_id(self)
    }

    fn pending_continuous(&self) -> Option<MutationId> {
        Mutator::pending_continuous(self)
    }

    fn abandon_continuous(&mut self) -> Option<MutationId> {
        Mutator::abandon_continuous(self)
    }

    fn undo(&mut self) -> LocalBoxFuture<'_, EditorResult<bool>> {
        Mutator::undo(self).boxed_local()
    }

    fn redo(&mut self) -> LocalBoxFuture<'_, EditorResult<bool>> {
        Mutator::redo(self).boxed_local()
    }

    fn persist_changes(&mut self) -> LocalBoxFuture<'_, EditorResult<PersistOutcome>> {
        Mutator::persist_changes(self).boxed_local()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default)]
pub struct MutationController {
    ids: MutationIds,
    surfaces: HashMap<SurfaceId, Box<dyn SurfaceMutator>>,
    active: Option<SurfaceId>,
}

impl MutationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id source to hand to every mutator registered here
    pub fn ids(&self) -> MutationIds {
        self.ids.clone()
    }

    pub fn register<D: MutationDomain>(&mut self, surface: SurfaceId, mutator: Mutator<D>) -> EditorResult<()> {
        if self.surfaces.contains_key(&surface) {
            return Err(EditorError::SurfaceAlreadyRegistered(surface));
        }
        debug!("[MutationController] registered {}", surface);
        self.surfaces.insert(surface, Box::new(mutator));
        Ok(())
    }

    /// Remove a surface. Its pending continuous mutation is abandoned and
    /// it stops being active.
    pub fn deregister(&mut self, surface: &SurfaceId) -> Option<Box<dyn SurfaceMutator>> {
        let mut mutator = self.surfaces.remove(surface)?;
        mutator.abandon_continuous();
        if self.active.as_ref() == Some(surface) {
            self.active = None;
        }
        debug!("[MutationController] deregistered {}", surface);
        Some(mutator)
    }

    /// Focus or blur a surface. Activating one deactivates the previous.
    pub fn set_mutator_active(&mut self, surface: &SurfaceId, is_active: bool) -> EditorResult<()> {
        if !self.surfaces.contains_key(surface) {
            return Err(EditorError::SurfaceNotRegistered(surface.clone()));
        }

        if is_active {
            self.active = Some(surface.clone());
        } else if self.active.as_ref() == Some(surface) {
            self.active = None;
        }
        Ok(())
    }

    pub fn active(&self) -> Option<&SurfaceId> {
        self.active.as_ref()
    }

    pub fn is_registered(&self, surface: &SurfaceId) -> bool {
        self.surfaces.contains_key(surface)
    }

    pub fn mutator<D: MutationDomain>(&self, surface: &SurfaceId) -> Option<&Mutator<D>> {
        self.surfaces
            .get(surface)
            .and_then(|mutator| mutator.as_any().downcast_ref::<Mutator<D>>())
    }

    pub fn mutator_mut<D: MutationDomain>(&mut self, surface: &SurfaceId) -> Option<&mut Mutator<D>> {
        self.surfaces
            .get_mut(surface)
            .and_then(|mutator| mutator.as_any_mut().downcast_mut::<Mutator<D>>())
    }

    /// Undo on the active surface. False if nothing is active or there is
    /// nothing to undo.
    pub async fn undo(&mut self) -> EditorResult<bool> {
        let Some(mutator) = self.active_mutator() else {
            return Ok(false);
        };
        let undone = mutator.undo().await?;
        if undone {
            info!("[MutationController] undo on {:?}", self.active);
        }
        Ok(undone)
    }

    pub async fn redo(&mut self) -> EditorResult<bool> {
        let Some(mutator) = self.active_mutator() else {
            return Ok(false);
        };
        let redone = mutator.redo().await?;
        if redone {
            info!("[MutationController] redo on {:?}", self.active);
        }
        Ok(redone)
    }

    fn active_mutator(&mut self) -> Option<&mut Box<dyn SurfaceMutator>> {
        let surface = self.active.as_ref()?;
        self.surfaces.get_mut(surface)
    }
}

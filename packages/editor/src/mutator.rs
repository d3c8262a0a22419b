//! # Mutator
//!
//! Transaction coordinator for one editing surface.
//!
//! A mutator owns the surface's domain (document, model, runtime), its undo
//! history and the file the document persists to. Every edit goes through it:
//!
//! ```text
//! apply(m)                  begin(m) → update(v)… → apply(handle)
//!     │                                                 │
//!     ├─ capture undo args     ├─ capture undo args     │
//!     ├─ update model/runtime  ├─ update model/runtime  │
//!     ├─ settle                                         ├─ settle
//!     ├─ write document (recorded) ◄────────────────────┘
//!     ├─ push history
//!     └─ persist → after_persist
//! ```
//!
//! At most one continuous mutation is pending at a time. While it is,
//! one-shot applies, undo and redo are refused.
//!
//! [`Mutator::debounce_continuous`] drives a continuous mutation without a
//! handle: updates of the same mutation extend it, and it is applied once
//! no update arrived for [`MutatorOptions::debounce_window`]. The mutator
//! keeps no timer; the host calls [`Mutator::expire_debounce`] at
//! [`Mutator::debounce_deadline`]. A one-shot apply, undo or redo applies a
//! debounced mutation first.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use composer_jsonc::{DocumentError, EditScript};
use futures::future::{FutureExt, LocalBoxFuture};
use tracing::{debug, info, warn};

use crate::document::{DocumentStore, MutationDomain, PersistOutcome};
use crate::errors::{EditorError, EditorResult};
use crate::events::{ChangeNotifier, MutationEvent, SubscriptionId};
use crate::ids::{MutationId, MutationIds};
use crate::mutation_trait::{ContinuousMutation, Mutation, MutationResult, OneShotMutation};
use crate::undo_stack::{Applied, UndoEntry, UndoStack};

#[derive(Debug, Clone)]
pub struct MutatorOptions {
    /// Oldest history entries are dropped past this many (0 = unlimited)
    pub max_undo_levels: usize,
    /// Quiet time after which a debounced continuous mutation is applied
    pub debounce_window: Duration,
}

impl Default for MutatorOptions {
    fn default() -> Self {
        Self {
            max_undo_levels: 100,
            debounce_window: Duration::from_millis(500),
        }
    }
}

/// Proof that a continuous mutation of type `M` was begun.
///
/// Consumed by [`Mutator::apply_continuous`] and [`Mutator::cancel_continuous`].
pub struct ContinuousHandle<M> {
    id: MutationId,
    _mutation: PhantomData<fn() -> M>,
}

impl<M> ContinuousHandle<M> {
    fn new(id: MutationId) -> Self {
        Self {
            id,
            _mutation: PhantomData,
        }
    }

    pub fn id(&self) -> MutationId {
        self.id
    }
}

impl<M> fmt::Debug for ContinuousHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContinuousHandle").field(&self.id).finish()
    }
}

struct ContinuousState<D, M: Mutation<D>> {
    mutation: M,
    undo_args: M::Args,
    last_args: Option<M::Args>,
    _domain: PhantomData<fn(&mut D)>,
}

struct Pending {
    id: MutationId,
    description: String,
    /// `ContinuousState<D, M>` for the `M` the handle was typed with
    state: Box<dyn Any>,
}

type ApplyPending<D> = fn(&mut Mutator<D>, MutationId) -> LocalBoxFuture<'_, EditorResult<MutationId>>;

/// The pending continuous mutation, when it was begun through
/// [`Mutator::debounce_continuous`]
struct Debounce<D: MutationDomain> {
    id: MutationId,
    mutation_type: TypeId,
    deadline: Instant,
    apply: ApplyPending<D>,
}

pub struct Mutator<D: MutationDomain> {
    domain: D,
    history: UndoStack<D>,
    store: DocumentStore,
    notifier: ChangeNotifier,
    ids: MutationIds,
    pending: Option<Pending>,
    debounce: Option<Debounce<D>>,
    debounce_window: Duration,
}

impl<D: MutationDomain> Mutator<D> {
    pub fn new(domain: D, store: DocumentStore, ids: MutationIds, options: MutatorOptions) -> Self {
        Self {
            domain,
            history: UndoStack::with_max_levels(options.max_undo_levels),
            store,
            notifier: ChangeNotifier::new(),
            ids,
            pending: None,
            debounce: None,
            debounce_window: options.debounce_window,
        }
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    /// Direct access for changes that bypass history (external events)
    pub fn domain_mut(&mut self) -> &mut D {
        &mut self.domain
    }

    pub fn history(&self) -> &UndoStack<D> {
        &self.history
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn latest_mutation_id(&self) -> Option<MutationId> {
        self.history.latest_id()
    }

    /// Id of the continuous mutation in progress, if any
    pub fn pending_continuous(&self) -> Option<MutationId> {
        self.pending.as_ref().map(|pending| pending.id)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&MutationEvent) + 'static) -> SubscriptionId {
        self.notifier.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Apply a one-shot mutation, record it and persist the document
    pub async fn apply<M: OneShotMutation<D>>(&mut self, mutation: M) -> EditorResult<MutationId> {
        self.flush_debounce().await?;
        self.ensure_idle()?;

        let id = self.ids.next_id();
        let description = mutation.description();
        debug!("[Mutator] apply {} {}", id, description);

        let undo_args = mutation.capture_undo_args(&self.domain)?;
        let args = mutation.args();

        if let Err(err) = mutation.update(&mut self.domain, &args) {
            self.restore(&mutation, &undo_args);
            return Err(err.into());
        }
        self.settle().await;

        let script = match self.record_document_write(|domain| mutation.write_document(domain)) {
            Ok(script) => script,
            Err(err) => {
                self.restore(&mutation, &undo_args);
                self.settle().await;
                return Err(err);
            }
        };

        self.commit(id, description, Applied::new(mutation, args, undo_args), script)
            .await
    }

    /// Snapshot pre-state and start a continuous mutation
    pub fn begin_continuous<M: ContinuousMutation<D>>(&mut self, mutation: M) -> EditorResult<ContinuousHandle<M>> {
        self.ensure_idle()?;

        let undo_args = mutation.capture_undo_args(&self.domain)?;
        let id = self.ids.next_id();
        let description = mutation.description();
        debug!("[Mutator] begin {} {}", id, description);

        self.pending = Some(Pending {
            id,
            description: description.clone(),
            state: Box::new(ContinuousState::<D, M> {
                mutation,
                undo_args,
                last_args: None,
                _domain: PhantomData,
            }),
        });
        self.notifier.emit(MutationEvent::Began { id, description });
        Ok(ContinuousHandle::new(id))
    }

    /// Overwrite model and runtime with `args`. The document is untouched.
    ///
    /// On failure the last good value is written back and the mutation
    /// stays pending.
    pub fn update_continuous<M: ContinuousMutation<D>>(
        &mut self,
        handle: &ContinuousHandle<M>,
        args: M::Args,
    ) -> EditorResult<()> {
        let state = pending_state::<D, M>(&mut self.pending, handle.id)?;

        if let Err(err) = state.mutation.update(&mut self.domain, &args) {
            let last_good = state.last_args.as_ref().unwrap_or(&state.undo_args);
            if let Err(restore_err) = state.mutation.update(&mut self.domain, last_good) {
                warn!("[Mutator] could not restore {} after failed update: {}", handle.id, restore_err);
            }
            return Err(err.into());
        }

        state.last_args = Some(args);
        self.notifier.emit(MutationEvent::Updated { id: handle.id });
        Ok(())
    }

    /// Write the document from the current model, record and persist.
    ///
    /// A mutation that was never updated is discarded with
    /// [`EditorError::ContinuousNotUpdated`].
    pub async fn apply_continuous<M: ContinuousMutation<D>>(
        &mut self,
        handle: ContinuousHandle<M>,
    ) -> EditorResult<MutationId> {
        let id = handle.id;
        let (description, state) = take_pending::<D, M>(&mut self.pending, id)?;
        let ContinuousState {
            mutation,
            undo_args,
            last_args,
            ..
        } = *state;

        let Some(args) = last_args else {
            warn!("[Mutator] {} {} applied without update, discarding", id, description);
            self.notifier.emit(MutationEvent::Abandoned { id });
            return Err(EditorError::ContinuousNotUpdated(id));
        };

        self.settle().await;

        let script = match self.record_document_write(|domain| mutation.write_document(domain)) {
            Ok(script) => script,
            Err(err) => {
                self.restore(&mutation, &undo_args);
                self.settle().await;
                return Err(err);
            }
        };

        self.commit(id, description, Applied::new(mutation, args, undo_args), script)
            .await
    }

    /// begin + update + apply in one call
    pub async fn apply_instantly<M: ContinuousMutation<D>>(
        &mut self,
        mutation: M,
        args: M::Args,
    ) -> EditorResult<MutationId> {
        let handle = self.begin_continuous(mutation)?;
        if let Err(err) = self.update_continuous(&handle, args) {
            self.abandon_continuous();
            return Err(err);
        }
        self.apply_continuous(handle).await
    }

    /// Drop the pending mutation and write its pre-state back to model and
    /// runtime. Nothing is persisted.
    pub async fn cancel_continuous<M: ContinuousMutation<D>>(&mut self, handle: ContinuousHandle<M>) -> EditorResult<()> {
        let id = handle.id;
        let (_, state) = take_pending::<D, M>(&mut self.pending, id)?;

        let result = if state.last_args.is_some() {
            state.mutation.update(&mut self.domain, &state.undo_args)
        } else {
            Ok(())
        };
        self.settle().await;

        debug!("[Mutator] cancelled {}", id);
        self.notifier.emit(MutationEvent::Cancelled { id });
        result.map_err(EditorError::from)
    }

    /// Update a continuous mutation without holding its handle.
    ///
    /// If the pending mutation was debounced, has the same type and the
    /// same description, it takes `args` and its deadline moves. Otherwise
    /// the debounced one is applied first and `mutation` is begun.
    pub async fn debounce_continuous<M: ContinuousMutation<D>>(
        &mut self,
        mutation: M,
        args: M::Args,
    ) -> EditorResult<MutationId> {
        let extending = match (&self.debounce, &self.pending) {
            (Some(debounce), Some(pending))
                if debounce.id == pending.id
                    && debounce.mutation_type == TypeId::of::<M>()
                    && pending.description == mutation.description() =>
            {
                Some(pending.id)
            }
            _ => None,
        };
        let extends = extending.is_some();

        let handle = if let Some(id) = extending {
            ContinuousHandle::<M>::new(id)
        } else {
            self.flush_debounce().await?;
            let handle = self.begin_continuous(mutation)?;
            self.debounce = Some(Debounce {
                id: handle.id,
                mutation_type: TypeId::of::<M>(),
                deadline: Instant::now() + self.debounce_window,
                apply: apply_pending::<D, M>,
            });
            handle
        };

        if let Err(err) = self.update_continuous(&handle, args) {
            if !extends {
                self.debounce = None;
                self.abandon_continuous();
            }
            return Err(err);
        }
        if let Some(debounce) = self.debounce.as_mut() {
            debounce.deadline = Instant::now() + self.debounce_window;
        }
        Ok(handle.id)
    }

    /// When the debounced mutation is due, if there is one
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.debounce.as_ref().map(|debounce| debounce.deadline)
    }

    /// Apply the debounced mutation if its deadline has passed at `now`
    pub async fn expire_debounce(&mut self, now: Instant) -> EditorResult<Option<MutationId>> {
        match self.debounce_deadline() {
            Some(deadline) if deadline <= now => self.flush_debounce().await,
            _ => Ok(None),
        }
    }

    /// Apply the debounced mutation now, if there is one
    pub async fn flush_debounce(&mut self) -> EditorResult<Option<MutationId>> {
        let Some(debounce) = self.debounce.take() else {
            return Ok(None);
        };
        if self.pending_continuous() != Some(debounce.id) {
            return Ok(None);
        }
        debug!("[Mutator] applying debounced {}", debounce.id);
        (debounce.apply)(self, debounce.id).await.map(Some)
    }

    /// Forget the pending mutation, keeping whatever transient state it left
    pub fn abandon_continuous(&mut self) -> Option<MutationId> {
        self.debounce = None;
        let pending = self.pending.take()?;
        debug!("[Mutator] abandoned {} {}", pending.id, pending.description);
        self.notifier.emit(MutationEvent::Abandoned { id: pending.id });
        Some(pending.id)
    }

    /// Revert the latest applied mutation. Returns false if there is none.
    pub async fn undo(&mut self) -> EditorResult<bool> {
        self.flush_debounce().await?;
        self.ensure_idle()?;

        let Some(entry) = self.history.undo_entry() else {
            return Ok(false);
        };
        let (id, description) = (entry.id, entry.description.clone());
        entry.record.restore(&mut self.domain)?;
        self.settle().await;

        if let Some(entry) = self.history.undo_entry_mut() {
            match self.domain.document_mut().revert_script(&entry.script) {
                Ok(()) => {}
                Err(DocumentError::StaleEdit { offset }) => {
                    warn!(
                        "[Mutator] recorded edits of {} no longer match at {}, rewriting from model",
                        id, offset
                    );
                    let fallback =
                        record_write(&mut self.domain, |domain| entry.record.write_document(domain))?;
                    entry.script = fallback.inverse();
                }
                Err(err) => return Err(err.into()),
            }
        }

        self.history.step_back();
        info!("[Mutator] undid {} {}", id, description);
        self.notifier.emit(MutationEvent::Undone { id, description });

        self.persist_changes().await?;
        self.run_after_persist(id).await?;
        Ok(true)
    }

    /// Re-apply the latest undone mutation. Returns false if there is none.
    pub async fn redo(&mut self) -> EditorResult<bool> {
        self.flush_debounce().await?;
        self.ensure_idle()?;

        let Some(entry) = self.history.redo_entry() else {
            return Ok(false);
        };
        let (id, description) = (entry.id, entry.description.clone());
        entry.record.replay(&mut self.domain)?;
        self.settle().await;

        if let Some(entry) = self.history.redo_entry_mut() {
            match self.domain.document_mut().apply_script(&entry.script) {
                Ok(()) => {}
                Err(DocumentError::StaleEdit { offset }) => {
                    warn!(
                        "[Mutator] recorded edits of {} no longer match at {}, rewriting from model",
                        id, offset
                    );
                    entry.script =
                        record_write(&mut self.domain, |domain| entry.record.write_document(domain))?;
                }
                Err(err) => return Err(err.into()),
            }
        }

        self.history.step_forward();
        info!("[Mutator] redid {} {}", id, description);
        self.notifier.emit(MutationEvent::Redone { id, description });

        self.persist_changes().await?;
        self.run_after_persist(id).await?;
        Ok(true)
    }

    /// Write the document to its file unless it is unchanged since the
    /// last read or write. In-memory state is kept if the write fails.
    pub async fn persist_changes(&mut self) -> EditorResult<PersistOutcome> {
        let text = self.domain.document().to_string();
        match self.store.persist(&text).await {
            Ok(PersistOutcome::Written { hash }) => {
                info!("[Mutator] persisted {} ({})", self.store.path().display(), hash);
                self.notifier.emit(MutationEvent::Persisted {
                    path: self.store.path().to_path_buf(),
                    hash: hash.clone(),
                });
                Ok(PersistOutcome::Written { hash })
            }
            Ok(PersistOutcome::Unchanged) => Ok(PersistOutcome::Unchanged),
            Err(err) => {
                warn!("[Mutator] {}", err);
                Err(err)
            }
        }
    }

    /// Re-read the document from its file and rebuild the domain.
    /// History is cleared and any pending continuous mutation abandoned.
    pub async fn reload_from_disk(&mut self) -> EditorResult<()> {
        self.abandon_continuous();

        let text = self.store.read().await?;
        self.domain.reload(text).await?;
        self.history.clear();

        info!("[Mutator] reloaded {}", self.store.path().display());
        self.notifier.emit(MutationEvent::Reloaded {
            path: self.store.path().to_path_buf(),
        });
        Ok(())
    }

    fn ensure_idle(&self) -> EditorResult<()> {
        match &self.pending {
            Some(pending) => Err(EditorError::ContinuousInProgress(pending.id)),
            None => Ok(()),
        }
    }

    async fn settle(&mut self) {
        for err in self.domain.settle().await {
            warn!("[Mutator] settle failed: {}", err);
        }
    }

    /// Best-effort write of the pre-state after a failed phase
    fn restore<M: Mutation<D>>(&mut self, mutation: &M, undo_args: &M::Args) {
        if let Err(err) = mutation.update(&mut self.domain, undo_args) {
            warn!("[Mutator] restoring {} failed: {}", mutation.description(), err);
        }
    }

    /// Run a document write and record its edits. A failed write is
    /// rolled back, leaving the document text as it was.
    fn record_document_write(
        &mut self,
        write: impl FnOnce(&mut D) -> MutationResult<()>,
    ) -> EditorResult<EditScript> {
        record_write(&mut self.domain, write)
    }

    async fn commit<M: Mutation<D>>(
        &mut self,
        id: MutationId,
        description: String,
        applied: Applied<D, M>,
        script: EditScript,
    ) -> EditorResult<MutationId> {
        self.history
            .push(UndoEntry::new(id, description.clone(), Box::new(applied), script));
        info!("[Mutator] applied {} {}", id, description);
        self.notifier.emit(MutationEvent::Applied { id, description });

        self.persist_changes().await?;
        self.run_after_persist(id).await?;
        Ok(id)
    }

    async fn run_after_persist(&mut self, id: MutationId) -> EditorResult<()> {
        if let Some(entry) = self.history.get(id) {
            entry
                .record
                .after_persist(&mut self.domain)
                .await
                .map_err(|source| EditorError::AfterPersist { id, source })?;
        }
        Ok(())
    }
}

fn apply_pending<D: MutationDomain, M: ContinuousMutation<D>>(
    mutator: &mut Mutator<D>,
    id: MutationId,
) -> LocalBoxFuture<'_, EditorResult<MutationId>> {
    mutator.apply_continuous(ContinuousHandle::<M>::new(id)).boxed_local()
}

fn record_write<D: MutationDomain>(
    domain: &mut D,
    write: impl FnOnce(&mut D) -> MutationResult<()>,
) -> EditorResult<EditScript> {
    domain.document_mut().start_recording();
    let result = write(domain);
    let script = domain.document_mut().finish_recording();

    if let Err(err) = result {
        if let Err(revert_err) = domain.document_mut().revert_script(&script) {
            warn!("[Mutator] could not roll back partial document write: {}", revert_err);
        }
        return Err(err.into());
    }
    Ok(script)
}

fn pending_state<D: MutationDomain, M: Mutation<D>>(
    slot: &mut Option<Pending>,
    id: MutationId,
) -> EditorResult<&mut ContinuousState<D, M>> {
    slot.as_mut()
        .filter(|pending| pending.id == id)
        .and_then(|pending| pending.state.downcast_mut::<ContinuousState<D, M>>())
        .ok_or(EditorError::StaleContinuousHandle(id))
}

fn take_pending<D: MutationDomain, M: Mutation<D>>(
    slot: &mut Option<Pending>,
    id: MutationId,
) -> EditorResult<(String, Box<ContinuousState<D, M>>)> {
    match slot.take() {
        Some(pending) if pending.id == id => match pending.state.downcast::<ContinuousState<D, M>>() {
            Ok(state) => Ok((pending.description, state)),
            Err(state) => {
                *slot = Some(Pending {
                    id,
                    description: pending.description,
                    state,
                });
                Err(EditorError::StaleContinuousHandle(id))
            }
        },
        other => {
            *slot = other;
            Err(EditorError::StaleContinuousHandle(id))
        }
    }
}

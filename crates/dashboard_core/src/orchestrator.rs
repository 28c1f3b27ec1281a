//! List + add/edit surface state for one resource page.
//!
//! The orchestrator owns the surface (drawer/modal) state and the active list
//! filter. It never edits cached pages: after a committed write it asks the
//! pager to reload.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::{Map, Value};
use shared::domain::{Record, RecordId};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    error::{DashboardError, StateError, TransportError},
    mutation::{MutationCoordinator, MutationObserver, MutationRequest},
    notifications::{MutationKind, Notification, NotificationRegistry},
    pager::{CursorPager, FetchOutcome, LoadStatus},
    resources::{DraftForm, Resource},
    trigger::NextPageTrigger,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceMode<T> {
    Closed,
    Adding,
    Editing {
        record: T,
        editable: bool,
        confirm_delete: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceView<T, F> {
    pub mode: SurfaceMode<T>,
    pub draft: Option<F>,
    pub submitting: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListStatus {
    Loading,
    Failed(String),
    Empty,
    Ready,
}

/// What the list region should render right now.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    pub status: ListStatus,
    pub items: Vec<T>,
    pub has_next_page: bool,
    pub refreshing: bool,
    /// Aggregate fields of the first page, e.g. running totals.
    pub summary: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<T> {
    /// The server acknowledged the write. `None` for deletes.
    Committed(Option<T>),
    Ignored(StateError),
}

struct SurfaceState<R: Resource> {
    mode: SurfaceMode<R::Record>,
    draft: Option<R::Form>,
    submitting: bool,
    // Bumped on every open/close so late responses can tell whether the
    // surface they were submitted from is still the one on screen.
    session: u64,
}

impl<R: Resource> SurfaceState<R> {
    fn reset(&mut self) {
        self.mode = SurfaceMode::Closed;
        self.draft = None;
        self.submitting = false;
        self.session += 1;
    }
}

pub struct ListOrchestrator<R: Resource> {
    pager: Arc<CursorPager<R>>,
    coordinator: Arc<MutationCoordinator<R>>,
    registry: Arc<NotificationRegistry>,
    trigger: NextPageTrigger<R>,
    surface: Mutex<SurfaceState<R>>,
    filter: Mutex<Option<R::Filter>>,
}

impl<R: Resource> ListOrchestrator<R> {
    pub fn new(
        pager: Arc<CursorPager<R>>,
        coordinator: Arc<MutationCoordinator<R>>,
        fetch_interval: Duration,
    ) -> Self {
        let registry = coordinator.registry().clone();
        Self {
            trigger: NextPageTrigger::new(pager.clone(), fetch_interval),
            pager,
            coordinator,
            registry,
            surface: Mutex::new(SurfaceState {
                mode: SurfaceMode::Closed,
                draft: None,
                submitting: false,
                session: 0,
            }),
            filter: Mutex::new(None),
        }
    }

    pub fn pager(&self) -> &Arc<CursorPager<R>> {
        &self.pager
    }

    pub fn coordinator(&self) -> &Arc<MutationCoordinator<R>> {
        &self.coordinator
    }

    pub async fn load(&self) -> Result<FetchOutcome, TransportError> {
        self.pager.ensure_loaded().await
    }

    /// End-of-list visibility signal, rate limited by the fetch interval.
    pub async fn reached_end(&self) -> Result<FetchOutcome, TransportError> {
        self.trigger.signal().await
    }

    pub async fn retry(&self) -> Result<FetchOutcome, TransportError> {
        self.pager.retry().await
    }

    pub async fn select_filter(&self, filter: Option<R::Filter>) {
        debug!(resource = R::PATH, filter = ?filter, "filter selected");
        *self.filter.lock().await = filter;
    }

    pub async fn filter(&self) -> Option<R::Filter> {
        self.filter.lock().await.clone()
    }

    pub async fn list_view(&self) -> ListView<R::Record> {
        let filter = self.filter.lock().await.clone();
        let snapshot = self.pager.snapshot().await;
        let summary = snapshot
            .pages
            .first()
            .map(|page| page.aggregates.clone())
            .unwrap_or_default();
        let items: Vec<R::Record> = snapshot
            .pages
            .iter()
            .flat_map(|page| page.items.iter())
            .filter(|item| filter.as_ref().map_or(true, |f| R::matches(item, f)))
            .cloned()
            .collect();

        // A zero running total for the selected tab means nothing to list,
        // whatever the first page happens to carry.
        let ruled_out = filter
            .as_ref()
            .is_some_and(|f| R::aggregates_rule_out(f, &summary));

        let status = match snapshot.status {
            LoadStatus::Idle | LoadStatus::Loading => ListStatus::Loading,
            LoadStatus::Failed(err) => ListStatus::Failed(err.message().to_string()),
            LoadStatus::Ready if ruled_out || items.is_empty() => ListStatus::Empty,
            LoadStatus::Ready => ListStatus::Ready,
        };
        let items = match status {
            ListStatus::Failed(_) | ListStatus::Empty => Vec::new(),
            _ => items,
        };

        ListView {
            status,
            items,
            has_next_page: snapshot.has_next_page,
            refreshing: snapshot.reloading,
            summary,
        }
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.registry.visible().await
    }

    pub async fn notification_slot(&self, kind: MutationKind) -> Option<Notification> {
        self.registry.slot(kind).await
    }

    pub async fn is_submitting(&self, kind: MutationKind) -> bool {
        self.coordinator.is_submitting(kind).await
    }

    pub async fn surface(&self) -> SurfaceView<R::Record, R::Form> {
        let state = self.surface.lock().await;
        SurfaceView {
            mode: state.mode.clone(),
            draft: state.draft.clone(),
            submitting: state.submitting,
        }
    }

    /// Opens an empty add surface, dropping any selected record.
    pub async fn open_add(&self) {
        let mut state = self.surface.lock().await;
        state.reset();
        state.mode = SurfaceMode::Adding;
        state.draft = Some(R::Form::default());
        debug!(resource = R::PATH, "add surface opened");
    }

    /// Opens a read-only detail surface with `record` loaded into the draft.
    pub async fn open_edit(&self, record: R::Record) {
        let mut state = self.surface.lock().await;
        state.reset();
        state.draft = Some(R::Form::from_record(&record));
        debug!(resource = R::PATH, id = %record.id(), "edit surface opened");
        state.mode = SurfaceMode::Editing {
            record,
            editable: false,
            confirm_delete: false,
        };
    }

    pub async fn open_edit_by_id(&self, id: RecordId) -> Result<(), StateError> {
        let Some(record) = self.pager.find(id).await else {
            debug!(resource = R::PATH, %id, "no loaded record to edit");
            return Err(StateError::NoRecordOpen);
        };
        self.open_edit(record).await;
        Ok(())
    }

    pub async fn make_editable(&self) -> Result<(), StateError> {
        let mut state = self.surface.lock().await;
        match &mut state.mode {
            SurfaceMode::Editing { editable, .. } => {
                *editable = true;
                Ok(())
            }
            _ => Err(StateError::NoRecordOpen),
        }
    }

    pub async fn update_draft(&self, edit: impl FnOnce(&mut R::Form) + Send) -> Result<(), StateError> {
        let mut state = self.surface.lock().await;
        match state.mode {
            SurfaceMode::Closed => return Err(StateError::SurfaceClosed),
            SurfaceMode::Editing {
                editable: false, ..
            } => return Err(StateError::ReadOnly),
            _ => {}
        }
        match state.draft.as_mut() {
            Some(draft) => {
                edit(draft);
                Ok(())
            }
            None => Err(StateError::SurfaceClosed),
        }
    }

    /// Closes the surface and discards the draft.
    pub async fn close(&self) {
        let mut state = self.surface.lock().await;
        if !matches!(state.mode, SurfaceMode::Closed) {
            debug!(resource = R::PATH, "surface closed without submitting");
        }
        state.reset();
    }

    pub async fn request_delete(&self) -> Result<(), StateError> {
        self.set_confirm_delete(true).await
    }

    pub async fn cancel_delete(&self) -> Result<(), StateError> {
        self.set_confirm_delete(false).await
    }

    async fn set_confirm_delete(&self, value: bool) -> Result<(), StateError> {
        let mut state = self.surface.lock().await;
        match &mut state.mode {
            SurfaceMode::Editing { confirm_delete, .. } => {
                *confirm_delete = value;
                Ok(())
            }
            _ => Err(StateError::NoRecordOpen),
        }
    }

    /// Submits the open add or editable edit surface.
    pub async fn submit(&self) -> Result<SubmitOutcome<R::Record>, DashboardError> {
        let prepared = {
            let mut state = self.surface.lock().await;
            let request = match (&state.mode, &state.draft) {
                _ if state.submitting => Err(StateError::AlreadySubmitting),
                (SurfaceMode::Adding, Some(draft)) => Ok(MutationRequest::add(draft.clone())),
                (SurfaceMode::Editing { editable: false, .. }, _) => Err(StateError::ReadOnly),
                (SurfaceMode::Editing { record, .. }, Some(draft)) => {
                    Ok(MutationRequest::edit(record.id(), draft.clone()))
                }
                _ => Err(StateError::SurfaceClosed),
            };
            request.map(|request| {
                state.submitting = true;
                (request, state.session)
            })
        };
        self.run(prepared).await
    }

    /// Deletes the record on the open surface once deletion was confirmed.
    pub async fn confirm_delete(&self) -> Result<SubmitOutcome<R::Record>, DashboardError> {
        let prepared = {
            let mut state = self.surface.lock().await;
            let request = match &state.mode {
                _ if state.submitting => Err(StateError::AlreadySubmitting),
                SurfaceMode::Editing {
                    record,
                    confirm_delete: true,
                    ..
                } => Ok(MutationRequest::delete(record.id())),
                SurfaceMode::Editing { .. } => Err(StateError::DeleteNotConfirmed),
                _ => Err(StateError::NoRecordOpen),
            };
            request.map(|request| {
                state.submitting = true;
                (request, state.session)
            })
        };
        self.run(prepared).await
    }

    /// Makes the record on the open surface the current one. Works from the
    /// read-only view; records that are already current are left alone.
    pub async fn activate(&self) -> Result<SubmitOutcome<R::Record>, DashboardError> {
        let prepared = {
            let mut state = self.surface.lock().await;
            let request = match &state.mode {
                _ if state.submitting => Err(StateError::AlreadySubmitting),
                SurfaceMode::Editing { record, .. } if R::can_activate(record) => {
                    Ok(MutationRequest::activate(record.id()))
                }
                SurfaceMode::Editing { .. } => Err(StateError::CannotActivate),
                _ => Err(StateError::NoRecordOpen),
            };
            request.map(|request| {
                state.submitting = true;
                (request, state.session)
            })
        };
        self.run(prepared).await
    }

    async fn run(
        &self,
        prepared: Result<(MutationRequest<R>, u64), StateError>,
    ) -> Result<SubmitOutcome<R::Record>, DashboardError> {
        let (request, session) = match prepared {
            Ok(prepared) => prepared,
            Err(reason) => {
                debug!(resource = R::PATH, %reason, "submit ignored");
                return Ok(SubmitOutcome::Ignored(reason));
            }
        };

        let callbacks = SurfaceCallbacks {
            orchestrator: self,
            session,
        };
        let result = self.coordinator.submit(request, &callbacks).await;

        {
            let mut state = self.surface.lock().await;
            if state.session == session {
                state.submitting = false;
            }
        }
        result.map(SubmitOutcome::Committed)
    }
}

/// Per-submission hooks bound to the surface session that issued the write.
struct SurfaceCallbacks<'a, R: Resource> {
    orchestrator: &'a ListOrchestrator<R>,
    session: u64,
}

#[async_trait]
impl<'a, R: Resource> MutationObserver<R> for SurfaceCallbacks<'a, R> {
    async fn on_submitted(&self, kind: MutationKind, _record: Option<&R::Record>) {
        {
            let mut state = self.orchestrator.surface.lock().await;
            if state.session == self.session {
                state.reset();
                info!(resource = R::PATH, kind = kind.as_str(), "surface closed after commit");
            } else {
                debug!(
                    resource = R::PATH,
                    kind = kind.as_str(),
                    "surface changed while the write was pending; leaving it as is"
                );
            }
        }
        if let Err(err) = self.orchestrator.pager.refetch().await {
            warn!(resource = R::PATH, error = %err, "reload after commit failed");
        }
    }

    async fn on_error(&self, kind: MutationKind, error: &TransportError) {
        debug!(
            resource = R::PATH,
            kind = kind.as_str(),
            error = %error,
            "write failed; surface stays open for retry"
        );
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;

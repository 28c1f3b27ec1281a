use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use shared::domain::RecordId;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    data_source::DataSource,
    error::{DashboardError, TransportError},
    notifications::{MutationKind, NotificationRegistry},
    resources::{DraftForm, Resource},
};

enum WriteOp<T> {
    Create(T),
    Update(RecordId, T),
    Remove(RecordId),
    Activate(RecordId),
}

pub struct MutationRequest<R: Resource> {
    op: WriteOp<R::Form>,
}

impl<R: Resource> MutationRequest<R> {
    pub fn add(form: R::Form) -> Self {
        Self {
            op: WriteOp::Create(form),
        }
    }

    pub fn edit(id: RecordId, form: R::Form) -> Self {
        Self {
            op: WriteOp::Update(id, form),
        }
    }

    pub fn delete(id: RecordId) -> Self {
        Self {
            op: WriteOp::Remove(id),
        }
    }

    pub fn activate(id: RecordId) -> Self {
        Self {
            op: WriteOp::Activate(id),
        }
    }

    pub fn kind(&self) -> MutationKind {
        match self.op {
            WriteOp::Create(_) => MutationKind::Add,
            WriteOp::Update(..) => MutationKind::Edit,
            WriteOp::Remove(_) => MutationKind::Delete,
            WriteOp::Activate(_) => MutationKind::Activate,
        }
    }

    pub fn target(&self) -> Option<RecordId> {
        match self.op {
            WriteOp::Create(_) => None,
            WriteOp::Update(id, _) | WriteOp::Remove(id) | WriteOp::Activate(id) => Some(id),
        }
    }

    fn validate(&self) -> Result<WriteOp<R::Payload>, DashboardError> {
        Ok(match &self.op {
            WriteOp::Create(form) => WriteOp::Create(form.validate()?),
            WriteOp::Update(id, form) => WriteOp::Update(*id, form.validate()?),
            WriteOp::Remove(id) => WriteOp::Remove(*id),
            WriteOp::Activate(id) => WriteOp::Activate(*id),
        })
    }
}

/// Lifecycle hooks a call site plugs into a submission.
#[async_trait]
pub trait MutationObserver<R: Resource>: Send + Sync {
    async fn on_loading(&self, _kind: MutationKind) {}
    /// Runs once the server acknowledged the write. `record` is `None` for deletes.
    async fn on_submitted(&self, kind: MutationKind, record: Option<&R::Record>);
    async fn on_error(&self, _kind: MutationKind, _error: &TransportError) {}
}

pub struct NoopObserver;

#[async_trait]
impl<R: Resource> MutationObserver<R> for NoopObserver {
    async fn on_submitted(&self, _kind: MutationKind, _record: Option<&R::Record>) {}
}

/// Progress, success and error titles for one mutation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationCopy {
    pub loading: String,
    pub success: String,
    pub error: String,
}

impl MutationCopy {
    pub fn for_kind(kind: MutationKind, label: &str) -> Self {
        let (progress, done, verb) = match kind {
            MutationKind::Add => ("Adding", "added", "add"),
            MutationKind::Edit => ("Updating", "updated", "update"),
            MutationKind::Delete => ("Removing", "removed", "remove"),
            MutationKind::Activate => ("Activating", "activated", "activate"),
        };
        Self {
            loading: format!("{progress} {label}"),
            success: format!("{} {done}", capitalize(label)),
            error: format!("Failed to {verb} {label}"),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Wraps one write with its notification lifecycle.
pub struct MutationCoordinator<R: Resource> {
    source: Arc<dyn DataSource<R>>,
    registry: Arc<NotificationRegistry>,
    in_flight: Mutex<HashMap<MutationKind, usize>>,
}

impl<R: Resource> MutationCoordinator<R> {
    pub fn new(source: Arc<dyn DataSource<R>>, registry: Arc<NotificationRegistry>) -> Self {
        Self {
            source,
            registry,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<NotificationRegistry> {
        &self.registry
    }

    /// True while at least one write of `kind` is waiting on the server. The
    /// submit affordance binds to this; submissions themselves are not queued.
    pub async fn is_submitting(&self, kind: MutationKind) -> bool {
        self.in_flight
            .lock()
            .await
            .get(&kind)
            .is_some_and(|count| *count > 0)
    }

    /// Validates, shows progress, writes, then resolves the notification and
    /// hands the outcome to `observer`. A draft that fails validation never
    /// reaches the registry or the server.
    pub async fn submit(
        &self,
        request: MutationRequest<R>,
        observer: &dyn MutationObserver<R>,
    ) -> Result<Option<R::Record>, DashboardError> {
        let kind = request.kind();
        let op = match request.validate() {
            Ok(op) => op,
            Err(err) => {
                debug!(resource = R::PATH, kind = kind.as_str(), error = %err, "draft rejected locally");
                return Err(err);
            }
        };

        *self.in_flight.lock().await.entry(kind).or_insert(0) += 1;
        let copy = MutationCopy::for_kind(kind, R::LABEL);
        let handle = self.registry.begin_loading(kind, &copy.loading).await;
        observer.on_loading(kind).await;

        info!(
            resource = R::PATH,
            kind = kind.as_str(),
            target = ?request.target(),
            "dispatching write"
        );
        let result = match op {
            WriteOp::Create(payload) => self.source.create(&payload).await.map(Some),
            WriteOp::Update(id, payload) => self.source.update(id, &payload).await.map(Some),
            WriteOp::Remove(id) => self.source.remove(id).await.map(|()| None),
            WriteOp::Activate(id) => self.source.activate(id).await.map(Some),
        };
        if let Some(count) = self.in_flight.lock().await.get_mut(&kind) {
            *count = count.saturating_sub(1);
        }

        match result {
            Ok(record) => {
                info!(resource = R::PATH, kind = kind.as_str(), "write acknowledged");
                self.registry
                    .resolve_success(handle, &copy.success, None)
                    .await;
                observer.on_submitted(kind, record.as_ref()).await;
                Ok(record)
            }
            Err(err) => {
                warn!(resource = R::PATH, kind = kind.as_str(), error = %err, "write failed");
                self.registry
                    .resolve_error(handle, &copy.error, err.message())
                    .await;
                observer.on_error(kind, &err).await;
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/mutation_tests.rs"]
mod tests;

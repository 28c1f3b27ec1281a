//! Keyed status notifications driven by mutation lifecycles.
//!
//! One slot per [`MutationKind`] points at the most recent handle issued for
//! that kind. Loading notifications never expire on their own: a write that
//! never settles leaves its notification loading until dismissed.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, Mutex};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MutationKind {
    Add,
    Edit,
    Delete,
    Activate,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Activate => "activate",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationHandle(u64);

impl NotificationHandle {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub handle: NotificationHandle,
    pub kind: MutationKind,
    pub status: NotificationStatus,
    pub title: String,
    pub message: Option<String>,
}

impl Notification {
    pub fn is_terminal(&self) -> bool {
        self.status != NotificationStatus::Loading
    }
}

/// What to do when a handle resolves after a newer `begin_loading` of the
/// same kind took over its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupersededResolution {
    /// Update the superseded notification in place anyway. A late resolution
    /// can therefore land after (and visually over) the newer state.
    #[default]
    Apply,
    /// Drop resolutions from handles that no longer own their slot.
    Ignore,
}

impl FromStr for SupersededResolution {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "apply" => Ok(Self::Apply),
            "ignore" => Ok(Self::Ignore),
            other => Err(format!("unknown superseded resolution policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Shown(Notification),
    Updated(Notification),
    Dismissed(NotificationHandle),
}

struct RegistryState {
    next_handle: u64,
    slots: HashMap<MutationKind, NotificationHandle>,
    visible: BTreeMap<NotificationHandle, Notification>,
    shut_down: bool,
}

pub struct NotificationRegistry {
    policy: SupersededResolution,
    inner: Mutex<RegistryState>,
    events: broadcast::Sender<NotificationEvent>,
}

impl Default for NotificationRegistry {
    fn default() -> Self {
        Self::new(SupersededResolution::default(), DEFAULT_EVENT_BUFFER)
    }
}

impl NotificationRegistry {
    pub fn new(policy: SupersededResolution, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            policy,
            inner: Mutex::new(RegistryState {
                next_handle: 1,
                slots: HashMap::new(),
                visible: BTreeMap::new(),
                shut_down: false,
            }),
            events,
        }
    }

    pub fn policy(&self) -> SupersededResolution {
        self.policy
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events.subscribe()
    }

    /// Registry events as a stream. A lagging consumer skips what it missed.
    pub fn event_stream(&self) -> impl Stream<Item = NotificationEvent> + Send + 'static {
        BroadcastStream::new(self.events.subscribe()).filter_map(|event| async move { event.ok() })
    }

    pub async fn begin_loading(&self, kind: MutationKind, title: &str) -> NotificationHandle {
        let mut guard = self.inner.lock().await;
        let handle = NotificationHandle(guard.next_handle);
        guard.next_handle += 1;
        if guard.shut_down {
            return handle;
        }

        if let Some(previous) = guard.slots.insert(kind, handle) {
            if guard.visible.get(&previous).is_some_and(|n| !n.is_terminal()) {
                warn!(
                    kind = kind.as_str(),
                    previous = previous.0,
                    "superseding a notification that is still loading"
                );
            }
        }
        // Superseded handles may have resolved after losing the slot, so clear
        // every resolved notification of this kind, not just the slot's.
        let resolved: Vec<NotificationHandle> = guard
            .visible
            .values()
            .filter(|n| n.kind == kind && n.is_terminal())
            .map(|n| n.handle)
            .collect();
        for stale in resolved {
            guard.visible.remove(&stale);
            let _ = self.events.send(NotificationEvent::Dismissed(stale));
        }

        let notification = Notification {
            handle,
            kind,
            status: NotificationStatus::Loading,
            title: title.to_string(),
            message: None,
        };
        guard.visible.insert(handle, notification.clone());
        debug!(kind = kind.as_str(), handle = handle.0, "notification loading");
        let _ = self.events.send(NotificationEvent::Shown(notification));
        handle
    }

    pub async fn resolve_success(
        &self,
        handle: NotificationHandle,
        title: &str,
        message: Option<&str>,
    ) -> bool {
        self.resolve(handle, NotificationStatus::Success, title, message)
            .await
    }

    pub async fn resolve_error(&self, handle: NotificationHandle, title: &str, message: &str) -> bool {
        self.resolve(handle, NotificationStatus::Error, title, Some(message))
            .await
    }

    /// Returns whether the update was applied. Resolving a dismissed handle or
    /// resolving after shutdown is a no-op.
    async fn resolve(
        &self,
        handle: NotificationHandle,
        status: NotificationStatus,
        title: &str,
        message: Option<&str>,
    ) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.shut_down {
            debug!(handle = handle.0, "registry shut down; dropping resolution");
            return false;
        }
        let Some(kind) = guard.visible.get(&handle).map(|n| n.kind) else {
            debug!(handle = handle.0, "resolution for unknown notification");
            return false;
        };
        let superseded = guard.slots.get(&kind) != Some(&handle);
        if superseded && self.policy == SupersededResolution::Ignore {
            // The write has settled; drop its spinner instead of leaving it loading.
            guard.visible.remove(&handle);
            debug!(
                kind = kind.as_str(),
                handle = handle.0,
                "ignoring resolution from superseded handle"
            );
            let _ = self.events.send(NotificationEvent::Dismissed(handle));
            return false;
        }

        let Some(notification) = guard.visible.get_mut(&handle) else {
            return false;
        };
        notification.status = status;
        notification.title = title.to_string();
        notification.message = message.map(str::to_string);
        let updated = notification.clone();
        debug!(
            kind = kind.as_str(),
            handle = handle.0,
            status = ?status,
            superseded,
            "notification resolved"
        );
        let _ = self.events.send(NotificationEvent::Updated(updated));
        true
    }

    pub async fn dismiss(&self, handle: NotificationHandle) -> bool {
        let mut guard = self.inner.lock().await;
        let Some(removed) = guard.visible.remove(&handle) else {
            return false;
        };
        if guard.slots.get(&removed.kind) == Some(&handle) {
            guard.slots.remove(&removed.kind);
        }
        let _ = self.events.send(NotificationEvent::Dismissed(handle));
        true
    }

    /// Current content of the slot for `kind`.
    pub async fn slot(&self, kind: MutationKind) -> Option<Notification> {
        let guard = self.inner.lock().await;
        let handle = guard.slots.get(&kind)?;
        guard.visible.get(handle).cloned()
    }

    pub async fn get(&self, handle: NotificationHandle) -> Option<Notification> {
        self.inner.lock().await.visible.get(&handle).cloned()
    }

    /// Every notification still on screen, oldest first.
    pub async fn visible(&self) -> Vec<Notification> {
        self.inner.lock().await.visible.values().cloned().collect()
    }

    /// Tears the registry down with its session. Later calls are no-ops.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        guard.shut_down = true;
        guard.slots.clear();
        guard.visible.clear();
    }

    pub async fn is_shut_down(&self) -> bool {
        self.inner.lock().await.shut_down
    }
}

#[cfg(test)]
#[path = "tests/notifications_tests.rs"]
mod tests;

use super::*;
use crate::{
    notifications::NotificationStatus,
    resources::{Periods, PositionForm, Positions},
    test_support::{period, position, ScriptedSource},
};
use std::time::Duration;

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    async fn events(&self) -> Vec<String> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl MutationObserver<Positions> for RecordingObserver {
    async fn on_loading(&self, kind: MutationKind) {
        self.events.lock().await.push(format!("loading:{kind}"));
    }

    async fn on_submitted(&self, kind: MutationKind, record: Option<&shared::domain::Position>) {
        let id = record.map(|record| record.id.0.to_string());
        self.events
            .lock()
            .await
            .push(format!("submitted:{kind}:{}", id.unwrap_or_else(|| "-".into())));
    }

    async fn on_error(&self, kind: MutationKind, error: &TransportError) {
        self.events
            .lock()
            .await
            .push(format!("error:{kind}:{}", error.message()));
    }
}

fn coordinator(
    source: &Arc<ScriptedSource<Positions>>,
) -> (MutationCoordinator<Positions>, Arc<NotificationRegistry>) {
    let registry = Arc::new(NotificationRegistry::default());
    let source: Arc<dyn DataSource<Positions>> = source.clone();
    (MutationCoordinator::new(source, registry.clone()), registry)
}

fn treasurer_form() -> PositionForm {
    PositionForm {
        name: "Treasurer".into(),
        level: "2".into(),
    }
}

#[tokio::test]
async fn invalid_draft_never_shows_progress_or_reaches_server() {
    let source = ScriptedSource::<Positions>::new();
    let (coordinator, registry) = coordinator(&source);
    let observer = RecordingObserver::default();
    let form = PositionForm {
        name: "Treasurer".into(),
        level: "  ".into(),
    };

    let err = coordinator
        .submit(MutationRequest::add(form), &observer)
        .await
        .expect_err("validation");

    match err {
        DashboardError::Validation(errors) => assert!(errors.get("level").is_some()),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(registry.visible().await.is_empty());
    assert!(observer.events().await.is_empty());
    assert_eq!(source.write_count().await, 0);
}

#[tokio::test]
async fn successful_add_resolves_success_and_notifies_observer() {
    let source = ScriptedSource::<Positions>::new();
    source.return_on_write(position(7, "Treasurer", 2)).await;
    let (coordinator, registry) = coordinator(&source);
    let observer = RecordingObserver::default();

    let record = coordinator
        .submit(MutationRequest::add(treasurer_form()), &observer)
        .await
        .expect("submit");

    assert_eq!(record.map(|r| r.id.0), Some(7));
    let payloads = source.creates.lock().await.clone();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].level, 2);
    assert_eq!(payloads[0].name, "Treasurer");

    let slot = registry.slot(MutationKind::Add).await.expect("slot");
    assert_eq!(slot.status, NotificationStatus::Success);
    assert_eq!(slot.title, "Position added");
    assert_eq!(observer.events().await, vec!["loading:add", "submitted:add:7"]);
    assert!(!coordinator.is_submitting(MutationKind::Add).await);
}

#[tokio::test]
async fn failed_edit_resolves_error_with_server_message() {
    let source = ScriptedSource::<Positions>::new();
    source.fail_writes("level out of range").await;
    let (coordinator, registry) = coordinator(&source);
    let observer = RecordingObserver::default();

    let err = coordinator
        .submit(
            MutationRequest::edit(RecordId(3), treasurer_form()),
            &observer,
        )
        .await
        .expect_err("transport");

    assert!(matches!(err, DashboardError::Transport(ref e) if e.message() == "level out of range"));
    let slot = registry.slot(MutationKind::Edit).await.expect("slot");
    assert_eq!(slot.status, NotificationStatus::Error);
    assert_eq!(slot.title, "Failed to update position");
    assert_eq!(slot.message.as_deref(), Some("level out of range"));
    assert_eq!(
        observer.events().await,
        vec!["loading:edit", "error:edit:level out of range"]
    );
    assert_eq!(source.updates.lock().await[0].0, RecordId(3));
}

#[tokio::test]
async fn manual_resubmit_after_failure_uses_a_fresh_notification() {
    let source = ScriptedSource::<Positions>::new();
    source.return_on_write(position(3, "Treasurer", 2)).await;
    source.fail_writes("server busy").await;
    let (coordinator, registry) = coordinator(&source);

    let request = || MutationRequest::edit(RecordId(3), treasurer_form());
    coordinator
        .submit(request(), &NoopObserver)
        .await
        .expect_err("first attempt");
    let failed = registry.slot(MutationKind::Edit).await.expect("slot");

    source.succeed_writes().await;
    coordinator
        .submit(request(), &NoopObserver)
        .await
        .expect("second attempt");

    let slot = registry.slot(MutationKind::Edit).await.expect("slot");
    assert_ne!(slot.handle, failed.handle);
    assert_eq!(slot.status, NotificationStatus::Success);
    assert_eq!(registry.visible().await.len(), 1);
    assert_eq!(source.updates.lock().await.len(), 2);
}

#[tokio::test]
async fn delete_reports_no_record() {
    let source = ScriptedSource::<Positions>::new();
    let (coordinator, registry) = coordinator(&source);
    let observer = RecordingObserver::default();

    let record = coordinator
        .submit(MutationRequest::delete(RecordId(5)), &observer)
        .await
        .expect("delete");

    assert_eq!(record, None);
    assert_eq!(source.removes.lock().await.clone(), vec![RecordId(5)]);
    assert_eq!(observer.events().await, vec!["loading:delete", "submitted:delete:-"]);
    assert_eq!(
        registry.slot(MutationKind::Delete).await.map(|n| n.title),
        Some("Position removed".to_string())
    );
}

#[tokio::test]
async fn is_submitting_tracks_outstanding_write() {
    let source = ScriptedSource::<Positions>::new();
    let gate = source.gate_writes().await;
    let (coordinator, _registry) = coordinator(&source);
    let coordinator = Arc::new(coordinator);

    let task = tokio::spawn({
        let coordinator = coordinator.clone();
        async move {
            coordinator
                .submit(MutationRequest::delete(RecordId(5)), &NoopObserver)
                .await
        }
    });
    tokio::time::timeout(Duration::from_secs(5), async {
        while source.removes.lock().await.is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("write started");

    assert!(coordinator.is_submitting(MutationKind::Delete).await);
    assert!(!coordinator.is_submitting(MutationKind::Add).await);

    gate.notify_one();
    task.await.expect("join").expect("delete");

    assert!(!coordinator.is_submitting(MutationKind::Delete).await);
}

struct BusyRecordingObserver {
    coordinator: Arc<MutationCoordinator<Positions>>,
    busy_on_loading: Mutex<Option<bool>>,
}

#[async_trait]
impl MutationObserver<Positions> for BusyRecordingObserver {
    async fn on_loading(&self, kind: MutationKind) {
        *self.busy_on_loading.lock().await = Some(self.coordinator.is_submitting(kind).await);
    }

    async fn on_submitted(&self, _kind: MutationKind, _record: Option<&shared::domain::Position>) {}
}

#[tokio::test]
async fn write_counts_as_submitting_once_progress_is_shown() {
    let source = ScriptedSource::<Positions>::new();
    let (coordinator, _registry) = coordinator(&source);
    let coordinator = Arc::new(coordinator);
    let observer = BusyRecordingObserver {
        coordinator: coordinator.clone(),
        busy_on_loading: Mutex::new(None),
    };

    coordinator
        .submit(MutationRequest::delete(RecordId(5)), &observer)
        .await
        .expect("delete");

    assert_eq!(*observer.busy_on_loading.lock().await, Some(true));
    assert!(!coordinator.is_submitting(MutationKind::Delete).await);
}

#[tokio::test]
async fn activate_dispatches_to_the_activation_endpoint() {
    let source = ScriptedSource::<Periods>::new();
    source.return_on_write(period(4, true)).await;
    let registry = Arc::new(NotificationRegistry::default());
    let data: Arc<dyn DataSource<Periods>> = source.clone();
    let coordinator = MutationCoordinator::new(data, registry.clone());

    let record = coordinator
        .submit(MutationRequest::activate(RecordId(4)), &NoopObserver)
        .await
        .expect("activate");

    assert_eq!(record, Some(period(4, true)));
    assert_eq!(source.activates.lock().await.clone(), vec![RecordId(4)]);
    assert!(source.updates.lock().await.is_empty());
    assert_eq!(
        registry.slot(MutationKind::Activate).await.map(|n| n.title),
        Some("Period activated".to_string())
    );
}

#[test]
fn copy_is_derived_from_kind_and_label() {
    let copy = MutationCopy::for_kind(MutationKind::Add, "blog post");

    assert_eq!(copy.loading, "Adding blog post");
    assert_eq!(copy.success, "Blog post added");
    assert_eq!(copy.error, "Failed to add blog post");
}

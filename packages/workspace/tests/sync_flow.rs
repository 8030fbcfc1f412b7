//! End-to-end flows across the session, coordinator, history and schedule
//! layers: optimistic editing with debounced saves, collaborator updates
//! arriving mid-edit, and conflict resolution.

use planwheel_editor::{HistoryOptions, OperationKind, OperationLabel};
use planwheel_model::{
    ChangeAction, DateSpan, DependencyKind, EntityPayload, Item, ItemDependency, Label, Page,
    PlanDocument,
};
use planwheel_workspace::{
    ChangeScope, ConflictResolution, PendingSnapshot, RemoteDisposition, RemoteEventType,
    RemotePayload, SaveOutcome, StructureKind, SyncCoordinator, SyncOptions, WheelSession,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn item(id: &str, name: &str, start: chrono::NaiveDate, end: chrono::NaiveDate) -> Item {
    Item {
        id: id.to_string(),
        name: name.to_string(),
        ring_id: "ring-1".to_string(),
        activity_group_id: "ag-1".to_string(),
        label_id: None,
        span: DateSpan::new(start, end),
        dependency: None,
    }
}

fn seeded_session() -> WheelSession {
    let mut document = PlanDocument::default();
    document.pages.push(Page {
        id: "page-1".to_string(),
        year: 2025,
        items: Vec::new(),
    });
    WheelSession::new(document, HistoryOptions::default(), SyncOptions::default())
}

#[tokio::test(start_paused = true)]
async fn edit_debounce_save_clean_cycle() {
    init_tracing();
    let mut session = seeded_session();
    let snapshots: Arc<Mutex<Vec<PendingSnapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let snapshots_in_callback = snapshots.clone();
    session.set_save_callback(move |snapshot| {
        let snapshots = snapshots_in_callback.clone();
        async move {
            snapshots.lock().unwrap().push(snapshot);
            Ok(())
        }
    });

    session.add_label(Label {
        id: "label-1".to_string(),
        name: "Milestone".to_string(),
        color: "#999999".to_string(),
        visible: true,
    });
    assert!(session.is_dirty());
    assert!(session.has_unsaved_changes());

    // The debounce fires without further prompting.
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(!session.is_dirty());
    let saved = snapshots.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].labels.added.len(), 1);
    match &saved[0].labels.added[0] {
        EntityPayload::Label(label) => assert_eq!(label.name, "Milestone"),
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn remote_update_mid_edit_becomes_conflict() {
    let mut session = seeded_session();
    session.set_save_callback(|_snapshot| async move { Ok(()) });

    session.add_label(Label {
        id: "label-1".to_string(),
        name: "Local name".to_string(),
        color: "#999999".to_string(),
        visible: true,
    });

    // A collaborator edits the same label while we are dirty.
    let disposition = session.offer_remote_update(
        "labels",
        RemoteEventType::Update,
        RemotePayload {
            new: Some(json!({ "id": "label-1", "name": "Remote name" })),
            old: None,
        },
    );
    assert_eq!(disposition, RemoteDisposition::Queued);

    // Retain the queue in case the user picks the remote side.
    let retained = session.coordinator().queued_remote_updates();

    let outcome = session.save_now().await.unwrap();
    let SaveOutcome::Saved { conflicts } = outcome else {
        panic!("expected a save");
    };
    let conflicts = conflicts.expect("same entity on both sides");
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].source_table, "labels");
    assert_eq!(conflicts[0].entity_id, "label-1");
    assert_eq!(conflicts[0].local_action, ChangeAction::Add);
    assert!(session.has_conflict());

    // User picks the remote version; queued updates replay.
    let mut replayed = Vec::new();
    session
        .coordinator()
        .resolve_conflict(ConflictResolution::Remote, &retained, |update| {
            replayed.push(update.payload.entity_id());
        });
    assert_eq!(replayed, vec![Some("label-1".to_string())]);
    assert!(!session.has_conflict());
}

#[tokio::test(start_paused = true)]
async fn failed_save_retries_on_next_cycle() {
    init_tracing();
    let coordinator = SyncCoordinator::new(SyncOptions::default());
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_in_callback = attempts.clone();
    coordinator.set_save_callback(move |_snapshot| {
        let attempts = attempts_in_callback.clone();
        async move {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("transient persistence failure");
            }
            Ok(())
        }
    });

    coordinator.mark_change(
        ChangeScope::Structure(StructureKind::Labels),
        ChangeAction::Modify,
        "l1",
        None,
    );
    coordinator.schedule_save();
    tokio::time::sleep(Duration::from_millis(600)).await;

    // First attempt failed; everything is still pending.
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(coordinator.is_dirty());
    assert!(coordinator.has_pending_changes());

    // The next edit re-arms the debounce and retries the same delta.
    coordinator.mark_change(
        ChangeScope::Structure(StructureKind::Labels),
        ChangeAction::Modify,
        "l1",
        None,
    );
    coordinator.schedule_save();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(!coordinator.is_dirty());
    assert!(!coordinator.has_pending_changes());
}

#[tokio::test(start_paused = true)]
async fn remote_updates_flow_again_after_grace_window() {
    let mut session = seeded_session();
    session.set_save_callback(|_snapshot| async move { Ok(()) });

    session.set_title("Grace test");
    session.save_now().await.unwrap();

    // Clean, but the save just completed: still blocked.
    assert!(!session.is_dirty());
    assert_eq!(
        session.offer_remote_update("items", RemoteEventType::Insert, RemotePayload::default()),
        RemoteDisposition::Queued
    );

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(
        session.offer_remote_update("items", RemoteEventType::Insert, RemotePayload::default()),
        RemoteDisposition::Apply
    );
}

#[tokio::test(start_paused = true)]
async fn cascaded_date_edit_persists_every_shifted_item() {
    let mut session = seeded_session();
    let snapshots: Arc<Mutex<Vec<PendingSnapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let snapshots_in_callback = snapshots.clone();
    session.set_save_callback(move |snapshot| {
        let snapshots = snapshots_in_callback.clone();
        async move {
            snapshots.lock().unwrap().push(snapshot);
            Ok(())
        }
    });

    let mut predecessor = item("P", "Prep", date(2025, 6, 1), date(2025, 6, 10));
    let mut dependent = item("D", "Launch", date(2025, 6, 12), date(2025, 6, 14));
    dependent.dependency = Some(ItemDependency {
        predecessor_id: "P".to_string(),
        kind: DependencyKind::FinishToStart,
        lag_days: 0,
    });
    session.add_item("page-1", predecessor.clone()).unwrap();
    session.add_item("page-1", dependent).unwrap();
    session.save_now().await.unwrap();

    predecessor.span = DateSpan::new(date(2025, 6, 6), date(2025, 6, 15));
    let shifts = session.update_item_dates("P", predecessor.span).unwrap();
    assert_eq!(shifts.len(), 1);

    session.save_now().await.unwrap();

    let saved = snapshots.lock().unwrap();
    let last = saved.last().expect("second save ran");
    // Both the edited predecessor and the cascaded dependent are in the
    // persisted delta.
    let modified_ids: Vec<&str> = last
        .items
        .modified
        .iter()
        .map(|payload| match payload {
            EntityPayload::Item(i) => i.id.as_str(),
            other => panic!("unexpected payload: {other:?}"),
        })
        .collect();
    assert!(modified_ids.contains(&"P"));
    assert!(modified_ids.contains(&"D"));
}

#[tokio::test(start_paused = true)]
async fn undo_after_save_reports_unsaved_steps() {
    let mut session = seeded_session();
    session.set_save_callback(|_snapshot| async move { Ok(()) });

    session.set_title("One");
    session.set_title("Two");
    session.save_now().await.unwrap();
    assert!(!session.has_unsaved_changes());

    session.undo();
    assert!(session.has_unsaved_changes());
    assert_eq!(session.unsaved_changes_count(), 1);
    assert_eq!(session.document().metadata.title, "One");

    assert!(session.undo_to_save());
    assert!(!session.has_unsaved_changes());
    assert_eq!(session.document().metadata.title, "Two");
}

#[tokio::test(start_paused = true)]
async fn gesture_batch_saves_once_and_marks_saved_index() {
    let mut session = seeded_session();
    session.set_save_callback(|_snapshot| async move { Ok(()) });

    session.begin_gesture(OperationLabel::named(OperationKind::DragItem, "Kickoff"));
    session.set_title("Drag frame 1");
    session.set_title("Drag frame 2");
    session.set_title("Drag frame 3");
    let batch_index = session.end_gesture().expect("the drag changed the document");

    // One history entry for the whole gesture.
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history().current_index(), batch_index);
    assert_eq!(
        session.undo_label().map(|l| l.describe()),
        Some("Change".to_string())
    );

    session.save_now().await.unwrap();
    assert!(!session.has_unsaved_changes());
}

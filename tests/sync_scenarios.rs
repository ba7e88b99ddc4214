use std::sync::Arc;

use boardsync::model::{Collection, Container, ContainerId, ItemId, ItemRef, SyncSettings};
use boardsync::ops::check::check_collection;
use boardsync::sync::{
    CollectionHandle, DragAdapter, DragEndEvent, DragLocation, DragResponse, MemoryRemote,
    NoticeKind, Outcome, RemoteCall, RemoteError, RemoteStore, SyncController, SyncError,
    SyncPhase,
};
use pretty_assertions::assert_eq;

fn todo_done() -> Collection {
    Collection::new("sprint-1")
        .with_container(Container::with_items(
            "todo",
            "To do",
            vec![
                ItemRef::new("T1", "todo", "Write docs").with_field("assignee", serde_json::json!("sam")),
                ItemRef::new("T2", "todo", "Ship it"),
            ],
        ))
        .with_container(Container::new("done", "Done"))
}

/// Mount a board in a handle, driven through an adapter against an
/// in-memory store seeded with the same board.
fn mount(collection: Collection, settings: SyncSettings) -> (DragAdapter, Arc<MemoryRemote>) {
    let remote = Arc::new(MemoryRemote::new(collection.clone()));
    let controller = SyncController::new(CollectionHandle::new(collection), remote.clone(), settings);
    (DragAdapter::new(controller), remote)
}

fn drag(item: &str, from: (&str, usize), to: (&str, usize)) -> DragEndEvent {
    DragEndEvent {
        dragged_item_id: ItemId::new(item),
        source: DragLocation {
            container_id: ContainerId::new(from.0),
            index: from.1,
        },
        destination: Some(DragLocation {
            container_id: ContainerId::new(to.0),
            index: to.1,
        }),
    }
}

fn ids(collection: &Collection, container: &str) -> Vec<String> {
    collection
        .container(&ContainerId::new(container))
        .map(|c| c.items.iter().map(|i| i.id.to_string()).collect())
        .unwrap_or_default()
}

fn orders(collection: &Collection, container: &str) -> Vec<usize> {
    collection
        .container(&ContainerId::new(container))
        .map(|c| c.items.iter().map(|i| i.order).collect())
        .unwrap_or_default()
}

fn dispatched(response: DragResponse) -> tokio::task::JoinHandle<Outcome> {
    match response {
        DragResponse::Dispatched(task) => task,
        other => panic!("expected a dispatched move, got {:?}", other),
    }
}

// ---------------------------------------------------------------------------
// Todo / done walkthrough
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_move_applies_locally_then_commits() {
    let (adapter, remote) = mount(todo_done(), SyncSettings::default());
    let handle = adapter.controller().handle().clone();
    remote.hold();

    let task = dispatched(adapter.on_drag_end(drag("T1", ("todo", 0), ("done", 0))));

    // Visible before the store has answered.
    let local = handle.snapshot();
    assert_eq!(ids(&local, "todo"), vec!["T2"]);
    assert_eq!(orders(&local, "todo"), vec![0]);
    assert_eq!(ids(&local, "done"), vec!["T1"]);
    assert_eq!(orders(&local, "done"), vec![0]);
    assert!(check_collection(&local).valid);
    assert!(!adapter.drag_enabled());

    remote.release();
    assert_eq!(task.await.unwrap(), Outcome::Committed);

    assert_eq!(handle.snapshot(), local);
    assert_eq!(handle.phase(), SyncPhase::Idle);
    assert!(adapter.drag_enabled());
    assert_eq!(remote.collection(), local);
    assert!(handle.take_notices().is_empty());
}

#[tokio::test]
async fn test_move_keeps_domain_fields() {
    let (adapter, _remote) = mount(todo_done(), SyncSettings::default());
    let task = dispatched(adapter.on_drag_end(drag("T1", ("todo", 0), ("done", 0))));
    assert_eq!(task.await.unwrap(), Outcome::Committed);

    let moved = adapter
        .controller()
        .handle()
        .read(|c| c.item(&ItemId::new("T1")).cloned())
        .unwrap();
    assert_eq!(moved.container_id, ContainerId::new("done"));
    assert_eq!(moved.title, "Write docs");
    assert_eq!(moved.fields.get("assignee"), Some(&serde_json::json!("sam")));
}

#[tokio::test]
async fn test_rejected_move_restores_exact_snapshot() {
    let (adapter, remote) = mount(todo_done(), SyncSettings::default());
    let handle = adapter.controller().handle().clone();
    remote.reject_next_move("permission denied");

    let task = dispatched(adapter.on_drag_end(drag("T1", ("todo", 0), ("done", 0))));
    let outcome = task.await.unwrap();

    assert_eq!(
        outcome,
        Outcome::RolledBack {
            error: RemoteError::Rejected("permission denied".to_string())
        }
    );
    assert_eq!(handle.snapshot(), todo_done());
    assert!(adapter.drag_enabled());

    let notices = handle.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Move);
    assert_eq!(notices[0].message, "failed to move T1; reverted");
}

#[tokio::test]
async fn test_second_call_failure_rolls_back_both_containers() {
    let (adapter, remote) = mount(todo_done(), SyncSettings::default());
    let handle = adapter.controller().handle().clone();
    remote.reject_next_reorder("conflict");

    let task = dispatched(adapter.on_drag_end(drag("T2", ("todo", 1), ("done", 0))));
    assert!(matches!(task.await.unwrap(), Outcome::RolledBack { .. }));

    // The move call went through before the reorder was refused.
    let calls = remote.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[0], RemoteCall::MoveItemToContainer { .. }));
    assert!(matches!(calls[1], RemoteCall::ReorderItemsInContainer { .. }));

    assert_eq!(handle.snapshot(), todo_done());
}

#[tokio::test]
async fn test_unanswered_call_times_out_and_rolls_back() {
    let settings = SyncSettings {
        remote_timeout_ms: 50,
    };
    let (adapter, remote) = mount(todo_done(), settings);
    let handle = adapter.controller().handle().clone();
    remote.hang_calls();

    let task = dispatched(adapter.on_drag_end(drag("T1", ("todo", 0), ("done", 0))));
    let outcome = task.await.unwrap();

    assert!(matches!(
        outcome,
        Outcome::RolledBack {
            error: RemoteError::Timeout(_)
        }
    ));
    assert_eq!(handle.snapshot(), todo_done());
    assert_eq!(handle.phase(), SyncPhase::Idle);
}

// ---------------------------------------------------------------------------
// Serialization and isolation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_drag_while_confirming_is_refused() {
    let (adapter, remote) = mount(todo_done(), SyncSettings::default());
    let handle = adapter.controller().handle().clone();
    remote.hold();

    let first = dispatched(adapter.on_drag_end(drag("T1", ("todo", 0), ("done", 0))));
    let after_first = handle.snapshot();

    match adapter.on_drag_end(drag("T2", ("todo", 0), ("done", 1))) {
        DragResponse::Rejected(SyncError::Busy(parent)) => assert_eq!(parent, "sprint-1"),
        other => panic!("expected Busy, got {:?}", other),
    }
    assert_eq!(handle.snapshot(), after_first);

    remote.release();
    assert_eq!(first.await.unwrap(), Outcome::Committed);

    // Dragging is open again once the first move settles.
    let second = dispatched(adapter.on_drag_end(drag("T2", ("todo", 0), ("done", 1))));
    assert_eq!(second.await.unwrap(), Outcome::Committed);
    assert_eq!(ids(&handle.snapshot(), "done"), vec!["T1", "T2"]);
}

#[tokio::test]
async fn test_independent_collections_confirm_concurrently() {
    let other = Collection::new("sprint-2").with_container(Container::with_items(
        "backlog",
        "Backlog",
        vec![
            ItemRef::new("B1", "backlog", "one"),
            ItemRef::new("B2", "backlog", "two"),
            ItemRef::new("B3", "backlog", "three"),
        ],
    ));
    let (a, remote_a) = mount(todo_done(), SyncSettings::default());
    let (b, remote_b) = mount(other, SyncSettings::default());
    remote_a.hold();
    remote_b.hold();

    let task_a = dispatched(a.on_drag_end(drag("T1", ("todo", 0), ("done", 0))));
    let task_b = dispatched(b.on_drag_end(drag("B1", ("backlog", 0), ("backlog", 2))));
    assert!(!a.drag_enabled());
    assert!(!b.drag_enabled());

    remote_b.release();
    assert_eq!(task_b.await.unwrap(), Outcome::Committed);
    assert!(b.drag_enabled());
    assert!(!a.drag_enabled());

    remote_a.release();
    assert_eq!(task_a.await.unwrap(), Outcome::Committed);
    assert_eq!(
        ids(&b.controller().handle().snapshot(), "backlog"),
        vec!["B2", "B3", "B1"]
    );
}

#[tokio::test]
async fn test_reload_while_confirming_discards_late_answer() {
    let (adapter, remote) = mount(todo_done(), SyncSettings::default());
    let handle = adapter.controller().handle().clone();
    remote.hold();

    let task = dispatched(adapter.on_drag_end(drag("T1", ("todo", 0), ("done", 0))));

    let fresh = Collection::new("sprint-1").with_container(Container::new("todo", "To do"));
    handle.replace(fresh.clone());

    remote.release();
    assert_eq!(task.await.unwrap(), Outcome::Discarded);
    assert_eq!(handle.snapshot(), fresh);
    assert!(handle.take_notices().is_empty());
}

#[tokio::test]
async fn test_unmounted_view_ignores_failure() {
    let (adapter, remote) = mount(todo_done(), SyncSettings::default());
    let handle = adapter.controller().handle().clone();
    remote.hold();
    remote.reject_next_move("gone");

    let task = dispatched(adapter.on_drag_end(drag("T1", ("todo", 0), ("done", 0))));
    handle.close();
    remote.release();

    assert_eq!(task.await.unwrap(), Outcome::Discarded);
    assert!(handle.take_notices().is_empty());
    assert!(!adapter.drag_enabled());
}

// ---------------------------------------------------------------------------
// Adapter edge cases
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_drop_outside_and_drop_in_place_do_nothing() {
    let (adapter, remote) = mount(todo_done(), SyncSettings::default());

    let mut outside = drag("T1", ("todo", 0), ("done", 0));
    outside.destination = None;
    assert!(matches!(adapter.on_drag_end(outside), DragResponse::Cancelled));
    assert!(matches!(
        adapter.on_drag_end(drag("T1", ("todo", 0), ("todo", 0))),
        DragResponse::NoOp
    ));
    // Last item dropped past the end stays put.
    assert!(matches!(
        adapter.on_drag_end(drag("T2", ("todo", 1), ("todo", 9))),
        DragResponse::NoOp
    ));

    assert!(remote.calls().is_empty());
    assert_eq!(adapter.controller().handle().snapshot(), todo_done());
}

#[tokio::test]
async fn test_stale_source_index_is_refused() {
    let (adapter, remote) = mount(todo_done(), SyncSettings::default());

    match adapter.on_drag_end(drag("T1", ("todo", 1), ("done", 0))) {
        DragResponse::Rejected(SyncError::Precondition(e)) => {
            assert!(e.to_string().starts_with("item not found in source"));
        }
        other => panic!("expected a precondition error, got {:?}", other),
    }
    assert!(remote.calls().is_empty());
    assert_eq!(adapter.controller().handle().snapshot(), todo_done());
}

#[tokio::test]
async fn test_drag_event_from_library_json() {
    let (adapter, _remote) = mount(todo_done(), SyncSettings::default());
    let event: DragEndEvent = serde_json::from_str(
        r#"{
            "draggedItemId": "T2",
            "source": {"containerId": "todo", "index": 1},
            "destination": {"containerId": "todo", "index": 0}
        }"#,
    )
    .unwrap();

    let task = dispatched(adapter.on_drag_end(event));
    assert_eq!(task.await.unwrap(), Outcome::Committed);
    assert_eq!(
        ids(&adapter.controller().handle().snapshot(), "todo"),
        vec!["T2", "T1"]
    );
}

#[tokio::test]
async fn test_reload_pulls_authoritative_state() {
    let (adapter, remote) = mount(todo_done(), SyncSettings::default());
    let controller = adapter.controller();

    // Another client moved T2 directly on the store.
    remote
        .move_item_to_container(&ItemId::new("T2"), &ContainerId::new("done"), 0)
        .await
        .unwrap();

    controller.reload().await.unwrap();
    assert_eq!(controller.handle().snapshot(), remote.collection());
    assert_eq!(ids(&controller.handle().snapshot(), "done"), vec!["T2"]);
}

#[tokio::test]
async fn test_drag_during_reload_is_refused() {
    let (adapter, remote) = mount(todo_done(), SyncSettings::default());
    let controller = adapter.controller().clone();
    remote.hold();

    let reload = tokio::spawn({
        let controller = controller.clone();
        async move { controller.reload().await }
    });
    tokio::task::yield_now().await;
    assert_eq!(controller.handle().phase(), SyncPhase::Reloading);
    assert!(!adapter.drag_enabled());

    match adapter.on_drag_end(drag("T1", ("todo", 0), ("done", 0))) {
        DragResponse::Rejected(SyncError::Busy(parent)) => assert_eq!(parent, "sprint-1"),
        other => panic!("expected Busy, got {:?}", other),
    }
    assert_eq!(controller.handle().snapshot(), todo_done());
    assert!(remote.calls().is_empty());

    remote.release();
    reload.await.unwrap().unwrap();
    assert!(adapter.drag_enabled());
    assert_eq!(controller.handle().snapshot(), remote.collection());
}

// ---------------------------------------------------------------------------
// Abandoned confirmations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_aborted_confirmation_rolls_back() {
    let (adapter, remote) = mount(todo_done(), SyncSettings::default());
    let handle = adapter.controller().handle().clone();
    remote.hold();

    let task = dispatched(adapter.on_drag_end(drag("T1", ("todo", 0), ("done", 0))));
    tokio::task::yield_now().await;
    assert_eq!(handle.phase(), SyncPhase::Confirming);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    remote.release();

    assert_eq!(handle.phase(), SyncPhase::Idle);
    assert!(adapter.drag_enabled());
    assert_eq!(handle.snapshot(), todo_done());
    let notices = handle.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Move);

    // The board is usable again.
    let retry = dispatched(adapter.on_drag_end(drag("T1", ("todo", 0), ("done", 0))));
    assert_eq!(retry.await.unwrap(), Outcome::Committed);
    assert_eq!(ids(&handle.snapshot(), "done"), vec!["T1"]);
}

// ---------------------------------------------------------------------------
// Boards written without order values
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_board_without_orders_accepts_moves() {
    let board: Collection = serde_json::from_str(
        r#"{"parent_id":"sprint-1","containers":[
            {"id":"a","title":"A","items":[{"id":"X","container_id":"a"},{"id":"Y","container_id":"a"}]},
            {"id":"b","title":"B","items":[{"id":"P","container_id":"b"}]},
            {"id":"c","title":"C"}
        ]}"#,
    )
    .unwrap();
    let (adapter, _remote) = mount(board, SyncSettings::default());
    let handle = adapter.controller().handle().clone();
    assert_eq!(orders(&handle.snapshot(), "a"), vec![0, 1]);

    let task = dispatched(adapter.on_drag_end(drag("P", ("b", 0), ("c", 0))));
    assert_eq!(task.await.unwrap(), Outcome::Committed);
    assert_eq!(ids(&handle.snapshot(), "c"), vec!["P"]);
    assert!(check_collection(&handle.snapshot()).valid);
}

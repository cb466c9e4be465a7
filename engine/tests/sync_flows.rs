//! Reconciliation flows against the in-process remote.

use rust_decimal::Decimal;
use std::sync::Arc;
use tally_engine::{
    ClientDraft, CollectionName, Engine, FileBackend, LocalStore, MemoryBackend, MemoryRemote,
    ProductDraft, RemoteCollections, SyncMode, UpwardSync,
};

fn engine() -> Engine<MemoryBackend> {
    Engine::open(LocalStore::new(MemoryBackend::new()))
}

#[tokio::test]
async fn upward_sync_ids_converge_after_live_update() {
    let mut engine = engine();
    let local = engine
        .clients()
        .upsert(ClientDraft::new("Ana", "1"))
        .unwrap();

    let remote = MemoryRemote::new();
    engine.attach(Arc::new(remote.clone())).await;

    // Memory still carries the local id until the feed is applied.
    assert!(engine.state().client(&local.id).is_some());

    engine.pump().unwrap();
    let clients = engine.state().clients.as_slice();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].name, "Ana");
    assert_ne!(clients[0].id, local.id);
    assert_eq!(clients[0].id, remote.documents(CollectionName::Clients)[0].id);
}

#[tokio::test]
async fn upward_sync_failures_are_per_record() {
    let mut engine = engine();
    engine
        .products()
        .upsert(ProductDraft::new("A", Decimal::ONE))
        .unwrap();
    engine
        .products()
        .upsert(ProductDraft::new("B", Decimal::TWO))
        .unwrap();

    let remote = MemoryRemote::new();
    remote.fail_writes(true);
    let report = engine.attach(Arc::new(remote.clone())).await;

    assert_eq!(
        report.outcome(CollectionName::Products),
        Some(&UpwardSync::Pushed {
            added: 0,
            failed: 2
        })
    );
    assert_eq!(remote.add_count(CollectionName::Products), 2);
    assert_eq!(engine.state().products.len(), 2);
}

#[tokio::test]
async fn listing_failure_skips_upward_sync() {
    let mut engine = engine();
    engine
        .products()
        .upsert(ProductDraft::new("A", Decimal::ONE))
        .unwrap();

    let remote = MemoryRemote::new();
    remote.fail_listing(true);
    let report = engine.attach(Arc::new(remote.clone())).await;

    assert_eq!(
        report.outcome(CollectionName::Products),
        Some(&UpwardSync::ListFailed)
    );
    assert_eq!(remote.add_count(CollectionName::Products), 0);
    assert_eq!(engine.mode(), SyncMode::RemoteAttached);
}

#[tokio::test]
async fn subscribe_failure_still_attaches() {
    let mut engine = engine();
    let remote = MemoryRemote::new();
    remote.fail_subscribe(true);

    let report = engine.attach(Arc::new(remote.clone())).await;
    assert!(report.subscribed.is_empty());
    assert_eq!(engine.mode(), SyncMode::RemoteAttached);

    engine
        .products()
        .upsert(ProductDraft::new("A", Decimal::ONE))
        .unwrap();
    engine.settle().await;
    assert_eq!(remote.documents(CollectionName::Products).len(), 1);
}

#[tokio::test]
async fn live_updates_from_another_writer() {
    let mut engine = engine();
    let remote = MemoryRemote::new();
    engine.attach(Arc::new(remote.clone())).await;
    engine.pump().unwrap();

    let other: Arc<dyn RemoteCollections> = Arc::new(remote.clone());
    let mut fields = tally_engine::Fields::new();
    fields.insert("name".into(), "Bea".into());
    other
        .set(CollectionName::Clients, "cli_other", fields)
        .await
        .unwrap();

    let changed = engine.process_next().await.unwrap();
    assert_eq!(changed, Some(CollectionName::Clients));
    assert_eq!(engine.state().client("cli_other").unwrap().name, "Bea");
    assert_eq!(engine.local().load_all().clients.len(), 1);
}

#[tokio::test]
async fn stale_echo_overwrites_newer_local_edit() {
    let mut engine = engine();
    let remote = MemoryRemote::new();
    engine.attach(Arc::new(remote.clone())).await;
    engine.pump().unwrap();

    let first = engine
        .clients()
        .upsert(ClientDraft::new("Ana", "1"))
        .unwrap();
    engine.settle().await;

    // Edit locally while the remote is refusing writes; the queued echo of
    // the first write still wins once applied.
    remote.fail_writes(true);
    let mut edit = ClientDraft::from(&first);
    edit.name = "Ana Maria".into();
    engine.clients().upsert(edit).unwrap();
    engine.settle().await;

    engine.pump().unwrap();
    assert_eq!(engine.state().client(&first.id).unwrap().name, "Ana");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn successive_edits_reach_remote_in_order() {
    for _ in 0..200 {
        let mut engine = engine();
        let remote = MemoryRemote::new();
        engine.attach(Arc::new(remote.clone())).await;

        for version in 0..8 {
            engine
                .clients()
                .upsert(ClientDraft::new(format!("v{version}"), "").with_id("cli_1"))
                .unwrap();
        }
        engine.settle().await;
        assert_eq!(engine.pending_writes(), 0);

        let stored = remote.documents(CollectionName::Clients);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].fields["name"], "v7");

        // Every echo, applied in delivery order, ends on the latest edit.
        engine.pump().unwrap();
        assert_eq!(engine.state().client("cli_1").unwrap().name, "v7");
        assert_eq!(engine.local().load_all().client("cli_1").unwrap().name, "v7");
    }
}

#[tokio::test]
async fn file_backed_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let backend = FileBackend::open(dir.path()).unwrap();
        let mut engine = Engine::open(LocalStore::new(backend));
        engine
            .clients()
            .upsert(ClientDraft::new("Ana", "555").with_id("cli_1"))
            .unwrap();
    }

    let backend = FileBackend::open(dir.path()).unwrap();
    let engine = Engine::open(LocalStore::new(backend));
    assert_eq!(engine.state().client("cli_1").unwrap().phone, "555");
}

#[tokio::test]
async fn detach_discards_queued_updates() {
    let mut engine = engine();
    engine
        .products()
        .upsert(ProductDraft::new("Keep", Decimal::ONE))
        .unwrap();

    let remote = MemoryRemote::new();
    remote.fail_listing(true);
    engine.attach(Arc::new(remote.clone())).await;
    engine.detach();

    assert!(engine.pump().unwrap().is_empty());
    assert_eq!(engine.state().products.len(), 1);
}

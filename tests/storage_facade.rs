/// Integration tests for the storage facade and the per-player adapter.
mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{memory_facade, DB};
use mobboard::storage::{Document, Outcome, PlayerStorage, StorageFacade, StoreError, Value};
use mobboard::tracker::{initialize_player_data, PlayerIdentity};
use tempfile::tempdir;
use uuid::Uuid;

#[tokio::test]
async fn read_after_write_returns_written_value() {
    let facade = memory_facade().await;
    let (_, storage) = common::seed_player(&facade, "Steve", 0).await;

    let cases = [
        ("kills", Value::Integer(42)),
        ("pendingRewardMaterial", Value::from("GOLD_INGOT")),
        ("banned", Value::Boolean(false)),
        ("stats", Value::Document(Document::new().with("deaths", 3i64))),
    ];
    for (field, value) in cases {
        assert!(storage
            .set_field_value("playerdata", field, value.clone())
            .await
            .is_found());
        match storage.get_field_value("playerdata", field).await {
            Outcome::Found(read) => assert_eq!(read, value, "field {field}"),
            other => panic!("expected {field} to be found, got {other:?}"),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn exists_false_until_insert_completes() {
    let facade = memory_facade().await;
    let storage = PlayerStorage::new(facade.clone(), DB, Uuid::new_v4());
    assert!(storage.provision().await.is_found());

    let probe = storage.clone();
    let before = tokio::task::spawn_blocking(move || probe.exists("playerdata"))
        .await
        .unwrap();
    assert!(!before);

    assert!(storage
        .insert_document(Document::of_type("playerdata").with("kills", 0i64))
        .await
        .is_found());

    let probe = storage.clone();
    let after = tokio::task::spawn_blocking(move || probe.exists("playerdata"))
        .await
        .unwrap();
    assert!(after);
    assert!(!storage.exists("mobdata"));
}

#[tokio::test]
async fn exists_is_false_for_unprovisioned_player() {
    let facade = memory_facade().await;
    let storage = PlayerStorage::new(facade, DB, Uuid::new_v4());
    assert!(!storage.exists("playerdata"));
}

#[tokio::test]
async fn missing_containers_are_misses_not_faults() {
    let facade = memory_facade().await;

    let insert = facade
        .insert_document("no-such-db", "c", Document::of_type("playerdata"))
        .await;
    assert!(matches!(insert, Outcome::NotFound(StoreError::DatabaseNotFound(_))));

    let insert = facade
        .insert_document(DB, "no-such-collection", Document::of_type("playerdata"))
        .await;
    assert!(matches!(insert, Outcome::NotFound(StoreError::CollectionNotFound { .. })));

    let get = facade
        .get_field_value(DB, "no-such-collection", "type", "playerdata", "kills")
        .await;
    assert!(get.is_not_found());

    let set = facade
        .set_field_value(DB, "no-such-collection", "type", "playerdata", "kills", 1i64)
        .await;
    assert!(set.is_not_found());

    // the failed insert did not create the collection
    let names = facade.list_collection_names(DB).await.found().unwrap();
    assert!(names.is_empty());
}

#[tokio::test]
async fn get_without_matching_document_is_document_miss() {
    let facade = memory_facade().await;
    let (_, storage) = common::seed_player(&facade, "Alex", 0).await;
    let outcome = storage.get_field_value("mobdata", "kills").await;
    assert!(matches!(outcome, Outcome::NotFound(StoreError::DocumentNotFound { .. })));
}

#[tokio::test]
async fn set_without_match_is_a_no_op() {
    let facade = memory_facade().await;
    let (_, storage) = common::seed_player(&facade, "Alex", 0).await;
    let outcome = storage.set_field_value("mobdata", "kills", 9i64).await;
    assert!(matches!(outcome, Outcome::Found(false)));
    assert!(matches!(
        storage.get_field_value("playerdata", "kills").await,
        Outcome::Found(Value::Integer(0))
    ));
}

#[tokio::test]
async fn find_returns_empty_cursor_when_nothing_matches() {
    let facade = memory_facade().await;
    let (_, storage) = common::seed_player(&facade, "Alex", 0).await;

    let mut cursor = storage.find_documents("type", "mobdata").await.found().unwrap();
    assert!(cursor.next().is_none());
    // single pass: stays exhausted
    assert!(cursor.next().is_none());

    let docs = storage
        .find_documents("name", "Alex")
        .await
        .found()
        .unwrap()
        .collect_documents()
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get_str("type"), Some("playerdata"));
}

#[tokio::test]
async fn initialize_player_data_is_idempotent() {
    let facade = memory_facade().await;
    let player = PlayerIdentity::new(Uuid::new_v4(), "Steve");
    let storage = PlayerStorage::new(facade.clone(), DB, player.uuid);

    assert!(initialize_player_data(&storage, &player).await.unwrap());
    assert!(!initialize_player_data(&storage, &player).await.unwrap());

    let docs = storage
        .find_documents("type", "playerdata")
        .await
        .found()
        .unwrap()
        .collect_documents()
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].get_str("uuid"), Some(player.uuid.to_string().as_str()));
}

#[tokio::test]
async fn operations_after_close_fault() {
    let facade = memory_facade().await;
    let (_, storage) = common::seed_player(&facade, "Alex", 0).await;

    facade.close().await.unwrap();
    facade.close().await.unwrap();

    let outcome = storage.get_field_value("playerdata", "kills").await;
    assert!(matches!(outcome, Outcome::Fault(StoreError::Closed)));
    assert!(matches!(
        initialize_player_data(&storage, &PlayerIdentity::new(Uuid::new_v4(), "x")).await,
        Err(StoreError::Closed)
    ));
}

#[tokio::test]
async fn data_survives_reopen() {
    let dir = tempdir().unwrap();
    let conn = format!("sled://{}", dir.path().join("store").display());
    let uuid = Uuid::new_v4();

    {
        let facade = StorageFacade::connect(&conn).unwrap();
        assert!(facade.ensure_database(DB).await.is_found());
        let player = PlayerIdentity::new(uuid, "Steve");
        let storage = PlayerStorage::new(facade.clone(), DB, uuid);
        initialize_player_data(&storage, &player).await.unwrap();
        assert!(storage.set_field_value("playerdata", "kills", 5i64).await.is_found());
        facade.close().await.unwrap();
    }

    let facade = StorageFacade::connect(&conn).unwrap();
    let storage = PlayerStorage::new(facade, DB, uuid);
    assert!(matches!(
        storage.get_field_value("playerdata", "kills").await,
        Outcome::Found(Value::Integer(5))
    ));
}

#[test]
fn facade_calls_can_be_driven_from_sync_code() {
    let facade = StorageFacade::connect("memory://").unwrap();
    let outcome = tokio_test::block_on(facade.list_collection_names("never-created"));
    assert!(matches!(outcome, Outcome::NotFound(StoreError::DatabaseNotFound(_))));
}

#[test]
fn concurrent_writes_to_distinct_fields_all_survive() {
    const WRITERS: usize = 8;
    const ROUNDS: usize = 50;

    let facade = StorageFacade::connect("memory://").unwrap();
    let client = Arc::clone(facade.client());
    client.create_database(DB).unwrap();
    let selector = Value::from("playerdata");

    for round in 0..ROUNDS {
        let collection = format!("player-{round}");
        client.create_collection(DB, &collection).unwrap();
        client
            .insert(DB, &collection, &Document::of_type("playerdata"))
            .unwrap();

        let barrier = Arc::new(Barrier::new(WRITERS));
        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let client = Arc::clone(&client);
                let barrier = Arc::clone(&barrier);
                let collection = collection.clone();
                let selector = selector.clone();
                thread::spawn(move || {
                    barrier.wait();
                    client
                        .update_field(DB, &collection, "type", &selector, &format!("f{i}"), &Value::Integer(1))
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let doc = client.find_first(DB, &collection, "type", &selector).unwrap();
        for i in 0..WRITERS {
            assert_eq!(doc.get_integer(&format!("f{i}")), Some(1), "round {round} lost f{i}");
        }
    }
}

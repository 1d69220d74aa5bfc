mod common;

use common::{AGENTS, Behavior, FlakyStore, ScriptedTransport, notifier, put, temp_db};
use herald::NotificationMessage;
use herald::store::DocumentStore;
use serde_json::json;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

const NOT_REGISTERED: &str = "messaging/registration-token-not-registered";
const INVALID_TOKEN: &str = "messaging/invalid-registration-token";
const UNAVAILABLE: &str = "messaging/server-unavailable";

fn message() -> NotificationMessage {
    NotificationMessage::new("Listing Live!", "Your listing for Skyline is now live P-1.")
        .with_data("event", "listing_published")
}

#[tokio::test]
async fn mixed_outcomes_prune_only_dead_list_tokens() {
    let db = temp_db("notifier-mixed").await;
    put(
        &db.store,
        AGENTS,
        "CP1",
        json!({ "fsmToken": ["ok-1", "gone", "flaky", "ok-2", "bad", "gone"] }),
    )
    .await;

    let transport = ScriptedTransport::new();
    transport.on("gone", Behavior::Reject(NOT_REGISTERED));
    transport.on("bad", Behavior::Reject(INVALID_TOKEN));
    transport.on("flaky", Behavior::Reject(UNAVAILABLE));

    let outcome = notifier(&db.store, &transport).deliver("CP1", message()).await;

    assert!(outcome.success);
    assert!(outcome.agent_found);
    assert_eq!(outcome.sent, 2);
    assert_eq!(outcome.total, 6);
    assert_eq!(outcome.removed, 3);
    assert_eq!(transport.sent().len(), 6);

    let agent = db.store.get(AGENTS, "CP1").await.unwrap().unwrap();
    assert_eq!(agent.get("fsmToken"), Some(&json!(["ok-1", "flaky", "ok-2"])));
}

#[tokio::test]
async fn dead_scalar_token_deletes_field() {
    let db = temp_db("notifier-scalar").await;
    put(&db.store, AGENTS, "CP1", json!({ "name": "Riya", "fsmToken": "only" })).await;

    let transport = ScriptedTransport::new();
    transport.on("only", Behavior::Reject(NOT_REGISTERED));

    let outcome = notifier(&db.store, &transport).deliver("CP1", message()).await;

    assert!(!outcome.success);
    assert_eq!((outcome.sent, outcome.total, outcome.removed), (0, 1, 1));

    let agent = db.store.get(AGENTS, "CP1").await.unwrap().unwrap();
    assert!(!agent.fields.contains_key("fsmToken"));
    assert_eq!(agent.get("name"), Some(&json!("Riya")));
}

#[tokio::test]
async fn missing_agent_attempts_nothing() {
    let db = temp_db("notifier-missing").await;
    let transport = ScriptedTransport::new();

    let outcome = notifier(&db.store, &transport).deliver("ghost", message()).await;

    assert!(!outcome.success);
    assert!(!outcome.agent_found);
    assert_eq!(outcome.total, 0);
    assert!(outcome.message.is_some());
    assert!(transport.sent().is_empty());
    assert!(db.store.get(AGENTS, "ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn agent_without_tokens_is_a_found_failure() {
    let db = temp_db("notifier-empty").await;
    put(&db.store, AGENTS, "CP1", json!({ "fsmToken": null })).await;
    put(&db.store, AGENTS, "CP2", json!({ "fsmToken": [] })).await;

    let transport = ScriptedTransport::new();
    let n = notifier(&db.store, &transport);

    for key in ["CP1", "CP2"] {
        let outcome = n.deliver(key, message()).await;
        assert!(!outcome.success);
        assert!(outcome.agent_found);
        assert_eq!((outcome.sent, outcome.total), (0, 0));
    }
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn hung_send_times_out_and_keeps_token() {
    let db = temp_db("notifier-timeout").await;
    put(&db.store, AGENTS, "CP1", json!({ "fsmToken": ["slow", "fast"] })).await;

    let transport = ScriptedTransport::new();
    transport.on("slow", Behavior::Hang);

    let started = Instant::now();
    let outcome = notifier(&db.store, &transport).deliver("CP1", message()).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(outcome.success);
    assert_eq!((outcome.sent, outcome.total, outcome.removed), (1, 2, 0));

    let agent = db.store.get(AGENTS, "CP1").await.unwrap().unwrap();
    assert_eq!(agent.get("fsmToken"), Some(&json!(["slow", "fast"])));
}

#[tokio::test]
async fn payload_reaches_transport() {
    let db = temp_db("notifier-payload").await;
    put(&db.store, AGENTS, "CP1", json!({ "fsmToken": "t1" })).await;

    let transport = ScriptedTransport::new();
    notifier(&db.store, &transport)
        .deliver("CP1", NotificationMessage::new("t", "b"))
        .await;
    notifier(&db.store, &transport).deliver("CP1", message()).await;

    let sent = transport.sent_to("t1");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].data, None);
    assert_eq!(
        sent[1]
            .data
            .as_ref()
            .and_then(|d| d.get("event"))
            .map(String::as_str),
        Some("listing_published")
    );
}

#[tokio::test]
async fn pacing_wait_does_not_count_against_send_timeout() {
    let db = temp_db("notifier-pacing").await;
    put(&db.store, AGENTS, "CP1", json!({ "fsmToken": ["t1", "t2", "t3"] })).await;

    // Longer than the 200ms send timeout used by `notifier`.
    let transport = ScriptedTransport::new();
    transport.pace(Duration::from_millis(350));

    let outcome = notifier(&db.store, &transport).deliver("CP1", message()).await;

    assert!(outcome.success);
    assert_eq!((outcome.sent, outcome.total, outcome.removed), (3, 3, 0));
    assert_eq!(outcome.error, None);
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test]
async fn store_failure_on_agent_fetch_becomes_failed_outcome() {
    let db = temp_db("notifier-fetch-fail").await;
    put(&db.store, AGENTS, "CP1", json!({ "fsmToken": ["t1"] })).await;

    let flaky = FlakyStore::new(&db.store);
    flaky.fail_get(true);
    let store: Arc<dyn DocumentStore> = flaky.clone();
    let transport = ScriptedTransport::new();

    let outcome = notifier(&store, &transport).deliver("CP1", message()).await;

    assert!(!outcome.success);
    assert!(!outcome.agent_found);
    assert_eq!((outcome.sent, outcome.total, outcome.removed), (0, 0, 0));
    let error = outcome.error.expect("error is reported");
    assert!(error.contains("store offline"), "got {error}");
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn failed_prune_is_not_counted_and_delivery_continues() {
    let db = temp_db("notifier-prune-fail").await;
    put(
        &db.store,
        AGENTS,
        "CP1",
        json!({ "fsmToken": ["gone", "ok-1", "ok-2"] }),
    )
    .await;

    let flaky = FlakyStore::new(&db.store);
    flaky.fail_update(true);
    let store: Arc<dyn DocumentStore> = flaky.clone();
    let transport = ScriptedTransport::new();
    transport.on("gone", Behavior::Reject(NOT_REGISTERED));

    let outcome = notifier(&store, &transport).deliver("CP1", message()).await;

    assert!(outcome.success);
    assert_eq!((outcome.sent, outcome.total, outcome.removed), (2, 3, 0));
    assert_eq!(transport.sent().len(), 3);

    let agent = db.store.get(AGENTS, "CP1").await.unwrap().unwrap();
    assert_eq!(agent.get("fsmToken"), Some(&json!(["gone", "ok-1", "ok-2"])));
}

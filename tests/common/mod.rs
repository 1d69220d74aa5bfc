#![allow(dead_code)]

use async_trait::async_trait;
use herald::error::{HeraldError, PushError};
use herald::notify::MulticastNotifier;
use herald::push::{PushMessage, PushTransport};
use herald::store::{self, BatchWrite, Document, DocumentStore, FieldOp, Query};
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

pub const AGENTS: &str = "agents";
pub const LISTINGS: &str = "ACN123";
pub const QC: &str = "QC_Inventories";
pub const ENQUIRIES: &str = "enquiries";

/// Throw-away SQLite file; removed on drop.
pub struct TempDb {
    pub path: PathBuf,
    pub store: Arc<dyn DocumentStore>,
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

pub async fn temp_db(label: &str) -> TempDb {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut path = std::env::temp_dir();
    path.push(format!(
        "herald-{label}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    let database_url = format!("sqlite:{}", path.display());
    let handle = store::spawn(&database_url).await.expect("spawn store");
    TempDb {
        path,
        store: Arc::new(handle),
    }
}

pub fn fields(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        other => panic!("expected object, got {other}"),
    }
}

pub async fn put(store: &Arc<dyn DocumentStore>, collection: &str, id: &str, v: Value) {
    store
        .set(collection, id, fields(v))
        .await
        .expect("seed document");
}

#[derive(Debug, Clone)]
pub enum Behavior {
    Accept,
    Reject(&'static str),
    Hang,
}

/// Push transport whose answer is scripted per token. Unscripted tokens are accepted.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<HashMap<String, Behavior>>,
    sent: Mutex<Vec<PushMessage>>,
    pacing: Mutex<Option<Duration>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(&self, token: &str, behavior: Behavior) {
        self.script
            .lock()
            .unwrap()
            .insert(token.to_string(), behavior);
    }

    /// Makes every `ready()` wait this long before a send may start.
    pub fn pace(&self, wait: Duration) {
        *self.pacing.lock().unwrap() = Some(wait);
    }

    /// Every message the transport was asked to send, in call order.
    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, token: &str) -> Vec<PushMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.token == token)
            .collect()
    }
}

#[async_trait]
impl PushTransport for ScriptedTransport {
    async fn ready(&self) {
        let wait = *self.pacing.lock().unwrap();
        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }
    }

    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        self.sent.lock().unwrap().push(message.clone());
        let behavior = self
            .script
            .lock()
            .unwrap()
            .get(&message.token)
            .cloned()
            .unwrap_or(Behavior::Accept);
        match behavior {
            Behavior::Accept => Ok(format!("projects/test/messages/{}", message.token)),
            Behavior::Reject(code) => Err(PushError::rejected(code, "scripted failure")),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("late".to_string())
            }
        }
    }
}

pub fn notifier(
    store: &Arc<dyn DocumentStore>,
    transport: &Arc<ScriptedTransport>,
) -> MulticastNotifier {
    let transport: Arc<dyn PushTransport> = transport.clone();
    MulticastNotifier::new(store.clone(), transport, AGENTS)
        .with_send_timeout(Duration::from_millis(200))
}

/// Wraps a real store and fails `get` or `update` on demand.
pub struct FlakyStore {
    inner: Arc<dyn DocumentStore>,
    fail_get: AtomicBool,
    fail_update: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: &Arc<dyn DocumentStore>) -> Arc<Self> {
        Arc::new(Self {
            inner: inner.clone(),
            fail_get: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
        })
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, HeraldError> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(HeraldError::UnexpectedError("store offline".to_string()));
        }
        self.inner.get(collection, id).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), HeraldError> {
        self.inner.set(collection, id, fields).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        ops: Vec<FieldOp>,
    ) -> Result<Document, HeraldError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(HeraldError::UnexpectedError("store offline".to_string()));
        }
        self.inner.update(collection, id, ops).await
    }

    async fn query(&self, collection: &str, query: Query) -> Result<Vec<Document>, HeraldError> {
        self.inner.query(collection, query).await
    }

    async fn batch_write(
        &self,
        collection: &str,
        writes: Vec<BatchWrite>,
    ) -> Result<(), HeraldError> {
        self.inner.batch_write(collection, writes).await
    }
}

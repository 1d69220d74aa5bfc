use super::{
    BatchWrite, Document, DocumentStore, FieldOp, FilterOp, MAX_BATCH_WRITES, Query,
    schema::SQLITE_INIT,
};
use crate::error::HeraldError;
use async_trait::async_trait;
use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::{str::FromStr, time::Duration};
use tracing::{debug, info};

#[derive(Debug)]
pub enum DbActorMessage {
    /// Fetch one document by (collection, id).
    Get(String, String, RpcReplyPort<Result<Option<Document>, HeraldError>>),

    /// Create or replace one document.
    Set(
        String,
        String,
        Map<String, Value>,
        RpcReplyPort<Result<(), HeraldError>>,
    ),

    /// Apply field operations to an existing document.
    Update(
        String,
        String,
        Vec<FieldOp>,
        RpcReplyPort<Result<Document, HeraldError>>,
    ),

    /// Filtered, id-ordered query with an optional cursor.
    Query(String, Query, RpcReplyPort<Result<Vec<Document>, HeraldError>>),

    /// Merge several documents in one transaction.
    BatchWrite(String, Vec<BatchWrite>, RpcReplyPort<Result<(), HeraldError>>),
}

/// Cloneable handle to the SQLite document store actor.
#[derive(Clone)]
pub struct DbActorHandle {
    actor: ActorRef<DbActorMessage>,
}

#[async_trait]
impl DocumentStore for DbActorHandle {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, HeraldError> {
        ractor::call!(
            self.actor,
            DbActorMessage::Get,
            collection.to_string(),
            id.to_string()
        )
        .map_err(|e| HeraldError::RactorError(format!("DbActor Get RPC failed: {e}")))?
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), HeraldError> {
        ractor::call!(
            self.actor,
            DbActorMessage::Set,
            collection.to_string(),
            id.to_string(),
            fields
        )
        .map_err(|e| HeraldError::RactorError(format!("DbActor Set RPC failed: {e}")))?
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        ops: Vec<FieldOp>,
    ) -> Result<Document, HeraldError> {
        ractor::call!(
            self.actor,
            DbActorMessage::Update,
            collection.to_string(),
            id.to_string(),
            ops
        )
        .map_err(|e| HeraldError::RactorError(format!("DbActor Update RPC failed: {e}")))?
    }

    async fn query(&self, collection: &str, query: Query) -> Result<Vec<Document>, HeraldError> {
        ractor::call!(
            self.actor,
            DbActorMessage::Query,
            collection.to_string(),
            query
        )
        .map_err(|e| HeraldError::RactorError(format!("DbActor Query RPC failed: {e}")))?
    }

    async fn batch_write(
        &self,
        collection: &str,
        writes: Vec<BatchWrite>,
    ) -> Result<(), HeraldError> {
        ractor::call!(
            self.actor,
            DbActorMessage::BatchWrite,
            collection.to_string(),
            writes
        )
        .map_err(|e| HeraldError::RactorError(format!("DbActor BatchWrite RPC failed: {e}")))?
    }
}

struct DbActorState {
    pool: SqlitePool,
}

struct DbActor;

#[ractor::async_trait]
impl Actor for DbActor {
    type Msg = DbActorMessage;
    type State = DbActorState;
    type Arguments = String;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        database_url: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let connect_opts = SqliteConnectOptions::from_str(database_url.as_str())
            .map_err(|e| ActorProcessingErr::from(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_opts)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db connect failed: {e}")))?;

        apply_schema(&pool)
            .await
            .map_err(|e| ActorProcessingErr::from(format!("db schema init failed: {e}")))?;

        info!("DbActor initialized");
        Ok(DbActorState { pool })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            DbActorMessage::Get(collection, id, reply) => {
                let res = get_document(&state.pool, &collection, &id).await;
                let _ = reply.send(res);
            }
            DbActorMessage::Set(collection, id, fields, reply) => {
                let res = set_document(&state.pool, &collection, &id, &fields).await;
                let _ = reply.send(res);
            }
            DbActorMessage::Update(collection, id, ops, reply) => {
                let res = update_document(&state.pool, &collection, &id, &ops).await;
                let _ = reply.send(res);
            }
            DbActorMessage::Query(collection, query, reply) => {
                let res = query_documents(&state.pool, &collection, query).await;
                let _ = reply.send(res);
            }
            DbActorMessage::BatchWrite(collection, writes, reply) => {
                let res = batch_write(&state.pool, &collection, writes).await;
                let _ = reply.send(res);
            }
        }
        Ok(())
    }
}

async fn get_document(
    pool: &SqlitePool,
    collection: &str,
    id: &str,
) -> Result<Option<Document>, HeraldError> {
    let body: Option<String> =
        sqlx::query_scalar("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(pool)
            .await?;

    body.map(|b| decode_row(id.to_string(), &b)).transpose()
}

async fn set_document(
    pool: &SqlitePool,
    collection: &str,
    id: &str,
    fields: &Map<String, Value>,
) -> Result<(), HeraldError> {
    let mut conn = pool.acquire().await?;
    upsert(&mut conn, collection, id, fields).await
}

async fn update_document(
    pool: &SqlitePool,
    collection: &str,
    id: &str,
    ops: &[FieldOp],
) -> Result<Document, HeraldError> {
    let mut tx = pool.begin().await?;

    let body: Option<String> =
        sqlx::query_scalar("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(body) = body else {
        return Err(HeraldError::not_found(collection, id));
    };

    let mut fields = decode_row(id.to_string(), &body)?.fields;
    for op in ops {
        op.apply(&mut fields)?;
    }
    upsert(&mut tx, collection, id, &fields).await?;
    tx.commit().await?;

    debug!(collection, id, ops = ops.len(), "Document updated");
    Ok(Document {
        id: id.to_string(),
        fields,
    })
}

async fn query_documents(
    pool: &SqlitePool,
    collection: &str,
    query: Query,
) -> Result<Vec<Document>, HeraldError> {
    let mut qb: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("SELECT id, body FROM documents WHERE collection = ");
    qb.push_bind(collection.to_string());

    for filter in query.filters {
        qb.push(" AND json_extract(body, ");
        qb.push_bind(json_path(&filter.field));
        qb.push(")");
        match filter.value {
            Value::Null if filter.op == FilterOp::Eq => {
                qb.push(" IS NULL");
            }
            Value::Null | Value::Array(_) | Value::Object(_) => {
                return Err(HeraldError::InvalidRequest(format!(
                    "unsupported filter on {}: {:?} {}",
                    filter.field, filter.op, filter.value
                )));
            }
            Value::String(s) => {
                qb.push(format!(" {} ", filter.op.as_sql()));
                qb.push_bind(s);
            }
            Value::Bool(b) => {
                qb.push(format!(" {} ", filter.op.as_sql()));
                qb.push_bind(b);
            }
            Value::Number(n) => {
                qb.push(format!(" {} ", filter.op.as_sql()));
                if let Some(i) = n.as_i64() {
                    qb.push_bind(i);
                } else {
                    qb.push_bind(n.as_f64().unwrap_or(f64::NAN));
                }
            }
        }
    }

    if let Some(cursor) = query.start_after {
        qb.push(" AND id > ");
        qb.push_bind(cursor);
    }
    qb.push(" ORDER BY id");
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ");
        qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }

    let rows: Vec<(String, String)> = qb.build_query_as().fetch_all(pool).await?;
    rows.into_iter()
        .map(|(id, body)| decode_row(id, &body))
        .collect()
}

async fn batch_write(
    pool: &SqlitePool,
    collection: &str,
    writes: Vec<BatchWrite>,
) -> Result<(), HeraldError> {
    if writes.len() > MAX_BATCH_WRITES {
        return Err(HeraldError::InvalidRequest(format!(
            "batch of {} writes exceeds the limit of {MAX_BATCH_WRITES}",
            writes.len()
        )));
    }

    let mut tx = pool.begin().await?;
    for write in &writes {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(&write.id)
                .fetch_optional(&mut *tx)
                .await?;
        let mut fields = match body {
            Some(body) => decode_row(write.id.clone(), &body)?.fields,
            None => Map::new(),
        };
        fields.extend(write.fields.clone());
        upsert(&mut tx, collection, &write.id, &fields).await?;
    }
    tx.commit().await?;

    debug!(collection, writes = writes.len(), "Batch committed");
    Ok(())
}

async fn upsert(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
    fields: &Map<String, Value>,
) -> Result<(), HeraldError> {
    let body = serde_json::to_string(fields)?;
    sqlx::query(
        r#"
        INSERT INTO documents (collection, id, body, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(collection, id) DO UPDATE SET
            body = excluded.body,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(collection)
    .bind(id)
    .bind(body)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

fn decode_row(id: String, body: &str) -> Result<Document, HeraldError> {
    let fields: Map<String, Value> = serde_json::from_str(body)?;
    Ok(Document { id, fields })
}

/// JSON1 path for a top-level field; quoting keeps dots and spaces literal.
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

/// Spawn the document store actor and return a cloneable handle.
pub async fn spawn(database_url: &str) -> Result<DbActorHandle, HeraldError> {
    let (actor, _jh) = ractor::Actor::spawn(None, DbActor, database_url.to_string())
        .await
        .map_err(|e| HeraldError::RactorError(format!("failed to spawn DbActor: {e}")))?;

    Ok(DbActorHandle { actor })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), HeraldError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}

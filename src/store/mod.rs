//! Document store gateway.
//!
//! Layout:
//! - `document.rs`: documents, field operations and queries
//! - `actor.rs`: SQLite-backed implementation behind a ractor actor
//! - `schema.rs`: SQL DDL for initializing the database

pub mod actor;
pub mod document;
pub mod schema;

pub use actor::{DbActorHandle, spawn};
pub use document::{BatchWrite, Document, FieldOp, Filter, FilterOp, Query};
pub use schema::SQLITE_INIT;

use crate::error::HeraldError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Largest number of writes accepted by one `batch_write` call.
pub const MAX_BATCH_WRITES: usize = 500;

/// Keyed, queryable collections of JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, HeraldError>;

    /// Create or replace a document.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), HeraldError>;

    /// Apply field operations to an existing document in one atomic step and
    /// return the document as written.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        ops: Vec<FieldOp>,
    ) -> Result<Document, HeraldError>;

    async fn query(&self, collection: &str, query: Query) -> Result<Vec<Document>, HeraldError>;

    /// Merge up to [`MAX_BATCH_WRITES`] field sets in one transaction.
    async fn batch_write(
        &self,
        collection: &str,
        writes: Vec<BatchWrite>,
    ) -> Result<(), HeraldError>;
}

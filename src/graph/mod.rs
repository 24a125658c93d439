//! Graph store connection
//!
//! The pipeline only needs two things from the store: run a read query and
//! release the connection. [`neo4j::Neo4jProvider`] is the real provider.

pub mod neo4j;

use crate::config::ConnectionConfig;
use crate::error::RagResult;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One result row, column name to value, in column order
pub type Record = IndexMap<String, serde_json::Value>;

/// Result of executing a Cypher query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl QueryResult {
    /// Zip tabular rows with their column names
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        let records = rows
            .into_iter()
            .map(|row| columns.iter().cloned().zip(row).collect())
            .collect();
        Self { columns, records }
    }

    /// Number of result records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// An open handle to the graph store.
///
/// `close` is idempotent: only the first call tears the connection down.
#[async_trait]
pub trait GraphConnection: Send + Sync {
    /// Execute a read-only Cypher query
    async fn execute(&self, cypher: &str) -> RagResult<QueryResult>;

    async fn close(&self) -> RagResult<()>;

    fn is_closed(&self) -> bool;
}

/// Opens connections to the graph store
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Fails with [`crate::RagError::Connection`] when the store is unreachable
    /// or rejects the credentials.
    async fn open(&self, config: &ConnectionConfig) -> RagResult<Arc<dyn GraphConnection>>;
}

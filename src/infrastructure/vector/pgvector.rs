//! pgvector-backed vector store

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::domain::vector::{
    DistanceMetric, QueryResult, ScoredId, VectorQuery, VectorRecord, VectorStore,
};
use crate::domain::DomainError;

static TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap());

const ENDPOINT: &str = "pgvector";

/// Configuration for the pgvector store
#[derive(Debug, Clone)]
pub struct PgvectorConfig {
    pub database_url: String,
    /// Embedding dimensions used when creating tables
    pub dimensions: usize,
    pub max_connections: u32,
    /// Create missing tables on first write
    pub auto_create: bool,
}

impl PgvectorConfig {
    pub fn new(database_url: impl Into<String>, dimensions: usize) -> Self {
        Self {
            database_url: database_url.into(),
            dimensions,
            max_connections: 5,
            auto_create: false,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }
}

/// Vector store on PostgreSQL with the pgvector extension
///
/// Each logical table maps to one SQL table holding every namespace.
/// With `auto_create` set, a table is created the first time it is written.
#[derive(Clone)]
pub struct PgvectorStore {
    pool: PgPool,
    dimensions: usize,
    auto_create: bool,
    ready_tables: Arc<RwLock<HashSet<String>>>,
}

impl fmt::Debug for PgvectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgvectorStore")
            .field("dimensions", &self.dimensions)
            .field("auto_create", &self.auto_create)
            .field("pool", &"<PgPool>")
            .finish()
    }
}

impl PgvectorStore {
    pub async fn connect(config: &PgvectorConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| classify_sqlx("Failed to connect", &e))?;

        Ok(Self::with_pool(pool, config.dimensions).with_auto_create(config.auto_create))
    }

    pub fn with_pool(pool: PgPool, dimensions: usize) -> Self {
        Self {
            pool,
            dimensions,
            auto_create: false,
            ready_tables: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    /// Whether a write to `table` must create it first
    async fn needs_table(&self, table: &str) -> bool {
        self.auto_create && !self.ready_tables.read().await.contains(table)
    }

    /// Create the extension, `table` and its namespace index when missing
    pub async fn ensure_table(&self, table: &str) -> Result<(), DomainError> {
        let table = validate_table(table)?;

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx("Failed to create vector extension", &e))?;

        let create = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id VARCHAR(255) PRIMARY KEY,
                namespace VARCHAR(255) NOT NULL,
                content TEXT,
                embedding vector({}) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            table, self.dimensions
        );

        sqlx::query(&create)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx("Failed to create table", &e))?;

        let index = format!(
            "CREATE INDEX IF NOT EXISTS idx_{}_namespace ON {} (namespace)",
            table, table
        );

        sqlx::query(&index)
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx("Failed to create namespace index", &e))?;

        self.ready_tables.write().await.insert(table.to_string());

        debug!(table, dimensions = self.dimensions, "Vector table ready");
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PgvectorStore {
    async fn upsert(&self, record: VectorRecord) -> Result<(), DomainError> {
        let table = validate_table(&record.table)?;

        if self.needs_table(table).await {
            self.ensure_table(table).await?;
        }

        let sql = format!(
            r#"
            INSERT INTO {} (id, namespace, content, embedding)
            VALUES ($1, $2, $3, $4::vector)
            ON CONFLICT (id) DO UPDATE
            SET namespace = EXCLUDED.namespace,
                content = EXCLUDED.content,
                embedding = EXCLUDED.embedding
            "#,
            table
        );

        sqlx::query(&sql)
            .bind(&record.id)
            .bind(&record.namespace)
            .bind(&record.payload)
            .bind(vector_literal(&record.vector))
            .execute(&self.pool)
            .await
            .map_err(|e| classify_sqlx("Upsert failed", &e))?;

        Ok(())
    }

    async fn query(&self, query: VectorQuery) -> Result<QueryResult, DomainError> {
        let table = validate_table(&query.table)?;

        let sql = format!(
            r#"
            SELECT id, content, (embedding {} $1::vector)::float8 AS distance
            FROM {}
            WHERE namespace = $2
            ORDER BY distance
            LIMIT $3
            "#,
            operator(query.metric),
            table
        );

        let rows = sqlx::query(&sql)
            .bind(vector_literal(&query.vector))
            .bind(&query.namespace)
            .bind(query.top_k as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(table, namespace = %query.namespace, error = %e, "Vector query failed");
                classify_sqlx("Query failed", &e)
            })?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| classify_sqlx("Unreadable row", &e))?;
            let content: Option<String> = row
                .try_get("content")
                .map_err(|e| classify_sqlx("Unreadable row", &e))?;
            let distance: f64 = row
                .try_get("distance")
                .map_err(|e| classify_sqlx("Unreadable row", &e))?;

            hits.push(ScoredId::new(id, to_score(query.metric, distance)).with_payload(content));
        }

        Ok(QueryResult::ranked(query.metric, hits, query.top_k))
    }

    fn store_type(&self) -> &'static str {
        "pgvector"
    }
}

/// pgvector operator; every operator sorts ascending
fn operator(metric: DistanceMetric) -> &'static str {
    match metric {
        DistanceMetric::L2 => "<->",
        DistanceMetric::InnerProduct => "<#>",
        DistanceMetric::Cosine => "<=>",
    }
}

/// Convert an operator result back into the metric's own score units
fn to_score(metric: DistanceMetric, distance: f64) -> f32 {
    match metric {
        DistanceMetric::L2 => distance as f32,
        // <#> returns the negative inner product
        DistanceMetric::InnerProduct => (-distance) as f32,
        DistanceMetric::Cosine => (1.0 - distance) as f32,
    }
}

fn vector_literal(vector: &[f32]) -> String {
    let values: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(","))
}

/// Table names are interpolated into SQL, so only plain identifiers pass
fn validate_table(table: &str) -> Result<&str, DomainError> {
    if TABLE_NAME.is_match(table) {
        Ok(table)
    } else {
        Err(DomainError::validation(format!("Invalid table name: '{}'", table)))
    }
}

fn classify_sqlx(context: &str, error: &sqlx::Error) -> DomainError {
    let message = format!("{}: {}", context, error);

    match error {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            DomainError::transient(ENDPOINT, message)
        }
        _ => DomainError::fatal(ENDPOINT, message),
    }
}

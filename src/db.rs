// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SurrealDB integration for signatures and the petition counter

use crate::{
    config::DatabaseConfig,
    error::{AppError, Result},
    models::Signature,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::IntoFuture;
use std::time::Duration;
use surrealdb::{
    engine::local::{Db, Mem},
    method::Query,
    sql::Datetime,
    Surreal,
};
use tracing::{debug, info};

/// First value of the signature counter; the first signature gets the next one.
pub const COUNTER_SEED: i64 = 12847;

const SIGNATURES: &str = "signatures";
const COUNTERS: &str = "counters";
const SIGNATURE_COUNTER: &str = "signature_counter";

const SIGNATURE_FIELDS: &str =
    "meta::id(id) AS signature_id, name, email, phone, timestamp, signature_number";

/// Signature as stored; the id lives in the record key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SignatureDocument {
    name: String,
    email: Option<String>,
    phone: String,
    timestamp: Datetime,
    signature_number: i64,
}

impl SignatureDocument {
    fn from_signature(signature: &Signature) -> Self {
        Self {
            name: signature.name.clone(),
            email: signature.email.clone(),
            phone: signature.phone.clone(),
            timestamp: Datetime::from(signature.timestamp),
            signature_number: signature.signature_number,
        }
    }

    fn into_signature(self, id: String) -> Signature {
        Signature {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            timestamp: self.timestamp.0,
            signature_number: self.signature_number,
        }
    }
}

/// Projection row carrying the record key next to the document fields.
#[derive(Debug, Deserialize)]
struct SignatureRow {
    signature_id: String,
    name: String,
    email: Option<String>,
    phone: String,
    timestamp: Datetime,
    signature_number: i64,
}

impl From<SignatureRow> for Signature {
    fn from(row: SignatureRow) -> Self {
        Signature {
            id: row.signature_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            timestamp: row.timestamp.0,
            signature_number: row.signature_number,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CounterRecord {
    count: i64,
}

#[derive(Debug, Deserialize)]
struct TimestampRow {
    timestamp: Datetime,
}

/// Filter applied to admin listing and counting queries.
#[derive(Debug, Clone, Default)]
pub struct SignatureQuery {
    /// Lowercased substring matched against name and phone
    pub search: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl SignatureQuery {
    fn where_clause(&self) -> String {
        let mut conditions = Vec::new();
        if self.search.is_some() {
            conditions.push(
                "(string::contains(string::lowercase(name), $search) \
                 OR string::contains(string::lowercase(phone), $search))",
            );
        }
        if self.from.is_some() {
            conditions.push("timestamp >= $from");
        }
        if self.to.is_some() {
            conditions.push("timestamp <= $to");
        }

        if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        }
    }

    fn bind_into<'r>(&self, mut query: Query<'r, Db>) -> Query<'r, Db> {
        if let Some(search) = &self.search {
            query = query.bind(("search", search.clone()));
        }
        if let Some(from) = self.from {
            query = query.bind(("from", Datetime::from(from)));
        }
        if let Some(to) = self.to {
            query = query.bind(("to", Datetime::from(to)));
        }
        query
    }
}

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    db: Surreal<Db>,
    timeout: Duration,
}

impl Database {
    /// Connect to SurrealDB, initialize the schema and seed the counter.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db = if config.path == "memory" {
            Surreal::new::<Mem>(()).await?
        } else {
            Self::open_persistent(&config.path).await?
        };

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;

        let database = Self {
            db,
            timeout: config.timeout(),
        };

        database
            .bounded("initialize schema", Self::init_schema(&database.db))
            .await?;
        database.seed_counter().await?;

        info!(path = %config.path, ns = %config.namespace, db = %config.database, "Connected to SurrealDB");
        Ok(database)
    }

    #[cfg(feature = "rocksdb")]
    async fn open_persistent(path: &str) -> Result<Surreal<Db>> {
        Ok(Surreal::new::<surrealdb::engine::local::RocksDb>(path).await?)
    }

    #[cfg(not(feature = "rocksdb"))]
    async fn open_persistent(path: &str) -> Result<Surreal<Db>> {
        Err(AppError::Internal(format!(
            "DB_PATH '{path}' needs the `rocksdb` feature; use 'memory' instead"
        )))
    }

    /// Initialize database schema
    async fn init_schema(db: &Surreal<Db>) -> Result<()> {
        db.query(
            r#"
            DEFINE TABLE signatures SCHEMAFULL;
            DEFINE FIELD name ON signatures TYPE string;
            DEFINE FIELD email ON signatures TYPE option<string>;
            DEFINE FIELD phone ON signatures TYPE string;
            DEFINE FIELD timestamp ON signatures TYPE datetime;
            DEFINE FIELD signature_number ON signatures TYPE int;

            DEFINE INDEX timestamp_idx ON signatures COLUMNS timestamp;
            DEFINE INDEX number_idx ON signatures COLUMNS signature_number UNIQUE;
        "#,
        )
        .await?
        .check()?;

        Ok(())
    }

    /// Create the counter record at [`COUNTER_SEED`] if it does not exist.
    async fn seed_counter(&self) -> Result<()> {
        let existing: Option<CounterRecord> = self
            .bounded("read counter", self.db.select((COUNTERS, SIGNATURE_COUNTER)))
            .await?;
        if existing.is_some() {
            return Ok(());
        }

        let created: std::result::Result<Option<CounterRecord>, AppError> = self
            .bounded(
                "seed counter",
                self.db
                    .create((COUNTERS, SIGNATURE_COUNTER))
                    .content(CounterRecord { count: COUNTER_SEED }),
            )
            .await;

        match created {
            Ok(_) => {
                info!(seed = COUNTER_SEED, "Signature counter seeded");
                Ok(())
            }
            // Another process may have seeded it between our read and create.
            Err(err) => {
                let retry: Option<CounterRecord> = self
                    .bounded("read counter", self.db.select((COUNTERS, SIGNATURE_COUNTER)))
                    .await?;
                retry.map(|_| ()).ok_or(err)
            }
        }
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T, E, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: IntoFuture<Output = std::result::Result<T, E>>,
        AppError: From<E>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => Err(AppError::StorageTimeout(operation)),
        }
    }

    /// Atomically increment the counter and return the new value.
    pub async fn increment_counter(&self) -> Result<i64> {
        let mut response = self
            .bounded(
                "increment counter",
                self.db
                    .query("UPDATE type::thing($table, $key) SET count += 1 RETURN AFTER")
                    .bind(("table", COUNTERS))
                    .bind(("key", SIGNATURE_COUNTER)),
            )
            .await?;

        let updated: Option<CounterRecord> = response.take(0)?;
        updated
            .map(|c| c.count)
            .ok_or_else(|| AppError::Internal("Signature counter missing".to_string()))
    }

    /// Current counter value without incrementing.
    pub async fn counter_value(&self) -> Result<i64> {
        let counter: Option<CounterRecord> = self
            .bounded("read counter", self.db.select((COUNTERS, SIGNATURE_COUNTER)))
            .await?;
        Ok(counter.map(|c| c.count).unwrap_or(COUNTER_SEED))
    }

    /// Persist a new signature under its id.
    pub async fn insert_signature(&self, signature: &Signature) -> Result<()> {
        let created: Option<SignatureDocument> = self
            .bounded(
                "insert signature",
                self.db
                    .create((SIGNATURES, signature.id.as_str()))
                    .content(SignatureDocument::from_signature(signature)),
            )
            .await?;

        created
            .map(|_| ())
            .ok_or_else(|| AppError::Internal("Failed to create signature".to_string()))
    }

    /// Get a signature by id
    pub async fn get_signature(&self, id: &str) -> Result<Option<Signature>> {
        let document: Option<SignatureDocument> = self
            .bounded("get signature", self.db.select((SIGNATURES, id)))
            .await?;
        Ok(document.map(|d| d.into_signature(id.to_string())))
    }

    /// Delete a signature, returning whether it existed.
    pub async fn delete_signature(&self, id: &str) -> Result<bool> {
        let deleted: Option<SignatureDocument> = self
            .bounded("delete signature", self.db.delete((SIGNATURES, id)))
            .await?;
        Ok(deleted.is_some())
    }

    /// Most recent signatures, newest first.
    pub async fn recent_signatures(&self, limit: u32) -> Result<Vec<Signature>> {
        self.list_signatures(&SignatureQuery::default(), limit, 0).await
    }

    /// Filtered page of signatures, newest first.
    pub async fn list_signatures(
        &self,
        filter: &SignatureQuery,
        limit: u32,
        start: u64,
    ) -> Result<Vec<Signature>> {
        let sql = format!(
            "SELECT {SIGNATURE_FIELDS} FROM {SIGNATURES}{} ORDER BY timestamp DESC LIMIT {limit} START {start}",
            filter.where_clause()
        );
        debug!(%sql, "Listing signatures");

        let mut response = self
            .bounded("list signatures", filter.bind_into(self.db.query(sql)))
            .await?;
        let rows: Vec<SignatureRow> = response.take(0)?;
        Ok(rows.into_iter().map(Signature::from).collect())
    }

    /// Every signature, newest first.
    pub async fn all_signatures(&self) -> Result<Vec<Signature>> {
        let sql = format!("SELECT {SIGNATURE_FIELDS} FROM {SIGNATURES} ORDER BY timestamp DESC");
        let mut response = self.bounded("export signatures", self.db.query(sql)).await?;
        let rows: Vec<SignatureRow> = response.take(0)?;
        Ok(rows.into_iter().map(Signature::from).collect())
    }

    /// Number of stored signatures matching the filter.
    pub async fn count_signatures(&self, filter: &SignatureQuery) -> Result<i64> {
        let sql = format!(
            "SELECT count() FROM {SIGNATURES}{} GROUP ALL",
            filter.where_clause()
        );
        let mut response = self
            .bounded("count signatures", filter.bind_into(self.db.query(sql)))
            .await?;
        let count: Option<i64> = response.take((0, "count"))?;
        Ok(count.unwrap_or(0))
    }

    /// Creation times of every signature at or after `since`.
    pub async fn timestamps_since(&self, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        let mut response = self
            .bounded(
                "read timestamps",
                self.db
                    .query("SELECT timestamp FROM signatures WHERE timestamp >= $since")
                    .bind(("since", Datetime::from(since))),
            )
            .await?;
        let rows: Vec<TimestampRow> = response.take(0)?;
        Ok(rows.into_iter().map(|r| r.timestamp.0).collect())
    }
}

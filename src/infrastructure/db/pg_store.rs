//! Postgres adapter for the document store port. Documents live as JSONB
//! rows keyed by (collection, id); transactions run at SERIALIZABLE
//! isolation and serialization failures (SQLSTATE 40001/40P01) are retried
//! internally, mirroring the hosted store's automatic conflict retry.

use anyhow::bail;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::Postgres;

use crate::application::ports::document_store::{
    DocumentStore, Query, SortDirection, StoreTransaction, TransactionBody,
};
use crate::infrastructure::db::PgPool;

const MAX_TXN_ATTEMPTS: u32 = 5;

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS documents (
               collection TEXT NOT NULL,
               id TEXT NOT NULL,
               data JSONB NOT NULL,
               PRIMARY KEY (collection, id)
           )"#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

enum StagedWrite {
    Set {
        collection: String,
        id: String,
        data: Value,
    },
    Update {
        collection: String,
        id: String,
        partial: Value,
    },
    Delete {
        collection: String,
        id: String,
    },
}

struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
    writes: Vec<StagedWrite>,
}

impl PgTransaction {
    async fn apply_and_commit(mut self) -> anyhow::Result<()> {
        for write in &self.writes {
            match write {
                StagedWrite::Set { collection, id, data } => {
                    sqlx::query(
                        r#"INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)
                           ON CONFLICT (collection, id) DO UPDATE SET data = EXCLUDED.data"#,
                    )
                    .bind(collection)
                    .bind(id)
                    .bind(data)
                    .execute(&mut *self.tx)
                    .await?;
                }
                StagedWrite::Update { collection, id, partial } => {
                    let res = sqlx::query(
                        "UPDATE documents SET data = data || $3 WHERE collection = $1 AND id = $2",
                    )
                    .bind(collection)
                    .bind(id)
                    .bind(partial)
                    .execute(&mut *self.tx)
                    .await?;
                    if res.rows_affected() == 0 {
                        bail!("update of missing document {}/{}", collection, id);
                    }
                }
                StagedWrite::Delete { collection, id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(collection)
                        .bind(id)
                        .execute(&mut *self.tx)
                        .await?;
                }
            }
        }
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn get(&mut self, collection: &str, id: &str) -> anyhow::Result<Option<Value>> {
        if !self.writes.is_empty() {
            bail!("transaction ordering violation: all reads must precede the first write");
        }
        let row = sqlx::query_scalar::<_, Value>(
            "SELECT data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    fn set(&mut self, collection: &str, id: &str, data: Value) {
        self.writes.push(StagedWrite::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
        });
    }

    fn update(&mut self, collection: &str, id: &str, partial: Value) {
        self.writes.push(StagedWrite::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            partial,
        });
    }

    fn delete(&mut self, collection: &str, id: &str) {
        self.writes.push(StagedWrite::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
    }
}

fn is_serialization_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .and_then(|db| db.code())
            .map(|code| code == "40001" || code == "40P01")
            .unwrap_or(false)
    })
}

fn order_field(field: &str) -> anyhow::Result<&str> {
    if field
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !field.is_empty()
    {
        Ok(field)
    } else {
        bail!("invalid order-by field '{}'", field)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> anyhow::Result<Option<Value>> {
        let row = sqlx::query_scalar::<_, Value>(
            "SELECT data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)
               ON CONFLICT (collection, id) DO UPDATE SET data = EXCLUDED.data"#,
        )
        .bind(collection)
        .bind(id)
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> anyhow::Result<()> {
        let res = sqlx::query(
            "UPDATE documents SET data = data || $3 WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(partial)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            bail!("update of missing document {}/{}", collection, id);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> anyhow::Result<Vec<Value>> {
        let mut filter_obj = serde_json::Map::new();
        for filter in &query.filters {
            filter_obj.insert(filter.field.clone(), filter.value.clone());
        }

        let mut sql =
            String::from("SELECT data FROM documents WHERE collection = $1 AND data @> $2");
        if let Some((field, direction)) = &query.order_by {
            let field = order_field(field)?;
            let dir = match direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            sql.push_str(&format!(" ORDER BY data->>'{}' {}", field, dir));
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        let rows = sqlx::query_scalar::<_, Value>(&sql)
            .bind(collection)
            .bind(Value::Object(filter_obj))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn run_transaction(&self, body: &dyn TransactionBody) -> anyhow::Result<()> {
        for _ in 0..MAX_TXN_ATTEMPTS {
            let mut tx = self.pool.begin().await?;
            sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
                .execute(&mut *tx)
                .await?;
            let mut handle = PgTransaction {
                tx,
                writes: Vec::new(),
            };
            if let Err(e) = body.run(&mut handle).await {
                if is_serialization_failure(&e) {
                    continue;
                }
                return Err(e);
            }
            match handle.apply_and_commit().await {
                Ok(()) => return Ok(()),
                Err(e) if is_serialization_failure(&e) => continue,
                Err(e) => return Err(e),
            }
        }
        bail!(
            "transaction aborted after {} contention retries",
            MAX_TXN_ATTEMPTS
        )
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

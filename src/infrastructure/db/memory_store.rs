//! In-memory document store with optimistic multi-document transactions.
//! Used by the test suite and as the dev backend. Semantics mirror the
//! hosted store: serializable transactions, automatic retry on commit
//! conflicts, and a hard "all reads before all writes" rule per
//! transaction.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::document_store::{
    DocumentStore, Query, SortDirection, StoreTransaction, TransactionBody,
};

const MAX_TXN_ATTEMPTS: u32 = 5;

#[derive(Clone)]
struct VersionedDoc {
    version: u64,
    data: Value,
}

type Collections = HashMap<String, HashMap<String, VersionedDoc>>;

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<Collections>,
    next_version: AtomicU64,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next_version.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }

    fn merge_into(data: &mut Value, partial: &Value) -> anyhow::Result<()> {
        let (Value::Object(target), Value::Object(fields)) = (data, partial) else {
            bail!("update requires object documents");
        };
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    fn commit(&self, txn: MemoryTransaction<'_>) -> CommitResult {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for read in &txn.reads {
            let current = collections
                .get(&read.collection)
                .and_then(|docs| docs.get(&read.id))
                .map(|doc| doc.version);
            if current != read.observed_version {
                return CommitResult::Conflict;
            }
        }

        for write in &txn.writes {
            match write {
                StagedWrite::Set { collection, id, data } => {
                    let version = self.bump();
                    collections.entry(collection.clone()).or_default().insert(
                        id.clone(),
                        VersionedDoc {
                            version,
                            data: data.clone(),
                        },
                    );
                }
                StagedWrite::Update { collection, id, partial } => {
                    let version = self.bump();
                    let Some(doc) = collections
                        .get_mut(collection)
                        .and_then(|docs| docs.get_mut(id))
                    else {
                        return CommitResult::Failed(anyhow!(
                            "update of missing document {}/{}",
                            collection,
                            id
                        ));
                    };
                    if let Err(e) = Self::merge_into(&mut doc.data, partial) {
                        return CommitResult::Failed(e);
                    }
                    doc.version = version;
                }
                StagedWrite::Delete { collection, id } => {
                    if let Some(docs) = collections.get_mut(collection) {
                        docs.remove(id);
                    }
                }
            }
        }

        CommitResult::Committed
    }
}

enum CommitResult {
    Committed,
    Conflict,
    Failed(anyhow::Error),
}

struct ReadRecord {
    collection: String,
    id: String,
    observed_version: Option<u64>,
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

struct MemoryTransaction<'a> {
    store: &'a MemoryDocumentStore,
    reads: Vec<ReadRecord>,
    writes: Vec<StagedWrite>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction<'_> {
    async fn get(&mut self, collection: &str, id: &str) -> anyhow::Result<Option<Value>> {
        if !self.writes.is_empty() {
            bail!("transaction ordering violation: all reads must precede the first write");
        }
        let collections = self
            .store
            .collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let doc = collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned();
        self.reads.push(ReadRecord {
            collection: collection.to_string(),
            id: id.to_string(),
            observed_version: doc.as_ref().map(|d| d.version),
        });
        Ok(doc.map(|d| d.data))
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

fn json_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> anyhow::Result<Option<Value>> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| doc.data.clone()))
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> anyhow::Result<()> {
        let version = self.bump();
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), VersionedDoc { version, data });
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> anyhow::Result<()> {
        let version = self.bump();
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| anyhow!("update of missing document {}/{}", collection, id))?;
        Self::merge_into(&mut doc.data, &partial)?;
        doc.version = version;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> anyhow::Result<()> {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> anyhow::Result<Vec<Value>> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut rows: Vec<Value> = collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| {
                        query.filters.iter().all(|f| {
                            doc.data.get(&f.field).map(|v| v == &f.value).unwrap_or(false)
                        })
                    })
                    .map(|doc| doc.data.clone())
                    .collect()
            })
            .unwrap_or_default();
        drop(collections);

        if let Some((field, direction)) = &query.order_by {
            rows.sort_by(|a, b| {
                let av = a.get(field).unwrap_or(&Value::Null);
                let bv = b.get(field).unwrap_or(&Value::Null);
                let ord = json_cmp(av, bv);
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }

        let offset = query.offset.unwrap_or(0);
        let rows = rows
            .into_iter()
            .skip(offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(rows)
    }

    async fn run_transaction(&self, body: &dyn TransactionBody) -> anyhow::Result<()> {
        for _ in 0..MAX_TXN_ATTEMPTS {
            let mut txn = MemoryTransaction {
                store: self,
                reads: Vec::new(),
                writes: Vec::new(),
            };
            body.run(&mut txn).await?;
            match self.commit(txn) {
                CommitResult::Committed => return Ok(()),
                CommitResult::Conflict => continue,
                CommitResult::Failed(e) => return Err(e),
            }
        }
        bail!(
            "transaction aborted after {} contention retries",
            MAX_TXN_ATTEMPTS
        )
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct ReadAfterWrite;

    #[async_trait]
    impl TransactionBody for ReadAfterWrite {
        async fn run(&self, tx: &mut dyn StoreTransaction) -> anyhow::Result<()> {
            tx.set("c", "a", json!({"v": 1}));
            tx.get("c", "b").await?;
            Ok(())
        }
    }

    struct FailAfterStaging;

    #[async_trait]
    impl TransactionBody for FailAfterStaging {
        async fn run(&self, tx: &mut dyn StoreTransaction) -> anyhow::Result<()> {
            tx.set("c", "a", json!({"v": 1}));
            tx.set("c", "b", json!({"v": 2}));
            bail!("abort")
        }
    }

    #[tokio::test]
    async fn read_after_write_is_rejected() {
        let store = MemoryDocumentStore::new();
        let err = store.run_transaction(&ReadAfterWrite).await.unwrap_err();
        assert!(err.to_string().contains("ordering violation"));
        assert!(store.get("c", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_body_leaves_no_writes() {
        let store = MemoryDocumentStore::new();
        assert!(store.run_transaction(&FailAfterStaging).await.is_err());
        assert!(store.get("c", "a").await.unwrap().is_none());
        assert!(store.get("c", "b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_merges_top_level_fields() {
        let store = MemoryDocumentStore::new();
        store
            .set("c", "a", json!({"x": 1, "y": 2}))
            .await
            .unwrap();
        store.update("c", "a", json!({"y": 3, "z": 4})).await.unwrap();
        let doc = store.get("c", "a").await.unwrap().unwrap();
        assert_eq!(doc, json!({"x": 1, "y": 3, "z": 4}));
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryDocumentStore::new();
        assert!(store.update("c", "nope", json!({"x": 1})).await.is_err());
    }

    #[tokio::test]
    async fn query_filters_orders_and_limits() {
        let store = MemoryDocumentStore::new();
        for (id, status, ts) in [
            ("a", "published", "2026-01-03T00:00:00Z"),
            ("b", "draft", "2026-01-02T00:00:00Z"),
            ("c", "published", "2026-01-01T00:00:00Z"),
        ] {
            store
                .set("posts", id, json!({"status": status, "updatedAt": ts}))
                .await
                .unwrap();
        }
        let q = Query {
            filters: vec![crate::application::ports::document_store::Filter {
                field: "status".into(),
                value: json!("published"),
            }],
            order_by: Some(("updatedAt".into(), SortDirection::Desc)),
            limit: Some(10),
            offset: None,
        };
        let rows = store.query("posts", &q).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["updatedAt"], json!("2026-01-03T00:00:00Z"));
    }
}

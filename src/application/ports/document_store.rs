use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Equality filter on a top-level document field.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Handle passed to a transaction body.
///
/// The store enforces the transaction ordering rule at this seam: every
/// `get` must be issued before the first write, and a read issued after a
/// write fails the whole transaction. Writes are staged and applied
/// atomically at commit.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn get(&mut self, collection: &str, id: &str) -> anyhow::Result<Option<Value>>;

    fn set(&mut self, collection: &str, id: &str, data: Value);

    /// Top-level field merge. Commit fails if the document does not exist.
    fn update(&mut self, collection: &str, id: &str, partial: Value);

    fn delete(&mut self, collection: &str, id: &str);
}

/// One logical multi-document mutation. `run` may be invoked several times
/// when the store retries a contended commit, so it must be re-runnable
/// from its captured inputs; an error return aborts without retry and
/// leaves no durable writes.
#[async_trait]
pub trait TransactionBody: Send + Sync {
    async fn run(&self, tx: &mut dyn StoreTransaction) -> anyhow::Result<()>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> anyhow::Result<Option<Value>>;

    async fn set(&self, collection: &str, id: &str, data: Value) -> anyhow::Result<()>;

    /// Non-transactional top-level merge; fails if the document is missing.
    async fn update(&self, collection: &str, id: &str, partial: Value) -> anyhow::Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> anyhow::Result<()>;

    async fn query(&self, collection: &str, query: &Query) -> anyhow::Result<Vec<Value>>;

    /// Serializable multi-document transaction: either every staged write
    /// commits or none does. Contention between overlapping transactions is
    /// retried internally up to a store-specific bound and surfaces as a
    /// plain error only once that bound is exhausted.
    async fn run_transaction(&self, body: &dyn TransactionBody) -> anyhow::Result<()>;

    async fn ping(&self) -> anyhow::Result<()>;
}

use sqlx::{Pool, Postgres};

pub type PgPool = Pool<Postgres>;

pub async fn connect_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub mod memory_store;
pub mod pg_store;

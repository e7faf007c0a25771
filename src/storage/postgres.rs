// region:    --- Imports
use super::{KeyValueStore, StorageError};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info};

// endregion: --- Imports

// region:    --- Queries
const GET_VALUE: &str = "SELECT value FROM kv_store WHERE key = $1";

const UPSERT_VALUE: &str = "INSERT INTO kv_store (key, value, updated_at) VALUES ($1, $2, $3)
    ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at";

const DELETE_VALUE: &str = "DELETE FROM kv_store WHERE key = $1";
// endregion: --- Queries

// region:    --- Postgres Store
/// PostgreSQL 키-값 저장소
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    /// 커넥션 풀 생성
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("{:<12} --> 커넥션 풀 생성 완료", "PgStore");
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// 트랜잭션 실행
    pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: for<'c> FnOnce(
            &'c mut sqlx::Transaction<'_, sqlx::Postgres>,
        ) -> Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'c>>,
        E: From<sqlx::Error>,
    {
        let mut tx = self.pool.begin().await?;
        let result = f(&mut tx).await;
        match result {
            Ok(r) => {
                tx.commit().await?;
                Ok(r)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// 스키마 초기화 (reset 이면 테이블을 지우고 다시 만든다)
    pub async fn initialize_database(&self, reset: bool) -> Result<(), StorageError> {
        if reset {
            let recreate_db_sql = include_str!("../../sql/00-recreate-db.sql");
            self.execute_multi_query(recreate_db_sql).await?;
        }

        let create_schema_sql = include_str!("../../sql/01-create-schema.sql");
        self.execute_multi_query(create_schema_sql).await?;

        Ok(())
    }

    /// 여러 쿼리 실행
    async fn execute_multi_query(&self, sql: &str) -> Result<(), StorageError> {
        for query in sql.split(';') {
            let query = query.trim();
            if !query.is_empty() {
                sqlx::query(query).execute(&*self.pool).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for PostgresStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query(GET_VALUE)
            .bind(key)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(|row| row.get("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        debug!("{:<12} --> set key={}", "PgStore", key);
        sqlx::query(UPSERT_VALUE)
            .bind(key)
            .bind(value)
            .bind(Utc::now())
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), StorageError> {
        debug!("{:<12} --> set_many count={}", "PgStore", entries.len());
        let entries = entries.to_vec();
        let now = Utc::now();
        self.transaction(|tx| {
            Box::pin(async move {
                for (key, value) in &entries {
                    sqlx::query(UPSERT_VALUE)
                        .bind(key)
                        .bind(value)
                        .bind(now)
                        .execute(&mut **tx)
                        .await?;
                }
                Ok::<(), StorageError>(())
            })
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query(DELETE_VALUE)
            .bind(key)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }
}
// endregion: --- Postgres Store

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "DATABASE_URL 이 가리키는 PostgreSQL 이 필요하다"]
    async fn test_postgres_store_round_trip() {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PostgresStore::connect(&database_url, 2).await.unwrap();
        store.initialize_database(false).await.unwrap();

        store
            .set_many(&[
                ("highest_bid_PGTEST".to_string(), "10.50".to_string()),
                ("bid_history_PGTEST".to_string(), "[]".to_string()),
            ])
            .await
            .unwrap();
        assert_eq!(
            store.get("highest_bid_PGTEST").await.unwrap().as_deref(),
            Some("10.50")
        );

        store.remove("highest_bid_PGTEST").await.unwrap();
        store.remove("bid_history_PGTEST").await.unwrap();
        assert_eq!(store.get("highest_bid_PGTEST").await.unwrap(), None);
    }
}
// endregion: --- Tests

/// 키-값 저장소
/// 모든 상태(입찰, 상품, 장바구니, 계정)는 이 인터페이스를 통해서만 저장된다.
// region:    --- Imports
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub mod postgres;

pub use postgres::PostgresStore;
// endregion: --- Imports

// region:    --- Storage Error
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("corrupt value at key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl From<sqlx::Error> for StorageError {
    fn from(value: sqlx::Error) -> Self {
        StorageError::Backend(value.to_string())
    }
}
// endregion: --- Storage Error

// region:    --- Key Value Store Trait
/// 키-값 저장소 트레이트
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 여러 키를 한 번에 저장 (전부 반영되거나 전부 반영되지 않음)
    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// JSON 값 조회
pub async fn get_json<T>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StorageError>
where
    T: serde::de::DeserializeOwned,
{
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// JSON 직렬화
pub fn to_json<T: serde::Serialize>(key: &str, value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// JSON 값 저장
pub async fn set_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StorageError>
where
    T: serde::Serialize,
{
    let raw = to_json(key, value)?;
    store.set(key, &raw).await
}
// endregion: --- Key Value Store Trait

// region:    --- Memory Store
/// 메모리 저장소 (테스트 및 DATABASE_URL 미설정 시 사용)
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        debug!("{:<12} --> set key={}", "MemoryStore", key);
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), StorageError> {
        debug!("{:<12} --> set_many count={}", "MemoryStore", entries.len());
        let mut guard = self.entries.write().await;
        for (key, value) in entries {
            guard.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
// endregion: --- Memory Store

// endregion: --- Tests

/// 사용자별 장바구니 / 위시리스트
// region:    --- Imports
use crate::catalog::{AuctionItem, ItemCatalog};
use crate::storage::{self, KeyValueStore, StorageError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;
// endregion: --- Imports

#[derive(Debug, Error)]
pub enum SavedItemsError {
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("unknown user: {0}")]
    UnknownUser(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Cart,
    Wishlist,
}

impl ListKind {
    fn key(self, username: &str) -> String {
        match self {
            ListKind::Cart => format!("cartItems_{}", username),
            ListKind::Wishlist => format!("wishlistItems_{}", username),
        }
    }
}

// region:    --- Saved Items
/// 중복 없는 상품 코드 목록 (추가 순서 유지)
pub struct SavedItems {
    kind: ListKind,
    store: Arc<dyn KeyValueStore>,
    catalog: Arc<dyn ItemCatalog>,
    write_lock: Mutex<()>,
}

impl SavedItems {
    pub fn new(kind: ListKind, store: Arc<dyn KeyValueStore>, catalog: Arc<dyn ItemCatalog>) -> Self {
        Self {
            kind,
            store,
            catalog,
            write_lock: Mutex::new(()),
        }
    }

    async fn codes(&self, username: &str) -> Result<Vec<String>, StorageError> {
        Ok(storage::get_json(self.store.as_ref(), &self.kind.key(username))
            .await?
            .unwrap_or_default())
    }

    /// 추가 (이미 있으면 무시)
    pub async fn add(&self, username: &str, item_code: &str) -> Result<(), SavedItemsError> {
        if self.catalog.item(item_code).await?.is_none() {
            return Err(SavedItemsError::UnknownItem(item_code.to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut codes = self.codes(username).await?;
        if codes.iter().any(|code| code == item_code) {
            return Ok(());
        }
        codes.push(item_code.to_string());
        storage::set_json(self.store.as_ref(), &self.kind.key(username), &codes).await?;

        info!(
            "{:<12} --> {:?} 추가: user={}, item={}",
            "SavedItems", self.kind, username, item_code
        );
        Ok(())
    }

    /// 제거 (없으면 무시)
    pub async fn remove(&self, username: &str, item_code: &str) -> Result<(), SavedItemsError> {
        let _guard = self.write_lock.lock().await;
        let mut codes = self.codes(username).await?;
        let before = codes.len();
        codes.retain(|code| code != item_code);
        if codes.len() != before {
            storage::set_json(self.store.as_ref(), &self.kind.key(username), &codes).await?;
            info!(
                "{:<12} --> {:?} 제거: user={}, item={}",
                "SavedItems", self.kind, username, item_code
            );
        }
        Ok(())
    }

    /// 상품 목록 (카탈로그에서 찾을 수 없는 코드는 건너뜀)
    pub async fn items(&self, username: &str) -> Result<Vec<AuctionItem>, SavedItemsError> {
        let mut items = Vec::new();
        for code in self.codes(username).await? {
            if let Some(item) = self.catalog.item(&code).await? {
                items.push(item);
            }
        }
        Ok(items)
    }
}
// endregion: --- Saved Items

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewItem, StoredCatalog};
    use crate::storage::MemoryStore;
    use rust_decimal_macros::dec;

    async fn setup(kind: ListKind) -> (SavedItems, Arc<dyn KeyValueStore>) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let catalog = Arc::new(StoredCatalog::new(Arc::clone(&store)));
        for code in ["A1", "A2"] {
            catalog
                .add_item(NewItem {
                    code: Some(code.to_string()),
                    name: format!("Item {}", code),
                    seller: "jane".to_string(),
                    category: "Electronics".to_string(),
                    condition: "New".to_string(),
                    description: String::new(),
                    listing_price: dec!(10),
                    email: None,
                    contact: None,
                    location: None,
                })
                .await
                .unwrap();
        }
        (SavedItems::new(kind, Arc::clone(&store), catalog), store)
    }

    fn codes(items: Vec<AuctionItem>) -> Vec<String> {
        items.into_iter().map(|item| item.code).collect()
    }

    #[tokio::test]
    async fn test_add_is_duplicate_free_and_ordered() {
        let (cart, store) = setup(ListKind::Cart).await;
        cart.add("u1", "A2").await.unwrap();
        cart.add("u1", "A1").await.unwrap();
        cart.add("u1", "A2").await.unwrap();

        assert_eq!(codes(cart.items("u1").await.unwrap()), ["A2", "A1"]);
        assert!(cart.items("u2").await.unwrap().is_empty());
        assert!(store.get("cartItems_u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove() {
        let (wishlist, store) = setup(ListKind::Wishlist).await;
        wishlist.add("u1", "A1").await.unwrap();
        wishlist.add("u1", "A2").await.unwrap();
        wishlist.remove("u1", "A1").await.unwrap();
        wishlist.remove("u1", "ZZ").await.unwrap();

        assert_eq!(codes(wishlist.items("u1").await.unwrap()), ["A2"]);
        assert_eq!(
            store.get("wishlistItems_u1").await.unwrap().as_deref(),
            Some(r#"["A2"]"#)
        );
    }

    #[tokio::test]
    async fn test_unknown_item_rejected() {
        let (cart, _) = setup(ListKind::Cart).await;
        assert!(matches!(
            cart.add("u1", "NOPE").await,
            Err(SavedItemsError::UnknownItem(code)) if code == "NOPE"
        ));
    }
}
// endregion: --- Tests

/// 상품 카탈로그
/// 1. 상품 등록
/// 2. 상품 조회 (전체, 코드, 카테고리, 판매자)
// region:    --- Imports
use crate::storage::{self, KeyValueStore, StorageError};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub mod model;

pub use model::{AuctionItem, NewItem};
// endregion: --- Imports

const ITEMS_KEY: &str = "bidItems";

// region:    --- Catalog Error
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid item: {0}")]
    Invalid(String),
    #[error("item code already listed: {0}")]
    DuplicateCode(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
// endregion: --- Catalog Error

// region:    --- Item Catalog Trait
/// 입찰 원장이 사용하는 읽기 전용 카탈로그 인터페이스
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    async fn item(&self, code: &str) -> Result<Option<AuctionItem>, StorageError>;
}
// endregion: --- Item Catalog Trait

// region:    --- Stored Catalog
pub struct StoredCatalog {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl StoredCatalog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// 저장 순서(오래된 순) 그대로 읽는다
    async fn load(&self) -> Result<Vec<AuctionItem>, StorageError> {
        Ok(storage::get_json(self.store.as_ref(), ITEMS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// 1. 상품 등록
    pub async fn add_item(&self, new_item: NewItem) -> Result<AuctionItem, CatalogError> {
        validate(&new_item)?;

        let _guard = self.write_lock.lock().await;
        let mut items = self.load().await?;

        let code = match new_item.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => Uuid::new_v4().simple().to_string().to_uppercase(),
        };
        if items.iter().any(|item| item.code == code) {
            warn!("{:<12} --> 중복된 상품 코드: {}", "Catalog", code);
            return Err(CatalogError::DuplicateCode(code));
        }

        let item = AuctionItem {
            code,
            name: new_item.name.trim().to_string(),
            seller: new_item.seller.trim().to_string(),
            category: new_item.category.trim().to_string(),
            condition: new_item.condition,
            description: new_item.description,
            listing_price: new_item.listing_price,
            email: optional(new_item.email),
            contact: optional(new_item.contact),
            location: optional(new_item.location),
            created_at: Utc::now(),
        };
        items.push(item.clone());
        storage::set_json(self.store.as_ref(), ITEMS_KEY, &items).await?;

        info!("{:<12} --> 상품 등록: {}", "Catalog", item.code);
        Ok(item)
    }

    /// 2. 전체 상품 조회 (최신순)
    pub async fn list_items(&self) -> Result<Vec<AuctionItem>, StorageError> {
        let mut items = self.load().await?;
        items.reverse();
        Ok(items)
    }

    /// 카테고리별 조회 (대소문자 무시)
    pub async fn items_in_category(&self, category: &str) -> Result<Vec<AuctionItem>, StorageError> {
        let category = category.trim();
        Ok(self
            .list_items()
            .await?
            .into_iter()
            .filter(|item| item.category.eq_ignore_ascii_case(category))
            .collect())
    }

    /// 판매자별 조회
    pub async fn items_by_seller(&self, seller: &str) -> Result<Vec<AuctionItem>, StorageError> {
        Ok(self
            .list_items()
            .await?
            .into_iter()
            .filter(|item| item.seller == seller)
            .collect())
    }
}

#[async_trait]
impl ItemCatalog for StoredCatalog {
    async fn item(&self, code: &str) -> Result<Option<AuctionItem>, StorageError> {
        Ok(self.load().await?.into_iter().find(|item| item.code == code))
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(new_item: &NewItem) -> Result<(), CatalogError> {
    for (field, value) in [
        ("name", &new_item.name),
        ("seller", &new_item.seller),
        ("category", &new_item.category),
    ] {
        if value.trim().is_empty() {
            return Err(CatalogError::Invalid(format!("{} is required", field)));
        }
    }
    if new_item.listing_price <= Decimal::ZERO {
        return Err(CatalogError::Invalid(
            "listing_price must be positive".to_string(),
        ));
    }
    Ok(())
}
// endregion: --- Stored Catalog

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use rust_decimal_macros::dec;

    fn new_item(code: Option<&str>, category: &str, seller: &str) -> NewItem {
        NewItem {
            code: code.map(str::to_string),
            name: "Apple iPhone 14".to_string(),
            seller: seller.to_string(),
            category: category.to_string(),
            condition: "Used".to_string(),
            description: "128GB".to_string(),
            listing_price: dec!(1200.00),
            email: None,
            contact: None,
            location: None,
        }
    }

    #[tokio::test]
    async fn test_add_and_lookup_item() {
        let catalog = StoredCatalog::new(Arc::new(MemoryStore::new()));
        let item = catalog
            .add_item(new_item(Some("A123"), "Electronics", "jane"))
            .await
            .unwrap();

        assert_eq!(item.code, "A123");
        let found = catalog.item("A123").await.unwrap().unwrap();
        assert_eq!(found, item);
        assert!(catalog.item("B999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seller_contact_fields_are_kept() {
        let catalog = StoredCatalog::new(Arc::new(MemoryStore::new()));
        let mut listing = new_item(Some("C1"), "Electronics", "jane");
        listing.email = Some("jane@example.com".to_string());
        listing.contact = Some(" 0771234567 ".to_string());
        listing.location = Some("  ".to_string());
        catalog.add_item(listing).await.unwrap();

        let found = catalog.item("C1").await.unwrap().unwrap();
        assert_eq!(found.email.as_deref(), Some("jane@example.com"));
        assert_eq!(found.contact.as_deref(), Some("0771234567"));
        assert_eq!(found.location, None);
    }

    #[tokio::test]
    async fn test_generated_code_when_missing() {
        let catalog = StoredCatalog::new(Arc::new(MemoryStore::new()));
        let item = catalog
            .add_item(new_item(None, "Electronics", "jane"))
            .await
            .unwrap();
        assert_eq!(item.code.len(), 32);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let catalog = StoredCatalog::new(Arc::new(MemoryStore::new()));
        catalog
            .add_item(new_item(Some("A123"), "Electronics", "jane"))
            .await
            .unwrap();
        let result = catalog
            .add_item(new_item(Some("A123"), "Books", "john"))
            .await;
        assert!(matches!(result, Err(CatalogError::DuplicateCode(code)) if code == "A123"));
    }

    #[tokio::test]
    async fn test_invalid_items_rejected() {
        let catalog = StoredCatalog::new(Arc::new(MemoryStore::new()));

        let mut item = new_item(Some("A1"), "Electronics", "jane");
        item.listing_price = dec!(0);
        assert!(matches!(
            catalog.add_item(item).await,
            Err(CatalogError::Invalid(_))
        ));

        let item = new_item(Some("A2"), "  ", "jane");
        assert!(matches!(
            catalog.add_item(item).await,
            Err(CatalogError::Invalid(_))
        ));
        assert!(catalog.list_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_filters_and_newest_first() {
        let catalog = StoredCatalog::new(Arc::new(MemoryStore::new()));
        catalog
            .add_item(new_item(Some("A1"), "Electronics", "jane"))
            .await
            .unwrap();
        catalog
            .add_item(new_item(Some("B1"), "Books", "john"))
            .await
            .unwrap();
        catalog
            .add_item(new_item(Some("A2"), "electronics", "john"))
            .await
            .unwrap();

        let codes = |items: Vec<AuctionItem>| -> Vec<String> {
            items.into_iter().map(|item| item.code).collect()
        };
        assert_eq!(codes(catalog.list_items().await.unwrap()), ["A2", "B1", "A1"]);
        assert_eq!(
            codes(catalog.items_in_category("Electronics").await.unwrap()),
            ["A2", "A1"]
        );
        assert_eq!(
            codes(catalog.items_by_seller("john").await.unwrap()),
            ["A2", "B1"]
        );
    }
}
// endregion: --- Tests

/// 입찰 원장
/// 1. 최고 입찰가 조회
/// 2. 입찰 (검증 후 상품 단위로 직렬화된 읽기-비교-쓰기)
// region:    --- Imports
use super::model::{Bid, HighestBidRecord, HighestBidView};
use crate::catalog::{AuctionItem, ItemCatalog};
use crate::storage::{self, KeyValueStore, StorageError};
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Bid Error
#[derive(Debug, Error)]
pub enum BidError {
    #[error("invalid bid amount: {0:?}")]
    InvalidAmount(String),
    #[error("bid of {amount} does not exceed the current highest bid of {current_highest}")]
    BidTooLow {
        amount: Decimal,
        current_highest: Decimal,
    },
    #[error("bidder id is required")]
    MissingBidder,
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
// endregion: --- Bid Error

// region:    --- Storage Keys
/// 호환성이 필요한 유일한 키: 십진수 금액 문자열
fn highest_bid_key(item_code: &str) -> String {
    format!("highest_bid_{}", item_code)
}

fn record_key(item_code: &str) -> String {
    format!("bid_record_{}", item_code)
}

fn history_key(item_code: &str) -> String {
    format!("bid_history_{}", item_code)
}
// endregion: --- Storage Keys

/// 입찰 금액 파싱: 0보다 큰 십진수만 허용
pub fn parse_amount(raw: &str) -> Result<Decimal, BidError> {
    let trimmed = raw.trim();
    // 지수 표기(1e+20)는 허용하지 않는다
    if trimmed.contains(|c: char| c == 'e' || c == 'E') {
        return Err(BidError::InvalidAmount(raw.to_string()));
    }
    let amount = Decimal::from_str(trimmed)
        .map_err(|_| BidError::InvalidAmount(raw.to_string()))?;
    if amount <= Decimal::ZERO {
        return Err(BidError::InvalidAmount(raw.to_string()));
    }
    Ok(amount)
}

// region:    --- Bid Ledger
pub struct BidLedger {
    store: Arc<dyn KeyValueStore>,
    catalog: Arc<dyn ItemCatalog>,
    item_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl BidLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, catalog: Arc<dyn ItemCatalog>) -> Self {
        Self {
            store,
            catalog,
            item_locks: DashMap::new(),
        }
    }

    async fn find_item(&self, item_code: &str) -> Result<AuctionItem, BidError> {
        self.catalog
            .item(item_code)
            .await?
            .ok_or_else(|| BidError::UnknownItem(item_code.to_string()))
    }

    fn item_lock(&self, item_code: &str) -> Arc<Mutex<()>> {
        self.item_locks
            .entry(item_code.to_string())
            .or_default()
            .clone()
    }

    async fn stored_highest(&self, item_code: &str) -> Result<Option<Decimal>, StorageError> {
        let key = highest_bid_key(item_code);
        match self.store.get(&key).await? {
            Some(raw) => Decimal::from_str(raw.trim())
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key,
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// 상품 등록가와 저장된 최고 입찰가 중 큰 값
    async fn current_highest(&self, item: &AuctionItem) -> Result<Decimal, StorageError> {
        let stored = self.stored_highest(&item.code).await?;
        Ok(stored.map_or(item.listing_price, |amount| amount.max(item.listing_price)))
    }

    /// 1. 최고 입찰가 조회
    pub async fn get_highest_bid(&self, item_code: &str) -> Result<Decimal, BidError> {
        let item = self.find_item(item_code).await?;
        Ok(self.current_highest(&item).await?)
    }

    /// 마지막으로 수락된 입찰 기록 (첫 입찰 전에는 None)
    pub async fn highest_bid_record(
        &self,
        item_code: &str,
    ) -> Result<Option<HighestBidRecord>, BidError> {
        self.find_item(item_code).await?;
        Ok(storage::get_json(self.store.as_ref(), &record_key(item_code)).await?)
    }

    /// 최고 입찰가와 기록을 한 번의 읽기로 조회
    /// 기록과 금액 키는 같은 set_many 로 저장되므로 기록의 금액이 곧 최고 입찰가다.
    pub async fn highest_bid_view(&self, item_code: &str) -> Result<HighestBidView, BidError> {
        let item = self.find_item(item_code).await?;
        let record: Option<HighestBidRecord> =
            storage::get_json(self.store.as_ref(), &record_key(&item.code)).await?;
        let highest_bid = match &record {
            Some(record) => record.amount.max(item.listing_price),
            None => self.current_highest(&item).await?,
        };
        Ok(HighestBidView {
            item_code: item.code,
            highest_bid,
            record,
        })
    }

    /// 입찰 이력 조회 (최신순)
    pub async fn bid_history(&self, item_code: &str) -> Result<Vec<Bid>, BidError> {
        self.find_item(item_code).await?;
        let mut history: Vec<Bid> = storage::get_json(self.store.as_ref(), &history_key(item_code))
            .await?
            .unwrap_or_default();
        history.reverse();
        Ok(history)
    }

    /// 2. 입찰
    pub async fn submit_bid(
        &self,
        item_code: &str,
        amount: &str,
        bidder_id: &str,
    ) -> Result<HighestBidRecord, BidError> {
        let amount = parse_amount(amount)?;
        let bidder_id = bidder_id.trim();
        if bidder_id.is_empty() {
            return Err(BidError::MissingBidder);
        }
        let item = self.find_item(item_code).await?;

        // 같은 상품에 대한 입찰은 여기서부터 커밋까지 직렬화된다
        let lock = self.item_lock(&item.code);
        let _guard = lock.lock().await;

        let current_highest = self.current_highest(&item).await?;
        if amount <= current_highest {
            warn!(
                "{:<12} --> 입찰 금액이 최고 입찰가보다 낮음: item={}, amount={}, highest={}",
                "Ledger", item.code, amount, current_highest
            );
            return Err(BidError::BidTooLow {
                amount,
                current_highest,
            });
        }

        let record = HighestBidRecord {
            item_code: item.code.clone(),
            amount,
            bidder_id: bidder_id.to_string(),
            bid_time: Utc::now(),
        };

        let history_key = history_key(&item.code);
        let mut history: Vec<Bid> = storage::get_json(self.store.as_ref(), &history_key)
            .await?
            .unwrap_or_default();
        history.push(Bid::from(&record));

        let record_key = record_key(&item.code);
        self.store
            .set_many(&[
                (highest_bid_key(&item.code), amount.to_string()),
                (record_key.clone(), storage::to_json(&record_key, &record)?),
                (history_key.clone(), storage::to_json(&history_key, &history)?),
            ])
            .await?;

        info!(
            "{:<12} --> 입찰 성공: item={}, bidder={}, amount={}",
            "Ledger", record.item_code, record.bidder_id, record.amount
        );
        Ok(record)
    }
}
// endregion: --- Bid Ledger

// endregion: --- Tests

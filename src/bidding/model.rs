use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// 입찰 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub item_code: String,
    pub bidder_id: String,
    pub amount: Decimal,
    pub bid_time: DateTime<Utc>,
}

// 최고 입찰 기록 (상품당 하나, 마지막으로 수락된 입찰)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighestBidRecord {
    pub item_code: String,
    pub amount: Decimal,
    pub bidder_id: String,
    pub bid_time: DateTime<Utc>,
}

// 최고 입찰가 조회 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighestBidView {
    pub item_code: String,
    pub highest_bid: Decimal,
    pub record: Option<HighestBidRecord>,
}

impl From<&HighestBidRecord> for Bid {
    fn from(record: &HighestBidRecord) -> Self {
        Bid {
            item_code: record.item_code.clone(),
            bidder_id: record.bidder_id.clone(),
            amount: record.amount,
            bid_time: record.bid_time,
        }
    }
}

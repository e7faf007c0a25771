use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// 경매 상품 모델 (등록 후 변경되지 않음)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionItem {
    pub code: String,
    pub name: String,
    pub seller: String,
    pub category: String,
    pub condition: String,
    pub description: String,
    pub listing_price: Decimal,
    // 판매자 연락처 (선택)
    pub email: Option<String>,
    pub contact: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

// 상품 등록 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    pub seller: String,
    pub category: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub description: String,
    pub listing_price: Decimal,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

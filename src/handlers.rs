// region:    --- Imports
use crate::account::{AccountError, AccountRegistry, NewProfile, Session};
use crate::bidding::{BidError, BidLedger};
use crate::catalog::{CatalogError, ItemCatalog, NewItem, StoredCatalog};
use crate::saved::{ListKind, SavedItems, SavedItemsError};
use crate::storage::{KeyValueStore, StorageError};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

// endregion: --- Imports

// region:    --- App State
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<StoredCatalog>,
    pub ledger: Arc<BidLedger>,
    pub cart: Arc<SavedItems>,
    pub wishlist: Arc<SavedItems>,
    pub accounts: Arc<AccountRegistry>,
}

impl AppState {
    /// 하나의 저장소 위에 모든 컴포넌트를 구성
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let catalog = Arc::new(StoredCatalog::new(Arc::clone(&store)));
        let ledger = Arc::new(BidLedger::new(Arc::clone(&store), catalog.clone()));
        let cart = Arc::new(SavedItems::new(
            ListKind::Cart,
            Arc::clone(&store),
            catalog.clone(),
        ));
        let wishlist = Arc::new(SavedItems::new(
            ListKind::Wishlist,
            Arc::clone(&store),
            catalog.clone(),
        ));
        let accounts = Arc::new(AccountRegistry::new(store));
        Self {
            catalog,
            ledger,
            cart,
            wishlist,
            accounts,
        }
    }

    fn saved(&self, kind: ListKind) -> &SavedItems {
        match kind {
            ListKind::Cart => self.cart.as_ref(),
            ListKind::Wishlist => self.wishlist.as_ref(),
        }
    }
}

/// 라우터 설정
pub fn routes(state: AppState) -> Router {
    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/bid", post(handle_bid))
        .route("/items", get(handle_get_items).post(handle_add_item))
        .route("/items/:code", get(handle_get_item))
        .route("/items/:code/highest-bid", get(handle_get_highest_bid))
        .route("/items/:code/bids", get(handle_get_bid_history))
        .route("/accounts", post(handle_register))
        .route("/login", post(handle_login))
        .route("/users/:username/profile", get(handle_get_profile))
        .route(
            "/users/:username/cart",
            get(handle_get_cart).post(handle_add_to_cart),
        )
        .route("/users/:username/cart/:code", delete(handle_remove_from_cart))
        .route(
            "/users/:username/wishlist",
            get(handle_get_wishlist).post(handle_add_to_wishlist),
        )
        .route(
            "/users/:username/wishlist/:code",
            delete(handle_remove_from_wishlist),
        )
        .layer(cors)
        .with_state(state)
}
// endregion: --- App State

// region:    --- Error Responses
fn error_body(status: StatusCode, code: &str, message: String) -> Response {
    (status, Json(json!({ "error": message, "code": code }))).into_response()
}

fn storage_failure(e: &StorageError) -> Response {
    error!("{:<12} --> 저장소 오류: {}", "Handler", e);
    error_body(
        StatusCode::INTERNAL_SERVER_ERROR,
        "STORAGE_ERROR",
        e.to_string(),
    )
}

impl IntoResponse for BidError {
    fn into_response(self) -> Response {
        match &self {
            BidError::InvalidAmount(_) => {
                error_body(StatusCode::BAD_REQUEST, "INVALID_AMOUNT", self.to_string())
            }
            BidError::MissingBidder => {
                error_body(StatusCode::BAD_REQUEST, "MISSING_BIDDER", self.to_string())
            }
            BidError::BidTooLow {
                amount,
                current_highest,
            } => (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": self.to_string(),
                    "code": "LOW_BID",
                    "bid_amount": amount,
                    "current_highest": current_highest,
                })),
            )
                .into_response(),
            BidError::UnknownItem(_) => {
                error_body(StatusCode::NOT_FOUND, "UNKNOWN_ITEM", self.to_string())
            }
            BidError::Storage(e) => storage_failure(e),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        match &self {
            CatalogError::Invalid(_) => {
                error_body(StatusCode::BAD_REQUEST, "INVALID_ITEM", self.to_string())
            }
            CatalogError::DuplicateCode(_) => {
                error_body(StatusCode::CONFLICT, "DUPLICATE_CODE", self.to_string())
            }
            CatalogError::Storage(e) => storage_failure(e),
        }
    }
}

impl IntoResponse for SavedItemsError {
    fn into_response(self) -> Response {
        match &self {
            SavedItemsError::UnknownItem(_) => {
                error_body(StatusCode::NOT_FOUND, "UNKNOWN_ITEM", self.to_string())
            }
            SavedItemsError::UnknownUser(_) => {
                error_body(StatusCode::NOT_FOUND, "UNKNOWN_USER", self.to_string())
            }
            SavedItemsError::Storage(e) => storage_failure(e),
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AccountError::MissingField(_) => (StatusCode::BAD_REQUEST, "MISSING_FIELD"),
            AccountError::PasswordMismatch => (StatusCode::BAD_REQUEST, "PASSWORD_MISMATCH"),
            AccountError::WeakPassword => (StatusCode::BAD_REQUEST, "WEAK_PASSWORD"),
            AccountError::UsernameTaken(_) => (StatusCode::CONFLICT, "USERNAME_TAKEN"),
            AccountError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AccountError::PasswordHash(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PASSWORD_HASH"),
            AccountError::Storage(e) => return storage_failure(e),
        };
        error_body(status, code, self.to_string())
    }
}

impl IntoResponse for StorageError {
    fn into_response(self) -> Response {
        storage_failure(&self)
    }
}
// endregion: --- Error Responses

// region:    --- Command Handlers

/// 입찰 요청
#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    pub item_code: String,
    pub bidder_id: String,
    /// 문자열 또는 숫자
    pub amount: Value,
}

/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    Json(req): Json<PlaceBidRequest>,
) -> Result<impl IntoResponse, BidError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Handler", req);

    let amount = match &req.amount {
        Value::String(raw) => raw.clone(),
        Value::Number(number) => number.to_string(),
        other => return Err(BidError::InvalidAmount(other.to_string())),
    };

    let record = state
        .ledger
        .submit_bid(&req.item_code, &amount, &req.bidder_id)
        .await?;

    Ok(Json(json!({
        "message": "입찰이 성공적으로 처리되었습니다.",
        "highest_bid": record.amount,
        "record": record,
    })))
}

/// 상품 등록
pub async fn handle_add_item(
    State(state): State<AppState>,
    Json(new_item): Json<NewItem>,
) -> Result<impl IntoResponse, CatalogError> {
    info!("{:<12} --> 상품 등록 요청: {}", "Handler", new_item.name);
    let item = state.catalog.add_item(new_item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// 회원가입
pub async fn handle_register(
    State(state): State<AppState>,
    Json(new_profile): Json<NewProfile>,
) -> Result<impl IntoResponse, AccountError> {
    info!("{:<12} --> 회원가입 요청: {}", "Handler", new_profile.username);
    let profile = state.accounts.register(new_profile).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 로그인
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Session>, AccountError> {
    info!("{:<12} --> 로그인 요청: {}", "Handler", req.username);
    let session = state.accounts.login(&req.username, &req.password).await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct SavedItemRequest {
    pub item_code: String,
}

/// 장바구니 / 위시리스트는 가입된 사용자만 가질 수 있다
async fn ensure_registered(state: &AppState, username: &str) -> Result<(), SavedItemsError> {
    if state.accounts.is_registered(username).await? {
        Ok(())
    } else {
        warn!("{:<12} --> 미가입 사용자: {}", "Handler", username);
        Err(SavedItemsError::UnknownUser(username.to_string()))
    }
}

async fn add_saved(
    state: &AppState,
    kind: ListKind,
    username: &str,
    item_code: &str,
) -> Result<Response, SavedItemsError> {
    info!(
        "{:<12} --> {:?} 추가 요청: user={}, item={}",
        "Handler", kind, username, item_code
    );
    ensure_registered(state, username).await?;
    let saved = state.saved(kind);
    saved.add(username, item_code).await?;
    Ok(Json(saved.items(username).await?).into_response())
}

async fn remove_saved(
    state: &AppState,
    kind: ListKind,
    username: &str,
    item_code: &str,
) -> Result<Response, SavedItemsError> {
    info!(
        "{:<12} --> {:?} 제거 요청: user={}, item={}",
        "Handler", kind, username, item_code
    );
    ensure_registered(state, username).await?;
    let saved = state.saved(kind);
    saved.remove(username, item_code).await?;
    Ok(Json(saved.items(username).await?).into_response())
}

async fn list_saved(
    state: &AppState,
    kind: ListKind,
    username: &str,
) -> Result<Response, SavedItemsError> {
    info!("{:<12} --> {:?} 조회: user={}", "HandlerQuery", kind, username);
    ensure_registered(state, username).await?;
    Ok(Json(state.saved(kind).items(username).await?).into_response())
}

pub async fn handle_add_to_cart(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(req): Json<SavedItemRequest>,
) -> Result<Response, SavedItemsError> {
    add_saved(&state, ListKind::Cart, &username, &req.item_code).await
}

pub async fn handle_remove_from_cart(
    State(state): State<AppState>,
    Path((username, code)): Path<(String, String)>,
) -> Result<Response, SavedItemsError> {
    remove_saved(&state, ListKind::Cart, &username, &code).await
}

pub async fn handle_add_to_wishlist(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(req): Json<SavedItemRequest>,
) -> Result<Response, SavedItemsError> {
    add_saved(&state, ListKind::Wishlist, &username, &req.item_code).await
}

pub async fn handle_remove_from_wishlist(
    State(state): State<AppState>,
    Path((username, code)): Path<(String, String)>,
) -> Result<Response, SavedItemsError> {
    remove_saved(&state, ListKind::Wishlist, &username, &code).await
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

#[derive(Debug, Default, Deserialize)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub seller: Option<String>,
}

/// 상품 목록 조회 (카테고리 또는 판매자 필터)
pub async fn handle_get_items(
    State(state): State<AppState>,
    Query(filter): Query<ItemFilter>,
) -> Result<impl IntoResponse, StorageError> {
    info!("{:<12} --> 상품 목록 조회: {:?}", "HandlerQuery", filter);
    let items = match (&filter.category, &filter.seller) {
        (Some(category), seller) => {
            let mut items = state.catalog.items_in_category(category).await?;
            if let Some(seller) = seller {
                items.retain(|item| &item.seller == seller);
            }
            items
        }
        (None, Some(seller)) => state.catalog.items_by_seller(seller).await?,
        (None, None) => state.catalog.list_items().await?,
    };
    Ok(Json(items))
}

/// 상품 조회
pub async fn handle_get_item(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, StorageError> {
    info!("{:<12} --> 상품 조회 code: {}", "HandlerQuery", code);
    Ok(match state.catalog.item(&code).await? {
        Some(item) => Json(item).into_response(),
        None => error_body(
            StatusCode::NOT_FOUND,
            "UNKNOWN_ITEM",
            format!("unknown item: {}", code),
        ),
    })
}

/// 최고 입찰가 조회
pub async fn handle_get_highest_bid(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, BidError> {
    info!("{:<12} --> 최고 입찰가 조회 code: {}", "HandlerQuery", code);
    let view = state.ledger.highest_bid_view(&code).await?;
    Ok(Json(view))
}

/// 입찰 이력 조회
pub async fn handle_get_bid_history(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, BidError> {
    info!("{:<12} --> 입찰 이력 조회 code: {}", "HandlerQuery", code);
    Ok(Json(state.ledger.bid_history(&code).await?))
}

/// 프로필 조회
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Response, AccountError> {
    info!("{:<12} --> 프로필 조회: {}", "HandlerQuery", username);
    Ok(match state.accounts.profile(&username).await? {
        Some(profile) => Json(profile).into_response(),
        None => error_body(
            StatusCode::NOT_FOUND,
            "UNKNOWN_USER",
            format!("unknown user: {}", username),
        ),
    })
}

pub async fn handle_get_cart(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Response, SavedItemsError> {
    list_saved(&state, ListKind::Cart, &username).await
}

pub async fn handle_get_wishlist(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Response, SavedItemsError> {
    list_saved(&state, ListKind::Wishlist, &username).await
}

// endregion: --- Query Handlers

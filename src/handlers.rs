//! HTTP shim over the core operations. Handlers stay thin: decode the
//! request, call one core operation, map `CoreError` to a status code.

// region:    --- Imports
use crate::auction::browse::{self, AuctionDetail, BrowseFilter};
use crate::auction::lifecycle::{self, CreateAuctionCommand};
use crate::auction::model::{Auction, AuctionSummary, Category, UserBid};
use crate::bidding::commands as bidding;
use crate::bidding::model::PlaceBidCommand;
use crate::database::DatabaseManager;
use crate::error::CoreError;
use crate::money::Money;
use crate::notification::{self, Notification};
use crate::payment;
use crate::wallet::{self, WalletTransaction};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

// endregion: --- Imports

type Db = State<Arc<DatabaseManager>>;

// region:    --- Request bodies

#[derive(Debug, Deserialize)]
pub struct BidRequest {
    pub bidder_id: i64,
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
pub struct SellerRequest {
    pub seller_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub user_id: i64,
    pub amount: Money,
    pub method: String,
}

#[derive(Debug, Deserialize)]
pub struct CashOutRequest {
    pub user_id: i64,
    pub amount: Money,
    pub bank_details: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub buyer_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

// endregion: --- Request bodies

// region:    --- Auction handlers

pub async fn handle_create_auction(
    State(db): Db,
    Json(cmd): Json<CreateAuctionCommand>,
) -> Result<impl IntoResponse, CoreError> {
    let auction_id = lifecycle::create_auction(&db, cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "auction_id": auction_id })),
    ))
}

pub async fn handle_list_categories(
    State(db): Db,
) -> Result<Json<Vec<Category>>, CoreError> {
    Ok(Json(browse::list_categories(&db).await?))
}

pub async fn handle_list_auctions(
    State(db): Db,
    Query(filter): Query<BrowseFilter>,
) -> Result<Json<Vec<AuctionSummary>>, CoreError> {
    Ok(Json(browse::list_active_auctions(&db, &filter).await?))
}

pub async fn handle_get_auction(
    State(db): Db,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, CoreError> {
    match browse::get_auction(&db, auction_id).await? {
        Some(detail) => Ok(Json(detail).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Auction not found" })),
        )
            .into_response()),
    }
}

pub async fn handle_place_bid(
    State(db): Db,
    Path(auction_id): Path<i64>,
    Json(req): Json<BidRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let cmd = PlaceBidCommand {
        auction_id,
        bidder_id: req.bidder_id,
        amount: req.amount,
    };
    let message = bidding::place_bid(&db, cmd).await?;
    Ok(Json(json!({ "message": message })))
}

pub async fn handle_sell_now(
    State(db): Db,
    Path(auction_id): Path<i64>,
    Json(req): Json<SellerRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let message = lifecycle::sell_now(&db, auction_id, req.seller_id).await?;
    Ok(Json(json!({ "message": message })))
}

pub async fn handle_end_now(
    State(db): Db,
    Path(auction_id): Path<i64>,
    Json(req): Json<SellerRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let message = lifecycle::end_now(&db, auction_id, req.seller_id).await?;
    Ok(Json(json!({ "message": message })))
}

/// External trigger for the expiry sweep (cron or polling caller).
pub async fn handle_close_expired(State(db): Db) -> Result<impl IntoResponse, CoreError> {
    let closed = lifecycle::close_expired_auctions(&db).await?;
    Ok(Json(json!({ "closed": closed })))
}

// endregion: --- Auction handlers

// region:    --- Wallet handlers

pub async fn handle_wallet_balance(
    State(db): Db,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, CoreError> {
    let balance = wallet::balance(&db, user_id).await?;
    Ok(Json(json!({
        "balance": balance,
        "display": balance.to_string(),
    })))
}

pub async fn handle_wallet_topup(
    State(db): Db,
    Json(req): Json<TopUpRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let message = wallet::top_up(&db, req.user_id, req.amount, &req.method).await?;
    Ok(Json(json!({ "message": message })))
}

pub async fn handle_wallet_cashout(
    State(db): Db,
    Json(req): Json<CashOutRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let message = wallet::cash_out(&db, req.user_id, req.amount, &req.bank_details).await?;
    Ok(Json(json!({ "message": message })))
}

pub async fn handle_wallet_transactions(
    State(db): Db,
    Path(user_id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<WalletTransaction>>, CoreError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    Ok(Json(wallet::transactions(&db, user_id, limit).await?))
}

pub async fn handle_total_earned(
    State(db): Db,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, CoreError> {
    let total = wallet::total_earned(&db, user_id).await?;
    Ok(Json(json!({ "total_earned": total })))
}

// endregion: --- Wallet handlers

// region:    --- Payment handlers

pub async fn handle_wallet_payment(
    State(db): Db,
    Path(auction_id): Path<i64>,
    Json(req): Json<PaymentRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let message = payment::process_wallet_payment(&db, auction_id, req.buyer_id).await?;
    Ok(Json(json!({ "message": message })))
}

pub async fn handle_mark_payment_complete(
    State(db): Db,
    Path(auction_id): Path<i64>,
    Json(req): Json<UserRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let paid = payment::mark_payment_complete(&db, auction_id, req.user_id).await?;
    Ok(Json(json!({ "paid": paid })))
}

// endregion: --- Payment handlers

// region:    --- Notification handlers

pub async fn handle_list_notifications(
    State(db): Db,
    Path(user_id): Path<i64>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, CoreError> {
    Ok(Json(
        notification::list_notifications(&db, user_id, query.unread_only).await?,
    ))
}

pub async fn handle_mark_notifications_read(
    State(db): Db,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, CoreError> {
    let updated = notification::mark_notifications_read(&db, user_id).await?;
    Ok(Json(json!({ "updated": updated })))
}

// endregion: --- Notification handlers

// region:    --- User history handlers

pub async fn handle_user_bids(
    State(db): Db,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<UserBid>>, CoreError> {
    Ok(Json(browse::user_bids(&db, user_id).await?))
}

pub async fn handle_user_auctions(
    State(db): Db,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<AuctionSummary>>, CoreError> {
    Ok(Json(browse::seller_auctions(&db, user_id).await?))
}

pub async fn handle_won_auctions(
    State(db): Db,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Auction>>, CoreError> {
    Ok(Json(browse::won_auctions(&db, user_id).await?))
}

pub async fn handle_pending_payments(
    State(db): Db,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Auction>>, CoreError> {
    Ok(Json(browse::pending_payments(&db, user_id).await?))
}

// endregion: --- User history handlers

//! Read side: auction detail and filtered browsing, plus the per-user
//! history views the dashboard shows.

// region:    --- Imports
use crate::bidding::model::Bid;
use crate::database::DatabaseManager;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use tracing::info;

use super::model::{Auction, AuctionSummary, Category, UserBid};
use super::queries;

// endregion: --- Imports

// region:    --- Filters

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct BrowseFilter {
    pub category_id: Option<i64>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Whitelisted sort keys; anything else is rejected rather than spliced
/// into the query.
fn sort_column(key: &str) -> Option<&'static str> {
    match key {
        "end_time" => Some("a.end_time"),
        "current_bid" => Some("current_bid"),
        "bid_count" => Some("bid_count"),
        "created_at" => Some("a.created_at"),
        _ => None,
    }
}

fn sort_direction(order: &str) -> Option<&'static str> {
    match order.to_ascii_uppercase().as_str() {
        "ASC" => Some("ASC"),
        "DESC" => Some("DESC"),
        _ => None,
    }
}

// endregion: --- Filters

// region:    --- Categories

/// Every category, for listing forms and browse filters.
pub async fn list_categories(db: &DatabaseManager) -> CoreResult<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>(queries::GET_CATEGORIES)
        .fetch_all(db.pool())
        .await?;
    Ok(categories)
}

// endregion: --- Categories

// region:    --- Detail

#[derive(Debug, Serialize)]
pub struct AuctionDetail {
    #[serde(flatten)]
    pub auction: AuctionSummary,
    pub bid_history: Vec<Bid>,
}

/// One auction with computed bid count, computed current bid and its last
/// ten bids.
pub async fn get_auction(db: &DatabaseManager, auction_id: i64) -> CoreResult<Option<AuctionDetail>> {
    info!("{:<12} --> get auction id: {}", "Browse", auction_id);
    let Some(auction) = sqlx::query_as::<_, AuctionSummary>(queries::GET_AUCTION_DETAIL)
        .bind(auction_id)
        .fetch_optional(db.pool())
        .await?
    else {
        return Ok(None);
    };

    let bid_history = sqlx::query_as::<_, Bid>(queries::GET_BID_HISTORY)
        .bind(auction_id)
        .fetch_all(db.pool())
        .await?;

    Ok(Some(AuctionDetail {
        auction,
        bid_history,
    }))
}

// endregion: --- Detail

// region:    --- Browse

/// Active auctions matching the filter, with bid aggregates.
pub async fn list_active_auctions(
    db: &DatabaseManager,
    filter: &BrowseFilter,
) -> CoreResult<Vec<AuctionSummary>> {
    info!("{:<12} --> list active auctions: {:?}", "Browse", filter);

    let sort = match &filter.sort_by {
        Some(key) => sort_column(key)
            .ok_or_else(|| CoreError::Validation(format!("Unknown sort key: {key}")))?,
        None => "a.end_time",
    };
    let direction = match &filter.order {
        Some(order) => sort_direction(order)
            .ok_or_else(|| CoreError::Validation(format!("Unknown sort order: {order}")))?,
        None => "ASC",
    };
    let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = filter.offset.unwrap_or(0).max(0);

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT a.auction_id, a.seller_id, u.username AS seller_name, a.title, \
                a.description, a.image_path, a.category_id, c.category_name, \
                a.starting_bid, \
                CAST(COALESCE(MAX(b.bid_amount), a.starting_bid) AS BIGINT) AS current_bid, \
                COUNT(DISTINCT b.bidder_id) AS bid_count, \
                a.status, a.end_time, a.created_at \
         FROM auctions a \
         LEFT JOIN users u ON a.seller_id = u.user_id \
         LEFT JOIN categories c ON a.category_id = c.category_id \
         LEFT JOIN bids b ON a.auction_id = b.auction_id \
         WHERE a.status = 'active' AND a.end_time > now()",
    );

    if let Some(category_id) = filter.category_id {
        query.push(" AND a.category_id = ");
        query.push_bind(category_id);
    }
    if let Some(min_price) = filter.min_price {
        query.push(" AND a.current_bid >= ");
        query.push_bind(min_price);
    }
    if let Some(max_price) = filter.max_price {
        query.push(" AND a.current_bid <= ");
        query.push_bind(max_price);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        query.push(" AND (a.title ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR a.description ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    query.push(" GROUP BY a.auction_id, u.username, c.category_name");
    query.push(format!(" ORDER BY {sort} {direction}"));
    query.push(" LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(offset);

    let auctions = query
        .build_query_as::<AuctionSummary>()
        .fetch_all(db.pool())
        .await?;
    Ok(auctions)
}

// endregion: --- Browse

// region:    --- User history

/// All bids a user has placed, flagged with whether each still leads.
pub async fn user_bids(db: &DatabaseManager, user_id: i64) -> CoreResult<Vec<UserBid>> {
    let bids = sqlx::query_as::<_, UserBid>(queries::GET_USER_BIDS)
        .bind(user_id)
        .fetch_all(db.pool())
        .await?;
    Ok(bids)
}

pub async fn seller_auctions(db: &DatabaseManager, user_id: i64) -> CoreResult<Vec<AuctionSummary>> {
    let auctions = sqlx::query_as::<_, AuctionSummary>(queries::GET_SELLER_AUCTIONS)
        .bind(user_id)
        .fetch_all(db.pool())
        .await?;
    Ok(auctions)
}

pub async fn won_auctions(db: &DatabaseManager, user_id: i64) -> CoreResult<Vec<Auction>> {
    let auctions = sqlx::query_as::<_, Auction>(queries::GET_WON_AUCTIONS)
        .bind(user_id)
        .fetch_all(db.pool())
        .await?;
    Ok(auctions)
}

/// Won auctions still awaiting payment.
pub async fn pending_payments(db: &DatabaseManager, user_id: i64) -> CoreResult<Vec<Auction>> {
    let auctions = sqlx::query_as::<_, Auction>(queries::GET_PENDING_PAYMENTS)
        .bind(user_id)
        .fetch_all(db.pool())
        .await?;
    Ok(auctions)
}

// endregion: --- User history

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keys_are_whitelisted() {
        assert_eq!(sort_column("end_time"), Some("a.end_time"));
        assert_eq!(sort_column("current_bid"), Some("current_bid"));
        assert_eq!(sort_column("bid_count"), Some("bid_count"));
        assert_eq!(sort_column("created_at"), Some("a.created_at"));
        assert_eq!(sort_column("title; DROP TABLE auctions"), None);
        assert_eq!(sort_column(""), None);
    }

    #[test]
    fn sort_direction_is_whitelisted() {
        assert_eq!(sort_direction("asc"), Some("ASC"));
        assert_eq!(sort_direction("DESC"), Some("DESC"));
        assert_eq!(sort_direction("sideways"), None);
    }
}

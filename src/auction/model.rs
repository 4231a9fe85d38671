use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Auction lifecycle states. `active` accepts bids; the other two are
/// terminal with respect to bidding.
pub mod status {
    pub const ACTIVE: &str = "active";
    pub const COMPLETED: &str = "completed";
    pub const SOLD: &str = "sold";
}

pub mod payment_status {
    pub const PAID: &str = "paid";
}

/// Artwork category, seeded at schema creation.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub category_id: i64,
    pub category_name: String,
}

/// One auction row.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Auction {
    pub auction_id: i64,
    pub seller_id: i64,
    pub title: String,
    pub description: String,
    pub image_path: Option<String>,
    pub category_id: Option<i64>,
    pub starting_bid: Money,
    pub current_bid: Money,
    pub status: String,
    pub end_time: DateTime<Utc>,
    pub winner_id: Option<i64>,
    pub sold_price: Option<Money>,
    pub payment_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == status::ACTIVE && now < self.end_time
    }

    /// Price a winner owes: the forced-sale price if one was set,
    /// otherwise the highest accepted bid.
    pub fn final_price(&self) -> Money {
        self.sold_price.unwrap_or(self.current_bid)
    }
}

/// Auction listing row with the aggregates browse pages show.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuctionSummary {
    pub auction_id: i64,
    pub seller_id: i64,
    pub seller_name: Option<String>,
    pub title: String,
    pub description: String,
    pub image_path: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub starting_bid: Money,
    pub current_bid: Money,
    pub bid_count: i64,
    pub status: String,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A bid a user placed, joined with its auction for history pages.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserBid {
    pub bid_id: i64,
    pub auction_id: i64,
    pub bid_amount: Money,
    pub bid_time: DateTime<Utc>,
    pub title: String,
    pub status: String,
    pub payment_status: Option<String>,
    pub end_time: DateTime<Utc>,
    pub current_highest_bid: Money,
    pub is_winning: bool,
}

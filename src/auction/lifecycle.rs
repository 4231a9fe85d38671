//! Auction lifecycle manager: creation, expiry sweeping and forced closure.
//!
//! Only this module moves an auction out of `active`. Every closing path
//! resolves the winner through [`winning_bid_in_tx`] and updates rows scoped
//! to `status = 'active'`, so overlapping sweeps and racing bids settle
//! deterministically: whoever takes the row lock first wins, the loser sees
//! a non-active auction.

// region:    --- Imports
use crate::config::{DEFAULT_AUCTION_DURATION_DAYS, MAXIMUM_BID_AMOUNT};
use crate::database::DatabaseManager;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::notification;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::model::{status, Auction};
use super::queries;

// endregion: --- Imports

// region:    --- Commands

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateAuctionCommand {
    pub seller_id: i64,
    pub title: String,
    pub description: String,
    pub image_path: Option<String>,
    pub category_id: Option<i64>,
    pub starting_bid: Money,
    pub duration_days: Option<i64>,
}

/// Highest bid on an auction at a point in time.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct WinningBid {
    pub bidder_id: i64,
    pub bid_amount: Money,
}

// endregion: --- Commands

// region:    --- Create

/// Create an auction and announce it to every other user. The insert and
/// the broadcast commit together.
pub async fn create_auction(db: &DatabaseManager, cmd: CreateAuctionCommand) -> CoreResult<i64> {
    info!("{:<12} --> create auction: {:?}", "Lifecycle", cmd.title);

    if cmd.title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".to_string()));
    }
    if cmd.starting_bid < Money::ZERO {
        return Err(CoreError::Validation(
            "Starting bid must not be negative".to_string(),
        ));
    }
    if cmd.starting_bid > MAXIMUM_BID_AMOUNT {
        return Err(CoreError::Validation(format!(
            "Starting bid must not exceed {MAXIMUM_BID_AMOUNT}"
        )));
    }
    let duration_days = cmd.duration_days.unwrap_or(DEFAULT_AUCTION_DURATION_DAYS);
    if duration_days <= 0 {
        return Err(CoreError::Validation(
            "Duration must be at least one day".to_string(),
        ));
    }
    let end_time = Utc::now() + Duration::days(duration_days);

    db.transaction(|tx| {
        Box::pin(async move {
            let auction_id: i64 = sqlx::query_scalar(queries::INSERT_AUCTION)
                .bind(cmd.seller_id)
                .bind(&cmd.title)
                .bind(&cmd.description)
                .bind(&cmd.image_path)
                .bind(cmd.category_id)
                .bind(cmd.starting_bid)
                .bind(end_time)
                .fetch_one(&mut **tx)
                .await?;

            let notified =
                notification::broadcast_new_auction_in_tx(tx, cmd.seller_id, &cmd.title).await?;
            debug!(
                "{:<12} --> auction {} announced to {} users",
                "Lifecycle", auction_id, notified
            );

            Ok(auction_id)
        })
    })
    .await
}

// endregion: --- Create

// region:    --- Winner determination

/// The one place that decides which bid wins an auction. Shared by the
/// expiry sweep, both forced-close paths and the outbid lookup.
pub async fn winning_bid_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    auction_id: i64,
) -> CoreResult<Option<WinningBid>> {
    let winning = sqlx::query_as::<_, WinningBid>(queries::WINNING_BID)
        .bind(auction_id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(winning)
}

// endregion: --- Winner determination

// region:    --- Expiry sweep

/// Close every `active` auction whose end time has passed; returns how many
/// were closed. Safe to run repeatedly and concurrently: expired rows are
/// locked for the duration of the sweep and the closing updates only touch
/// rows still `active`, so a second sweep finds nothing left to close.
pub async fn close_expired_auctions(db: &DatabaseManager) -> CoreResult<u64> {
    let now = Utc::now();
    let count = db
        .transaction(|tx| {
            Box::pin(async move {
                let expired = sqlx::query_as::<_, Auction>(queries::LOCK_EXPIRED_ACTIVE)
                    .bind(now)
                    .fetch_all(&mut **tx)
                    .await?;

                let mut closed = 0u64;
                for auction in expired {
                    let winning = winning_bid_in_tx(tx, auction.auction_id).await?;
                    let result = match winning {
                        Some(winning) => {
                            let result = sqlx::query(queries::CLOSE_WITH_WINNER)
                                .bind(status::COMPLETED)
                                .bind(winning.bidder_id)
                                .bind(None::<Money>)
                                .bind(auction.end_time)
                                .bind(auction.auction_id)
                                .execute(&mut **tx)
                                .await?;
                            if result.rows_affected() > 0 {
                                let message = format!(
                                    "Congratulations! You won the auction for '{}'",
                                    auction.title
                                );
                                notification::notify_in_tx(tx, winning.bidder_id, &message, "won")
                                    .await?;
                            }
                            result
                        }
                        None => {
                            sqlx::query(queries::CLOSE_WITHOUT_WINNER)
                                .bind(auction.auction_id)
                                .execute(&mut **tx)
                                .await?
                        }
                    };
                    closed += result.rows_affected();
                }
                Ok::<u64, CoreError>(closed)
            })
        })
        .await?;

    if count > 0 {
        info!("{:<12} --> closed {} expired auction(s)", "Lifecycle", count);
    }
    Ok(count)
}

// endregion: --- Expiry sweep

// region:    --- Forced closure

/// Seller-initiated immediate sale to the current highest bidder.
pub async fn sell_now(db: &DatabaseManager, auction_id: i64, seller_id: i64) -> CoreResult<String> {
    info!("{:<12} --> sell now auction: {}", "Lifecycle", auction_id);
    force_close(db, auction_id, seller_id, status::SOLD).await?;
    Ok("Auction sold immediately to highest bidder".to_string())
}

/// Seller-initiated early end; same closure, `completed` terminal state.
pub async fn end_now(db: &DatabaseManager, auction_id: i64, seller_id: i64) -> CoreResult<String> {
    info!("{:<12} --> end now auction: {}", "Lifecycle", auction_id);
    force_close(db, auction_id, seller_id, status::COMPLETED).await?;
    Ok("Auction ended successfully. Buyer has been notified".to_string())
}

async fn force_close(
    db: &DatabaseManager,
    auction_id: i64,
    seller_id: i64,
    final_status: &'static str,
) -> CoreResult<()> {
    db.transaction(|tx| {
        Box::pin(async move {
            let auction = sqlx::query_as::<_, Auction>(queries::LOCK_AUCTION)
                .bind(auction_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| CoreError::StateConflict("Auction not found".to_string()))?;

            if auction.seller_id != seller_id {
                return Err(CoreError::Authorization(
                    "You do not have permission to end this auction".to_string(),
                ));
            }
            if auction.status != status::ACTIVE {
                return Err(CoreError::StateConflict("Auction is not active".to_string()));
            }

            let winning = winning_bid_in_tx(tx, auction_id).await?.ok_or_else(|| {
                CoreError::StateConflict("No bids have been placed yet, cannot sell".to_string())
            })?;

            sqlx::query(queries::CLOSE_WITH_WINNER)
                .bind(final_status)
                .bind(winning.bidder_id)
                .bind(Some(winning.bid_amount))
                .bind(Utc::now())
                .bind(auction_id)
                .execute(&mut **tx)
                .await?;

            let message = match final_status {
                status::SOLD => format!(
                    "Congratulations! You won '{}' for {}. Please complete your payment.",
                    auction.title, winning.bid_amount
                ),
                _ => format!(
                    "Congratulations! The seller accepted your bid for '{}'. Please complete payment.",
                    auction.title
                ),
            };
            notification::notify_in_tx(tx, winning.bidder_id, &message, "won").await?;

            Ok(())
        })
    })
    .await
}

// endregion: --- Forced closure

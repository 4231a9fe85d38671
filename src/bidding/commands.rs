//! Bid engine: validates and records bids against an auction.

// region:    --- Imports
use crate::auction::model::Auction;
use crate::auction::queries;
use crate::config::{MAXIMUM_BID_AMOUNT, MINIMUM_BID_INCREMENT};
use crate::database::DatabaseManager;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::notification;
use chrono::{DateTime, Utc};
use tracing::info;

use super::model::PlaceBidCommand;

// endregion: --- Imports

// region:    --- Validation

/// Lowest amount the next bid on this auction may carry.
pub fn minimum_acceptable_bid(current_bid: Money) -> Money {
    current_bid + MINIMUM_BID_INCREMENT
}

/// Bid preconditions, checked in order; the first failure wins.
pub fn validate_bid(
    auction: &Auction,
    bidder_id: i64,
    amount: Money,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if !auction.is_active(now) {
        return Err(CoreError::StateConflict(
            "Auction is not active or has ended".to_string(),
        ));
    }
    if auction.seller_id == bidder_id {
        return Err(CoreError::Authorization(
            "You cannot bid on your own auction".to_string(),
        ));
    }
    if amount > MAXIMUM_BID_AMOUNT {
        return Err(CoreError::Validation(format!(
            "Bid must not exceed {MAXIMUM_BID_AMOUNT}"
        )));
    }
    let min_bid = minimum_acceptable_bid(auction.current_bid);
    if amount < min_bid {
        return Err(CoreError::Validation(format!(
            "Bid must be at least {min_bid}"
        )));
    }
    Ok(())
}

// endregion: --- Validation

// region:    --- Commands

/// Place a bid. Bid insert, current-bid update and the outbid notification
/// commit in one transaction; the auction row stays locked throughout, so
/// concurrent bids on one auction serialize and the floor check never sees
/// a stale current bid.
pub async fn place_bid(db: &DatabaseManager, cmd: PlaceBidCommand) -> CoreResult<String> {
    info!("{:<12} --> place bid: {:?}", "Bid", cmd);

    db.transaction(|tx| {
        Box::pin(async move {
            let auction = sqlx::query_as::<_, Auction>(queries::LOCK_AUCTION)
                .bind(cmd.auction_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| {
                    CoreError::StateConflict("Auction is not active or has ended".to_string())
                })?;

            validate_bid(&auction, cmd.bidder_id, cmd.amount, Utc::now())?;

            let previous_bidder = crate::auction::lifecycle::winning_bid_in_tx(tx, cmd.auction_id)
                .await?
                .map(|winning| winning.bidder_id);

            sqlx::query(queries::INSERT_BID)
                .bind(cmd.auction_id)
                .bind(cmd.bidder_id)
                .bind(cmd.amount)
                .execute(&mut **tx)
                .await?;

            sqlx::query(queries::UPDATE_CURRENT_BID)
                .bind(cmd.amount)
                .bind(cmd.auction_id)
                .execute(&mut **tx)
                .await?;

            if let Some(previous) = previous_bidder {
                if previous != cmd.bidder_id {
                    let message =
                        format!("You have been outbid on '{}'", auction.title);
                    notification::notify_in_tx(tx, previous, &message, "outbid").await?;
                }
            }

            Ok("Bid placed successfully".to_string())
        })
    })
    .await
}

// endregion: --- Commands

//! Payment settlement: bridges the auction lifecycle and the wallet
//! engine. `process_wallet_payment` is the only path that moves funds
//! between two wallets, and it does so in one transaction.

// region:    --- Imports
use crate::auction::model::{payment_status, Auction};
use crate::auction::queries;
use crate::database::DatabaseManager;
use crate::error::{CoreError, CoreResult};
use crate::notification;
use crate::wallet::{self, TransactionType};
use tracing::info;

// endregion: --- Imports

/// Settle a won auction from the buyer's wallet: debit buyer, credit
/// seller, append both ledger rows, mark the auction paid and notify the
/// seller. All of it commits or none of it does.
pub async fn process_wallet_payment(
    db: &DatabaseManager,
    auction_id: i64,
    buyer_id: i64,
) -> CoreResult<String> {
    info!(
        "{:<12} --> wallet payment auction: {} buyer: {}",
        "Payment", auction_id, buyer_id
    );

    db.transaction(|tx| {
        Box::pin(async move {
            let auction = sqlx::query_as::<_, Auction>(queries::LOCK_AUCTION)
                .bind(auction_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or_else(|| CoreError::StateConflict("Auction not found".to_string()))?;

            if auction.winner_id != Some(buyer_id) {
                return Err(CoreError::Authorization(
                    "You are not the winner of this auction".to_string(),
                ));
            }
            if auction.payment_status.as_deref() == Some(payment_status::PAID) {
                return Err(CoreError::StateConflict(
                    "Auction has already been paid".to_string(),
                ));
            }

            let amount = auction.final_price();
            let seller_id = auction.seller_id;

            // Both wallet rows locked in ascending user-id order before any
            // balance moves, so concurrent settlements cannot deadlock.
            sqlx::query("SELECT user_id FROM users WHERE user_id IN ($1, $2) ORDER BY user_id FOR UPDATE")
                .bind(buyer_id)
                .bind(seller_id)
                .execute(&mut **tx)
                .await?;

            wallet::debit_in_tx(
                tx,
                buyer_id,
                amount,
                TransactionType::PaymentMade,
                &format!("Payment for '{}'", auction.title),
                Some(auction_id),
            )
            .await?;

            wallet::credit_in_tx(
                tx,
                seller_id,
                amount,
                TransactionType::PaymentReceived,
                &format!("Payment received for '{}'", auction.title),
                Some(auction_id),
            )
            .await?;

            sqlx::query("UPDATE auctions SET payment_status = 'paid' WHERE auction_id = $1")
                .bind(auction_id)
                .execute(&mut **tx)
                .await?;

            let message = format!(
                "Payment of {} received for '{}' (added to wallet)",
                amount, auction.title
            );
            notification::notify_in_tx(tx, seller_id, &message, "won").await?;

            Ok("Payment completed successfully using wallet".to_string())
        })
    })
    .await
}

/// Settlement for non-wallet payment methods: flips `payment_status` and
/// notifies the seller, without moving any funds. Returns whether a row
/// was actually marked (caller must be the winner, auction not yet paid).
pub async fn mark_payment_complete(
    db: &DatabaseManager,
    auction_id: i64,
    user_id: i64,
) -> CoreResult<bool> {
    info!(
        "{:<12} --> mark payment complete auction: {} user: {}",
        "Payment", auction_id, user_id
    );

    db.transaction(|tx| {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE auctions SET payment_status = 'paid'
                 WHERE auction_id = $1 AND winner_id = $2
                   AND payment_status IS DISTINCT FROM 'paid'",
            )
            .bind(auction_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

            if result.rows_affected() == 0 {
                return Ok::<bool, CoreError>(false);
            }

            let (seller_id, title): (i64, String) =
                sqlx::query_as("SELECT seller_id, title FROM auctions WHERE auction_id = $1")
                    .bind(auction_id)
                    .fetch_one(&mut **tx)
                    .await?;

            let message = format!("Payment received for '{title}'");
            notification::notify_in_tx(tx, seller_id, &message, "won").await?;

            Ok(true)
        })
    })
    .await
}

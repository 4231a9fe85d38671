//! Notification emitter: appends notification rows as a side effect of
//! core state changes. Emission always happens on the caller's transaction
//! so it commits or rolls back together with the change that caused it.

// region:    --- Imports
use crate::database::DatabaseManager;
use crate::error::CoreResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};
use tracing::info;

// endregion: --- Imports

// region:    --- Model

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub notification_id: i64,
    pub user_id: i64,
    pub message: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Model

// region:    --- Emitter

/// Append one notification for one user.
pub async fn notify_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    message: &str,
    kind: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO notifications (user_id, message, type) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(message)
        .bind(kind)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Announce a new auction to every user except the seller.
///
/// One INSERT .. SELECT rather than a per-user insert loop; still O(users)
/// rows, but a single statement on the creating transaction.
pub async fn broadcast_new_auction_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    seller_id: i64,
    title: &str,
) -> Result<u64, sqlx::Error> {
    let message = format!("New auction available: '{title}'");
    let result = sqlx::query(
        "INSERT INTO notifications (user_id, message, type)
         SELECT user_id, $1, 'new_auction' FROM users WHERE user_id != $2",
    )
    .bind(&message)
    .bind(seller_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

// endregion: --- Emitter

// region:    --- Queries

/// Latest notifications for a user, newest first, capped at 20.
pub async fn list_notifications(
    db: &DatabaseManager,
    user_id: i64,
    unread_only: bool,
) -> CoreResult<Vec<Notification>> {
    info!(
        "{:<12} --> list notifications user: {} unread_only: {}",
        "Notify", user_id, unread_only
    );
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT notification_id, user_id, message, type, is_read, created_at
         FROM notifications
         WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
         ORDER BY created_at DESC, notification_id DESC
         LIMIT 20",
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(db.pool())
    .await?;
    Ok(notifications)
}

/// Flip the read flag on everything the user has; returns rows touched.
pub async fn mark_notifications_read(db: &DatabaseManager, user_id: i64) -> CoreResult<u64> {
    info!("{:<12} --> mark notifications read user: {}", "Notify", user_id);
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1")
        .bind(user_id)
        .execute(db.pool())
        .await?;
    Ok(result.rows_affected())
}

// endregion: --- Queries

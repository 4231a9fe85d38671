//! Wallet engine: the only component allowed to mutate `wallet_balance`.
//!
//! Every credit/debit locks the user row, writes the new balance and
//! appends a ledger row whose `balance_after` snapshots the balance as of
//! that transaction. Balance and ledger therefore reconcile at every point
//! in history.

// region:    --- Imports
use crate::config::{TOPUP_MAX, TOPUP_MIN};
use crate::database::DatabaseManager;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};
use tracing::info;

// endregion: --- Imports

// region:    --- Model

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    TopUp,
    CashOut,
    PaymentMade,
    PaymentReceived,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::TopUp => "top_up",
            TransactionType::CashOut => "cash_out",
            TransactionType::PaymentMade => "payment_made",
            TransactionType::PaymentReceived => "payment_received",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct WalletTransaction {
    pub transaction_id: i64,
    pub user_id: i64,
    pub transaction_type: String,
    pub amount: Money,
    pub balance_after: Money,
    pub description: String,
    pub reference_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Model

// region:    --- Validation

/// Top-up amounts must lie in [TOPUP_MIN, TOPUP_MAX].
pub fn validate_topup(amount: Money) -> CoreResult<()> {
    if amount < TOPUP_MIN || amount > TOPUP_MAX {
        return Err(CoreError::Validation(format!(
            "Top-up amount must be between {TOPUP_MIN} and {TOPUP_MAX}"
        )));
    }
    Ok(())
}

// endregion: --- Validation

// region:    --- Credit / Debit

/// Lock the user's row and return the current balance.
async fn balance_for_update(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
) -> CoreResult<Money> {
    let balance: Option<Money> =
        sqlx::query_scalar("SELECT wallet_balance FROM users WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
    balance.ok_or_else(|| CoreError::Validation("User not found".to_string()))
}

async fn write_balance(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    new_balance: Money,
    amount: Money,
    kind: TransactionType,
    description: &str,
    reference_id: Option<i64>,
) -> CoreResult<()> {
    sqlx::query("UPDATE users SET wallet_balance = $1 WHERE user_id = $2")
        .bind(new_balance)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        "INSERT INTO wallet_transactions
         (user_id, transaction_type, amount, balance_after, description, reference_id)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(user_id)
    .bind(kind.as_str())
    .bind(amount)
    .bind(new_balance)
    .bind(description)
    .bind(reference_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Add funds on the caller's transaction; returns the balance after.
pub async fn credit_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    amount: Money,
    kind: TransactionType,
    description: &str,
    reference_id: Option<i64>,
) -> CoreResult<Money> {
    if !amount.is_positive() {
        return Err(CoreError::Validation("Amount must be positive".to_string()));
    }
    let new_balance = balance_for_update(tx, user_id).await? + amount;
    write_balance(tx, user_id, new_balance, amount, kind, description, reference_id).await?;
    Ok(new_balance)
}

/// Remove funds on the caller's transaction; never lets the balance go
/// negative. Returns the balance after.
pub async fn debit_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    amount: Money,
    kind: TransactionType,
    description: &str,
    reference_id: Option<i64>,
) -> CoreResult<Money> {
    if !amount.is_positive() {
        return Err(CoreError::Validation("Amount must be positive".to_string()));
    }
    let current = balance_for_update(tx, user_id).await?;
    if current < amount {
        return Err(CoreError::InsufficientFunds(amount - current));
    }
    let new_balance = current - amount;
    write_balance(tx, user_id, new_balance, amount, kind, description, reference_id).await?;
    Ok(new_balance)
}

// endregion: --- Credit / Debit

// region:    --- Operations

/// Current balance; 0 for an unknown user, never a domain error.
pub async fn balance(db: &DatabaseManager, user_id: i64) -> CoreResult<Money> {
    let balance: Option<Money> =
        sqlx::query_scalar("SELECT wallet_balance FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(db.pool())
            .await?;
    Ok(balance.unwrap_or(Money::ZERO))
}

pub async fn top_up(
    db: &DatabaseManager,
    user_id: i64,
    amount: Money,
    method: &str,
) -> CoreResult<String> {
    info!(
        "{:<12} --> top up user: {} amount: {} via {}",
        "Wallet", user_id, amount, method
    );
    validate_topup(amount)?;
    let description = format!("Wallet top-up via {method}");
    db.transaction(|tx| {
        Box::pin(async move {
            credit_in_tx(tx, user_id, amount, TransactionType::TopUp, &description, None).await
        })
    })
    .await?;
    Ok(format!("{amount} added to your wallet"))
}

pub async fn cash_out(
    db: &DatabaseManager,
    user_id: i64,
    amount: Money,
    bank_details: &str,
) -> CoreResult<String> {
    info!(
        "{:<12} --> cash out user: {} amount: {}",
        "Wallet", user_id, amount
    );
    if !amount.is_positive() {
        return Err(CoreError::Validation("Amount must be positive".to_string()));
    }
    let description = format!("Cash out to {bank_details}");
    db.transaction(|tx| {
        Box::pin(async move {
            debit_in_tx(tx, user_id, amount, TransactionType::CashOut, &description, None).await
        })
    })
    .await?;
    Ok(format!("{amount} withdrawn from your wallet"))
}

/// Ledger slice for a user, newest first.
pub async fn transactions(
    db: &DatabaseManager,
    user_id: i64,
    limit: i64,
) -> CoreResult<Vec<WalletTransaction>> {
    let rows = sqlx::query_as::<_, WalletTransaction>(
        "SELECT transaction_id, user_id, transaction_type, amount, balance_after,
                description, reference_id, created_at
         FROM wallet_transactions
         WHERE user_id = $1
         ORDER BY created_at DESC, transaction_id DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

/// Total a seller has received from paid auctions.
pub async fn total_earned(db: &DatabaseManager, user_id: i64) -> CoreResult<Money> {
    let total: Money = sqlx::query_scalar(
        "SELECT CAST(COALESCE(SUM(amount), 0) AS BIGINT) FROM wallet_transactions
         WHERE user_id = $1 AND transaction_type = 'payment_received'",
    )
    .bind(user_id)
    .fetch_one(db.pool())
    .await?;
    Ok(total)
}

// endregion: --- Operations

//! Scenario tests against a live Postgres. Run them with:
//!
//! ```sh
//! DATABASE_URL=postgres://... cargo test -- --ignored
//! ```
//!
//! The schema is recreated once per test run; tests create their own users
//! and auctions so they can run in parallel.

use art_auction_service::auction::browse;
use art_auction_service::auction::lifecycle::{self, CreateAuctionCommand};
use art_auction_service::auction::model::{status, Auction};
use art_auction_service::bidding::commands::place_bid;
use art_auction_service::bidding::model::PlaceBidCommand;
use art_auction_service::config::Config;
use art_auction_service::database::DatabaseManager;
use art_auction_service::error::CoreError;
use art_auction_service::money::Money;
use art_auction_service::notification;
use art_auction_service::payment;
use art_auction_service::wallet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

static SCHEMA: OnceCell<()> = OnceCell::const_new();
static SEQ: AtomicU64 = AtomicU64::new(0);

async fn setup() -> Arc<DatabaseManager> {
    let config = Config::from_env().expect("DATABASE_URL must be set for integration tests");
    let db = Arc::new(
        DatabaseManager::new(&config)
            .await
            .expect("failed to connect"),
    );
    let schema_db = Arc::clone(&db);
    SCHEMA
        .get_or_init(|| async move {
            schema_db
                .initialize_database()
                .await
                .expect("failed to initialize schema");
        })
        .await;
    db
}

async fn create_user(db: &DatabaseManager, prefix: &str) -> i64 {
    let tag = format!(
        "{prefix}_{}_{}",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    );
    sqlx::query_scalar(
        "INSERT INTO users (username, email, password_hash)
         VALUES ($1, $2, 'x') RETURNING user_id",
    )
    .bind(&tag)
    .bind(format!("{tag}@example.com"))
    .fetch_one(db.pool())
    .await
    .expect("failed to create user")
}

async fn create_auction(db: &DatabaseManager, seller_id: i64, starting_bid: Money) -> i64 {
    lifecycle::create_auction(
        db,
        CreateAuctionCommand {
            seller_id,
            title: format!("Test Artwork {}", SEQ.fetch_add(1, Ordering::Relaxed)),
            description: "Oil on canvas".to_string(),
            image_path: None,
            category_id: None,
            starting_bid,
            duration_days: Some(7),
        },
    )
    .await
    .expect("failed to create auction")
}

async fn fetch_auction(db: &DatabaseManager, auction_id: i64) -> Auction {
    sqlx::query_as(
        "SELECT auction_id, seller_id, title, description, image_path, category_id,
                starting_bid, current_bid, status, end_time, winner_id, sold_price,
                payment_status, created_at
         FROM auctions WHERE auction_id = $1",
    )
    .bind(auction_id)
    .fetch_one(db.pool())
    .await
    .expect("auction should exist")
}

async fn expire(db: &DatabaseManager, auction_id: i64) {
    sqlx::query("UPDATE auctions SET end_time = now() - interval '1 second' WHERE auction_id = $1")
        .bind(auction_id)
        .execute(db.pool())
        .await
        .expect("failed to expire auction");
}

async fn bid(db: &DatabaseManager, auction_id: i64, bidder_id: i64, dollars: i64) -> Result<String, CoreError> {
    place_bid(
        db,
        PlaceBidCommand {
            auction_id,
            bidder_id,
            amount: Money::from_dollars(dollars),
        },
    )
    .await
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn bid_sequence_enforces_floor_and_notifies_outbid() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(100)).await;

    // $100 start, $5 increment: $100 is below the floor
    let err = bid(&db, auction_id, alice, 100).await.unwrap_err();
    assert_eq!(err.to_string(), "Bid must be at least $105.00");

    bid(&db, auction_id, alice, 105).await.unwrap();
    assert_eq!(
        fetch_auction(&db, auction_id).await.current_bid,
        Money::from_dollars(105)
    );

    let err = bid(&db, auction_id, bob, 108).await.unwrap_err();
    assert_eq!(err.to_string(), "Bid must be at least $110.00");

    bid(&db, auction_id, bob, 110).await.unwrap();
    assert_eq!(
        fetch_auction(&db, auction_id).await.current_bid,
        Money::from_dollars(110)
    );

    let alice_notifications = notification::list_notifications(&db, alice, true)
        .await
        .unwrap();
    assert!(
        alice_notifications
            .iter()
            .any(|n| n.kind == "outbid" && n.message.contains("You have been outbid")),
        "previous highest bidder should be told they were outbid"
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn seller_cannot_bid_on_own_auction() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(100)).await;

    let err = bid(&db, auction_id, seller, 500).await.unwrap_err();
    assert!(matches!(err, CoreError::Authorization(_)));
    assert_eq!(err.to_string(), "You cannot bid on your own auction");
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn sweep_closes_expired_auction_with_winner_exactly_once() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let alice = create_user(&db, "alice").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(100)).await;
    bid(&db, auction_id, alice, 105).await.unwrap();
    expire(&db, auction_id).await;

    lifecycle::close_expired_auctions(&db).await.unwrap();
    let closed = fetch_auction(&db, auction_id).await;
    assert_eq!(closed.status, status::COMPLETED);
    assert_eq!(closed.winner_id, Some(alice));
    assert_eq!(closed.sold_price, None, "normal expiry sets no sold price");

    let won: Vec<_> = notification::list_notifications(&db, alice, false)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.kind == "won")
        .collect();
    assert_eq!(won.len(), 1);

    // second sweep finds nothing left to close on this auction
    lifecycle::close_expired_auctions(&db).await.unwrap();
    let after = fetch_auction(&db, auction_id).await;
    assert_eq!(after.status, status::COMPLETED);
    assert_eq!(after.winner_id, Some(alice));
    let won_again: Vec<_> = notification::list_notifications(&db, alice, false)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.kind == "won")
        .collect();
    assert_eq!(won_again.len(), 1, "winner must not be notified twice");
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn zero_bid_auction_closes_without_winner() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(100)).await;
    expire(&db, auction_id).await;

    lifecycle::close_expired_auctions(&db).await.unwrap();
    let closed = fetch_auction(&db, auction_id).await;
    assert_eq!(closed.status, status::COMPLETED);
    assert_eq!(closed.winner_id, None);
    assert_eq!(closed.payment_status, None, "no winner means nothing to pay");
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn debit_never_reduces_balance_below_zero() {
    let db = setup().await;
    let user = create_user(&db, "wallet").await;
    wallet::top_up(&db, user, Money::from_dollars(50), "bank_transfer")
        .await
        .unwrap();

    let err = wallet::cash_out(&db, user, Money::from_dollars(80), "Maybank 1234")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InsufficientFunds(_)));
    assert_eq!(
        wallet::balance(&db, user).await.unwrap(),
        Money::from_dollars(50),
        "failed debit must leave the balance untouched"
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn topup_bounds_are_enforced() {
    let db = setup().await;
    let user = create_user(&db, "wallet").await;

    let err = wallet::top_up(&db, user, Money::from_dollars(5), "card")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(wallet::balance(&db, user).await.unwrap(), Money::ZERO);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn ledger_balance_after_reconciles_with_live_balance() {
    let db = setup().await;
    let user = create_user(&db, "wallet").await;
    wallet::top_up(&db, user, Money::from_dollars(100), "card")
        .await
        .unwrap();
    wallet::cash_out(&db, user, Money::from_dollars(30), "Maybank 1234")
        .await
        .unwrap();
    wallet::top_up(&db, user, Money::from_dollars(15), "card")
        .await
        .unwrap();

    let history = wallet::transactions(&db, user, 50).await.unwrap();
    assert_eq!(history.len(), 3);
    // newest first: each snapshot replays to the one before it
    assert_eq!(history[0].balance_after, Money::from_dollars(85));
    assert_eq!(history[1].balance_after, Money::from_dollars(70));
    assert_eq!(history[2].balance_after, Money::from_dollars(100));
    assert_eq!(
        wallet::balance(&db, user).await.unwrap(),
        history[0].balance_after,
        "latest ledger snapshot must equal the live balance"
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn wallet_payment_reports_exact_shortfall_and_changes_nothing() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let buyer = create_user(&db, "buyer").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(70)).await;
    bid(&db, auction_id, buyer, 80).await.unwrap();
    lifecycle::sell_now(&db, auction_id, seller).await.unwrap();

    wallet::top_up(&db, buyer, Money::from_dollars(50), "card")
        .await
        .unwrap();

    let err = payment::process_wallet_payment(&db, auction_id, buyer)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Insufficient wallet balance. You need $30.00 more."
    );
    assert_eq!(
        wallet::balance(&db, buyer).await.unwrap(),
        Money::from_dollars(50)
    );
    let auction = fetch_auction(&db, auction_id).await;
    assert_ne!(auction.payment_status.as_deref(), Some("paid"));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn wallet_payment_settles_atomically() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let buyer = create_user(&db, "buyer").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(70)).await;
    bid(&db, auction_id, buyer, 80).await.unwrap();
    lifecycle::sell_now(&db, auction_id, seller).await.unwrap();

    let sold = fetch_auction(&db, auction_id).await;
    assert_eq!(sold.status, status::SOLD);
    assert_eq!(sold.sold_price, Some(Money::from_dollars(80)));

    wallet::top_up(&db, buyer, Money::from_dollars(200), "card")
        .await
        .unwrap();
    payment::process_wallet_payment(&db, auction_id, buyer)
        .await
        .unwrap();

    assert_eq!(
        wallet::balance(&db, buyer).await.unwrap(),
        Money::from_dollars(120)
    );
    assert_eq!(
        wallet::balance(&db, seller).await.unwrap(),
        Money::from_dollars(80)
    );
    assert_eq!(
        wallet::total_earned(&db, seller).await.unwrap(),
        Money::from_dollars(80)
    );
    assert_eq!(
        fetch_auction(&db, auction_id).await.payment_status.as_deref(),
        Some("paid")
    );

    let buyer_ledger = wallet::transactions(&db, buyer, 50).await.unwrap();
    assert!(buyer_ledger
        .iter()
        .any(|t| t.transaction_type == "payment_made" && t.reference_id == Some(auction_id)));
    let seller_ledger = wallet::transactions(&db, seller, 50).await.unwrap();
    assert!(seller_ledger
        .iter()
        .any(|t| t.transaction_type == "payment_received" && t.reference_id == Some(auction_id)));

    // paying twice must be refused
    let err = payment::process_wallet_payment(&db, auction_id, buyer)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StateConflict(_)));
    assert_eq!(
        wallet::balance(&db, buyer).await.unwrap(),
        Money::from_dollars(120)
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn settlement_rolls_back_entirely_when_a_later_step_fails() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let buyer = create_user(&db, "buyer").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(70)).await;
    bid(&db, auction_id, buyer, 80).await.unwrap();
    lifecycle::sell_now(&db, auction_id, seller).await.unwrap();
    wallet::top_up(&db, buyer, Money::from_dollars(200), "card")
        .await
        .unwrap();

    // replay the settlement writes but fail after the debit and the
    // status flip have both executed
    let result: Result<(), CoreError> = db
        .transaction(|tx| {
            Box::pin(async move {
                wallet::debit_in_tx(
                    tx,
                    buyer,
                    Money::from_dollars(80),
                    wallet::TransactionType::PaymentMade,
                    "Payment for 'Test Artwork'",
                    Some(auction_id),
                )
                .await?;
                sqlx::query("UPDATE auctions SET payment_status = 'paid' WHERE auction_id = $1")
                    .bind(auction_id)
                    .execute(&mut **tx)
                    .await?;
                Err(CoreError::StateConflict(
                    "settlement interrupted".to_string(),
                ))
            })
        })
        .await;
    assert!(result.is_err());

    assert_eq!(
        wallet::balance(&db, buyer).await.unwrap(),
        Money::from_dollars(200),
        "rolled-back debit must leave the balance untouched"
    );
    let ledger = wallet::transactions(&db, buyer, 50).await.unwrap();
    assert!(
        ledger.iter().all(|t| t.transaction_type != "payment_made"),
        "rolled-back debit must leave no ledger row"
    );
    assert_ne!(
        fetch_auction(&db, auction_id).await.payment_status.as_deref(),
        Some("paid")
    );

    // the auction is still payable afterwards
    payment::process_wallet_payment(&db, auction_id, buyer)
        .await
        .unwrap();
    assert_eq!(
        wallet::balance(&db, buyer).await.unwrap(),
        Money::from_dollars(120)
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn non_winner_cannot_pay() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let buyer = create_user(&db, "buyer").await;
    let stranger = create_user(&db, "stranger").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(70)).await;
    bid(&db, auction_id, buyer, 80).await.unwrap();
    lifecycle::sell_now(&db, auction_id, seller).await.unwrap();

    let err = payment::process_wallet_payment(&db, auction_id, stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Authorization(_)));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn sell_now_requires_at_least_one_bid() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(100)).await;

    let err = lifecycle::sell_now(&db, auction_id, seller).await.unwrap_err();
    assert!(matches!(err, CoreError::StateConflict(_)));
    assert_eq!(fetch_auction(&db, auction_id).await.status, status::ACTIVE);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn only_the_seller_can_force_close() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let alice = create_user(&db, "alice").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(100)).await;
    bid(&db, auction_id, alice, 105).await.unwrap();

    let err = lifecycle::end_now(&db, auction_id, alice).await.unwrap_err();
    assert!(matches!(err, CoreError::Authorization(_)));
    assert_eq!(fetch_auction(&db, auction_id).await.status, status::ACTIVE);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn end_now_completes_with_sold_price() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let alice = create_user(&db, "alice").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(100)).await;
    bid(&db, auction_id, alice, 105).await.unwrap();

    lifecycle::end_now(&db, auction_id, seller).await.unwrap();
    let closed = fetch_auction(&db, auction_id).await;
    assert_eq!(closed.status, status::COMPLETED);
    assert_eq!(closed.winner_id, Some(alice));
    assert_eq!(closed.sold_price, Some(Money::from_dollars(105)));

    let pending = browse::pending_payments(&db, alice).await.unwrap();
    assert!(pending.iter().any(|a| a.auction_id == auction_id));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn mark_payment_complete_is_winner_only() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let alice = create_user(&db, "alice").await;
    let auction_id = create_auction(&db, seller, Money::from_dollars(100)).await;
    bid(&db, auction_id, alice, 105).await.unwrap();
    lifecycle::end_now(&db, auction_id, seller).await.unwrap();

    assert!(!payment::mark_payment_complete(&db, auction_id, seller)
        .await
        .unwrap());
    assert!(payment::mark_payment_complete(&db, auction_id, alice)
        .await
        .unwrap());
    assert!(
        !payment::mark_payment_complete(&db, auction_id, alice)
            .await
            .unwrap(),
        "already-paid auction must not be marked again"
    );
    assert_eq!(
        fetch_auction(&db, auction_id).await.payment_status.as_deref(),
        Some("paid")
    );
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn concurrent_bids_serialize_on_the_auction_row() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let mut bidders = Vec::new();
    for _ in 0..10 {
        bidders.push(create_user(&db, "bidder").await);
    }
    let auction_id = create_auction(&db, seller, Money::from_dollars(100)).await;

    let mut handles = Vec::new();
    for (i, bidder) in bidders.into_iter().enumerate() {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            bid(&db, auction_id, bidder, 105 + (i as i64) * 5).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            accepted += 1;
        }
    }
    assert!(accepted >= 1);

    // every accepted bid beat the one before it by the increment
    let bids: Vec<(i64,)> = sqlx::query_as(
        "SELECT bid_amount FROM bids WHERE auction_id = $1 ORDER BY bid_id ASC",
    )
    .bind(auction_id)
    .fetch_all(db.pool())
    .await
    .unwrap();
    assert_eq!(bids.len(), accepted);
    let mut floor = Money::from_dollars(100);
    for (cents,) in bids {
        let amount = Money::from_cents(cents);
        assert!(amount >= floor + art_auction_service::config::MINIMUM_BID_INCREMENT);
        floor = amount;
    }
    assert_eq!(fetch_auction(&db, auction_id).await.current_bid, floor);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn categories_are_seeded_and_listable() {
    let db = setup().await;
    let categories = browse::list_categories(&db).await.unwrap();
    assert!(categories.len() >= 5);
    assert!(categories.iter().any(|c| c.category_name == "Painting"));
    assert!(categories.iter().any(|c| c.category_name == "Sculpture"));
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn starting_bid_above_ceiling_is_rejected() {
    let db = setup().await;
    let seller = create_user(&db, "seller").await;
    let err = lifecycle::create_auction(
        &db,
        CreateAuctionCommand {
            seller_id: seller,
            title: "Priceless".to_string(),
            description: "".to_string(),
            image_path: None,
            category_id: None,
            starting_bid: Money::from_cents(i64::MAX),
            duration_days: Some(7),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(err.to_string(), "Starting bid must not exceed $100000000.00");
}

#[tokio::test]
#[ignore = "requires the service running on localhost:3000"]
async fn http_browse_smoke_test() {
    let client = reqwest::Client::new();
    let response = client
        .get("http://localhost:3000/auctions?sort_by=end_time&order=asc")
        .send()
        .await
        .expect("failed to reach server");
    assert!(response.status().is_success());
    let auctions: serde_json::Value = response.json().await.unwrap();
    assert!(auctions.is_array());
}

// region:    --- Imports
use art_auction_service::config::Config;
use art_auction_service::database::DatabaseManager;
use art_auction_service::handlers;
use art_auction_service::scheduler::AuctionScheduler;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(DatabaseManager::new(&config).await?);
    if let Err(e) = db.initialize_database().await {
        error!("{:<12} --> database initialization failed: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> database initialized", "Main");

    // Expiry sweep; /admin/close-expired covers external schedulers.
    let scheduler = AuctionScheduler::new(Arc::clone(&db), config.sweep_interval_secs);
    scheduler.start();
    info!(
        "{:<12} --> expiry sweep every {}s",
        "Main", config.sweep_interval_secs
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes_all = Router::new()
        .route(
            "/auctions",
            post(handlers::handle_create_auction).get(handlers::handle_list_auctions),
        )
        .route("/auctions/:id", get(handlers::handle_get_auction))
        .route("/categories", get(handlers::handle_list_categories))
        .route("/auctions/:id/bids", post(handlers::handle_place_bid))
        .route("/auctions/:id/sell-now", post(handlers::handle_sell_now))
        .route("/auctions/:id/end-now", post(handlers::handle_end_now))
        .route("/auctions/:id/pay", post(handlers::handle_wallet_payment))
        .route(
            "/auctions/:id/mark-paid",
            post(handlers::handle_mark_payment_complete),
        )
        .route("/admin/close-expired", post(handlers::handle_close_expired))
        .route("/wallet/:user_id", get(handlers::handle_wallet_balance))
        .route(
            "/wallet/:user_id/transactions",
            get(handlers::handle_wallet_transactions),
        )
        .route("/wallet/:user_id/earned", get(handlers::handle_total_earned))
        .route("/wallet/topup", post(handlers::handle_wallet_topup))
        .route("/wallet/cashout", post(handlers::handle_wallet_cashout))
        .route(
            "/notifications/:user_id",
            get(handlers::handle_list_notifications),
        )
        .route(
            "/notifications/:user_id/read",
            post(handlers::handle_mark_notifications_read),
        )
        .route("/users/:user_id/bids", get(handlers::handle_user_bids))
        .route("/users/:user_id/auctions", get(handlers::handle_user_auctions))
        .route("/users/:user_id/won", get(handlers::handle_won_auctions))
        .route(
            "/users/:user_id/pending-payments",
            get(handlers::handle_pending_payments),
        )
        .layer(cors)
        .with_state(db);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main

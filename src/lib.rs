pub mod auction;
pub mod bidding;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod money;
pub mod notification;
pub mod payment;
pub mod scheduler;
pub mod wallet;

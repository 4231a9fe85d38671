use crate::money::Money;

/// Flat amount a new bid must exceed the current bid by.
pub const MINIMUM_BID_INCREMENT: Money = Money::from_dollars(5);

/// Ceiling on bid and starting-bid amounts.
pub const MAXIMUM_BID_AMOUNT: Money = Money::from_dollars(100_000_000);

/// Wallet top-up bounds, inclusive.
pub const TOPUP_MIN: Money = Money::from_dollars(10);
pub const TOPUP_MAX: Money = Money::from_dollars(1_000_000);

pub const DEFAULT_AUCTION_DURATION_DAYS: i64 = 7;

/// Runtime configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    /// Seconds between expiry sweeps run by the in-process scheduler.
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let max_connections = env_parse("MAX_CONNECTIONS", 5)?;
        let sweep_interval_secs = env_parse("SWEEP_INTERVAL_SECS", 5)?;

        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
            sweep_interval_secs,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| format!("{key} is not a valid value: {raw}")),
        Err(_) => Ok(default),
    }
}

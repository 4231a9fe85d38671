/// Lock one auction row for the duration of the caller's transaction.
/// Both bidding and every closing path go through this, which is what
/// makes a bid racing the expiry sweep resolve deterministically.
pub const LOCK_AUCTION: &str = r#"
    SELECT auction_id, seller_id, title, description, image_path, category_id,
           starting_bid, current_bid, status, end_time, winner_id, sold_price,
           payment_status, created_at
    FROM auctions
    WHERE auction_id = $1
    FOR UPDATE
"#;

/// Expired auctions still open, locked for the sweep.
pub const LOCK_EXPIRED_ACTIVE: &str = r#"
    SELECT auction_id, seller_id, title, description, image_path, category_id,
           starting_bid, current_bid, status, end_time, winner_id, sold_price,
           payment_status, created_at
    FROM auctions
    WHERE status = 'active' AND end_time <= $1
    FOR UPDATE
"#;

pub const GET_CATEGORIES: &str =
    "SELECT category_id, category_name FROM categories ORDER BY category_name";

pub const INSERT_AUCTION: &str = r#"
    INSERT INTO auctions
        (seller_id, title, description, image_path, category_id,
         starting_bid, current_bid, end_time)
    VALUES ($1, $2, $3, $4, $5, $6, $6, $7)
    RETURNING auction_id
"#;

/// Highest bid on an auction; ties on amount go to the earlier bid.
/// Ordered by bid_id, not bid_time: `now()` is transaction-start time, so
/// bids that serialized on the auction lock can share a timestamp.
pub const WINNING_BID: &str = r#"
    SELECT bidder_id, bid_amount
    FROM bids
    WHERE auction_id = $1
    ORDER BY bid_amount DESC, bid_id ASC
    LIMIT 1
"#;

pub const INSERT_BID: &str =
    "INSERT INTO bids (auction_id, bidder_id, bid_amount) VALUES ($1, $2, $3)";

pub const UPDATE_CURRENT_BID: &str =
    "UPDATE auctions SET current_bid = $1 WHERE auction_id = $2";

/// Close with a winner; scoped to `active` so it is a no-op when another
/// closer got there first.
pub const CLOSE_WITH_WINNER: &str = r#"
    UPDATE auctions
    SET status = $1, winner_id = $2, sold_price = $3, end_time = $4
    WHERE auction_id = $5 AND status = 'active'
"#;

pub const CLOSE_WITHOUT_WINNER: &str = r#"
    UPDATE auctions
    SET status = 'completed'
    WHERE auction_id = $1 AND status = 'active'
"#;

pub const GET_AUCTION_DETAIL: &str = r#"
    SELECT a.auction_id, a.seller_id, u.username AS seller_name, a.title,
           a.description, a.image_path, a.category_id, c.category_name,
           a.starting_bid,
           CAST(COALESCE(MAX(b.bid_amount), a.starting_bid) AS BIGINT) AS current_bid,
           COUNT(DISTINCT b.bidder_id) AS bid_count,
           a.status, a.end_time, a.created_at
    FROM auctions a
    LEFT JOIN users u ON a.seller_id = u.user_id
    LEFT JOIN categories c ON a.category_id = c.category_id
    LEFT JOIN bids b ON a.auction_id = b.auction_id
    WHERE a.auction_id = $1
    GROUP BY a.auction_id, u.username, c.category_name
"#;

pub const GET_BID_HISTORY: &str = r#"
    SELECT b.bid_id, b.auction_id, b.bidder_id, b.bid_amount, b.bid_time
    FROM bids b
    WHERE b.auction_id = $1
    ORDER BY b.bid_time DESC
    LIMIT 10
"#;

pub const GET_USER_BIDS: &str = r#"
    SELECT b.bid_id, b.auction_id, b.bid_amount, b.bid_time,
           a.title, a.status, a.payment_status, a.end_time,
           CAST(MAX(b2.bid_amount) AS BIGINT) AS current_highest_bid,
           MAX(b2.bid_amount) = b.bid_amount AS is_winning
    FROM bids b
    JOIN auctions a ON b.auction_id = a.auction_id
    JOIN bids b2 ON b.auction_id = b2.auction_id
    WHERE b.bidder_id = $1
    GROUP BY b.bid_id, a.auction_id
    ORDER BY b.bid_time DESC
"#;

pub const GET_SELLER_AUCTIONS: &str = r#"
    SELECT a.auction_id, a.seller_id, u.username AS seller_name, a.title,
           a.description, a.image_path, a.category_id, c.category_name,
           a.starting_bid,
           CAST(COALESCE(MAX(b.bid_amount), a.starting_bid) AS BIGINT) AS current_bid,
           COUNT(DISTINCT b.bidder_id) AS bid_count,
           a.status, a.end_time, a.created_at
    FROM auctions a
    LEFT JOIN users u ON a.seller_id = u.user_id
    LEFT JOIN categories c ON a.category_id = c.category_id
    LEFT JOIN bids b ON a.auction_id = b.auction_id
    WHERE a.seller_id = $1
    GROUP BY a.auction_id, u.username, c.category_name
    ORDER BY a.created_at DESC
"#;

pub const GET_WON_AUCTIONS: &str = r#"
    SELECT auction_id, seller_id, title, description, image_path, category_id,
           starting_bid, current_bid, status, end_time, winner_id, sold_price,
           payment_status, created_at
    FROM auctions
    WHERE winner_id = $1 AND status IN ('completed', 'sold')
    ORDER BY end_time DESC
"#;

/// Won but not yet paid.
pub const GET_PENDING_PAYMENTS: &str = r#"
    SELECT auction_id, seller_id, title, description, image_path, category_id,
           starting_bid, current_bid, status, end_time, winner_id, sold_price,
           payment_status, created_at
    FROM auctions
    WHERE winner_id = $1
      AND status IN ('completed', 'sold')
      AND (payment_status IS NULL OR payment_status = 'pending')
    ORDER BY end_time DESC
"#;

pub mod ledger;
pub mod model;

pub use ledger::{parse_amount, BidError, BidLedger};
pub use model::{Bid, HighestBidRecord, HighestBidView};

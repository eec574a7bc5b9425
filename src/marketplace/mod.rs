//! The marketplace domain: listings, bids, users, and the facade.

pub mod bid;
pub mod listing;
pub mod market;
pub mod users;

pub use bid::{Bid, BidChange, BidChangeKind, BidLedger};
pub use listing::{
    ActiveData, CancelledData, Listing, ListingActivated, ListingCancelled, ListingDraft,
    ListingSold, ListingState, ListingUid, SoldData,
};
pub use market::Marketplace;
pub use users::{Buyer, Seller, Username};

//! Auction marketplace engine.
//!
//! A library-shaped core composing three concerns that must stay mutually
//! consistent under mutation:
//!
//! - [`Listing`]: an irreversible state machine (draft → active →
//!   sold/cancelled) whose payload depends on its state, with a
//!   snapshot/restore workflow for editing drafts.
//! - [`BidLedger`]: per-listing competitive bidding with strictly
//!   increasing prices, O(1) access to the highest bid, and amortized O(1)
//!   withdrawal of any earlier bid (via [`WithdrawableStack`]).
//! - [`EventManager`]: a minimal pub-sub primitive keeping dependent
//!   aggregates (a seller's listing folders, a buyer's running totals)
//!   correct without wiring them into listing or bid internals.
//!
//! The [`Marketplace`] facade owns canonical seller/buyer identity and
//! listing UID allocation, and is the entry point:
//!
//! ```
//! use std::time::Duration;
//! use bazaar::Marketplace;
//! use rust_decimal_macros::dec;
//!
//! # fn main() -> bazaar::MarketResult<()> {
//! let mut market = Marketplace::new("demo");
//! let seller = market.seller("sal");
//! let buyer = market.buyer("ben");
//!
//! let uid = {
//!     let listing = market.new_draft_listing(&seller)?;
//!     listing
//!         .set_title("Vintage Lamp")?
//!         .set_description("Brass, wired for modern bulbs.")?
//!         .set_start_price(dec!(10.00))?
//!         .set_min_bidding_time(Duration::from_secs(60))?;
//!     listing.activate()?;
//!     listing.uid().clone()
//! };
//!
//! let listing = market.listing_mut(&uid).expect("just created");
//! assert!(buyer.place_bid(listing, dec!(12.00))?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod marketplace;
pub mod stack;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use error::{MarketError, MarketResult};
pub use events::{EventManager, Subscription};
pub use marketplace::{
    Bid, BidChange, BidChangeKind, BidLedger, Buyer, Listing, ListingActivated, ListingCancelled,
    ListingDraft, ListingSold, ListingState, ListingUid, Marketplace, Seller, SoldData, Username,
};
pub use stack::{StackError, WithdrawableStack};
pub use traits::{RandomSource, SystemTimeProvider, ThreadRng, TimeProvider};

//! Sellers and buyers: flyweight identities with event-driven aggregates.
//!
//! Both are cheap cloneable handles over a shared inner record; the
//! marketplace's registry guarantees one instance per username, so handle
//! identity is user identity. The aggregates they carry (a seller's
//! listings folder, a buyer's running totals) hold no authority over
//! listing state — they are derived views, mutated exclusively by the event
//! callbacks wired up when a listing or bid is first touched.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::error::{MarketError, MarketResult};
use crate::traits::TimeProvider;

use super::bid::{Bid, BidChange, BidChangeKind};
use super::listing::{
    Listing, ListingActivated, ListingCancelled, ListingSold, ListingState, ListingUid,
};

/// A username, unique per marketplace and per role registry.
pub type Username = String;

// == Seller ==

/// Per-state folders of a seller's listings, plus lifetime earnings.
#[derive(Debug, Default)]
struct SellerBook {
    draft: BTreeSet<ListingUid>,
    active: BTreeSet<ListingUid>,
    sold: BTreeSet<ListingUid>,
    cancelled: BTreeSet<ListingUid>,
    amount_earned: Decimal,
}

impl SellerBook {
    fn shelf(&self, state: ListingState) -> &BTreeSet<ListingUid> {
        match state {
            ListingState::Draft => &self.draft,
            ListingState::Active => &self.active,
            ListingState::Sold => &self.sold,
            ListingState::Cancelled => &self.cancelled,
        }
    }
}

struct SellerInner {
    marketplace: String,
    username: Username,
    book: Mutex<SellerBook>,
}

/// A seller in a marketplace.
///
/// Obtained from [`Marketplace::seller`](super::market::Marketplace::seller);
/// the same username always yields the same underlying instance, and
/// equality is that flyweight identity.
#[derive(Clone)]
pub struct Seller {
    inner: Arc<SellerInner>,
}

impl Seller {
    pub(crate) fn new(marketplace: impl Into<String>, username: impl Into<Username>) -> Self {
        Self {
            inner: Arc::new(SellerInner {
                marketplace: marketplace.into(),
                username: username.into(),
                book: Mutex::new(SellerBook::default()),
            }),
        }
    }

    pub fn username(&self) -> &str {
        &self.inner.username
    }

    pub(crate) fn marketplace_uid(&self) -> &str {
        &self.inner.marketplace
    }

    /// UIDs of this seller's listings currently in `state`, in UID order.
    pub fn listings(&self, state: ListingState) -> Vec<ListingUid> {
        self.inner.book.lock().shelf(state).iter().cloned().collect()
    }

    pub fn has_listing(&self, state: ListingState, uid: &ListingUid) -> bool {
        self.inner.book.lock().shelf(state).contains(uid)
    }

    /// Total earned across this seller's sold listings.
    pub fn amount_earned(&self) -> Decimal {
        self.inner.book.lock().amount_earned
    }

    /// File a fresh draft into the folder and follow the listing's
    /// lifecycle from there on. Called by the marketplace at creation.
    pub(crate) fn attach<T: TimeProvider>(&self, listing: &Listing<T>) {
        self.inner.book.lock().draft.insert(listing.uid().clone());

        let inner = Arc::clone(&self.inner);
        listing
            .on_activate()
            .register(move |event: &ListingActivated| {
                let mut book = inner.book.lock();
                book.draft.remove(&event.uid);
                book.active.insert(event.uid.clone());
            });

        let inner = Arc::clone(&self.inner);
        listing.on_sell().register(move |event: &ListingSold| {
            let mut book = inner.book.lock();
            book.active.remove(&event.uid);
            book.sold.insert(event.uid.clone());
            book.amount_earned += event.sale_price;
        });

        let inner = Arc::clone(&self.inner);
        listing.on_cancel().register(move |event: &ListingCancelled| {
            let mut book = inner.book.lock();
            book.draft.remove(&event.uid);
            book.active.remove(&event.uid);
            book.cancelled.insert(event.uid.clone());
        });
    }
}

impl PartialEq for Seller {
    /// Flyweight identity: two handles are equal when they share one
    /// underlying seller record.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Seller {}

impl fmt::Debug for Seller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seller")
            .field("username", &self.inner.username)
            .field("marketplace", &self.inner.marketplace)
            .finish()
    }
}

// == Buyer ==

/// A buyer's running totals, kept in sync by event callbacks.
#[derive(Debug, Default)]
struct BuyerActivity {
    /// This buyer's live bid per active listing.
    bids_on_active: BTreeMap<ListingUid, Decimal>,
    /// Listings won, with their sale prices.
    listings_bought: BTreeMap<ListingUid, Decimal>,
    /// Amount this buyer has on the current top bid, per listing.
    leading: BTreeMap<ListingUid, Decimal>,
    amount_on_highest_bids: Decimal,
    amount_spent: Decimal,
    /// Listings whose events this buyer is already subscribed to.
    tracked: HashSet<ListingUid>,
}

impl BuyerActivity {
    fn apply_bid_change(&mut self, me: &str, change: &BidChange) {
        if change.bid.bidder == me {
            match change.kind {
                BidChangeKind::Placed => {
                    self.bids_on_active
                        .insert(change.listing.clone(), change.bid.price);
                }
                BidChangeKind::Withdrawn => {
                    self.bids_on_active.remove(&change.listing);
                }
            }
        }
        // Whoever holds the reported top holds the exposure; everyone else
        // on this listing drops to zero.
        let now_leading = match &change.top {
            Some(top) if top.bidder == me => Some(top.price),
            _ => None,
        };
        let previously = self.leading.remove(&change.listing);
        if let Some(amount) = now_leading {
            self.leading.insert(change.listing.clone(), amount);
        }
        self.amount_on_highest_bids +=
            now_leading.unwrap_or_default() - previously.unwrap_or_default();
    }

    fn apply_sold(&mut self, me: &str, event: &ListingSold) {
        if let Some(amount) = self.leading.remove(&event.uid) {
            self.amount_on_highest_bids -= amount;
        }
        self.bids_on_active.remove(&event.uid);
        self.tracked.remove(&event.uid);
        if event.buyer == me {
            self.amount_spent += event.sale_price;
            self.listings_bought
                .insert(event.uid.clone(), event.sale_price);
        }
    }

    fn apply_cancelled(&mut self, event: &ListingCancelled) {
        // A listing only cancels with no live bids left; just drop the
        // tracking residue.
        if let Some(amount) = self.leading.remove(&event.uid) {
            self.amount_on_highest_bids -= amount;
        }
        self.bids_on_active.remove(&event.uid);
        self.tracked.remove(&event.uid);
    }
}

struct BuyerInner {
    marketplace: String,
    username: Username,
    activity: Mutex<BuyerActivity>,
}

/// A buyer in a marketplace.
///
/// Obtained from [`Marketplace::buyer`](super::market::Marketplace::buyer);
/// same flyweight identity rules as [`Seller`]. Bidding goes through this
/// handle so the buyer's totals can follow the listing's events.
#[derive(Clone)]
pub struct Buyer {
    inner: Arc<BuyerInner>,
}

impl Buyer {
    pub(crate) fn new(marketplace: impl Into<String>, username: impl Into<Username>) -> Self {
        Self {
            inner: Arc::new(BuyerInner {
                marketplace: marketplace.into(),
                username: username.into(),
                activity: Mutex::new(BuyerActivity::default()),
            }),
        }
    }

    pub fn username(&self) -> &str {
        &self.inner.username
    }

    /// Place a bid on an active listing, returning whether it was accepted.
    ///
    /// # Errors
    ///
    /// `ForeignBuyer` if the listing belongs to another marketplace;
    /// `InvalidState` if the listing is not active.
    pub fn place_bid<T: TimeProvider>(
        &self,
        listing: &mut Listing<T>,
        price: Decimal,
    ) -> MarketResult<bool> {
        self.enforce_same_marketplace(listing)?;
        self.track(listing)?;
        listing
            .bids_mut()?
            .place(Bid::new(self.inner.username.clone(), price))
    }

    /// Withdraw this buyer's live bid, returning it if one existed.
    ///
    /// # Errors
    ///
    /// `ForeignBuyer` if the listing belongs to another marketplace;
    /// `InvalidState` if the listing is not active.
    pub fn withdraw_bid<T: TimeProvider>(
        &self,
        listing: &mut Listing<T>,
    ) -> MarketResult<Option<Bid>> {
        self.enforce_same_marketplace(listing)?;
        Ok(listing.bids_mut()?.withdraw(&self.inner.username))
    }

    /// Total amount currently on this buyer's highest bids across active
    /// listings.
    pub fn amount_on_highest_bids(&self) -> Decimal {
        self.inner.activity.lock().amount_on_highest_bids
    }

    /// Total spent on listings this buyer won.
    pub fn amount_spent(&self) -> Decimal {
        self.inner.activity.lock().amount_spent
    }

    /// This buyer's live bids on active listings, by listing UID.
    pub fn bids_on_active_listings(&self) -> BTreeMap<ListingUid, Decimal> {
        self.inner.activity.lock().bids_on_active.clone()
    }

    pub fn bid_on(&self, uid: &ListingUid) -> Option<Decimal> {
        self.inner.activity.lock().bids_on_active.get(uid).copied()
    }

    /// Listings this buyer won, with their sale prices.
    pub fn listings_bought(&self) -> BTreeMap<ListingUid, Decimal> {
        self.inner.activity.lock().listings_bought.clone()
    }

    fn enforce_same_marketplace<T: TimeProvider>(&self, listing: &Listing<T>) -> MarketResult<()> {
        if listing.marketplace_uid() != self.inner.marketplace {
            return Err(MarketError::ForeignBuyer(self.inner.username.clone()));
        }
        Ok(())
    }

    /// Subscribe this buyer's aggregate to the listing's bid and lifecycle
    /// events, once per listing. A no-op when already subscribed; errors
    /// (listing not active) leave the aggregate untouched.
    fn track<T: TimeProvider>(&self, listing: &Listing<T>) -> MarketResult<()> {
        let uid = listing.uid().clone();
        if self.inner.activity.lock().tracked.contains(&uid) {
            return Ok(());
        }
        let bid_events = listing.bids()?.on_change().clone();

        let me = self.inner.username.clone();
        let inner = Arc::clone(&self.inner);
        bid_events.register(move |change: &BidChange| {
            inner.activity.lock().apply_bid_change(&me, change);
        });

        let me = self.inner.username.clone();
        let inner = Arc::clone(&self.inner);
        listing.on_sell().register(move |event: &ListingSold| {
            inner.activity.lock().apply_sold(&me, event);
        });

        let inner = Arc::clone(&self.inner);
        listing.on_cancel().register(move |event: &ListingCancelled| {
            inner.activity.lock().apply_cancelled(event);
        });

        self.inner.activity.lock().tracked.insert(uid);
        Ok(())
    }
}

impl PartialEq for Buyer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Buyer {}

impl fmt::Debug for Buyer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buyer")
            .field("username", &self.inner.username)
            .field("marketplace", &self.inner.marketplace)
            .finish()
    }
}

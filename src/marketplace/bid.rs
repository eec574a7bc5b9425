//! Bids and the per-listing bid ledger.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MarketResult;
use crate::events::EventManager;
use crate::stack::WithdrawableStack;

use super::listing::ListingUid;
use super::users::Username;

/// An immutable (bidder, price) pair submitted against an active listing.
///
/// Created when placed, never mutated; discarded on withdrawal or when the
/// same bidder places a higher bid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bid {
    pub bidder: Username,
    pub price: Decimal,
}

impl Bid {
    pub fn new(bidder: impl Into<Username>, price: Decimal) -> Self {
        Self {
            bidder: bidder.into(),
            price,
        }
    }
}

/// What happened to a ledger's bids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BidChangeKind {
    Placed,
    Withdrawn,
}

/// Payload of a bid-changed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidChange {
    /// Listing whose ledger changed.
    pub listing: ListingUid,
    pub kind: BidChangeKind,
    /// The bid that was placed or withdrawn.
    pub bid: Bid,
    /// Highest live bid after the change took effect, if any. Carried in
    /// the payload so subscribers need no access to the ledger itself.
    pub top: Option<Bid>,
}

/// The collection of live bids on one active listing.
///
/// Invariants: at most one live bid per bidder; the top of the stack is
/// always the numerically highest live bid; a placement must strictly
/// exceed the current top's price or it is rejected.
#[derive(Debug)]
pub struct BidLedger {
    listing: ListingUid,
    stack: WithdrawableStack<Bid>,
    current_bid_by_bidder: HashMap<Username, Bid>,
    on_change: EventManager<BidChange>,
}

impl BidLedger {
    pub(crate) fn new(listing: ListingUid) -> Self {
        Self {
            listing,
            stack: WithdrawableStack::new(),
            current_bid_by_bidder: HashMap::new(),
            on_change: EventManager::new(),
        }
    }

    /// The listing this ledger belongs to.
    pub fn listing(&self) -> &ListingUid {
        &self.listing
    }

    /// Current highest live bid, or `None` if there are no bids.
    pub fn top(&mut self) -> Option<&Bid> {
        self.stack.peek().ok()
    }

    /// Attempt to place a bid, returning whether it was accepted.
    ///
    /// A bid whose price does not strictly exceed the current top's is
    /// rejected without mutation or event: rejection is an expected
    /// business outcome, not an error. If the same bidder already has a
    /// live bid, it is folded into the placement — withdrawn silently, with
    /// a single `Placed` event emitted for the new bid.
    pub fn place(&mut self, bid: Bid) -> MarketResult<bool> {
        if let Some(top) = self.top().map(|top| top.price) {
            if bid.price <= top {
                debug!(
                    listing = %self.listing,
                    bidder = %bid.bidder,
                    price = %bid.price,
                    %top,
                    "bid rejected, does not beat the current top"
                );
                return Ok(false);
            }
        }
        if let Some(previous) = self.current_bid_by_bidder.remove(&bid.bidder) {
            self.stack.remove(&previous);
        }
        self.stack.push(bid.clone())?;
        self.current_bid_by_bidder
            .insert(bid.bidder.clone(), bid.clone());
        debug!(
            listing = %self.listing,
            bidder = %bid.bidder,
            price = %bid.price,
            "bid placed"
        );
        let change = BidChange {
            listing: self.listing.clone(),
            kind: BidChangeKind::Placed,
            top: Some(bid.clone()),
            bid,
        };
        self.on_change.trigger(&change);
        Ok(true)
    }

    /// Withdraw the bidder's live bid, returning it if one existed.
    pub fn withdraw(&mut self, bidder: &str) -> Option<Bid> {
        let bid = self.current_bid_by_bidder.remove(bidder)?;
        self.stack.remove(&bid);
        let top = self.top().cloned();
        debug!(
            listing = %self.listing,
            bidder = %bid.bidder,
            price = %bid.price,
            "bid withdrawn"
        );
        let change = BidChange {
            listing: self.listing.clone(),
            kind: BidChangeKind::Withdrawn,
            bid: bid.clone(),
            top,
        };
        self.on_change.trigger(&change);
        Some(bid)
    }

    /// The bidder's live bid, if any.
    pub fn bid_for(&self, bidder: &str) -> Option<&Bid> {
        self.current_bid_by_bidder.get(bidder)
    }

    pub fn has_bids(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Number of live bids.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Handle for subscribing to placed/withdrawn events. Subscriptions die
    /// with the ledger when the listing leaves the active state.
    pub fn on_change(&self) -> &EventManager<BidChange> {
        &self.on_change
    }
}

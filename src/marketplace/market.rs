//! The marketplace facade: canonical identities and listing registry.
//!
//! The marketplace is the entry point of the engine. It owns the flyweight
//! registries for sellers and buyers (one instance per username, for its
//! whole lifetime) and the map of every listing ever created, and it alone
//! allocates listing UIDs.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::{MarketError, MarketResult};
use crate::traits::{RandomSource, SystemTimeProvider, ThreadRng, TimeProvider};

use super::listing::{Listing, ListingUid};
use super::users::{Buyer, Seller, Username};

/// A marketplace: the facade composing listings, sellers and buyers.
///
/// Time and randomness are injected so lifecycle deadlines and UID
/// allocation can be pinned down in tests; production code uses the
/// defaults via [`Marketplace::new`].
pub struct Marketplace<T = SystemTimeProvider, R = ThreadRng>
where
    T: TimeProvider + Clone,
    R: RandomSource,
{
    uid: String,
    time: T,
    random: R,
    sellers: HashMap<Username, Seller>,
    buyers: HashMap<Username, Buyer>,
    listings: HashMap<ListingUid, Listing<T>>,
}

impl Marketplace {
    /// Create a marketplace on the system clock and thread-local RNG.
    pub fn new(uid: impl Into<String>) -> Self {
        Self::with_providers(uid, SystemTimeProvider::new(), ThreadRng::new())
    }
}

impl<T, R> Marketplace<T, R>
where
    T: TimeProvider + Clone,
    R: RandomSource,
{
    /// Create a marketplace with explicit time and randomness providers.
    pub fn with_providers(uid: impl Into<String>, time: T, random: R) -> Self {
        Self {
            uid: uid.into(),
            time,
            random,
            sellers: HashMap::new(),
            buyers: HashMap::new(),
            listings: HashMap::new(),
        }
    }

    /// The unique identifier of this marketplace.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// The seller registered under `username`, created on first reference.
    ///
    /// Repeated calls with the same username return handles to the same
    /// underlying instance for the marketplace's lifetime.
    pub fn seller(&mut self, username: impl Into<Username>) -> Seller {
        let username = username.into();
        let marketplace = self.uid.clone();
        self.sellers
            .entry(username)
            .or_insert_with_key(|username| {
                info!(%username, marketplace = %marketplace, "seller registered");
                Seller::new(marketplace.clone(), username.clone())
            })
            .clone()
    }

    /// The buyer registered under `username`, created on first reference.
    pub fn buyer(&mut self, username: impl Into<Username>) -> Buyer {
        let username = username.into();
        let marketplace = self.uid.clone();
        self.buyers
            .entry(username)
            .or_insert_with_key(|username| {
                info!(%username, marketplace = %marketplace, "buyer registered");
                Buyer::new(marketplace.clone(), username.clone())
            })
            .clone()
    }

    /// Create a draft listing for `seller`, allocating a fresh UID.
    ///
    /// # Errors
    ///
    /// `ForeignSeller` if the seller was not issued by this marketplace.
    pub fn new_draft_listing(&mut self, seller: &Seller) -> MarketResult<&mut Listing<T>> {
        if seller.marketplace_uid() != self.uid {
            return Err(MarketError::ForeignSeller(seller.username().to_string()));
        }
        let uid = self.fresh_listing_uid();
        let listing = Listing::draft(
            uid.clone(),
            self.uid.clone(),
            seller.clone(),
            self.time.clone(),
        );
        seller.attach(&listing);
        info!(%uid, seller = %seller.username(), "draft listing created");
        Ok(self.listings.entry(uid).or_insert(listing))
    }

    /// Create a draft listing for `seller` seeded from the snapshot of an
    /// existing listing, whatever state it is in.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown UID; `ForeignSeller` as in
    /// [`Marketplace::new_draft_listing`].
    pub fn clone_listing(
        &mut self,
        uid: &ListingUid,
        seller: &Seller,
    ) -> MarketResult<&mut Listing<T>> {
        let snapshot = match self.listings.get(uid) {
            Some(listing) => listing.snapshot(),
            None => return Err(MarketError::NotFound(format!("listing {uid}"))),
        };
        let clone = self.new_draft_listing(seller)?;
        clone.restore(&snapshot)?;
        Ok(clone)
    }

    pub fn listing(&self, uid: &ListingUid) -> Option<&Listing<T>> {
        self.listings.get(uid)
    }

    pub fn listing_mut(&mut self, uid: &ListingUid) -> Option<&mut Listing<T>> {
        self.listings.get_mut(uid)
    }

    /// UIDs of every listing ever created here, in any state, in UID order.
    pub fn listing_uids(&self) -> Vec<ListingUid> {
        let mut uids: Vec<ListingUid> = self.listings.keys().cloned().collect();
        uids.sort();
        uids
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Draw UIDs until one is unused. A collision is astronomically
    /// unlikely with 128 random bits, but the contract checks anyway.
    fn fresh_listing_uid(&self) -> ListingUid {
        let mut uid = ListingUid::from_random(&self.random);
        while self.listings.contains_key(&uid) {
            warn!(%uid, "listing uid collision, drawing again");
            uid = ListingUid::from_random(&self.random);
        }
        uid
    }
}

//! Error-path coverage: every rejected operation leaves state untouched.

use std::time::Duration;

use bazaar::mocks::{MockRandom, MockTime};
use bazaar::{ListingState, MarketError, Marketplace};
use rust_decimal_macros::dec;

use crate::common::AuctionHarness;

#[test]
fn test_activate_without_start_price_stays_draft() {
    let mut harness = AuctionHarness::new();
    let seller = harness.seller("sal");

    let uid = {
        let listing = harness.market.new_draft_listing(&seller).unwrap();
        listing
            .set_title("Vintage Lamp")
            .unwrap()
            .set_description("Brass, wired for modern bulbs.")
            .unwrap()
            .set_min_bidding_time(Duration::from_secs(60))
            .unwrap();
        listing.uid().clone()
    };

    let result = harness.listing_mut(&uid).activate();
    assert!(matches!(result, Err(MarketError::Validation(_))));
    assert_eq!(harness.listing(&uid).state(), ListingState::Draft);
    assert!(seller.has_listing(ListingState::Draft, &uid));
}

#[test]
fn test_sell_with_zero_bids_is_rejected() {
    let mut harness = AuctionHarness::new();
    let seller = harness.seller("sal");
    let uid = harness.active_listing(&seller, "Side Table", dec!(15), Duration::from_secs(60));

    harness.advance(3600);
    let result = harness.listing_mut(&uid).sell();
    assert!(matches!(result, Err(MarketError::InvalidState(_))));

    // Ledger and state unchanged; the auction can continue.
    let listing = harness.listing(&uid);
    assert_eq!(listing.state(), ListingState::Active);
    assert!(listing.bids().unwrap().is_empty());
}

#[test]
fn test_sell_before_deadline_is_rejected() {
    let mut harness = AuctionHarness::new();
    let seller = harness.seller("sal");
    let ben = harness.buyer("ben");
    let uid = harness.active_listing(&seller, "Side Table", dec!(15), Duration::from_secs(600));

    assert!(ben.place_bid(harness.listing_mut(&uid), dec!(20)).unwrap());
    harness.advance(599);

    assert!(matches!(
        harness.listing_mut(&uid).sell(),
        Err(MarketError::InvalidState(_))
    ));
    assert_eq!(harness.listing(&uid).state(), ListingState::Active);
    assert_eq!(harness.listing(&uid).bids().unwrap().len(), 1);
}

#[test]
fn test_terminal_listings_refuse_further_transitions() {
    let mut harness = AuctionHarness::new();
    let seller = harness.seller("sal");
    let ben = harness.buyer("ben");

    let sold = harness.active_listing(&seller, "Sold Item", dec!(10), Duration::from_secs(60));
    assert!(ben.place_bid(harness.listing_mut(&sold), dec!(11)).unwrap());
    harness.advance(60);
    harness.listing_mut(&sold).sell().unwrap();

    for result in [
        harness.listing_mut(&sold).activate(),
        harness.listing_mut(&sold).sell(),
        harness.listing_mut(&sold).cancel(),
    ] {
        assert!(matches!(result, Err(MarketError::InvalidState(_))));
    }
    assert_eq!(harness.listing(&sold).state(), ListingState::Sold);

    // Bidding after the sale is impossible: the ledger no longer exists.
    assert!(matches!(
        ben.place_bid(harness.listing_mut(&sold), dec!(99)),
        Err(MarketError::InvalidState(_))
    ));
}

#[test]
fn test_field_edits_after_activation_are_rejected() {
    let mut harness = AuctionHarness::new();
    let seller = harness.seller("sal");
    let uid = harness.active_listing(&seller, "Fixed Title", dec!(10), Duration::from_secs(60));

    let listing = harness.listing_mut(&uid);
    assert!(matches!(
        listing.set_title("Changed"),
        Err(MarketError::InvalidState(_))
    ));
    assert!(matches!(
        listing.set_start_price(dec!(1)),
        Err(MarketError::InvalidState(_))
    ));
    assert_eq!(listing.active_data().unwrap().title(), "Fixed Title");
}

#[test]
fn test_validation_bounds_reject_out_of_range_fields() {
    let mut harness = AuctionHarness::new();
    let seller = harness.seller("sal");
    let uid = {
        let listing = harness.market.new_draft_listing(&seller).unwrap();
        listing.uid().clone()
    };

    let listing = harness.listing_mut(&uid);
    assert!(matches!(
        listing.set_title("t".repeat(51)),
        Err(MarketError::Validation(_))
    ));
    assert!(matches!(
        listing.set_description(""),
        Err(MarketError::Validation(_))
    ));
    assert!(matches!(
        listing.set_start_price(dec!(-1)),
        Err(MarketError::Validation(_))
    ));
    assert!(matches!(
        listing.set_min_bidding_time(Duration::from_secs(30)),
        Err(MarketError::Validation(_))
    ));
    assert!(listing.draft_fields().unwrap().title.is_none());
}

#[test]
fn test_sellers_cannot_cross_marketplaces() {
    let mut market_one = Marketplace::with_providers(
        "market-one",
        MockTime::new(1000),
        MockRandom::new(1),
    );
    let mut market_two = Marketplace::with_providers(
        "market-two",
        MockTime::new(1000),
        MockRandom::new(2),
    );

    let stranger = market_two.seller("sal");
    assert!(matches!(
        market_one.new_draft_listing(&stranger),
        Err(MarketError::ForeignSeller(_))
    ));

    // Same username registered locally works fine; identity is per market.
    let local = market_one.seller("sal");
    assert!(market_one.new_draft_listing(&local).is_ok());
    assert_ne!(local, stranger);
}

#[test]
fn test_buyers_cannot_cross_marketplaces() {
    let mut harness = AuctionHarness::new();
    let seller = harness.seller("sal");
    let uid = harness.active_listing(&seller, "Local Item", dec!(10), Duration::from_secs(60));

    let mut foreign_market = Marketplace::with_providers(
        "another-market",
        MockTime::new(1000),
        MockRandom::new(9),
    );
    let stranger = foreign_market.buyer("zoe");

    assert!(matches!(
        stranger.place_bid(harness.listing_mut(&uid), dec!(99)),
        Err(MarketError::ForeignBuyer(_))
    ));
    assert!(!harness.listing(&uid).bids().unwrap().has_bids());
}

//! Full auction lifecycles driven through the marketplace facade.

use std::time::Duration;

use bazaar::ListingState;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::common::AuctionHarness;

#[test]
fn test_vintage_lamp_auction_settles_at_highest_bid() {
    let mut harness = AuctionHarness::new();
    let seller = harness.seller("sal");
    let ann = harness.buyer("ann");
    let ben = harness.buyer("ben");

    let uid = harness.active_listing(
        &seller,
        "Vintage Lamp",
        dec!(10.00),
        Duration::from_secs(60),
    );
    assert_eq!(harness.listing(&uid).state(), ListingState::Active);

    // Ann opens at 12.00; Ben undercuts and is rejected, then overbids.
    assert!(ann
        .place_bid(harness.listing_mut(&uid), dec!(12.00))
        .unwrap());
    assert!(!ben
        .place_bid(harness.listing_mut(&uid), dec!(11.00))
        .unwrap());
    assert!(ben
        .place_bid(harness.listing_mut(&uid), dec!(15.00))
        .unwrap());

    harness.advance(60);
    harness.listing_mut(&uid).sell().unwrap();

    let listing = harness.listing(&uid);
    assert_eq!(listing.state(), ListingState::Sold);
    let sold = listing.sold_data().unwrap();
    assert_eq!(sold.sale_price(), dec!(15.00));
    assert_eq!(sold.buyer(), "ben");
}

#[test]
fn test_aggregates_track_a_full_auction() {
    let mut harness = AuctionHarness::new();
    let seller = harness.seller("sal");
    let ann = harness.buyer("ann");
    let ben = harness.buyer("ben");

    let uid = harness.active_listing(
        &seller,
        "Walnut Desk",
        dec!(50.00),
        Duration::from_secs(60),
    );

    assert!(ann
        .place_bid(harness.listing_mut(&uid), dec!(55.00))
        .unwrap());
    assert!(ben
        .place_bid(harness.listing_mut(&uid), dec!(60.00))
        .unwrap());

    // Mid-auction: Ben leads, Ann's bid is live but not winning.
    assert_eq!(ben.amount_on_highest_bids(), dec!(60.00));
    assert_eq!(ann.amount_on_highest_bids(), Decimal::ZERO);
    assert_eq!(ann.bid_on(&uid), Some(dec!(55.00)));
    assert!(seller.has_listing(ListingState::Active, &uid));

    harness.advance(90);
    harness.listing_mut(&uid).sell().unwrap();

    // Settled: seller earned, winner spent, loser owes nothing.
    assert_eq!(seller.amount_earned(), dec!(60.00));
    assert!(seller.has_listing(ListingState::Sold, &uid));
    assert_eq!(ben.amount_spent(), dec!(60.00));
    assert_eq!(ben.amount_on_highest_bids(), Decimal::ZERO);
    assert_eq!(ben.listings_bought().get(&uid), Some(&dec!(60.00)));
    assert_eq!(ann.amount_spent(), Decimal::ZERO);
    assert_eq!(ann.bid_on(&uid), None);
}

#[test]
fn test_two_concurrent_listings_stay_independent() {
    let mut harness = AuctionHarness::new();
    let seller = harness.seller("sal");
    let ann = harness.buyer("ann");

    let lamp = harness.active_listing(
        &seller,
        "Vintage Lamp",
        dec!(10.00),
        Duration::from_secs(60),
    );
    let desk = harness.active_listing(
        &seller,
        "Walnut Desk",
        dec!(50.00),
        Duration::from_secs(60),
    );

    assert!(ann.place_bid(harness.listing_mut(&lamp), dec!(12)).unwrap());
    assert!(ann.place_bid(harness.listing_mut(&desk), dec!(55)).unwrap());

    // Ann leads both auctions at once.
    assert_eq!(ann.amount_on_highest_bids(), dec!(67));
    assert_eq!(ann.bids_on_active_listings().len(), 2);

    harness.advance(60);
    harness.listing_mut(&lamp).sell().unwrap();

    assert_eq!(ann.amount_spent(), dec!(12));
    assert_eq!(ann.amount_on_highest_bids(), dec!(55));
    assert_eq!(seller.listings(ListingState::Sold), vec![lamp.clone()]);
    assert!(seller.has_listing(ListingState::Active, &desk));
}

#[test]
fn test_draft_edit_then_activate_then_cancel_without_bids() {
    let mut harness = AuctionHarness::new();
    let seller = harness.seller("sal");

    let uid = harness.draft_listing(
        &seller,
        "Boxed Radio",
        dec!(5.00),
        Duration::from_secs(120),
    );
    assert!(seller.has_listing(ListingState::Draft, &uid));

    // Rework the draft from a snapshot before going live.
    let mut snapshot = harness.listing(&uid).snapshot();
    snapshot.title = Some("Boxed Valve Radio".to_string());
    harness.listing_mut(&uid).restore(&snapshot).unwrap();
    harness.listing_mut(&uid).activate().unwrap();
    assert!(seller.has_listing(ListingState::Active, &uid));

    harness.advance(30);
    harness.listing_mut(&uid).cancel().unwrap();

    assert_eq!(harness.listing(&uid).state(), ListingState::Cancelled);
    assert!(seller.has_listing(ListingState::Cancelled, &uid));
    let cancelled = harness.listing(&uid);
    assert_eq!(
        cancelled.cancelled_data().unwrap().fields().title.as_deref(),
        Some("Boxed Valve Radio")
    );
}

#[test]
fn test_cloned_listing_runs_its_own_auction() {
    let mut harness = AuctionHarness::new();
    let sal = harness.seller("sal");
    let sue = harness.seller("sue");
    let ben = harness.buyer("ben");

    let original = harness.active_listing(
        &sal,
        "Vintage Lamp",
        dec!(10.00),
        Duration::from_secs(60),
    );

    let clone = harness
        .market
        .clone_listing(&original, &sue)
        .unwrap()
        .uid()
        .clone();
    harness.listing_mut(&clone).activate().unwrap();

    assert!(ben
        .place_bid(harness.listing_mut(&clone), dec!(20.00))
        .unwrap());
    harness.advance(60);
    harness.listing_mut(&clone).sell().unwrap();

    // The clone settled under its new seller; the original is untouched.
    assert_eq!(sue.amount_earned(), dec!(20.00));
    assert_eq!(sal.amount_earned(), Decimal::ZERO);
    assert_eq!(harness.listing(&original).state(), ListingState::Active);
}

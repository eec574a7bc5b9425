//! Listing lifecycle: an irreversible state machine with state-dependent
//! payloads.
//!
//! A listing starts as a draft, whose fields are edited through validating
//! setters or restored wholesale from a snapshot. Activation freezes the
//! draft fields and opens a bid ledger; selling and cancelling are terminal
//! and discard the ledger. Each payload only exists in its own state — a
//! draft has no sale price to misread, a sold listing has no ledger left to
//! bid into.

use std::fmt;
use std::mem;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{DESCRIPTION_MAX_LEN, MIN_BIDDING_TIME_FLOOR, TITLE_MAX_LEN};
use crate::error::{MarketError, MarketResult};
use crate::events::EventManager;
use crate::traits::{RandomSource, TimeProvider};

use super::bid::BidLedger;
use super::users::{Seller, Username};

/// Unique identifier of a listing within a marketplace.
///
/// 128 random bits, hex-encoded. Allocation (and collision checking) is the
/// marketplace's job, not the listing's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingUid(String);

impl ListingUid {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub(crate) fn from_random<R: RandomSource + ?Sized>(random: &R) -> Self {
        Self(hex::encode(random.uid_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The state tag of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingState {
    Draft,
    Active,
    Sold,
    Cancelled,
}

impl fmt::Display for ListingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Sold => "sold",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// The editable fields of a draft listing.
///
/// Doubles as the snapshot type: `Listing::snapshot` returns one of these
/// and `Listing::restore` applies one, so a draft can be checkpointed and
/// rolled back while it is being put together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_price: Option<Decimal>,
    pub min_bidding_time: Option<Duration>,
}

impl ListingDraft {
    /// Whether every field required for activation is set.
    pub fn is_complete(&self) -> bool {
        self.title.is_some()
            && self.description.is_some()
            && self.start_price.is_some()
            && self.min_bidding_time.is_some()
    }
}

/// Payload of an active listing: the frozen draft fields, the activation
/// timestamp, and the live bid ledger.
#[derive(Debug)]
pub struct ActiveData {
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) start_price: Decimal,
    pub(crate) min_bidding_time: Duration,
    pub(crate) listed_at: u64,
    pub(crate) ledger: BidLedger,
}

impl ActiveData {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start_price(&self) -> Decimal {
        self.start_price
    }

    pub fn min_bidding_time(&self) -> Duration {
        self.min_bidding_time
    }

    pub fn listed_at(&self) -> u64 {
        self.listed_at
    }
}

/// Payload of a sold listing. The ledger is gone; only the sale outcome
/// remains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoldData {
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) start_price: Decimal,
    pub(crate) min_bidding_time: Duration,
    pub(crate) listed_at: u64,
    pub(crate) sold_at: u64,
    pub(crate) sale_price: Decimal,
    pub(crate) buyer: Username,
}

impl SoldData {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start_price(&self) -> Decimal {
        self.start_price
    }

    pub fn min_bidding_time(&self) -> Duration {
        self.min_bidding_time
    }

    pub fn listed_at(&self) -> u64 {
        self.listed_at
    }

    pub fn sold_at(&self) -> u64 {
        self.sold_at
    }

    pub fn sale_price(&self) -> Decimal {
        self.sale_price
    }

    pub fn buyer(&self) -> &str {
        &self.buyer
    }
}

/// Payload of a cancelled listing: whichever draft fields were set, plus
/// the cancellation timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledData {
    pub(crate) fields: ListingDraft,
    pub(crate) cancelled_at: u64,
}

impl CancelledData {
    pub fn fields(&self) -> &ListingDraft {
        &self.fields
    }

    pub fn cancelled_at(&self) -> u64 {
        self.cancelled_at
    }
}

/// Event published when a draft is activated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingActivated {
    pub uid: ListingUid,
    pub listed_at: u64,
}

/// Event published when an active listing is sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSold {
    pub uid: ListingUid,
    pub sold_at: u64,
    pub sale_price: Decimal,
    pub buyer: Username,
}

/// Event published when a listing is cancelled (from draft or active).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingCancelled {
    pub uid: ListingUid,
    pub cancelled_at: u64,
    pub from: ListingState,
}

/// Tagged state payload. Fields of other states simply do not exist.
#[derive(Debug)]
enum State {
    Draft(ListingDraft),
    Active(ActiveData),
    Sold(SoldData),
    Cancelled(CancelledData),
}

impl State {
    fn tag(&self) -> ListingState {
        match self {
            Self::Draft(_) => ListingState::Draft,
            Self::Active(_) => ListingState::Active,
            Self::Sold(_) => ListingState::Sold,
            Self::Cancelled(_) => ListingState::Cancelled,
        }
    }
}

/// A sellable item posted by a seller.
///
/// Constructed in the draft state by the marketplace, which allocates the
/// UID. Transitions are one-directional (draft → active → sold/cancelled,
/// draft → cancelled) and each one clears the subscriber lists of events
/// that can never fire again.
#[derive(Debug)]
pub struct Listing<T: TimeProvider> {
    uid: ListingUid,
    marketplace: String,
    seller: Seller,
    time: T,
    state: State,
    on_activate: EventManager<ListingActivated>,
    on_sell: EventManager<ListingSold>,
    on_cancel: EventManager<ListingCancelled>,
}

impl<T: TimeProvider> Listing<T> {
    pub(crate) fn draft(uid: ListingUid, marketplace: String, seller: Seller, time: T) -> Self {
        Self {
            uid,
            marketplace,
            seller,
            time,
            state: State::Draft(ListingDraft::default()),
            on_activate: EventManager::new(),
            on_sell: EventManager::new(),
            on_cancel: EventManager::new(),
        }
    }

    pub fn uid(&self) -> &ListingUid {
        &self.uid
    }

    /// UID of the marketplace this listing belongs to.
    pub fn marketplace_uid(&self) -> &str {
        &self.marketplace
    }

    pub fn seller(&self) -> &Seller {
        &self.seller
    }

    pub fn state(&self) -> ListingState {
        self.state.tag()
    }

    pub fn is_draft(&self) -> bool {
        matches!(self.state, State::Draft(_))
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    pub fn is_sold(&self) -> bool {
        matches!(self.state, State::Sold(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.state, State::Cancelled(_))
    }

    // == Event access ==

    /// Fires once, on activation; its subscriber list is cleared afterwards.
    pub fn on_activate(&self) -> &EventManager<ListingActivated> {
        &self.on_activate
    }

    pub fn on_sell(&self) -> &EventManager<ListingSold> {
        &self.on_sell
    }

    pub fn on_cancel(&self) -> &EventManager<ListingCancelled> {
        &self.on_cancel
    }

    // == State-scoped payload access ==

    pub fn draft_fields(&self) -> MarketResult<&ListingDraft> {
        match &self.state {
            State::Draft(draft) => Ok(draft),
            other => Err(self.wrong_state("read draft fields of", other.tag())),
        }
    }

    pub fn active_data(&self) -> MarketResult<&ActiveData> {
        match &self.state {
            State::Active(data) => Ok(data),
            other => Err(self.wrong_state("read active data of", other.tag())),
        }
    }

    pub fn sold_data(&self) -> MarketResult<&SoldData> {
        match &self.state {
            State::Sold(data) => Ok(data),
            other => Err(self.wrong_state("read sold data of", other.tag())),
        }
    }

    pub fn cancelled_data(&self) -> MarketResult<&CancelledData> {
        match &self.state {
            State::Cancelled(data) => Ok(data),
            other => Err(self.wrong_state("read cancelled data of", other.tag())),
        }
    }

    /// The bid ledger. Only active listings have bids.
    pub fn bids(&self) -> MarketResult<&BidLedger> {
        match &self.state {
            State::Active(data) => Ok(&data.ledger),
            other => Err(self.wrong_state("read bids of", other.tag())),
        }
    }

    /// Mutable bid ledger access, for placing and withdrawing bids.
    pub fn bids_mut(&mut self) -> MarketResult<&mut BidLedger> {
        match &mut self.state {
            State::Active(data) => Ok(&mut data.ledger),
            other => {
                let tag = other.tag();
                Err(MarketError::InvalidState(format!(
                    "cannot bid on listing {}: it is {tag}, not active",
                    self.uid
                )))
            }
        }
    }

    // == Draft field setters ==

    /// Set the title. Draft state only; 1 to 50 characters.
    pub fn set_title(&mut self, title: impl Into<String>) -> MarketResult<&mut Self> {
        let title = title.into();
        self.draft_fields_mut("set the title of")?;
        validate_title(&title)?;
        if let State::Draft(draft) = &mut self.state {
            draft.title = Some(title);
        }
        Ok(self)
    }

    /// Set the description. Draft state only; 1 to 500 characters.
    pub fn set_description(&mut self, description: impl Into<String>) -> MarketResult<&mut Self> {
        let description = description.into();
        self.draft_fields_mut("set the description of")?;
        validate_description(&description)?;
        if let State::Draft(draft) = &mut self.state {
            draft.description = Some(description);
        }
        Ok(self)
    }

    /// Set the starting price. Draft state only; must be non-negative.
    pub fn set_start_price(&mut self, price: Decimal) -> MarketResult<&mut Self> {
        self.draft_fields_mut("set the start price of")?;
        validate_start_price(price)?;
        if let State::Draft(draft) = &mut self.state {
            draft.start_price = Some(price);
        }
        Ok(self)
    }

    /// Set the minimum bidding time. Draft state only; at least one minute.
    pub fn set_min_bidding_time(&mut self, duration: Duration) -> MarketResult<&mut Self> {
        self.draft_fields_mut("set the minimum bidding time of")?;
        validate_min_bidding_time(duration)?;
        if let State::Draft(draft) = &mut self.state {
            draft.min_bidding_time = Some(duration);
        }
        Ok(self)
    }

    // == Snapshot / restore ==

    /// A copy of the current draft-shaped fields, in any state.
    ///
    /// For active and sold listings every field is present; for cancelled
    /// listings, whichever fields were set before cancellation.
    pub fn snapshot(&self) -> ListingDraft {
        match &self.state {
            State::Draft(draft) => draft.clone(),
            State::Active(data) => ListingDraft {
                title: Some(data.title.clone()),
                description: Some(data.description.clone()),
                start_price: Some(data.start_price),
                min_bidding_time: Some(data.min_bidding_time),
            },
            State::Sold(data) => ListingDraft {
                title: Some(data.title.clone()),
                description: Some(data.description.clone()),
                start_price: Some(data.start_price),
                min_bidding_time: Some(data.min_bidding_time),
            },
            State::Cancelled(data) => data.fields.clone(),
        }
    }

    /// Apply the fields present in `snapshot` to this draft.
    ///
    /// Every present field is validated before any is applied, so a failed
    /// restore leaves the draft exactly as it was. Absent fields are left
    /// untouched.
    pub fn restore(&mut self, snapshot: &ListingDraft) -> MarketResult<()> {
        self.draft_fields_mut("restore")?;
        if let Some(title) = &snapshot.title {
            validate_title(title)?;
        }
        if let Some(description) = &snapshot.description {
            validate_description(description)?;
        }
        if let Some(price) = snapshot.start_price {
            validate_start_price(price)?;
        }
        if let Some(duration) = snapshot.min_bidding_time {
            validate_min_bidding_time(duration)?;
        }
        let draft = self.draft_fields_mut("restore")?;
        if let Some(title) = &snapshot.title {
            draft.title = Some(title.clone());
        }
        if let Some(description) = &snapshot.description {
            draft.description = Some(description.clone());
        }
        if let Some(price) = snapshot.start_price {
            draft.start_price = Some(price);
        }
        if let Some(duration) = snapshot.min_bidding_time {
            draft.min_bidding_time = Some(duration);
        }
        Ok(())
    }

    // == Transitions ==

    /// Activate a complete draft, opening its bid ledger.
    ///
    /// # Errors
    ///
    /// `InvalidState` outside the draft state; `Validation` if a required
    /// field is unset. The listing is unchanged on error.
    pub fn activate(&mut self) -> MarketResult<()> {
        let draft = match &self.state {
            State::Draft(draft) => draft,
            other => return Err(self.wrong_state("activate", other.tag())),
        };
        let title = required(draft.title.clone(), "title")?;
        let description = required(draft.description.clone(), "description")?;
        let start_price = required(draft.start_price, "start_price")?;
        let min_bidding_time = required(draft.min_bidding_time, "min_bidding_time")?;

        let listed_at = self.time.now_unix();
        self.state = State::Active(ActiveData {
            title,
            description,
            start_price,
            min_bidding_time,
            listed_at,
            ledger: BidLedger::new(self.uid.clone()),
        });
        info!(uid = %self.uid, seller = %self.seller.username(), "listing activated");

        let event = ListingActivated {
            uid: self.uid.clone(),
            listed_at,
        };
        self.on_activate.trigger(&event);
        // Activation cannot recur; drop its subscribers.
        self.on_activate.clear();
        Ok(())
    }

    /// Sell an active listing to its highest bidder.
    ///
    /// # Errors
    ///
    /// `InvalidState` outside the active state, with no live bids, or
    /// before the minimum bidding time has elapsed. The listing (ledger
    /// included) is unchanged on error.
    pub fn sell(&mut self) -> MarketResult<()> {
        let sold_at = self.time.now_unix();
        let state = mem::replace(&mut self.state, State::Draft(ListingDraft::default()));
        let mut data = match state {
            State::Active(data) => data,
            other => {
                let tag = other.tag();
                self.state = other;
                return Err(self.wrong_state("sell", tag));
            }
        };

        let top = match data.ledger.top() {
            Some(top) => top.clone(),
            None => {
                self.state = State::Active(data);
                return Err(MarketError::InvalidState(format!(
                    "cannot sell listing {}: it has no bids",
                    self.uid
                )));
            }
        };
        if sold_at.saturating_sub(data.listed_at) < data.min_bidding_time.as_secs() {
            self.state = State::Active(data);
            return Err(MarketError::InvalidState(format!(
                "cannot sell listing {}: the minimum bidding time has not elapsed",
                self.uid
            )));
        }

        let event = ListingSold {
            uid: self.uid.clone(),
            sold_at,
            sale_price: top.price,
            buyer: top.bidder.clone(),
        };
        // The ledger is dropped here with the rest of the active payload.
        self.state = State::Sold(SoldData {
            title: data.title,
            description: data.description,
            start_price: data.start_price,
            min_bidding_time: data.min_bidding_time,
            listed_at: data.listed_at,
            sold_at,
            sale_price: top.price,
            buyer: top.bidder,
        });
        info!(uid = %self.uid, seller = %self.seller.username(), "listing sold");

        self.on_sell.trigger(&event);
        self.clear_all_events();
        Ok(())
    }

    /// Cancel a draft or an active listing without live bids.
    ///
    /// # Errors
    ///
    /// `InvalidState` in a terminal state, or while the ledger still holds
    /// a live bid. The listing is unchanged on error.
    pub fn cancel(&mut self) -> MarketResult<()> {
        let cancelled_at = self.time.now_unix();
        let from = self.state.tag();
        let state = mem::replace(&mut self.state, State::Draft(ListingDraft::default()));
        let fields = match state {
            State::Draft(draft) => draft,
            State::Active(data) => {
                if data.ledger.has_bids() {
                    self.state = State::Active(data);
                    return Err(MarketError::InvalidState(format!(
                        "cannot cancel listing {}: it still has live bids",
                        self.uid
                    )));
                }
                // Active-only fields and the ledger are dropped here.
                ListingDraft {
                    title: Some(data.title),
                    description: Some(data.description),
                    start_price: Some(data.start_price),
                    min_bidding_time: Some(data.min_bidding_time),
                }
            }
            other => {
                let tag = other.tag();
                self.state = other;
                return Err(self.wrong_state("cancel", tag));
            }
        };

        self.state = State::Cancelled(CancelledData {
            fields,
            cancelled_at,
        });
        info!(uid = %self.uid, seller = %self.seller.username(), %from, "listing cancelled");

        let event = ListingCancelled {
            uid: self.uid.clone(),
            cancelled_at,
            from,
        };
        self.on_cancel.trigger(&event);
        self.clear_all_events();
        Ok(())
    }

    fn clear_all_events(&self) {
        self.on_activate.clear();
        self.on_sell.clear();
        self.on_cancel.clear();
    }

    fn draft_fields_mut(&mut self, action: &str) -> MarketResult<&mut ListingDraft> {
        match &mut self.state {
            State::Draft(draft) => Ok(draft),
            other => {
                let tag = other.tag();
                Err(MarketError::InvalidState(format!(
                    "cannot {action} listing {}: it is {tag}, not draft",
                    self.uid
                )))
            }
        }
    }

    fn wrong_state(&self, action: &str, actual: ListingState) -> MarketError {
        MarketError::InvalidState(format!(
            "cannot {action} listing {}: it is {actual}",
            self.uid
        ))
    }
}

fn required<V>(value: Option<V>, field: &str) -> MarketResult<V> {
    value.ok_or_else(|| MarketError::Validation(format!("{field} is required")))
}

fn validate_title(title: &str) -> MarketResult<()> {
    if title.is_empty() {
        return Err(MarketError::Validation("title cannot be empty".into()));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(MarketError::Validation(format!(
            "title length must be at most {TITLE_MAX_LEN}"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> MarketResult<()> {
    if description.is_empty() {
        return Err(MarketError::Validation(
            "description cannot be empty".into(),
        ));
    }
    if description.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(MarketError::Validation(format!(
            "description length must be at most {DESCRIPTION_MAX_LEN}"
        )));
    }
    Ok(())
}

fn validate_start_price(price: Decimal) -> MarketResult<()> {
    if price < Decimal::ZERO {
        return Err(MarketError::Validation(
            "start price cannot be negative".into(),
        ));
    }
    Ok(())
}

fn validate_min_bidding_time(duration: Duration) -> MarketResult<()> {
    if duration < MIN_BIDDING_TIME_FLOOR {
        return Err(MarketError::Validation(format!(
            "minimum bidding time must be at least {} seconds",
            MIN_BIDDING_TIME_FLOOR.as_secs()
        )));
    }
    Ok(())
}

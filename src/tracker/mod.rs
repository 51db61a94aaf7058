//! Tracker module - the listing ledger and the purchase decision rules.
//!
//! # Key Concepts
//! - Listing: one observed product with optional price, rating and title
//! - Ledger: listings per storefront in insertion order, plus a best-price cache
//! - Composite score: `rating * 10000 - price`, missing price is a huge penalty
//! - Exclusion set: titles that failed to open and must not be offered again
//!
//! # Design Principles
//! - Everything here is synchronous and in memory
//! - Nothing here logs; callers decide what to report
//! - Every failure is a [`TrackerError`] value and leaves the tracker usable

mod decision;
mod error;
mod exclusion;
mod ledger;
mod listing;
mod score;

pub use decision::{
    Candidate, DecisionResult, PriceTracker, SelectionStrategy, DEFAULT_SAMPLE_SIZE,
};
pub use error::TrackerError;
pub use exclusion::ExclusionSet;
pub use ledger::ListingLedger;
pub use listing::{
    escape_html, normalize_storefront, normalize_title, parse_lenient_number, unescape_html, Listing,
    Observation, RawField, SPONSORED_MARKERS, UNKNOWN_TITLE,
};
pub use score::{composite_score, score_parts, MISSING_PRICE_PENALTY, RATING_WEIGHT};

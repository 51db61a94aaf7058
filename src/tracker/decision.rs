//! Purchase decisions over the ledger.
//!
//! # Flow
//! - `decide`: sample the first N listings per storefront, prefer the lowest
//!   in-budget price, otherwise fall back to composite score, then refuse a
//!   winner that is still over budget
//! - `next_candidate`: after an open failure, rescore the full history with
//!   every failed title removed

use serde::Serialize;

use crate::budget::BudgetInput;

use super::error::TrackerError;
use super::exclusion::ExclusionSet;
use super::ledger::ListingLedger;
use super::listing::{Listing, Observation};
use super::score::{composite_score, first_max_by};

/// Listings per storefront considered by `decide`.
pub const DEFAULT_SAMPLE_SIZE: usize = 2;

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    LowerPrice,
    CompositeScore,
    NextAfterFailure,
}

/// Outcome of a successful decision. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionResult {
    pub storefront: String,
    pub title: String,
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub score: f64,
    pub strategy: SelectionStrategy,
    pub reason: String,
}

/// Best listing of one storefront.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub storefront: &'a str,
    pub listing: &'a Listing,
    pub score: f64,
}

impl<'a> Candidate<'a> {
    fn new(storefront: &'a str, listing: &'a Listing) -> Self {
        Self {
            storefront,
            listing,
            score: composite_score(listing),
        }
    }

    fn within(&self, budget: f64) -> bool {
        self.listing.price().map_or(true, |p| p <= budget)
    }

    pub fn into_decision(self, strategy: SelectionStrategy, reason: String) -> DecisionResult {
        DecisionResult {
            storefront: self.storefront.to_string(),
            title: self.listing.title().to_string(),
            price: self.listing.price(),
            rating: self.listing.rating(),
            score: self.score,
            strategy,
            reason,
        }
    }
}

/// Keep candidates that are unpriced or within budget, unless that would
/// leave nothing, in which case keep them all.
fn budget_filter(candidates: Vec<Candidate<'_>>, budget: Option<f64>) -> Vec<Candidate<'_>> {
    let Some(budget) = budget else {
        return candidates;
    };
    let filtered: Vec<_> = candidates.iter().copied().filter(|c| c.within(budget)).collect();
    if filtered.is_empty() {
        candidates
    } else {
        filtered
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
}

/// Ledger, failed-open exclusions and the decision rules over them.
///
/// Holds no locks: callers that share a tracker across tasks wrap it in a
/// single-writer lock.
#[derive(Debug)]
pub struct PriceTracker {
    ledger: ListingLedger,
    failed_opens: ExclusionSet,
    sample_size: usize,
}

impl Default for PriceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceTracker {
    pub fn new() -> Self {
        Self::with_sample_size(DEFAULT_SAMPLE_SIZE)
    }

    /// Tracker whose `decide` samples `sample_size` listings per storefront
    /// (at least one).
    pub fn with_sample_size(sample_size: usize) -> Self {
        Self {
            ledger: ListingLedger::new(),
            failed_opens: ExclusionSet::new(),
            sample_size: sample_size.max(1),
        }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn ledger(&self) -> &ListingLedger {
        &self.ledger
    }

    pub fn failed_opens(&self) -> &ExclusionSet {
        &self.failed_opens
    }

    /// Record one observation and describe what was stored.
    pub fn record_listing(&mut self, obs: &Observation) -> Result<String, TrackerError> {
        let listing = self.ledger.record(obs)?;
        Ok(format!(
            "Logged item for {}: title={}, price={}, rating={}",
            obs.storefront,
            listing.title(),
            fmt_opt(listing.price()),
            fmt_opt(listing.rating())
        ))
    }

    pub fn best_price(&self, storefront: &str) -> Option<f64> {
        self.ledger.best_price(storefront)
    }

    /// Best composite-score listing among the first `sample_size` of each storefront.
    pub fn sampled_candidates(&self, sample_size: usize) -> Vec<Candidate<'_>> {
        self.ledger
            .iter()
            .filter_map(|(storefront, items)| {
                let window = &items[..items.len().min(sample_size)];
                first_max_by(window, |l| composite_score(l))
                    .map(|listing| Candidate::new(storefront, listing))
            })
            .collect()
    }

    /// Composite-score winner across storefronts, optionally preferring
    /// candidates that fit the budget.
    pub fn choose_overall_best(
        &self,
        budget: Option<f64>,
        sample_size: usize,
    ) -> Option<Candidate<'_>> {
        let candidates = budget_filter(self.sampled_candidates(sample_size), budget);
        first_max_by(candidates, |c| c.score)
    }

    /// Pick a storefront and listing to buy within `budget`.
    pub fn decide(&self, budget: impl Into<BudgetInput>) -> Result<DecisionResult, TrackerError> {
        if self.ledger.is_empty() {
            return Err(TrackerError::NoListings);
        }
        let budget = budget.into().resolve()?;

        let candidates = self.sampled_candidates(self.sample_size);
        if candidates.is_empty() {
            return Err(TrackerError::NoCandidates);
        }

        // min_by keeps the first of equal prices
        let cheapest = candidates
            .iter()
            .copied()
            .filter_map(|c| c.listing.price().filter(|p| *p <= budget).map(|p| (c, p)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let (winner, strategy, reason) = match cheapest {
            Some((candidate, price)) => (
                candidate,
                SelectionStrategy::LowerPrice,
                format!("Selected by lower price: {} on {}", price, candidate.storefront),
            ),
            None => {
                let candidate = self
                    .choose_overall_best(Some(budget), self.sample_size)
                    .ok_or(TrackerError::NoCandidates)?;
                (
                    candidate,
                    SelectionStrategy::CompositeScore,
                    format!(
                        "Selected by composite score: {} on {}",
                        candidate.score, candidate.storefront
                    ),
                )
            }
        };

        if let Some(price) = winner.listing.price() {
            if price > budget {
                return Err(TrackerError::BudgetExceeded {
                    storefront: winner.storefront.to_string(),
                    price,
                    budget,
                });
            }
        }

        Ok(winner.into_decision(strategy, reason))
    }

    /// Remember that `title` could not be opened on `storefront`.
    pub fn mark_failed_open(
        &mut self,
        storefront: &str,
        title: Option<&str>,
    ) -> Result<String, TrackerError> {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TrackerError::MissingInput("Error: No product title provided.".to_string()))?;
        self.failed_opens.insert(title);
        Ok(format!(
            "Marked '{}' as failed to open for {}.",
            title, storefront
        ))
    }

    pub fn should_try(&self, title: Option<&str>) -> bool {
        match title.filter(|t| !t.trim().is_empty()) {
            Some(t) => !self.failed_opens.contains(t),
            None => true,
        }
    }

    /// Mark `title` as failed and return the best remaining listing across the
    /// full history of every storefront.
    pub fn next_candidate(
        &mut self,
        storefront: &str,
        title: Option<&str>,
        budget: Option<BudgetInput>,
    ) -> Result<DecisionResult, TrackerError> {
        // an absent title only means there is nothing new to exclude
        let _ = self.mark_failed_open(storefront, title);

        let budget = budget.map(|b| b.resolve()).transpose()?;

        let excluded = &self.failed_opens;
        let candidates: Vec<Candidate<'_>> = self
            .ledger
            .iter()
            .filter_map(|(name, items)| {
                let remaining = items
                    .iter()
                    .filter(|l| !excluded.contains_key(&l.title_key()));
                first_max_by(remaining, |l| composite_score(l))
                    .map(|listing| Candidate::new(name, listing))
            })
            .collect();

        if candidates.is_empty() {
            return Err(TrackerError::NoCandidates);
        }

        let winner = first_max_by(budget_filter(candidates, budget), |c| c.score)
            .ok_or(TrackerError::NoCandidates)?;
        let reason = format!(
            "Next best by composite score: {} on {} ({} failed open)",
            winner.score,
            winner.storefront,
            excluded.len()
        );
        Ok(winner.into_decision(SelectionStrategy::NextAfterFailure, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(entries: &[(&str, &str, &str, &str)]) -> PriceTracker {
        let mut tracker = PriceTracker::new();
        for (store, price, rating, title) in entries {
            tracker
                .record_listing(&Observation::new(*store).price(*price).rating(*rating).title(*title))
                .unwrap();
        }
        tracker
    }

    #[test]
    fn test_empty_ledger_reports_no_listings() {
        let tracker = PriceTracker::new();
        assert_eq!(tracker.decide("15k"), Err(TrackerError::NoListings));
        assert_eq!(tracker.decide(1.0), Err(TrackerError::NoListings));
    }

    #[test]
    fn test_invalid_budget_is_reported() {
        let tracker = seeded(&[("amazon", "1200", "4.0", "Kettle")]);
        assert!(matches!(tracker.decide("abc"), Err(TrackerError::InvalidBudget(_))));
        assert!(matches!(tracker.decide("0"), Err(TrackerError::InvalidBudget(_))));
    }

    #[test]
    fn test_price_first_selection() {
        let tracker = seeded(&[
            ("Amazon", "₹1,200", "3.0", "Kettle A"),
            ("Flipkart", "₹1,500", "4.8", "Kettle B"),
        ]);
        let decision = tracker.decide("2000").unwrap();
        assert_eq!(decision.storefront, "amazon");
        assert_eq!(decision.title, "Kettle A");
        assert_eq!(decision.price, Some(1200.0));
        assert_eq!(decision.strategy, SelectionStrategy::LowerPrice);
        assert!(decision.reason.starts_with("Selected by lower price"));
        assert_eq!(decision.score, 3.0 * 10_000.0 - 1200.0);
    }

    #[test]
    fn test_equal_prices_keep_storefront_order() {
        let tracker = seeded(&[
            ("flipkart", "999", "3.9", "F"),
            ("amazon", "999", "4.9", "A"),
        ]);
        assert_eq!(tracker.decide("1000").unwrap().storefront, "flipkart");
    }

    #[test]
    fn test_fallback_to_composite_score() {
        let tracker = seeded(&[
            ("amazon", "2500", "4.0", "Over budget"),
            ("flipkart", "Price on request", "4.9", "Unpriced"),
        ]);
        let decision = tracker.decide("2000").unwrap();
        assert_eq!(decision.storefront, "flipkart");
        assert_eq!(decision.price, None);
        assert_eq!(decision.strategy, SelectionStrategy::CompositeScore);
        assert!(decision.reason.starts_with("Selected by composite score"));
    }

    #[test]
    fn test_over_budget_everywhere_is_budget_exceeded() {
        let tracker = seeded(&[
            ("amazon", "2500", "4.0", "A"),
            ("flipkart", "2600", "4.5", "B"),
        ]);
        match tracker.decide("2000") {
            Err(TrackerError::BudgetExceeded { storefront, price, budget }) => {
                assert_eq!(storefront, "flipkart");
                assert_eq!(price, 2600.0);
                assert_eq!(budget, 2000.0);
            }
            other => panic!("expected BudgetExceeded, got {:?}", other),
        }
        // the tracker stays usable
        let mut tracker = tracker;
        tracker
            .record_listing(&Observation::new("amazon").price("1800").title("C"))
            .unwrap();
        assert_eq!(tracker.decide("2000").unwrap_err().kind(), "budget_exceeded");
    }

    #[test]
    fn test_decide_only_samples_first_listings() {
        let tracker = seeded(&[
            ("amazon", "1900", "3.0", "First"),
            ("amazon", "1950", "3.5", "Second"),
            ("amazon", "100", "5.0", "Third is outside the window"),
        ]);
        let decision = tracker.decide("2000").unwrap();
        // best composite in the window is "Second"; the price rule then takes it
        assert_eq!(decision.title, "Second");
    }

    #[test]
    fn test_sample_window_is_configurable() {
        let mut tracker = PriceTracker::with_sample_size(3);
        for (price, title) in [("1900", "First"), ("1950", "Second"), ("100", "Third")] {
            tracker
                .record_listing(&Observation::new("amazon").price(price).rating("3.0").title(title))
                .unwrap();
        }
        assert_eq!(tracker.decide("2000").unwrap().title, "Third");
        assert_eq!(PriceTracker::with_sample_size(0).sample_size(), 1);
    }

    #[test]
    fn test_choose_overall_best_budget_filter_falls_back_to_all() {
        let tracker = seeded(&[
            ("amazon", "2500", "4.0", "A"),
            ("flipkart", "3000", "4.9", "B"),
        ]);
        let best = tracker.choose_overall_best(Some(1000.0), 2).unwrap();
        assert_eq!(best.storefront, "flipkart");

        let best = tracker.choose_overall_best(Some(2600.0), 2).unwrap();
        assert_eq!(best.storefront, "amazon");
    }

    #[test]
    fn test_mark_failed_open_is_idempotent() {
        let mut tracker = seeded(&[("amazon", "1200", "4.0", "Kettle")]);
        tracker.mark_failed_open("amazon", Some("Steel Kettle")).unwrap();
        tracker.mark_failed_open("amazon", Some("  STEEL kettle ")).unwrap();
        assert_eq!(tracker.failed_opens().len(), 1);

        let err = tracker.mark_failed_open("amazon", None).unwrap_err();
        assert_eq!(err.kind(), "missing_input");
        assert_eq!(tracker.failed_opens().len(), 1);
    }

    #[test]
    fn test_should_try() {
        let mut tracker = PriceTracker::new();
        assert!(tracker.should_try(None));
        assert!(tracker.should_try(Some("Kettle")));
        tracker.mark_failed_open("amazon", Some("Kettle")).unwrap();
        assert!(!tracker.should_try(Some("kettle")));
        assert!(tracker.should_try(Some("Toaster")));
        assert!(tracker.should_try(Some("")));
    }

    #[test]
    fn test_next_candidate_uses_full_history_and_skips_failures() {
        let mut tracker = seeded(&[
            ("amazon", "1200", "4.0", "A1"),
            ("amazon", "1300", "4.1", "A2"),
            ("amazon", "1100", "4.6", "A3"),
            ("flipkart", "1250", "4.2", "F1"),
        ]);

        let first = tracker.next_candidate("amazon", Some("A1"), None).unwrap();
        // A3 sits outside the sample window but is the best overall
        assert_eq!(first.title, "A3");
        assert_eq!(first.strategy, SelectionStrategy::NextAfterFailure);

        let second = tracker.next_candidate("amazon", Some("A3"), None).unwrap();
        assert_eq!(second.title, "F1");

        let third = tracker.next_candidate("flipkart", Some("F1"), None).unwrap();
        assert_eq!(third.title, "A2");

        for failed in ["A1", "A3", "F1"] {
            assert!(!tracker.should_try(Some(failed)));
        }

        tracker.next_candidate("amazon", Some("A2"), None).unwrap_err();
        assert_eq!(
            tracker.next_candidate("amazon", None, None),
            Err(TrackerError::NoCandidates)
        );
    }

    #[test]
    fn test_next_candidate_accepts_escaped_titles() {
        let mut tracker = seeded(&[
            ("amazon", "1200", "4.9", "Salt & Pepper"),
            ("amazon", "1300", "4.0", "Pepper Mill"),
        ]);
        let decision = tracker.decide("2000").unwrap();
        assert_eq!(decision.title, "Salt &amp; Pepper");

        let next = tracker
            .next_candidate("amazon", Some(decision.title.as_str()), Some("2000".into()))
            .unwrap();
        assert_eq!(next.title, "Pepper Mill");
    }

    #[test]
    fn test_next_candidate_prefers_in_budget() {
        let mut tracker = seeded(&[
            ("amazon", "5000", "4.9", "Premium"),
            ("flipkart", "1500", "3.5", "Budget"),
            ("flipkart", "1400", "3.0", "Failed"),
        ]);
        let next = tracker
            .next_candidate("flipkart", Some("Failed"), Some(BudgetInput::from(2000.0)))
            .unwrap();
        assert_eq!(next.title, "Budget");

        let next = tracker
            .next_candidate("flipkart", Some("Budget"), Some(BudgetInput::from(2000.0)))
            .unwrap();
        // nothing in budget remains, so the filter is ignored
        assert_eq!(next.title, "Premium");
    }

    #[test]
    fn test_next_candidate_rejects_bad_budget() {
        let mut tracker = seeded(&[("amazon", "1200", "4.0", "A")]);
        let err = tracker
            .next_candidate("amazon", Some("B"), Some("abc".into()))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_budget");
        // the failure was still recorded
        assert!(!tracker.should_try(Some("B")));
    }
}

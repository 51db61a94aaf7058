//! Per-storefront listing ledger.

use std::collections::HashMap;

use super::error::TrackerError;
use super::listing::{normalize_storefront, Listing, Observation};

/// Append-only record of every observed listing, grouped by storefront.
///
/// Storefronts iterate in the order they were first seen and listings in the
/// order they were recorded; the "first N results" sampling depends on both.
#[derive(Debug, Default)]
pub struct ListingLedger {
    order: Vec<String>,
    listings: HashMap<String, Vec<Listing>>,
    /// Cache of the lowest parsed price per storefront. Decisions never read it.
    best_prices: HashMap<String, f64>,
}

impl ListingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listing built from `obs`.
    ///
    /// Fails only when the observation carries no price, rating or title.
    pub fn record(&mut self, obs: &Observation) -> Result<&Listing, TrackerError> {
        if !obs.has_signal() {
            return Err(TrackerError::MissingInput(format!(
                "Error: No price, rating or title provided for {}.",
                obs.storefront
            )));
        }

        let listing = Listing::from_observation(obs);
        let key = listing.storefront().to_string();

        if let Some(price) = listing.price() {
            self.best_prices
                .entry(key.clone())
                .and_modify(|best| {
                    if price < *best {
                        *best = price;
                    }
                })
                .or_insert(price);
        }

        if !self.listings.contains_key(&key) {
            self.order.push(key.clone());
        }
        let bucket = self.listings.entry(key).or_default();
        bucket.push(listing);
        Ok(&bucket[bucket.len() - 1])
    }

    /// Lowest recorded price for a storefront, if any listing had a parseable price.
    pub fn best_price(&self, storefront: &str) -> Option<f64> {
        self.best_prices.get(&normalize_storefront(storefront)).copied()
    }

    /// Listings for a storefront in insertion order.
    pub fn listings(&self, storefront: &str) -> &[Listing] {
        self.listings
            .get(&normalize_storefront(storefront))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Storefronts in first-seen order with their listings.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Listing])> + '_ {
        self.order.iter().map(move |name| {
            let items = self
                .listings
                .get(name)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            (name.as_str(), items)
        })
    }

    pub fn storefront_count(&self) -> usize {
        self.order.len()
    }

    /// Total number of listings across all storefronts.
    pub fn len(&self) -> usize {
        self.listings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_groups_by_normalized_storefront() {
        let mut ledger = ListingLedger::new();
        ledger.record(&Observation::new("Amazon").price("₹1,299").title("A")).unwrap();
        ledger.record(&Observation::new(" amazon ").price("₹999").title("B")).unwrap();
        ledger.record(&Observation::new("Flipkart").price("₹1,099").title("C")).unwrap();

        assert_eq!(ledger.storefront_count(), 2);
        assert_eq!(ledger.len(), 3);
        let titles: Vec<&str> = ledger.listings("AMAZON").iter().map(|l| l.title()).collect();
        assert_eq!(titles, vec!["A", "B"]);

        let order: Vec<&str> = ledger.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["amazon", "flipkart"]);
    }

    #[test]
    fn test_best_price_tracks_minimum() {
        let mut ledger = ListingLedger::new();
        assert_eq!(ledger.best_price("amazon"), None);

        ledger.record(&Observation::new("amazon").price("1500")).unwrap();
        ledger.record(&Observation::new("amazon").price("1200")).unwrap();
        ledger.record(&Observation::new("amazon").price("1300")).unwrap();
        ledger.record(&Observation::new("amazon").price("n/a").title("X")).unwrap();

        assert_eq!(ledger.best_price("Amazon"), Some(1200.0));
    }

    #[test]
    fn test_best_price_absent_when_nothing_parses() {
        let mut ledger = ListingLedger::new();
        ledger.record(&Observation::new("flipkart").price("See price in cart")).unwrap();
        assert_eq!(ledger.best_price("flipkart"), None);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_record_requires_some_signal() {
        let mut ledger = ListingLedger::new();
        let err = ledger.record(&Observation::new("amazon")).unwrap_err();
        assert_eq!(err.kind(), "missing_input");
        assert!(ledger.is_empty());

        // still usable afterwards
        ledger.record(&Observation::new("amazon").rating("4.5")).unwrap();
        assert_eq!(ledger.len(), 1);
    }
}

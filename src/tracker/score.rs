//! Composite scoring.
//!
//! `score = rating * RATING_WEIGHT - price`. A missing rating counts as zero
//! and a missing price as [`MISSING_PRICE_PENALTY`], so an unpriced listing
//! only wins when nothing priced competes with it.

use super::listing::Listing;

pub const RATING_WEIGHT: f64 = 10_000.0;
pub const MISSING_PRICE_PENALTY: f64 = 1e9;

pub fn score_parts(rating: Option<f64>, price: Option<f64>) -> f64 {
    debug_assert!(
        price.map_or(true, |p| p >= 0.0),
        "negative price reached the scorer"
    );
    rating.unwrap_or(0.0) * RATING_WEIGHT - price.unwrap_or(MISSING_PRICE_PENALTY)
}

pub fn composite_score(listing: &Listing) -> f64 {
    score_parts(listing.rating(), listing.price())
}

/// Highest scoring item; the earliest one wins ties.
pub(crate) fn first_max_by<T, F>(items: impl IntoIterator<Item = T>, mut score: F) -> Option<T>
where
    F: FnMut(&T) -> f64,
{
    let mut best: Option<(T, f64)> = None;
    for item in items {
        let s = score(&item);
        match &best {
            Some((_, best_score)) if s <= *best_score => {}
            _ => best = Some((item, s)),
        }
    }
    best.map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_formula() {
        assert_eq!(score_parts(Some(4.5), Some(1200.0)), 45_000.0 - 1200.0);
        assert_eq!(score_parts(None, Some(1200.0)), -1200.0);
        assert_eq!(score_parts(Some(4.9), None), 49_000.0 - 1e9);
        assert_eq!(score_parts(None, None), -1e9);
    }

    #[test]
    fn test_score_monotonic_in_rating_and_price() {
        let price = Some(1500.0);
        assert!(score_parts(Some(4.1), price) > score_parts(Some(4.0), price));
        assert!(score_parts(Some(3.0), price) > score_parts(None, price));

        let rating = Some(4.0);
        assert!(score_parts(rating, Some(999.0)) > score_parts(rating, Some(1000.0)));
        assert!(score_parts(rating, Some(250_000.0)) > score_parts(rating, None));
    }

    #[test]
    fn test_rating_outweighs_small_price_gaps() {
        // half a star is worth 5000 in price
        assert!(score_parts(Some(4.5), Some(1500.0)) > score_parts(Some(4.0), Some(1000.0)));
    }

    #[test]
    fn test_first_max_prefers_earliest_on_ties() {
        let items = vec![("a", 1.0), ("b", 3.0), ("c", 3.0), ("d", 2.0)];
        let best = first_max_by(items.iter(), |(_, s)| *s).unwrap();
        assert_eq!(best.0, "b");

        let empty: Vec<(&str, f64)> = Vec::new();
        assert!(first_max_by(empty.iter(), |(_, s)| *s).is_none());
    }
}

//! Listing records and the normalisation applied to everything that enters
//! the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Substrings that mark a result as a paid placement.
///
/// Matching is a plain case-insensitive substring test, so `"ad"` also hits
/// ordinary titles such as "Apple iPad" or "boAt Rockerz".
pub const SPONSORED_MARKERS: &[&str] = &["sponsored", "ad", "advertisement", "promoted"];

/// Title stored when the observation carried none.
pub const UNKNOWN_TITLE: &str = "(unknown)";

/// A numeric-ish value as reported by the automation layer: either a JSON
/// number or free text such as `"₹14,999"` or `"4.3★"`. Text is read by
/// keeping only digits and `.`, so `"4.3 out of 5"` becomes `4.35`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
}

impl RawField {
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Lenient numeric reading shared by price and rating.
    pub fn to_number(&self) -> Option<f64> {
        parse_lenient_number(&self.as_text())
    }

    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

impl From<&str> for RawField {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for RawField {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Strip everything except ASCII digits and `.` and parse the remainder.
///
/// Returns `None` when no digits survive or the remainder is not a number
/// (e.g. `"1.2.3"`). The result is never negative.
pub fn parse_lenient_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Escape the characters that matter when a title is later rendered as HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_html`].
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

pub fn normalize_storefront(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Comparison key for a title: trimmed, lowercased, HTML-escaped.
///
/// Already-escaped input (a title handed back from a decision result)
/// produces the same key as the raw title it came from.
pub fn normalize_title(title: &str) -> String {
    escape_html(&unescape_html(title.trim()).to_lowercase())
}

/// One product observation as reported by the automation layer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Observation {
    #[serde(alias = "app_name")]
    pub storefront: String,
    #[serde(default)]
    pub price_text: Option<RawField>,
    #[serde(default)]
    pub rating: Option<RawField>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Observation {
    pub fn new(storefront: impl Into<String>) -> Self {
        Self {
            storefront: storefront.into(),
            ..Self::default()
        }
    }

    pub fn price(mut self, price_text: impl Into<RawField>) -> Self {
        self.price_text = Some(price_text.into());
        self
    }

    pub fn rating(mut self, rating: impl Into<RawField>) -> Self {
        self.rating = Some(rating.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn present_price(&self) -> Option<&RawField> {
        self.price_text.as_ref().filter(|f| !f.is_blank())
    }

    fn present_rating(&self) -> Option<&RawField> {
        self.rating.as_ref().filter(|f| !f.is_blank())
    }

    fn present_title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// At least one of price, rating or title must carry something.
    pub fn has_signal(&self) -> bool {
        self.present_price().is_some()
            || self.present_rating().is_some()
            || self.present_title().is_some()
    }

    /// Case-insensitive substring check of title and price text against
    /// [`SPONSORED_MARKERS`].
    pub fn is_sponsored(&self) -> bool {
        let combined = format!(
            "{} {}",
            self.title.as_deref().unwrap_or_default(),
            self.price_text.as_ref().map(RawField::as_text).unwrap_or_default()
        )
        .to_lowercase();
        SPONSORED_MARKERS.iter().any(|m| combined.contains(m))
    }
}

/// An observed product. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    storefront: String,
    title: String,
    price: Option<f64>,
    rating: Option<f64>,
    raw_price_text: String,
    observed_at: DateTime<Utc>,
}

impl Listing {
    pub fn from_observation(obs: &Observation) -> Self {
        Self {
            storefront: normalize_storefront(&obs.storefront),
            title: escape_html(obs.present_title().unwrap_or(UNKNOWN_TITLE)),
            price: obs.present_price().and_then(RawField::to_number),
            rating: obs.present_rating().and_then(RawField::to_number),
            raw_price_text: obs
                .present_price()
                .map(|p| escape_html(&p.as_text()))
                .unwrap_or_default(),
            observed_at: Utc::now(),
        }
    }

    pub fn storefront(&self) -> &str {
        &self.storefront
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn title_key(&self) -> String {
        normalize_title(&self.title)
    }

    pub fn price(&self) -> Option<f64> {
        self.price
    }

    pub fn rating(&self) -> Option<f64> {
        self.rating
    }

    pub fn raw_price_text(&self) -> &str {
        &self.raw_price_text
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Parsed price when available, otherwise the sanitized raw text.
    pub fn display_price(&self) -> String {
        match self.price {
            Some(p) => p.to_string(),
            None => self.raw_price_text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_number_parsing() {
        assert_eq!(parse_lenient_number("₹14,999"), Some(14999.0));
        assert_eq!(parse_lenient_number("â‚¹1,299.00"), Some(1299.0));
        assert_eq!(parse_lenient_number("4.3★"), Some(4.3));
        // digits are concatenated, not tokenized
        assert_eq!(parse_lenient_number("4.3 out of 5"), Some(4.35));
        assert_eq!(parse_lenient_number("-250"), Some(250.0));
        assert_eq!(parse_lenient_number("Currently unavailable"), None);
        assert_eq!(parse_lenient_number("1.2.3"), None);
        assert_eq!(parse_lenient_number(""), None);
    }

    #[test]
    fn test_raw_field_accepts_numbers_and_text() {
        assert_eq!(RawField::from(4.3).to_number(), Some(4.3));
        assert_eq!(RawField::from("4.1").to_number(), Some(4.1));

        let parsed: RawField = serde_json::from_value(serde_json::json!(1299)).unwrap();
        assert_eq!(parsed.to_number(), Some(1299.0));
        let parsed: RawField = serde_json::from_value(serde_json::json!("₹1,299")).unwrap();
        assert_eq!(parsed.to_number(), Some(1299.0));
    }

    #[test]
    fn test_escape_and_normalize_title() {
        assert_eq!(
            escape_html("<b>Tom & Jerry's \"Box\"</b>"),
            "&lt;b&gt;Tom &amp; Jerry&#x27;s &quot;Box&quot;&lt;/b&gt;"
        );
        assert_eq!(normalize_title("  Tom & Jerry  "), "tom &amp; jerry");
        // escaped input normalises to the same key
        assert_eq!(normalize_title("Tom &amp; Jerry"), "tom &amp; jerry");
        assert_eq!(normalize_title("TOM & JERRY"), normalize_title("tom & jerry"));
    }

    #[test]
    fn test_listing_from_observation() {
        let obs = Observation::new("  Amazon ")
            .price("₹1,299")
            .rating("4.2")
            .title("Boat <Rockerz>");
        let listing = Listing::from_observation(&obs);

        assert_eq!(listing.storefront(), "amazon");
        assert_eq!(listing.title(), "Boat &lt;Rockerz&gt;");
        assert_eq!(listing.price(), Some(1299.0));
        assert_eq!(listing.rating(), Some(4.2));
        assert_eq!(listing.raw_price_text(), "₹1,299");
    }

    #[test]
    fn test_listing_keeps_raw_text_when_price_unparseable() {
        let listing = Listing::from_observation(&Observation::new("flipkart").price("See options"));
        assert_eq!(listing.price(), None);
        assert_eq!(listing.title(), UNKNOWN_TITLE);
        assert_eq!(listing.display_price(), "See options");
    }

    #[test]
    fn test_signal_detection() {
        assert!(!Observation::new("amazon").has_signal());
        assert!(!Observation::new("amazon").title("   ").price("").has_signal());
        assert!(Observation::new("amazon").rating(4.0).has_signal());
        assert!(Observation::new("amazon").title("Kettle").has_signal());
    }

    #[test]
    fn test_sponsored_detection() {
        assert!(Observation::new("amazon").title("Sponsored: Kettle").is_sponsored());
        assert!(Observation::new("amazon").title("Kettle").price("Promoted ₹999").is_sponsored());
        assert!(Observation::new("amazon").title("Advertisement").is_sponsored());
        assert!(!Observation::new("amazon").title("Steel Kettle").price("₹999").is_sponsored());
        // the short marker over-matches ordinary titles
        assert!(Observation::new("amazon").title("Apple iPad (10th Gen)").is_sponsored());
    }

    #[test]
    fn test_observation_deserializes_app_name_alias() {
        let obs: Observation = serde_json::from_value(serde_json::json!({
            "app_name": "Flipkart",
            "price_text": "₹999",
            "rating": 4.1,
            "title": "Kettle"
        }))
        .unwrap();
        assert_eq!(obs.storefront, "Flipkart");
        assert_eq!(obs.rating, Some(RawField::Number(4.1)));
    }
}

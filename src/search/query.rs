//! Price hints embedded in free-text queries.

use once_cell::sync::Lazy;
use regex::Regex;

static UNDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)under\s*₹?(\d{2,6})").expect("valid price regex"));

static OVER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)over\s*₹?(\d{2,6})|above\s*₹?(\d{2,6})").expect("valid price regex")
});

/// Extract `(min, max)` price bounds from phrases like `under ₹5000`,
/// `over 1000` or `above 250`.
///
/// An `under` bound wins over `over`/`above`; at most one side is returned.
pub fn parse_price_from_query(query: &str) -> (Option<f64>, Option<f64>) {
    if let Some(max) = UNDER_REGEX
        .captures(query)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        return (None, Some(max));
    }

    if let Some(min) = OVER_REGEX
        .captures(query)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        return (Some(min), None);
    }

    (None, None)
}

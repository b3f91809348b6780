//! Click-based personalization of search results.
//!
//! A lightweight user profile (preferred categories and colors) is derived
//! from the session's click history and used to boost matching results:
//!
//! - exact-click boost for items the user already clicked, growing linearly
//!   with repeated clicks
//! - category boost for items in one of the preferred categories
//! - color boost for items in one of the preferred colors
//!
//! Every function here is pure: inputs are borrowed and fresh records are
//! returned. Sorting by the boosted score is left to the caller.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::catalog::{CatalogLookup, Product};
use crate::search::SearchHit;

pub const DEFAULT_BOOST_EXACT_CLICK: f32 = 0.40;
pub const DEFAULT_BOOST_CATEGORY: f32 = 0.20;
pub const DEFAULT_BOOST_COLOR: f32 = 0.12;

/// How many preferred categories/colors a profile keeps.
pub const DEFAULT_PROFILE_TOP_K: usize = 3;

/// Extra weight per repeated click on the same item.
const REPEAT_CLICK_STEP: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostWeights {
    pub exact_click: f32,
    pub category: f32,
    pub color: f32,
}

impl Default for BoostWeights {
    fn default() -> Self {
        Self {
            exact_click: DEFAULT_BOOST_EXACT_CLICK,
            category: DEFAULT_BOOST_CATEGORY,
            color: DEFAULT_BOOST_COLOR,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
}

impl UserProfile {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.colors.is_empty()
    }
}

/// Attributes the profile is built from.
pub trait ItemAttributes {
    fn category(&self) -> Option<&str>;
    fn color(&self) -> Option<&str>;
}

impl ItemAttributes for Product {
    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}

impl ItemAttributes for SearchHit {
    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}

/// Re-ranker settings: boost weights and profile size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Personalizer {
    pub weights: BoostWeights,
    pub profile_top_k: usize,
}

impl Default for Personalizer {
    fn default() -> Self {
        Self {
            weights: BoostWeights::default(),
            profile_top_k: DEFAULT_PROFILE_TOP_K,
        }
    }
}

impl Personalizer {
    pub fn new(weights: BoostWeights, profile_top_k: usize) -> Self {
        Self {
            weights,
            profile_top_k,
        }
    }

    /// Re-score `results` against the click history.
    ///
    /// Returns a new list in the same order as `results`. With an empty click
    /// history the output equals the input.
    pub fn apply<C>(
        &self,
        results: &[SearchHit],
        click_history: &[i64],
        catalog: Option<&C>,
    ) -> Vec<SearchHit>
    where
        C: CatalogLookup + ?Sized,
    {
        if click_history.is_empty() {
            return results.to_vec();
        }

        let profile = build_profile_from_clicks(click_history, catalog, self.profile_top_k);
        let pref_categories: HashSet<&str> =
            profile.categories.iter().map(String::as_str).collect();
        let pref_colors: HashSet<&str> = profile.colors.iter().map(String::as_str).collect();

        let mut click_counts: HashMap<i64, usize> = HashMap::new();
        for id in click_history {
            *click_counts.entry(*id).or_default() += 1;
        }

        log::debug!(
            "personalizing {} results: {} distinct clicks, profile {:?}",
            results.len(),
            click_counts.len(),
            profile
        );

        results
            .iter()
            .map(|hit| {
                let mut score = hit.score;

                let times = hit
                    .id
                    .as_int()
                    .and_then(|id| click_counts.get(&id).copied())
                    .unwrap_or(0);
                if times > 0 {
                    score += self.weights.exact_click * exact_click_multiplier(times);
                }

                if !pref_categories.is_empty()
                    && hit.category().is_some_and(|c| pref_categories.contains(c))
                {
                    score += self.weights.category;
                }

                if !pref_colors.is_empty() && hit.color().is_some_and(|c| pref_colors.contains(c))
                {
                    score += self.weights.color;
                }

                SearchHit {
                    score,
                    ..hit.clone()
                }
            })
            .collect()
    }
}

/// `1 + (times - 1) * 0.15` for an item clicked `times` times.
fn exact_click_multiplier(times: usize) -> f32 {
    1.0 + times.saturating_sub(1) as f32 * REPEAT_CLICK_STEP
}

/// Re-score results with the given boost weights and the default profile size.
#[cfg(test)]
pub fn apply_personalization<C>(
    results: &[SearchHit],
    click_history: &[i64],
    catalog: Option<&C>,
    weights: BoostWeights,
) -> Vec<SearchHit>
where
    C: CatalogLookup + ?Sized,
{
    Personalizer::new(weights, DEFAULT_PROFILE_TOP_K).apply(results, click_history, catalog)
}

/// Infer preferred categories and colors from clicked catalog rows.
///
/// Each clicked row is counted once, whatever the number of clicks on it.
/// Ids missing from the catalog are ignored. Without a catalog, or with one
/// lacking an `id` column, the profile is empty.
pub fn build_profile_from_clicks<C>(
    click_history: &[i64],
    catalog: Option<&C>,
    top_k: usize,
) -> UserProfile
where
    C: CatalogLookup + ?Sized,
{
    let mut profile = UserProfile::default();

    let Some(catalog) = catalog else {
        return profile;
    };
    if click_history.is_empty() || !catalog.has_column("id") {
        return profile;
    }

    let clicked: HashSet<i64> = click_history.iter().copied().collect();
    let rows: Vec<&Product> = catalog
        .rows()
        .iter()
        .filter(|row| clicked.contains(&row.id))
        .collect();
    if rows.is_empty() {
        return profile;
    }

    if catalog.has_column("category") {
        profile.categories = most_common(rows.iter().filter_map(|row| row.category()), top_k);
    }

    if catalog.has_column("color") {
        profile.colors = most_common(rows.iter().filter_map(|row| row.color()), top_k);
    }

    profile
}

/// Fold a freshly clicked item into a running profile.
///
/// The item's category and color are appended to the profile lists, then each
/// list is collapsed to its `keep_top` most frequent values.
pub fn update_user_profile<T>(
    profile: Option<UserProfile>,
    clicked_item: &T,
    keep_top: usize,
) -> UserProfile
where
    T: ItemAttributes + ?Sized,
{
    let mut profile = profile.unwrap_or_default();

    if let Some(category) = clicked_item.category().filter(|c| !c.is_empty()) {
        profile.categories.push(category.to_string());
    }

    if let Some(color) = clicked_item.color().filter(|c| !c.is_empty()) {
        profile.colors.push(color.to_string());
    }

    UserProfile {
        categories: most_common(profile.categories.iter().map(String::as_str), keep_top),
        colors: most_common(profile.colors.iter().map(String::as_str), keep_top),
    }
}

/// The `k` most frequent non-empty values, ties in first-seen order.
fn most_common<'a, I>(values: I, k: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    value_counts(values)
        .into_iter()
        .take(k)
        .map(|(value, _)| value)
        .collect()
}

/// Occurrences of each non-empty value, most frequent first.
///
/// Values with equal counts keep the order in which they were first seen.
pub fn value_counts<'a, I>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(&'a str, usize)> = vec![];
    let mut slots: HashMap<&'a str, usize> = HashMap::new();

    for value in values.into_iter().filter(|v| !v.is_empty()) {
        match slots.get(value) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::search::ItemId;

    fn product(id: i64, category: &str, color: &str) -> Product {
        Product {
            id,
            category: (!category.is_empty()).then(|| category.to_string()),
            color: (!color.is_empty()).then(|| color.to_string()),
            ..Default::default()
        }
    }

    fn catalog(products: Vec<Product>) -> Catalog {
        let columns = ["id", "category", "color"].map(String::from).to_vec();
        Catalog::from_products(columns, products)
    }

    fn hit(id: i64, score: f32, category: Option<&str>, color: Option<&str>) -> SearchHit {
        SearchHit {
            category: category.map(String::from),
            color: color.map(String::from),
            ..SearchHit::new(id, score)
        }
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_empty_history_is_noop() {
        let results = vec![
            hit(1, 0.9, Some("shoes"), Some("blue")),
            hit(2, 0.4, None, None),
        ];
        let cat = catalog(vec![product(1, "shoes", "blue")]);

        let out = apply_personalization(&results, &[], Some(&cat), BoostWeights::default());
        assert_eq!(out, results);
    }

    #[test]
    fn test_exact_click_boost_scales_with_repeats() {
        let results = vec![hit(5, 0.5, None, None)];
        let weights = BoostWeights::default();

        for n in 1..=4usize {
            let clicks = vec![5i64; n];
            let out = apply_personalization::<Catalog>(&results, &clicks, None, weights);
            let expected = 0.5 + weights.exact_click * (1.0 + (n as f32 - 1.0) * 0.15);
            assert_close(out[0].score, expected);
        }
    }

    #[test]
    fn test_removing_one_click_changes_score_by_exact_increment() {
        let cat = catalog(vec![product(5, "shoes", "red"), product(6, "shoes", "red")]);
        let results = vec![hit(5, 0.3, Some("shoes"), Some("red"))];
        let weights = BoostWeights::default();

        // id 6 keeps the category/color profile identical in both calls
        let with_click = apply_personalization(&results, &[6, 5, 5, 5], Some(&cat), weights);
        let without_click = apply_personalization(&results, &[6, 5, 5], Some(&cat), weights);

        let three = weights.exact_click * (1.0 + 2.0 * 0.15);
        let two = weights.exact_click * (1.0 + 0.15);
        assert_close(with_click[0].score - without_click[0].score, three - two);
    }

    #[test]
    fn test_profile_top_category() {
        let cat = catalog(vec![
            product(1, "shoes", ""),
            product(2, "bags", ""),
            product(3, "shoes", ""),
        ]);

        let profile = build_profile_from_clicks(&[1, 3], Some(&cat), DEFAULT_PROFILE_TOP_K);
        assert_eq!(profile.categories.first().map(String::as_str), Some("shoes"));
        assert!(profile.colors.is_empty());
    }

    #[test]
    fn test_category_boost_without_exact_click() {
        let cat = catalog(vec![product(1, "shoes", ""), product(9, "shoes", "")]);
        let results = vec![hit(9, 0.5, Some("shoes"), None)];

        let out = apply_personalization(&results, &[1], Some(&cat), BoostWeights::default());
        assert_close(out[0].score, 0.70);
    }

    #[test]
    fn test_color_boost() {
        let cat = catalog(vec![product(1, "", "blue")]);
        let results = vec![
            hit(2, 0.1, Some("bags"), Some("blue")),
            hit(3, 0.1, Some("bags"), Some("green")),
        ];

        let out = apply_personalization(&results, &[1], Some(&cat), BoostWeights::default());
        assert_close(out[0].score, 0.1 + DEFAULT_BOOST_COLOR);
        assert_close(out[1].score, 0.1);
    }

    #[test]
    fn test_all_boosts_stack() {
        let cat = catalog(vec![product(4, "shoes", "blue")]);
        let results = vec![hit(4, 0.2, Some("shoes"), Some("blue"))];

        let out = apply_personalization(&results, &[4, 4], Some(&cat), BoostWeights::default());
        let expected = 0.2 + 0.40 * 1.15 + 0.20 + 0.12;
        assert_close(out[0].score, expected);
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let cat = catalog(vec![product(1, "shoes", "blue")]);
        let results = vec![
            hit(1, 0.9, Some("shoes"), Some("blue")),
            hit(2, 0.4, Some("shoes"), None),
        ];
        let clicks = vec![1, 1, 7];
        let results_before = results.clone();
        let clicks_before = clicks.clone();

        let out = apply_personalization(&results, &clicks, Some(&cat), BoostWeights::default());

        assert_eq!(results, results_before);
        assert_eq!(clicks, clicks_before);
        assert_ne!(out, results);
    }

    #[test]
    fn test_other_fields_preserved_and_order_kept() {
        let cat = catalog(vec![product(2, "bags", "")]);
        let mut first = hit(1, 0.3, Some("shoes"), None);
        first.title = Some("Runner".to_string());
        first
            .extra
            .insert("badge".to_string(), serde_json::json!("new"));
        let results = vec![first.clone(), hit(2, 0.1, Some("bags"), None)];

        let out = apply_personalization(&results, &[2], Some(&cat), BoostWeights::default());

        assert_eq!(out[0], first);
        assert_eq!(out[1].id, ItemId::Int(2));
        // boosted item stays in place; sorting is the caller's job
        assert!(out[1].score > out[0].score);
    }

    #[test]
    fn test_non_integer_id_skips_only_exact_boost() {
        let cat = catalog(vec![product(1, "shoes", "")]);
        let mut odd = hit(0, 0.5, Some("shoes"), None);
        odd.id = ItemId::Text("sku-1".to_string());
        let results = vec![odd, hit(1, 0.5, None, None)];

        let out = apply_personalization(&results, &[1], Some(&cat), BoostWeights::default());

        assert_close(out[0].score, 0.5 + DEFAULT_BOOST_CATEGORY);
        assert_close(out[1].score, 0.5 + DEFAULT_BOOST_EXACT_CLICK);
    }

    #[test]
    fn test_fractional_id_gets_no_exact_boost() {
        let mut fractional = hit(0, 0.0, None, None);
        fractional.id = ItemId::Float(2.5);

        let out =
            apply_personalization::<Catalog>(&[fractional], &[2], None, BoostWeights::default());
        assert_eq!(out[0].score, 0.0);
    }

    #[test]
    fn test_string_id_gets_exact_boost() {
        let mut text_id = hit(0, 0.0, None, None);
        text_id.id = ItemId::Text("12".to_string());

        let out = apply_personalization::<Catalog>(&[text_id], &[12], None, BoostWeights::default());
        assert_close(out[0].score, DEFAULT_BOOST_EXACT_CLICK);
    }

    #[test]
    fn test_no_catalog_means_exact_boost_only() {
        let results = vec![hit(1, 0.0, Some("shoes"), Some("blue"))];
        let out = apply_personalization::<Catalog>(&results, &[1], None, BoostWeights::default());
        assert_close(out[0].score, DEFAULT_BOOST_EXACT_CLICK);
    }

    #[test]
    fn test_profile_empty_without_catalog_or_history() {
        let cat = catalog(vec![product(1, "shoes", "blue")]);
        assert!(build_profile_from_clicks(&[], Some(&cat), 3).is_empty());
        assert!(build_profile_from_clicks::<Catalog>(&[1], None, 3).is_empty());
    }

    #[test]
    fn test_profile_empty_without_id_column() {
        let columns = ["category", "color"].map(String::from).to_vec();
        let cat = Catalog::from_products(columns, vec![product(1, "shoes", "blue")]);
        assert!(build_profile_from_clicks(&[1], Some(&cat), 3).is_empty());
    }

    #[test]
    fn test_profile_skips_absent_columns() {
        let columns = ["id", "category"].map(String::from).to_vec();
        let cat = Catalog::from_products(columns, vec![product(1, "shoes", "blue")]);

        let profile = build_profile_from_clicks(&[1], Some(&cat), 3);
        assert_eq!(profile.categories, vec!["shoes"]);
        assert!(profile.colors.is_empty());
    }

    #[test]
    fn test_profile_ignores_unknown_ids_and_empty_values() {
        let cat = catalog(vec![
            product(1, "shoes", ""),
            product(2, "", "red"),
            product(3, "bags", "red"),
        ]);

        let profile = build_profile_from_clicks(&[1, 2, 3, 99], Some(&cat), 3);
        assert_eq!(profile.categories, vec!["shoes", "bags"]);
        assert_eq!(profile.colors, vec!["red"]);
    }

    #[test]
    fn test_profile_counts_rows_not_clicks() {
        let cat = catalog(vec![
            product(1, "bags", ""),
            product(2, "shoes", ""),
            product(3, "shoes", ""),
        ]);

        // three clicks on the bag still count its row once
        let profile = build_profile_from_clicks(&[1, 1, 1, 2, 3], Some(&cat), 1);
        assert_eq!(profile.categories, vec!["shoes"]);
    }

    #[test]
    fn test_profile_respects_top_k() {
        let cat = catalog(
            (1..=6)
                .map(|id| product(id, &format!("cat{id}"), ""))
                .collect(),
        );
        let profile = build_profile_from_clicks(&[1, 2, 3, 4, 5, 6], Some(&cat), 3);
        assert_eq!(profile.categories, vec!["cat1", "cat2", "cat3"]);
    }

    #[test]
    fn test_update_profile_from_none() {
        let item = hit(1, 0.0, Some("shoes"), Some("blue"));
        let profile = update_user_profile(None, &item, 3);

        assert_eq!(profile.categories, vec!["shoes"]);
        assert_eq!(profile.colors, vec!["blue"]);
    }

    #[test]
    fn test_update_profile_skips_missing_and_empty_attributes() {
        let item = hit(1, 0.0, Some(""), None);
        let profile = update_user_profile(None, &item, 3);
        assert!(profile.is_empty());
    }

    #[test]
    fn test_update_profile_never_exceeds_keep_top() {
        let mut profile = None;
        for i in 0..20 {
            let item = product(i, &format!("cat{i}"), &format!("color{}", i % 7));
            let updated = update_user_profile(profile, &item, 3);
            assert!(updated.categories.len() <= 3);
            assert!(updated.colors.len() <= 3);
            profile = Some(updated);
        }
    }

    #[test]
    fn test_update_profile_promotes_repeated_value() {
        let profile = UserProfile {
            categories: vec!["bags".into(), "hats".into(), "belts".into()],
            colors: vec![],
        };
        let item = product(1, "belts", "");

        let updated = update_user_profile(Some(profile), &item, 3);
        assert_eq!(updated.categories, vec!["belts", "bags", "hats"]);
    }

    #[test]
    fn test_most_common_tie_break_is_first_seen() {
        let values = ["b", "a", "c", "a", "b"];
        assert_eq!(most_common(values, 2), vec!["b", "a"]);
        assert_eq!(most_common(values, 10), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_value_counts_skips_empty() {
        let counts = value_counts(["x", "", "y", "y"]);
        assert_eq!(counts, vec![("y".to_string(), 2), ("x".to_string(), 1)]);
    }
}

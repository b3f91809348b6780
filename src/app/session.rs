//! A shopper's search session: retrieval, re-ranking and the click history
//! that drives it.

use serde::{Deserialize, Serialize};

use crate::{
    app::errors::AppError,
    config::Config,
    personalization::{
        build_profile_from_clicks, update_user_profile, BoostWeights, Personalizer, UserProfile,
    },
    prefs::PreferenceStore,
    search::{CategoryRecommendation, Facets, ResultFilter, SearchHit, SearchOptions, Searcher},
};

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,

    #[serde(flatten)]
    pub options: SearchOptions,

    #[serde(flatten)]
    pub filter: ResultFilter,

    /// Re-rank with the click history. On by default.
    #[serde(default = "default_personalize")]
    pub personalize: bool,
}

fn default_personalize() -> bool {
    true
}

impl SearchRequest {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            options: SearchOptions::default(),
            filter: ResultFilter::default(),
            personalize: true,
        }
    }

    /// Reject requests that could never return anything useful.
    pub fn validate(&self) -> Result<(), AppError> {
        let SearchOptions {
            top_k,
            price_min,
            price_max,
            ..
        } = self.options;

        if !price_min.is_finite() || !price_max.is_finite() || price_min < 0.0 {
            return Err(AppError::InvalidRequest(
                "prices must be non-negative numbers".to_string(),
            ));
        }
        if price_min > price_max {
            return Err(AppError::InvalidRequest(format!(
                "price_min ({price_min}) is greater than price_max ({price_max})"
            )));
        }
        if top_k == 0 {
            return Err(AppError::InvalidRequest("top_k must be greater than 0".to_string()));
        }
        if self.filter.limit == Some(0) {
            return Err(AppError::InvalidRequest("limit must be greater than 0".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// Hits retrieved before brand/category filtering and the display limit
    pub total: usize,
    pub results: Vec<SearchHit>,
    pub facets: Facets,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub clicks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferencesSummary {
    pub total_clicks: usize,
    pub click_history: Vec<i64>,
    pub category_counts: Vec<CategoryCount>,
    pub profile: UserProfile,
    /// Profile folded click by click since the session started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_profile: Option<UserProfile>,
}

pub struct Session {
    config: Config,
    searcher: Searcher,
    personalizer: Personalizer,
    prefs: PreferenceStore,
    click_history: Vec<i64>,
    session_profile: Option<UserProfile>,
}

impl Session {
    pub fn new(config: Config, searcher: Searcher, prefs: PreferenceStore) -> Result<Self, AppError> {
        let click_history = prefs.load()?;
        let personalizer = Personalizer::new(
            config.personalization.weights(),
            config.personalization.profile_top_k,
        );

        log::info!(
            "session started with {} saved clicks, semantic search {}",
            click_history.len(),
            if searcher.has_index() { "ready" } else { "unavailable" }
        );

        Ok(Self {
            config,
            searcher,
            personalizer,
            prefs,
            click_history,
            session_profile: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn click_history(&self) -> &[i64] {
        &self.click_history
    }

    /// Profile derived from the whole click history.
    pub fn profile(&self) -> UserProfile {
        build_profile_from_clicks(
            &self.click_history,
            Some(self.searcher.catalog().as_ref()),
            self.personalizer.profile_top_k,
        )
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse, AppError> {
        request.validate()?;

        let hits = self.searcher.search(&request.query, &request.options)?;
        let total = hits.len();
        let facets = Facets::collect(&hits);

        let hits = if request.personalize {
            self.personalizer.apply(
                &hits,
                &self.click_history,
                Some(self.searcher.catalog().as_ref()),
            )
        } else {
            hits
        };

        let filter = ResultFilter {
            limit: request.filter.limit.or(Some(self.config.web.display_limit)),
            ..request.filter.clone()
        };
        let results = filter.apply(hits);

        Ok(SearchResponse {
            query: request.query.clone(),
            total,
            results,
            facets,
            profile: self.profile(),
        })
    }

    /// Re-rank records supplied by the caller, against the session's click
    /// history unless another one is given. Order is kept.
    pub fn personalize(
        &self,
        results: &[SearchHit],
        click_history: Option<&[i64]>,
        weights: Option<BoostWeights>,
    ) -> Vec<SearchHit> {
        let personalizer = Personalizer {
            weights: weights.unwrap_or(self.personalizer.weights),
            ..self.personalizer
        };

        personalizer.apply(
            results,
            click_history.unwrap_or(&self.click_history),
            Some(self.searcher.catalog().as_ref()),
        )
    }

    /// Record a click on a catalog product and persist the history.
    pub fn click(&mut self, id: i64) -> Result<UserProfile, AppError> {
        let product = self
            .searcher
            .catalog()
            .get(id)
            .ok_or(AppError::NotFound(id))?;

        let session_profile = update_user_profile(
            self.session_profile.clone(),
            product,
            self.personalizer.profile_top_k,
        );

        // nothing changes in memory unless the new history is on disk
        let mut click_history = self.click_history.clone();
        click_history.push(id);
        self.prefs.save(&click_history)?;

        self.click_history = click_history;
        self.session_profile = Some(session_profile);
        log::debug!("click on {id}, {} clicks total", self.click_history.len());

        Ok(self.profile())
    }

    pub fn reset(&mut self) -> Result<(), AppError> {
        self.click_history.clear();
        self.session_profile = None;
        self.prefs.save(&self.click_history)?;
        log::info!("click history cleared");
        Ok(())
    }

    pub fn preferences(&self) -> PreferencesSummary {
        let category_counts = self
            .searcher
            .category_counts(&self.click_history)
            .into_iter()
            .map(|(category, clicks)| CategoryCount { category, clicks })
            .collect();

        PreferencesSummary {
            total_clicks: self.click_history.len(),
            click_history: self.click_history.clone(),
            category_counts,
            profile: self.profile(),
            session_profile: self.session_profile.clone().filter(|p| !p.is_empty()),
        }
    }

    pub fn recommendations(&self) -> Vec<CategoryRecommendation> {
        self.searcher.recommendations(
            &self.click_history,
            self.config.web.recommendations_per_category,
        )
    }
}

use crate::{
    app::{AppFactory, AppPaths, SearchRequest},
    search::{ResultFilter, SearchOptions, SortOrder},
};
use anyhow::{bail, Result};
use inquire::error::InquireResult;

/// Search flags as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: String,
    pub top_k: Option<usize>,
    pub categories: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub brand: Option<String>,
    pub sort: SortOrder,
    pub limit: Option<usize>,
    pub no_personalize: bool,
}

impl SearchParams {
    pub fn into_request(self, default_top_k: usize) -> Result<SearchRequest> {
        let defaults = SearchOptions::default();
        let price_min = self.min_price.unwrap_or(defaults.price_min);
        let price_max = self.max_price.unwrap_or(defaults.price_max);

        let top_k = self.top_k.unwrap_or(default_top_k);

        let request = SearchRequest {
            query: self.query,
            options: SearchOptions {
                top_k,
                categories: self.categories,
                price_min,
                price_max,
            },
            filter: ResultFilter {
                brand: self.brand,
                category: None,
                sort: self.sort,
                limit: self.limit,
            },
            personalize: !self.no_personalize,
        };
        request.validate()?;

        Ok(request)
    }
}

pub fn handle_index(paths: &AppPaths) -> Result<()> {
    let config = AppFactory::create_config(paths)?;
    let count = AppFactory::build_index(&config)?;

    println!("{count} products indexed");
    Ok(())
}

pub fn handle_search(paths: &AppPaths, params: SearchParams) -> Result<()> {
    let session = AppFactory::create_session(paths)?;
    let request = params.into_request(session.config().semantic_search.top_k)?;

    let response = session.search(&request)?;
    if response.results.is_empty() {
        log::warn!("no results found, try a different query");
    }

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

pub fn handle_click(paths: &AppPaths, id: i64) -> Result<()> {
    let mut session = AppFactory::create_offline_session(paths)?;
    let profile = session.click(id)?;

    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

pub fn handle_reset(paths: &AppPaths, yes: bool) -> Result<()> {
    let mut session = AppFactory::create_offline_session(paths)?;

    if session.click_history().is_empty() {
        println!("Click history is already empty");
        return Ok(());
    }

    if !yes {
        match inquire::prompt_confirmation(format!(
            "Are you sure you want to forget {} clicks?",
            session.click_history().len()
        )) {
            InquireResult::Ok(true) => {}
            InquireResult::Ok(false) => return Ok(()),
            InquireResult::Err(err) => bail!("An error occurred: {}", err),
        }
    }

    session.reset()?;
    println!("Click history cleared");
    Ok(())
}

pub fn handle_prefs(paths: &AppPaths) -> Result<()> {
    let session = AppFactory::create_offline_session(paths)?;
    println!("{}", serde_json::to_string_pretty(&session.preferences())?);
    Ok(())
}

pub fn handle_recommend(paths: &AppPaths) -> Result<()> {
    let session = AppFactory::create_offline_session(paths)?;
    println!("{}", serde_json::to_string_pretty(&session.recommendations())?);
    Ok(())
}

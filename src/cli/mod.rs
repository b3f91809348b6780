use clap::{Parser, Subcommand};

use crate::search::SortOrder;

mod handlers;

pub use handlers::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start shopsearch as a service.
    Daemon {},

    /// Embed the catalog and build the search index
    Index {},

    /// Search the catalog
    Search {
        /// Free text query. Hints like "under 2000" narrow the price range.
        /// Leave empty to list the catalog.
        #[clap(default_value = "")]
        query: String,

        /// Neighbors fetched before filtering
        #[clap(short = 'k', long)]
        top_k: Option<usize>,

        /// Only these categories (repeatable)
        #[clap(short, long)]
        category: Vec<String>,

        #[clap(long)]
        min_price: Option<f64>,

        #[clap(long)]
        max_price: Option<f64>,

        /// Exact brand match
        #[clap(short, long)]
        brand: Option<String>,

        #[clap(short, long, value_enum, default_value_t = SortOrder::Score)]
        sort: SortOrder,

        /// Results to print
        #[clap(short, long)]
        limit: Option<usize>,

        /// Don't re-rank with the click history
        #[clap(long, default_value = "false")]
        no_personalize: bool,
    },

    /// Record a click on a product
    Click {
        id: i64,
    },

    /// Clear the click history
    Reset {
        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },

    /// Show the click history and the preferences inferred from it
    Prefs {},

    /// Products from the categories you clicked most
    Recommend {},
}

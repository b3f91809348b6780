use clap::Parser;
use tracing_subscriber::EnvFilter;

mod app;
mod catalog;
mod cli;
mod config;
mod personalization;
mod prefs;
mod search;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod web;
use app::AppFactory;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    let paths = AppFactory::get_paths()?;

    match args.command {
        cli::Command::Daemon {} => {
            let session = AppFactory::create_session(&paths)?;
            web::start_daemon(session)
        }

        cli::Command::Index {} => cli::handle_index(&paths),

        cli::Command::Search {
            query,
            top_k,
            category,
            min_price,
            max_price,
            brand,
            sort,
            limit,
            no_personalize,
        } => cli::handle_search(
            &paths,
            cli::SearchParams {
                query,
                top_k,
                categories: category,
                min_price,
                max_price,
                brand,
                sort,
                limit,
                no_personalize,
            },
        ),

        cli::Command::Click { id } => cli::handle_click(&paths, id),
        cli::Command::Reset { yes } => cli::handle_reset(&paths, yes),
        cli::Command::Prefs {} => cli::handle_prefs(&paths),
        cli::Command::Recommend {} => cli::handle_recommend(&paths),
    }
}

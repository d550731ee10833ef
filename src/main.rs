use clap::Parser;
use tiered_cache_repo::cli::{self, Cli, Command};
use tiered_cache_repo::config::AppConfig;
use tiered_cache_repo::infrastructure::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);

    match cli.command {
        Command::Decide(args) => cli::decide::run(args, &config.cache).await,
        Command::Config => cli::show_config::run(&config).await,
    }
}

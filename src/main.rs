//! Application entry point for listing-watch.
//!
//! Initializes all components, starts the poller and the Telegram bot.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use dotenv::dotenv;
use listing_watch::bot::TelegramBot;
use listing_watch::bot::commands::CommandHandler;
use listing_watch::config::Config;
use listing_watch::listing::ListingSource;
use listing_watch::listing::aggregator::ListingAggregator;
use listing_watch::listing::bazaraki_platform::BazarakiPlatform;
use listing_watch::logging::setup_logging;
use listing_watch::notifier::Notifier;
use listing_watch::notifier::telegram_notifier::TelegramNotifier;
use listing_watch::repository::Repository;
use listing_watch::service::Services;
use listing_watch::task::listing_poller::ListingPoller;
use listing_watch::telegram::TelegramClient;
use log::debug;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let init_start = Instant::now();
    let config = Arc::new(Config::new()?);
    let _log_guard = setup_logging(&config)?;
    info!("Starting listing-watch...");

    let db = setup_database(&config, init_start).await?;
    let services = setup_services(&config, db)?;

    let telegram = Arc::new(TelegramClient::new(
        &config.telegram_api_url,
        &config.bot_token,
    )?);
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(telegram.clone()));

    let poller = ListingPoller::new(
        services.listing_watch.clone(),
        notifier.clone(),
        config.poll_interval,
        config.max_concurrent_requests,
    );
    poller.clone().start()?;

    let handler = Arc::new(CommandHandler::new(services, notifier));
    let bot = TelegramBot::new(telegram, handler);
    bot.clone().start()?;

    run(init_start).await?;

    poller.stop()?;
    bot.stop()?;
    Ok(())
}

async fn setup_database(config: &Config, init_start: Instant) -> Result<Arc<Repository>> {
    debug!("Setting up Database...");
    let db = Arc::new(Repository::new(&config.db_url, &config.db_path).await?);

    info!("Running database migrations...");
    db.run_migrations().await?;
    info!(
        "Database setup complete ({:.2}s).",
        init_start.elapsed().as_secs_f64()
    );

    Ok(db)
}

fn setup_services(config: &Config, db: Arc<Repository>) -> Result<Arc<Services>> {
    debug!("Setting up Services...");
    let platform: Arc<dyn ListingSource> = Arc::new(BazarakiPlatform::new(
        &config.listing_base_url,
        config.requests_per_second,
    )?);
    let aggregator = Arc::new(ListingAggregator::new(
        platform,
        config.max_concurrent_requests,
    ));
    Ok(Arc::new(Services::new(db, aggregator)))
}

async fn run(init_start: Instant) -> Result<()> {
    info!(
        "listing-watch is up in {:.2}s. Press Ctrl+C to stop.",
        init_start.elapsed().as_secs_f64()
    );

    tokio::signal::ctrl_c().await?;
    info!("Ctrl+C received, shutting down.");

    Ok(())
}

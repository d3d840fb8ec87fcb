use crate::components::calendar_watch::{CalendarScheduler, ScheduleSettings};
use crate::components::{DiscordNotifier, IcsFeed};
use crate::config::Config;
use crate::error::Error;
use crate::shutdown;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,serenity=warn,reqwest=warn,hyper=warn")
        }))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Connect to Discord and run the calendar checks until a shutdown signal
pub async fn start_watch(config: Config) -> miette::Result<()> {
    crate::utils::i18n::set_locale(&config.bot_locale);
    info!("Setting locale to {}", config.bot_locale);
    info!(
        "Timezone {}, morning schedule at {}, reminders {} minutes ahead",
        config.timezone, config.morning_schedule_time, config.reminder_minutes
    );

    let feed = IcsFeed::from_config(&config)?;
    let notifier = DiscordNotifier::connect(&config).await.map_err(|e| {
        error!("Failed to connect to Discord: {}", e);
        e
    })?;

    let scheduler = CalendarScheduler::new(
        ScheduleSettings::from_config(&config),
        Arc::new(feed),
        Arc::new(notifier),
    );

    // Wait for either the scheduler to end or a shutdown signal
    tokio::select! {
        _ = scheduler.run() => {
            info!("Scheduler ended");
            Ok(())
        }
        result = shutdown::wait_for_signal() => {
            result?;
            info!("Received shutdown signal, stopping calendar watch...");
            Ok(())
        }
    }
}
